use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    ChaCha20Poly1305, Nonce,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const TOKEN_VERSION: u8 = 1;
pub const NONCE_BYTES: usize = 12;
pub const TAG_BYTES: usize = 16;

/// version(1) + unix seconds i64 BE(8) + nonce(12). Authenticated as AAD so
/// neither the timestamp nor the nonce can be swapped without detection.
const HEADER_BYTES: usize = 1 + 8 + NONCE_BYTES;
const MIN_TOKEN_BYTES: usize = HEADER_BYTES + TAG_BYTES;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("token is too short or has an unknown version")]
    Malformed,
    #[error("token failed authentication (wrong key or tampered payload)")]
    Rejected,
    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

/// Symmetric gateway keyed by one student's provisioned key string. The
/// 256-bit cipher key is the SHA-256 digest of that string, so any
/// printable key material from the roster works unchanged.
pub struct Cipher {
    key: [u8; 32],
}

impl Cipher {
    pub fn from_key_str(key: &str) -> Cipher {
        Cipher {
            key: Sha256::digest(key.as_bytes()).into(),
        }
    }

    /// Encrypts one result payload into a self-contained token with a fresh
    /// random nonce. Two seals of the same plaintext never produce the same
    /// token.
    pub fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CipherError> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.key).expect("32-byte key");
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let mut token = Vec::with_capacity(MIN_TOKEN_BYTES + plaintext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&Utc::now().timestamp().to_be_bytes());
        token.extend_from_slice(&nonce);

        let body = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &token,
                },
            )
            .map_err(|_| CipherError::Rejected)?;
        token.extend_from_slice(&body);
        Ok(token)
    }

    pub fn open(&self, token: &[u8]) -> Result<String, CipherError> {
        if token.len() < MIN_TOKEN_BYTES || token[0] != TOKEN_VERSION {
            return Err(CipherError::Malformed);
        }
        let (header, body) = token.split_at(HEADER_BYTES);
        let nonce = Nonce::from_slice(&header[9..]);

        let cipher = ChaCha20Poly1305::new_from_slice(&self.key).expect("32-byte key");
        let plain = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: body,
                    aad: header,
                },
            )
            .map_err(|_| CipherError::Rejected)?;
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }
}

/// Reads the embedded issue time without authenticating the token. Only for
/// diagnostics; trust nothing from an unopened token.
pub fn issued_at(token: &[u8]) -> Option<DateTime<Utc>> {
    if token.len() < MIN_TOKEN_BYTES || token[0] != TOKEN_VERSION {
        return None;
    }
    let secs = i64::from_be_bytes(token[1..9].try_into().ok()?);
    DateTime::from_timestamp(secs, 0)
}
