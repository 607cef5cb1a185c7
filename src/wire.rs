use std::io::{self, Read, Write};

/// Upper bound on one response frame. Large enough for any full-record
/// dump, small enough to reject garbage lengths from a confused peer.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Writes one response as a u32 big-endian length prefix followed by the
/// payload. One frame is one protocol message; the receiver never has to
/// guess where a message ends.
pub fn send_frame(writer: &mut impl Write, payload: &[u8]) -> io::Result<()> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "frame of {} bytes exceeds the {} byte cap",
                payload.len(),
                MAX_FRAME_BYTES
            ),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Reads one length-prefixed frame. `Ok(None)` means the peer closed
/// cleanly at a frame boundary; an EOF inside a frame is an error, as is a
/// length over the cap.
pub fn recv_frame(reader: &mut impl Read) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        match reader.read(&mut len_bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside a frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("peer announced a {len} byte frame, cap is {MAX_FRAME_BYTES}"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}
