use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use gradeport::cipher::{Cipher, CipherError};
use gradeport::roster::Roster;
use gradeport::server;
use gradeport::wire;

const SAMPLE: &str = "\
Name,ID Number,Key,Midterm
Lisa Simpson,1803933,lisa-key-2024,80
Bart Simpson,1884159,bart-key-2024,90
";

/// Serves the given roster on an ephemeral localhost port, one connection
/// at a time, for the lifetime of the test process.
fn start_server(roster_text: &str) -> SocketAddr {
    let roster: &'static Roster =
        Box::leak(Box::new(Roster::parse(roster_text).expect("parse roster")));
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        let _ = server::serve(listener, roster);
    });
    addr
}

fn connect(addr: SocketAddr) -> (TcpStream, BufReader<TcpStream>) {
    let stream = TcpStream::connect(addr).expect("connect");
    let reader = BufReader::new(stream.try_clone().expect("clone stream"));
    (stream, reader)
}

fn send_line(stream: &mut TcpStream, line: &str) {
    stream.write_all(line.as_bytes()).expect("send line");
    stream.write_all(b"\n").expect("send newline");
    stream.flush().expect("flush");
}

#[test]
fn gma_round_trip_decrypts_under_the_requesters_key() {
    let addr = start_server(SAMPLE);
    let (mut stream, mut reader) = connect(addr);

    send_line(&mut stream, "1803933 GMA");
    let token = wire::recv_frame(&mut reader)
        .expect("recv")
        .expect("one response frame");

    let plaintext = Cipher::from_key_str("lisa-key-2024")
        .open(&token)
        .expect("decrypt with the requester's key");
    assert_eq!(plaintext, "Midterm average: 85.0");

    // Any other student's key must not open the same response.
    assert_eq!(
        Cipher::from_key_str("bart-key-2024").open(&token),
        Err(CipherError::Rejected)
    );
}

#[test]
fn gg_returns_the_requesters_record_only() {
    let addr = start_server(SAMPLE);
    let (mut stream, mut reader) = connect(addr);

    send_line(&mut stream, "1884159 GG");
    let token = wire::recv_frame(&mut reader).expect("recv").expect("frame");

    let plaintext = Cipher::from_key_str("bart-key-2024")
        .open(&token)
        .expect("decrypt");
    assert_eq!(
        plaintext,
        "Name: Bart Simpson, Key: bart-key-2024, Midterm: 90"
    );
    assert!(!plaintext.contains("Lisa"));
}

#[test]
fn requests_are_stateless_across_one_connection() {
    let addr = start_server(SAMPLE);
    let (mut stream, mut reader) = connect(addr);

    send_line(&mut stream, "1803933 GMA");
    let first = wire::recv_frame(&mut reader).expect("recv").expect("frame");
    assert!(Cipher::from_key_str("lisa-key-2024").open(&first).is_ok());

    send_line(&mut stream, "1884159 GG");
    let second = wire::recv_frame(&mut reader).expect("recv").expect("frame");
    assert!(Cipher::from_key_str("bart-key-2024").open(&second).is_ok());
}

#[test]
fn unknown_command_is_rejected_but_the_connection_survives() {
    let addr = start_server(SAMPLE);
    let (mut stream, mut reader) = connect(addr);

    // No reply is sent for the rejected token, so the next frame on the
    // wire belongs to the follow-up request.
    send_line(&mut stream, "1803933 BOGUS");
    send_line(&mut stream, "1803933 GMA");

    let token = wire::recv_frame(&mut reader).expect("recv").expect("frame");
    let plaintext = Cipher::from_key_str("lisa-key-2024")
        .open(&token)
        .expect("decrypt");
    assert_eq!(plaintext, "Midterm average: 85.0");
}

#[test]
fn malformed_lines_are_rejected_but_the_connection_survives() {
    let addr = start_server(SAMPLE);
    let (mut stream, mut reader) = connect(addr);

    send_line(&mut stream, "1803933");
    send_line(&mut stream, "1803933 GMA extra");
    send_line(&mut stream, "1803933 GMA");

    let token = wire::recv_frame(&mut reader).expect("recv").expect("frame");
    assert!(Cipher::from_key_str("lisa-key-2024").open(&token).is_ok());
}

#[test]
fn unknown_student_closes_the_connection_but_not_the_listener() {
    let addr = start_server(SAMPLE);

    let (mut stream, mut reader) = connect(addr);
    send_line(&mut stream, "9999999 GMA");
    assert!(
        wire::recv_frame(&mut reader).expect("recv").is_none(),
        "connection should be closed without a reply"
    );

    // The listener keeps accepting after the failed connection.
    let (mut stream, mut reader) = connect(addr);
    send_line(&mut stream, "1803933 GMA");
    assert!(wire::recv_frame(&mut reader).expect("recv").is_some());
}

#[test]
fn compute_errors_close_the_connection_without_a_reply() {
    let bad = "\
Name,ID Number,Key,Midterm
Lisa Simpson,1803933,lisa-key-2024,ninety
";
    let addr = start_server(bad);
    let (mut stream, mut reader) = connect(addr);

    send_line(&mut stream, "1803933 GMA");
    assert!(wire::recv_frame(&mut reader).expect("recv").is_none());
}

#[test]
fn peer_close_at_the_request_boundary_is_clean() {
    let addr = start_server(SAMPLE);
    let (stream, reader) = connect(addr);
    drop(stream);
    drop(reader);

    // The listener must still be serving after the silent disconnect.
    let (mut stream, mut reader) = connect(addr);
    send_line(&mut stream, "1884159 GMA");
    assert!(wire::recv_frame(&mut reader).expect("recv").is_some());
}
