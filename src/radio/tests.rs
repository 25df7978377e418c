use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::net::TcpListener;
use std::thread;

use crate::config::Station;
use crate::error::ConnectionError;

use super::stream::{connect, RadioStream};

fn station(url: String) -> Station {
    Station {
        name: "Test FM".to_string(),
        url,
        description: String::new(),
    }
}

/// Serve exactly one canned HTTP response on a loopback socket.
fn serve_once(response: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut socket, _)) = listener.accept() {
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request);
            let _ = socket.write_all(&response);
        }
    });
    format!("http://{addr}/stream")
}

#[test]
fn connect_to_a_closed_port_is_unreachable() {
    // Bind and immediately drop so the port is known to refuse.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = connect(&station(format!("http://127.0.0.1:{port}/stream"))).unwrap_err();
    assert!(matches!(err, ConnectionError::Unreachable(_)));
}

#[test]
fn non_success_response_reports_bad_status() {
    let url = serve_once(
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
    );

    let err = connect(&station(url)).unwrap_err();
    assert_eq!(err, ConnectionError::BadStatus(404));
}

#[test]
fn stream_bytes_arrive_through_the_reader_until_the_server_closes() {
    let payload = b"icecast-ish audio bytes".to_vec();
    let mut response =
        b"HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nConnection: close\r\n\r\n".to_vec();
    response.extend_from_slice(&payload);
    let url = serve_once(response);

    let stream = connect(&station(url)).unwrap();
    assert_eq!(stream.station(), "Test FM");

    let mut reader = stream.into_reader();
    let mut received = Vec::new();
    reader.read_to_end(&mut received).unwrap();
    assert_eq!(received, payload);

    // After the end, reads keep returning zero.
    let mut probe = [0u8; 8];
    assert_eq!(reader.read(&mut probe).unwrap(), 0);
}

#[test]
fn seeking_a_live_stream_is_rejected() {
    let stream = RadioStream::from_transport("Test FM", Cursor::new(vec![0u8; 32]));
    let mut reader = stream.into_reader();

    let err = reader.seek(SeekFrom::Start(0)).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

    // The failed seek does not disturb the byte stream itself.
    let mut received = Vec::new();
    reader.read_to_end(&mut received).unwrap();
    assert_eq!(received.len(), 32);
}

#[test]
fn dropping_the_reader_releases_a_blocked_transport() {
    // A transport far larger than the buffer cap forces the pump to block.
    let stream = RadioStream::from_transport("Test FM", Cursor::new(vec![0u8; 2 * 1024 * 1024]));
    let mut reader = stream.into_reader();

    let mut first = [0u8; 1024];
    assert!(reader.read(&mut first).unwrap() > 0);
    drop(reader);
    // Nothing to assert beyond not hanging: the pump thread observes the
    // closed flag and exits instead of waiting forever.
}
