//! One-shot HTTP test servers for exercising the remote clients.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Accepts a single connection, captures the raw request (headers plus
/// body, using `Content-Length` to know when the body is complete),
/// replies with the canned response, and hands the captured request back
/// through the join handle.
pub fn spawn_single_response_server(
    response: &'static str,
) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let mut request = Vec::new();
        let mut buf = [0_u8; 4096];

        loop {
            let read = stream.read(&mut buf).expect("read request");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
            if let Some(headers_end) = find_headers_end(&request) {
                let headers = String::from_utf8_lossy(&request[..headers_end]);
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.trim()
                            .eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if request.len() >= headers_end + 4 + content_length {
                    break;
                }
            }
        }

        stream
            .write_all(response.as_bytes())
            .expect("write response");
        stream.flush().expect("flush response");
        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{}", addr), handle)
}

fn find_headers_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

pub fn http_ok(body: &str) -> String {
    http_response("200 OK", body)
}

pub fn http_error(status: &str, body: &str) -> String {
    http_response(status, body)
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Responses handed to a server thread need a `'static` lifetime.
pub fn leak(value: String) -> &'static str {
    Box::leak(value.into_boxed_str())
}
