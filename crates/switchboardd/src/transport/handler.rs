//! Per-connection request handling.
//!
//! A client writes one JSON-RPC payload and then waits. The payload ends at
//! the first read that returns fewer bytes than [`READ_CHUNK_BYTES`], or at
//! end of stream. A payload that happens to fill the last chunk exactly is
//! only complete once the client closes its write half.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use serde_json::Value;
use switchboard_rpc::{DispatchEngine, Response, RpcError};
use tracing::{debug, warn};

use super::LISTENER_TARGET;

/// Size of each socket read.
pub const READ_CHUNK_BYTES: usize = 1024;

/// Largest request payload accepted before the connection is refused.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Turns one request payload into at most one response payload.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles `payload`, returning the encoded response unless the request
    /// was a notification.
    fn handle_request(&self, payload: &[u8]) -> Option<String>;
}

impl RequestHandler for DispatchEngine {
    fn handle_request(&self, payload: &[u8]) -> Option<String> {
        self.handle_bytes(payload)
    }
}

/// Handles accepted socket connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}

/// Connection handler that feeds each payload to a [`RequestHandler`].
#[derive(Debug)]
pub struct RpcConnectionHandler<H> {
    requests: H,
}

impl<H: RequestHandler> RpcConnectionHandler<H> {
    /// Wraps a request handler.
    pub const fn new(requests: H) -> Self {
        Self { requests }
    }

    /// Request handler receiving payloads.
    pub const fn requests(&self) -> &H {
        &self.requests
    }

    /// Runs one request/response exchange over `stream`.
    pub(crate) fn exchange<S: Read + Write>(&self, stream: &mut S) -> io::Result<()> {
        let payload = match read_request(stream) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(target: LISTENER_TARGET, "client disconnected without request");
                return Ok(());
            }
            Err(error) if error.kind() == io::ErrorKind::InvalidData => {
                warn!(target: LISTENER_TARGET, %error, "rejecting oversized request");
                let response = Response::failure(Value::Null, RpcError::parse_error(error.to_string()));
                return write_response(stream, &response.encode());
            }
            Err(error) => return Err(error),
        };

        debug!(target: LISTENER_TARGET, bytes = payload.len(), "request received");
        match self.requests.handle_request(&payload) {
            Some(response) => write_response(stream, &response),
            None => {
                debug!(target: LISTENER_TARGET, "notification handled without response");
                Ok(())
            }
        }
    }
}

impl<H: RequestHandler> ConnectionHandler for RpcConnectionHandler<H> {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = self.exchange(&mut stream) {
            if error.kind() == io::ErrorKind::ConnectionReset {
                debug!(target: LISTENER_TARGET, %error, "client reset connection");
            } else {
                warn!(target: LISTENER_TARGET, %error, "connection handler error");
            }
        }
    }
}

/// Reads one request payload.
///
/// Returns `Ok(None)` when the client closes the connection without sending
/// anything.
pub(crate) fn read_request<R: Read>(stream: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK_BYTES];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        buffer.extend_from_slice(chunk.get(..bytes_read).unwrap_or_default());
        enforce_request_limit(buffer.len())?;
        if bytes_read < READ_CHUNK_BYTES {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
    }
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> io::Result<()> {
    if size > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "request exceeds maximum size",
        ));
    }
    Ok(())
}

fn write_response<W: Write>(stream: &mut W, response: &str) -> io::Result<()> {
    debug!(target: LISTENER_TARGET, bytes = response.len(), "writing response");
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use mockall::mock;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    mock! {
        Requests {}
        impl RequestHandler for Requests {
            fn handle_request(&self, payload: &[u8]) -> Option<String>;
        }
    }

    /// Stream that yields scripted reads and records writes.
    #[derive(Default)]
    struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn with_reads(reads: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into_iter().collect(),
                written: Vec::new(),
            }
        }

        fn written(&self) -> &str {
            std::str::from_utf8(&self.written).expect("response is UTF-8")
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some(next) = self.reads.pop_front() else {
                return Ok(0);
            };
            let bytes = next?;
            let len = bytes.len().min(buf.len());
            buf.get_mut(..len)
                .expect("scripted read fits buffer")
                .copy_from_slice(bytes.get(..len).expect("scripted read length"));
            Ok(len)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn chunk(byte: u8, len: usize) -> io::Result<Vec<u8>> {
        Ok(vec![byte; len])
    }

    #[test]
    fn short_read_ends_the_request() {
        let mut stream = ScriptedStream::with_reads([Ok(b"{\"id\":1}".to_vec()), chunk(b'x', 4)]);
        let payload = read_request(&mut stream).expect("read succeeds");
        assert_eq!(payload.as_deref(), Some(b"{\"id\":1}".as_slice()));
        assert_eq!(stream.reads.len(), 1, "second read must not be consumed");
    }

    #[test]
    fn full_chunks_accumulate_until_a_short_read() {
        let mut stream = ScriptedStream::with_reads([
            chunk(b'a', READ_CHUNK_BYTES),
            chunk(b'b', READ_CHUNK_BYTES),
            chunk(b'c', 10),
        ]);
        let payload = read_request(&mut stream)
            .expect("read succeeds")
            .expect("payload present");
        assert_eq!(payload.len(), 2 * READ_CHUNK_BYTES + 10);
        assert_eq!(payload.last(), Some(&b'c'));
    }

    #[test]
    fn chunk_aligned_request_ends_at_end_of_stream() {
        let mut stream = ScriptedStream::with_reads([chunk(b'a', READ_CHUNK_BYTES)]);
        let payload = read_request(&mut stream)
            .expect("read succeeds")
            .expect("payload present");
        assert_eq!(payload.len(), READ_CHUNK_BYTES);
    }

    #[test]
    fn empty_stream_yields_no_request() {
        let mut stream = ScriptedStream::default();
        assert!(read_request(&mut stream).expect("read succeeds").is_none());
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut stream = ScriptedStream::with_reads([
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"{}".to_vec()),
        ]);
        let payload = read_request(&mut stream).expect("read succeeds");
        assert_eq!(payload.as_deref(), Some(b"{}".as_slice()));
    }

    #[test]
    fn oversized_requests_are_rejected() {
        let full_chunks = MAX_REQUEST_BYTES.div_ceil(READ_CHUNK_BYTES) + 1;
        let mut stream =
            ScriptedStream::with_reads((0..full_chunks).map(|_| chunk(b'a', READ_CHUNK_BYTES)));
        let error = read_request(&mut stream).expect_err("request is too large");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn exchange_writes_the_dispatched_response() {
        let mut requests = MockRequests::new();
        requests
            .expect_handle_request()
            .withf(|payload| payload == b"ping")
            .times(1)
            .return_const(Some(String::from("pong")));
        let handler = RpcConnectionHandler::new(requests);
        let mut stream = ScriptedStream::with_reads([Ok(b"ping".to_vec())]);

        handler.exchange(&mut stream).expect("exchange succeeds");

        assert_eq!(stream.written(), "pong");
    }

    #[rstest]
    #[case::notification(Some(b"note".to_vec()))]
    #[case::disconnect(None)]
    fn exchange_writes_nothing_without_a_response(#[case] payload: Option<Vec<u8>>) {
        let mut requests = MockRequests::new();
        requests
            .expect_handle_request()
            .times(usize::from(payload.is_some()))
            .return_const(None);
        let handler = RpcConnectionHandler::new(requests);
        let mut stream = ScriptedStream::with_reads(payload.map(Ok));

        handler.exchange(&mut stream).expect("exchange succeeds");

        assert!(stream.written.is_empty());
    }

    #[test]
    fn oversized_exchange_reports_a_parse_error() {
        let mut requests = MockRequests::new();
        requests.expect_handle_request().never();
        let handler = RpcConnectionHandler::new(requests);
        let full_chunks = MAX_REQUEST_BYTES.div_ceil(READ_CHUNK_BYTES) + 1;
        let mut stream =
            ScriptedStream::with_reads((0..full_chunks).map(|_| chunk(b'a', READ_CHUNK_BYTES)));

        handler.exchange(&mut stream).expect("rejection is written");

        let response: Value = serde_json::from_str(stream.written()).expect("response is JSON");
        assert_eq!(response["error"]["code"], json!(-32700));
        assert_eq!(response["id"], Value::Null);
    }
}
