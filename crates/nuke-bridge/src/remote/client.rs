//! TCP client for the remote execution listener running inside Nuke.
//!
//! Every call to [`RemoteExecClient::send`] is one exchange on a fresh
//! connection: connect, write the payload once, read one response, close.
//! Nothing is retried.
//!
//! # Thread Safety
//!
//! The client holds a tokio `Mutex` for the duration of each exchange, so
//! concurrent callers are queued and served one at a time in arrival order.

use super::protocol::{read_response, write_request, ExecutionRequest};
use crate::address::ConnectionAddress;
use crate::config::{Framing, TransportConfig, TransportSettings};
use crate::error::{BridgeError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Response received from the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Response text, decoded lossily as UTF-8.
    pub output: String,
    /// Where the response came from.
    pub address: ConnectionAddress,
}

/// Socket options for each exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub framing: Framing,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub max_response_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            connect_timeout: TransportConfig::CONNECT_TIMEOUT,
            response_timeout: TransportConfig::RESPONSE_TIMEOUT,
            max_response_size: TransportConfig::MAX_RESPONSE_SIZE,
        }
    }
}

impl From<&TransportSettings> for ClientOptions {
    fn from(settings: &TransportSettings) -> Self {
        Self {
            framing: settings.framing,
            connect_timeout: settings.connect_timeout(),
            response_timeout: settings.response_timeout(),
            max_response_size: settings.max_response_bytes,
        }
    }
}

/// One-shot request/response client.
#[derive(Debug, Default)]
pub struct RemoteExecClient {
    options: ClientOptions,
    in_flight: Mutex<()>,
}

impl RemoteExecClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            in_flight: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Serialize `request` to JSON and send it.
    pub async fn send_request(
        &self,
        address: &ConnectionAddress,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult> {
        let payload = request.to_payload()?;
        self.send(address, &payload).await
    }

    /// Send an already-serialized payload and wait for the response.
    ///
    /// The connection is closed when this returns, whether it succeeded or
    /// not.
    pub async fn send(&self, address: &ConnectionAddress, payload: &str) -> Result<ExecutionResult> {
        let _guard = self.in_flight.lock().await;
        let target = address.to_string();

        let mut stream = tokio::time::timeout(
            self.options.connect_timeout,
            TcpStream::connect((address.host(), address.port())),
        )
        .await
        .map_err(|_| BridgeError::Connection {
            address: target.clone(),
            message: format!("connect timed out after {:?}", self.options.connect_timeout),
            source: None,
        })?
        .map_err(|e| BridgeError::connection(&target, e))?;

        debug!("Connected to listener at {}", target);

        let exchange = async {
            write_request(&mut stream, payload.as_bytes(), self.options.framing).await?;
            debug!("Sent {} bytes to {}", payload.len(), target);
            read_response(&mut stream, self.options.framing, self.options.max_response_size).await
        };

        let response = tokio::time::timeout(self.options.response_timeout, exchange)
            .await
            .map_err(|_| BridgeError::Timeout {
                address: target.clone(),
                after: self.options.response_timeout,
            })?
            .map_err(|e| match e {
                BridgeError::Io {
                    source: Some(source),
                    ..
                } => BridgeError::connection(&target, source),
                other => other,
            })?;

        drop(stream);

        let bytes = response.ok_or_else(|| BridgeError::EmptyResponse {
            address: target.clone(),
        })?;
        debug!("Received {} bytes from {}", bytes.len(), target);

        Ok(ExecutionResult {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            address: address.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn bind_local() -> (TcpListener, ConnectionAddress) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ConnectionAddress::new("127.0.0.1", port).unwrap())
    }

    fn options(framing: Framing) -> ClientOptions {
        ClientOptions {
            framing,
            response_timeout: Duration::from_secs(5),
            ..ClientOptions::default()
        }
    }

    #[tokio::test]
    async fn test_send_receives_single_reply_and_closes() {
        let (listener, address) = bind_local().await;

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
            stream.write_all(b"Message Received").await.unwrap();
            stream.shutdown().await.unwrap();

            // The client drops its socket after the reply: nothing else arrives.
            let mut rest = Vec::new();
            let n = stream.read_to_end(&mut rest).await.unwrap();
            (request, n)
        });

        let client = RemoteExecClient::new(options(Framing::UntilClose));
        let request = ExecutionRequest::new("", "print('hello')");
        let result = client.send_request(&address, &request).await.unwrap();

        assert_eq!(result.output, "Message Received");
        assert_eq!(result.address, address);

        let (received, trailing) = server.await.unwrap();
        let received: ExecutionRequest = serde_json::from_slice(&received).unwrap();
        assert_eq!(received, request);
        assert_eq!(trailing, 0);
    }

    #[tokio::test]
    async fn test_send_without_listener_is_connection_error() {
        let (listener, address) = bind_local().await;
        drop(listener);

        let client = RemoteExecClient::new(options(Framing::UntilClose));
        let result = client.send(&address, "{}").await;

        match result {
            Err(BridgeError::Connection { address: a, .. }) => {
                assert_eq!(a, address.to_string());
            }
            other => panic!("Expected Connection error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_silent_listener_times_out() {
        let (listener, address) = bind_local().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let client = RemoteExecClient::new(ClientOptions {
            response_timeout: Duration::from_millis(100),
            ..options(Framing::UntilClose)
        });
        let result = client.send(&address, "{}").await;

        assert!(matches!(result, Err(BridgeError::Timeout { .. })));
        server.abort();
    }

    #[tokio::test]
    async fn test_listener_closing_without_reply_is_empty_response() {
        let (listener, address) = bind_local().await;
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            stream.read_to_end(&mut request).await.unwrap();
        });

        let client = RemoteExecClient::new(options(Framing::UntilClose));
        let result = client.send(&address, "{}").await;
        assert!(matches!(result, Err(BridgeError::EmptyResponse { .. })));
    }

    #[tokio::test]
    async fn test_length_prefixed_exchange() {
        let (listener, address) = bind_local().await;
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = crate::remote::protocol::read_frame(&mut stream, 1024)
                .await
                .unwrap()
                .unwrap();
            let mut reply = b"ok: ".to_vec();
            reply.extend_from_slice(&request);
            crate::remote::protocol::write_frame(&mut stream, &reply)
                .await
                .unwrap();
        });

        let client = RemoteExecClient::new(options(Framing::LengthPrefixed));
        let result = client.send(&address, "payload").await.unwrap();
        assert_eq!(result.output, "ok: payload");
    }

    #[tokio::test]
    async fn test_first_chunk_does_not_wait_for_close() {
        let (listener, address) = bind_local().await;
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(b"Message Received").await.unwrap();
            // Keep the connection open; the client must not wait for close.
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = RemoteExecClient::new(options(Framing::FirstChunk));
        let result = client.send(&address, "{}").await.unwrap();
        assert_eq!(result.output, "Message Received");
        server.abort();
    }

    #[tokio::test]
    async fn test_concurrent_sends_never_overlap() {
        let (listener, address) = bind_local().await;
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (active_srv, peak_srv) = (active.clone(), peak.clone());
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let (active, peak) = (active_srv.clone(), peak_srv.clone());
                tokio::spawn(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let mut request = Vec::new();
                    stream.read_to_end(&mut request).await.unwrap();
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    stream.write_all(&request).await.unwrap();
                });
            }
        });

        let client = Arc::new(RemoteExecClient::new(options(Framing::UntilClose)));
        let mut tasks = Vec::new();
        for i in 0..4 {
            let client = client.clone();
            let address = address.clone();
            tasks.push(tokio::spawn(async move {
                client.send(&address, &format!("request {}", i)).await
            }));
        }
        for (i, task) in tasks.into_iter().enumerate() {
            let result = task.await.unwrap().unwrap();
            assert_eq!(result.output, format!("request {}", i));
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
