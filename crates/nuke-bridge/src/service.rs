//! Command layer the editor calls to run code inside Nuke.
//!
//! The service ties together the settings, the address resolver, the client
//! and the injected collaborators (output sink, notifier, active document).
//! One exchange, including writing its output, runs at a time; requests
//! queue in arrival order so responses land in the log in request order.

use crate::address::{resolve_address, Resolution};
use crate::config::Settings;
use crate::document::ActiveDocument;
use crate::error::{BridgeError, Result};
use crate::output::{Notifier, OutputSink};
use crate::platform;
use crate::remote::{ClientOptions, ExecutionRequest, ExecutionResult, RemoteExecClient};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Script sent by [`RemoteExecService::test_connection`].
pub const TEST_CONNECTION_SCRIPT: &str = "nuke.message('Hello from Nuke Bridge')";

/// Runs scripts inside Nuke and reports the results.
pub struct RemoteExecService {
    settings: Settings,
    ini_path: Option<PathBuf>,
    client: RemoteExecClient,
    sink: Arc<dyn OutputSink>,
    notifier: Arc<dyn Notifier>,
    document: Option<Arc<dyn ActiveDocument>>,
    queue: Mutex<()>,
}

impl RemoteExecService {
    /// Create a service that looks for the listener INI file in the user's
    /// home directory.
    pub fn new(
        settings: Settings,
        sink: Arc<dyn OutputSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ini_path = match platform::server_ini_path() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Listener INI file unavailable: {}", e);
                None
            }
        };
        let client = RemoteExecClient::new(ClientOptions::from(&settings.transport));

        Self {
            settings,
            ini_path,
            client,
            sink,
            notifier,
            document: None,
            queue: Mutex::new(()),
        }
    }

    /// Read the listener port from `path` instead of `~/.nuke`.
    pub fn with_ini_path(mut self, path: Option<PathBuf>) -> Self {
        self.ini_path = path;
        self
    }

    /// Set the provider used by [`Self::run_active_document`].
    pub fn with_document_provider(mut self, document: Arc<dyn ActiveDocument>) -> Self {
        self.document = Some(document);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve the listener address and forward any fallback warnings.
    pub fn resolve(&self) -> Resolution {
        let resolution = resolve_address(&self.settings.network, self.ini_path.as_deref());
        for warning in &resolution.warnings {
            self.notifier.warn(&warning.to_string());
        }
        resolution
    }

    /// Send `request` and append the response to the output log.
    ///
    /// Network failures are shown through the notifier and returned.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let _turn = self.queue.lock().await;

        let address = self.resolve().address;
        debug!("Executing {} bytes of code on {}", request.text.len(), address);

        match self.client.send_request(&address, request).await {
            Ok(result) => {
                if self.settings.output.clear_previous_output {
                    self.sink.clear();
                }
                self.sink.append_line(&result.output);
                Ok(result)
            }
            Err(e) => {
                self.notifier.error(&e.user_message());
                Err(e)
            }
        }
    }

    /// Run code from an arbitrary source.
    pub async fn run_code(
        &self,
        file: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<ExecutionResult> {
        self.execute(&ExecutionRequest::new(file, text)).await
    }

    /// Run the active document's selection, or the whole document when
    /// nothing is selected.
    pub async fn run_active_document(&self) -> Result<ExecutionResult> {
        let snapshot = match self.document.as_ref().and_then(|d| d.snapshot()) {
            Some(snapshot) => snapshot,
            None => {
                let err = BridgeError::NoActiveDocument;
                self.notifier.error(&err.user_message());
                return Err(err);
            }
        };

        let request = ExecutionRequest::new(snapshot.file_field(), snapshot.code());
        self.execute(&request).await
    }

    /// Send a hello-message script to check that the listener is reachable.
    pub async fn test_connection(&self) -> Result<ExecutionResult> {
        let result = self.run_code("", TEST_CONNECTION_SCRIPT).await?;
        info!("Listener at {} is reachable", result.address);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkSettings, OutputSettings, TransportSettings};
    use crate::document::DocumentSnapshot;
    use crate::output::{MemoryNotifier, MemorySink};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct FixedDocument(Option<DocumentSnapshot>);

    impl ActiveDocument for FixedDocument {
        fn snapshot(&self) -> Option<DocumentSnapshot> {
            self.0.clone()
        }
    }

    /// Listener that answers every request with its decoded `text` field.
    async fn spawn_echo_listener() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    let request: ExecutionRequest = loop {
                        let n = stream.read(&mut chunk).await.unwrap();
                        assert!(n > 0, "client closed before sending a request");
                        buf.extend_from_slice(&chunk[..n]);
                        if let Ok(request) = serde_json::from_slice(&buf) {
                            break request;
                        }
                    };
                    stream.write_all(request.text.as_bytes()).await.unwrap();
                });
            }
        });
        port
    }

    fn settings_for(port: u16, clear_previous_output: bool) -> Settings {
        Settings {
            network: NetworkSettings {
                enable_manual_connection: true,
                host: "127.0.0.1".to_string(),
                port: port.to_string(),
            },
            output: OutputSettings {
                clear_previous_output,
            },
            transport: TransportSettings::default(),
        }
    }

    fn service(settings: Settings) -> (RemoteExecService, Arc<MemorySink>, Arc<MemoryNotifier>) {
        let sink = Arc::new(MemorySink::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let service = RemoteExecService::new(settings, sink.clone(), notifier.clone())
            .with_ini_path(None);
        (service, sink, notifier)
    }

    #[tokio::test]
    async fn test_run_code_appends_response() {
        let port = spawn_echo_listener().await;
        let (service, sink, notifier) = service(settings_for(port, false));

        service.run_code("", "first").await.unwrap();
        service.run_code("", "second").await.unwrap();

        assert_eq!(sink.lines(), vec!["first", "second"]);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_clear_previous_output() {
        let port = spawn_echo_listener().await;
        let (service, sink, _) = service(settings_for(port, true));

        service.run_code("", "first").await.unwrap();
        service.run_code("", "second").await.unwrap();

        assert_eq!(sink.lines(), vec!["second"]);
    }

    #[tokio::test]
    async fn test_unreachable_listener_notifies_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (service, sink, notifier) = service(settings_for(port, false));
        let result = service.run_code("", "print(1)").await;

        assert!(matches!(result, Err(BridgeError::Connection { .. })));
        assert!(sink.lines().is_empty());
        let errors = notifier.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("manual connection"));
    }

    #[test]
    fn test_empty_manual_override_warns() {
        let dir = tempfile::TempDir::new().unwrap();
        let ini = dir.path().join("NukeServerSocket.ini");
        std::fs::write(&ini, "[server]\nport=55555\n").unwrap();

        let mut settings = settings_for(1, false);
        settings.network.host = String::new();
        settings.network.port = String::new();
        let (service, _, notifier) = service(settings);
        let service = service.with_ini_path(Some(ini));

        let resolution = service.resolve();
        assert_eq!(resolution.address.host(), "127.0.0.1");
        assert_eq!(resolution.address.port(), 55555);
        assert_eq!(notifier.warnings().len(), 2);
    }

    #[test]
    fn test_each_fallback_is_reported_once() {
        let mut settings = settings_for(1, false);
        settings.network.port = "not-a-port".to_string();
        let (service, _, notifier) = service(settings);

        let resolution = service.resolve();
        let expected: Vec<String> = resolution.warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(expected.len(), 1);
        assert_eq!(notifier.warnings(), expected);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_run_active_document_sends_selection() {
        let port = spawn_echo_listener().await;
        let (service, sink, _) = service(settings_for(port, false));
        let service = service.with_document_provider(Arc::new(FixedDocument(Some(
            DocumentSnapshot {
                path: Some(PathBuf::from("/shots/comp.py")),
                text: "whole()".to_string(),
                selection: Some("selected()".to_string()),
            },
        ))));

        service.run_active_document().await.unwrap();
        assert_eq!(sink.lines(), vec!["selected()"]);
    }

    #[tokio::test]
    async fn test_run_active_document_without_document() {
        let (service, _, notifier) = service(Settings::default());
        let service = service.with_document_provider(Arc::new(FixedDocument(None)));

        let result = service.run_active_document().await;
        assert!(matches!(result, Err(BridgeError::NoActiveDocument)));
        assert_eq!(notifier.errors(), vec!["No active document to execute"]);
    }

    #[tokio::test]
    async fn test_connection_sends_hello_script() {
        let port = spawn_echo_listener().await;
        let (service, sink, _) = service(settings_for(port, false));

        let result = service.test_connection().await.unwrap();
        assert_eq!(result.output, TEST_CONNECTION_SCRIPT);
        assert_eq!(sink.lines(), vec![TEST_CONNECTION_SCRIPT]);
    }

    #[tokio::test]
    async fn test_concurrent_runs_keep_request_order() {
        let port = spawn_echo_listener().await;
        let (service, sink, _) = service(settings_for(port, false));

        let (a, b, c) = tokio::join!(
            service.run_code("", "a"),
            service.run_code("", "b"),
            service.run_code("", "c"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(sink.lines(), vec!["a", "b", "c"]);
    }
}
