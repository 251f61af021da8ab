//! Interactive authorization collaborator.
//!
//! The credential manager hands a consent URL to an
//! [`InteractiveAuthorizer`] and gets back the URL the browser was
//! redirected to. [`LoopbackAuthorizer`] does this for desktop use: it
//! listens on a fixed loopback port, opens the browser, and captures the
//! first `GET /callback` request.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::gateway::BoxFuture;

/// Default loopback port for the redirect listener.
pub const DEFAULT_LOOPBACK_PORT: u16 = 8085;

/// Timeout for waiting for the OAuth callback.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const CALLBACK_PATH: &str = "/callback";

/// Opens a consent URL and returns where the user ended up.
pub trait InteractiveAuthorizer: Send + Sync {
    /// The redirect URI to register in the authorization request.
    fn redirect_uri(&self) -> String;

    /// Shows `auth_url` to the user and resolves to the full redirect URL,
    /// including its query string.
    ///
    /// Fails with an authorization error when no redirect arrives.
    fn launch_interactive<'a>(&'a self, auth_url: &'a str) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Browser plus loopback HTTP listener.
#[derive(Debug, Clone)]
pub struct LoopbackAuthorizer {
    port: u16,
    timeout: Duration,
    open_browser: bool,
}

impl LoopbackAuthorizer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            timeout: CALLBACK_TIMEOUT,
            open_browser: true,
        }
    }

    /// Sets how long to wait for the redirect.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// When disabled, the URL is only printed to stderr.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn bind(&self) -> ProviderResult<TcpListener> {
        let listener = TcpListener::bind(("127.0.0.1", self.port)).map_err(|e| {
            ProviderError::configuration(format!(
                "cannot listen on 127.0.0.1:{} for the OAuth redirect: {}",
                self.port, e
            ))
        })?;
        debug!("bound loopback server on port {}", self.port);
        Ok(listener)
    }

    fn show(&self, auth_url: &str) {
        if self.open_browser {
            info!("opening browser for Google consent");
            match open::that(auth_url) {
                Ok(()) => return,
                Err(e) => warn!("failed to open browser: {}", e),
            }
        }
        eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
    }
}

impl Default for LoopbackAuthorizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOOPBACK_PORT)
    }
}

impl InteractiveAuthorizer for LoopbackAuthorizer {
    fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    fn launch_interactive<'a>(&'a self, auth_url: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            // Listen before the browser can possibly redirect.
            let listener = self.bind()?;
            self.show(auth_url);

            let timeout = self.timeout;
            let target = tokio::task::spawn_blocking(move || wait_for_callback(listener, timeout))
                .await
                .map_err(|e| ProviderError::internal(format!("callback task failed: {}", e)))??;

            Ok(format!("http://127.0.0.1:{}{}", self.port, target))
        })
    }
}

/// Blocks until a callback request arrives, returning its request target.
fn wait_for_callback(listener: TcpListener, timeout: Duration) -> ProviderResult<String> {
    let (tx, rx) = mpsc::channel();

    // Accept on a separate thread so the wait can time out.
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(target) = handle_callback(stream) {
                        let _ = tx.send(target);
                        return;
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    });

    match rx.recv_timeout(timeout) {
        Ok(target) => Ok(target),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authorization(
            "no authorization redirect received before timeout",
        )),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ProviderError::internal("callback listener stopped"))
        }
    }
}

/// Answers one HTTP request; returns the target if it was the callback.
fn handle_callback(mut stream: TcpStream) -> Option<String> {
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();

    if reader.read_line(&mut request_line).is_err() {
        return None;
    }

    // Drain the headers so closing the socket does not reset it.
    let mut header = String::new();
    while reader.read_line(&mut header).is_ok_and(|n| n > 0) && header.trim() != "" {
        header.clear();
    }

    // GET /callback?code=...&state=... HTTP/1.1
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return None;
    };
    let target = target.to_string();

    let path = target.split('?').next().unwrap_or_default();
    if path != CALLBACK_PATH {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        return None;
    }

    let query = target.split_once('?').map(|(_, q)| q).unwrap_or_default();
    let granted = url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| key == "code" && !value.is_empty())
        && !url::form_urlencoded::parse(query.as_bytes()).any(|(key, _)| key == "error");

    let response = if granted {
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Successful</h1>\
        <p>You can close this window and return to the terminal.</p></body></html>"
    } else {
        "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h1>Authorization Failed</h1>\
        <p>You can close this window.</p></body></html>"
    };

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();

    Some(target)
}
