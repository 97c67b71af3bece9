// ABOUTME: Client configuration - remote address, TLS material, and timeouts.
// ABOUTME: Defaults target the bucket service on the local host.

use std::path::PathBuf;
use std::time::Duration;

/// Port the bucket service listens on by default.
pub const DEFAULT_PORT: u16 = 9008;

/// Default bound on establishing the connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Paths to the PEM files used for mutual TLS.
///
/// TLS is only enabled when all three paths are set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsPaths {
    pub root_ca: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

impl TlsPaths {
    pub fn new(
        root_ca: impl Into<PathBuf>,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root_ca: Some(root_ca.into()),
            cert: Some(cert.into()),
            key: Some(key.into()),
        }
    }

    /// The three paths, if every one of them is set and non-empty.
    pub fn complete(&self) -> Option<(&PathBuf, &PathBuf, &PathBuf)> {
        fn present(path: &Option<PathBuf>) -> Option<&PathBuf> {
            path.as_ref().filter(|p| !p.as_os_str().is_empty())
        }

        Some((
            present(&self.root_ca)?,
            present(&self.cert)?,
            present(&self.key)?,
        ))
    }

    pub fn is_complete(&self) -> bool {
        self.complete().is_some()
    }
}

/// Configuration for [`TokenBucketClient`](crate::TokenBucketClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the bucket service, or a full `http(s)://` URL.
    pub remote: String,
    pub tls: TlsPaths,
    /// Bound on establishing the connection at construction time.
    pub dial_timeout: Duration,
    /// Per-call bound applied by the HTTP layer, on top of the caller's context.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(default_remote())
    }
}

impl ClientConfig {
    /// Configuration for the service at `remote`, with defaults otherwise.
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            tls: TlsPaths::default(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: None,
        }
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn with_tls(mut self, tls: TlsPaths) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// `<hostname>:9008`, falling back to `localhost` when the host name is unknown.
pub fn default_remote() -> String {
    let host = gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| {
            tracing::warn!("cannot determine host name, using localhost");
            "localhost".to_string()
        });
    format!("{}:{}", host, DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Counts warn-level events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_default_remote_uses_kernel_hostname() {
        let host = gethostname::gethostname().into_string().unwrap();
        assert_eq!(default_remote(), format!("{}:{}", host, DEFAULT_PORT));
    }

    #[test]
    fn test_explicit_remote_skips_hostname_lookup() {
        let warns = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warns.clone()));

        let config = tracing::subscriber::with_default(subscriber, || {
            ClientConfig::new("bucket.example:1234")
        });

        assert_eq!(config.remote, "bucket.example:1234");
        assert_eq!(warns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_remote_uses_default_port() {
        let config = ClientConfig::default();
        assert!(config.remote.ends_with(":9008"));
        assert!(!config.tls.is_complete());
        assert_eq!(config.dial_timeout, DEFAULT_DIAL_TIMEOUT);
    }

    #[test]
    fn test_tls_paths_complete() {
        let paths = TlsPaths::new("ca.pem", "cert.pem", "key.pem");
        assert!(paths.is_complete());
    }

    #[test]
    fn test_tls_paths_incomplete_when_any_missing() {
        let mut paths = TlsPaths::new("ca.pem", "cert.pem", "key.pem");
        paths.key = None;
        assert!(!paths.is_complete());

        let paths = TlsPaths::new("ca.pem", "", "key.pem");
        assert!(!paths.is_complete());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("bucket.example:1234")
            .with_dial_timeout(Duration::from_millis(250))
            .with_request_timeout(Duration::from_secs(1));

        assert_eq!(config.remote, "bucket.example:1234");
        assert_eq!(config.dial_timeout, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(1)));
    }
}
