// ABOUTME: Command-line client that withdraws tokens from one bucket.
// ABOUTME: Prints Success or Failure; an unreachable service still reports Success.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tokenbucket_client::prelude::*;

/// Largest magnitude accepted for an amount (63-bit signed range).
const AMOUNT_LIMIT: i64 = 1 << 62;

/// Withdraw tokens from a bucket of a networked token bucket service.
#[derive(Parser, Debug)]
#[command(name = "tokenbucket-cli")]
#[command(version)]
#[command(about = "Request tokens from a token bucket service")]
struct Cli {
    /// Bucket family.
    family: String,

    /// Bucket name within the family.
    bucket: String,

    /// Number of tokens to request (base-10, may be negative).
    #[arg(value_parser = parse_amount, allow_negative_numbers = true)]
    amount: i64,

    /// Address of the token bucket service (`host:port` or URL).
    #[arg(
        long,
        env = "TOKENBUCKET_REMOTE",
        default_value_t = tokenbucket_client::config::default_remote()
    )]
    remote: String,

    /// Path to the root certificate to verify the server against.
    #[arg(long = "root-ca")]
    root_ca: Option<PathBuf>,

    /// Path to the client certificate. TLS disabled if unset.
    #[arg(long)]
    cert: Option<PathBuf>,

    /// Path to the client private key. TLS disabled if unset.
    #[arg(long)]
    key: Option<PathBuf>,

    /// Time in milliseconds before failing the server request.
    #[arg(long = "timeout", default_value = "5000")]
    timeout_ms: u64,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose")]
    is_verbose: bool,

    /// Suppress all logging output.
    #[arg(short = 'q', long = "quiet")]
    is_quiet: bool,
}

/// Parse a base-10 amount that fits in 63 bits.
fn parse_amount(raw: &str) -> Result<i64, String> {
    let amount: i64 = raw
        .parse()
        .map_err(|e| format!("cannot parse amount {} as number: {}", raw, e))?;

    if !(-AMOUNT_LIMIT..AMOUNT_LIMIT).contains(&amount) {
        return Err(format!("cannot parse amount {} as number: value out of range", raw));
    }
    Ok(amount)
}

fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Connect to the service, naming the failing step in the error.
async fn connect_client(config: &ClientConfig) -> Result<TokenBucketClient> {
    match TokenBucketClient::connect(config).await {
        Ok(client) => Ok(client),
        Err(err @ ClientError::Tls(_)) => {
            Err(anyhow::Error::new(err).context("Error reading TLS credentials"))
        }
        Err(err) => {
            Err(anyhow::Error::new(err).context("Error connecting to token bucket service"))
        }
    }
}

/// Log any request error and the verdict; the verdict is returned for printing.
fn report(admission: &Admission, family: &str, bucket: &str) -> &'static str {
    if let Some(err) = &admission.error {
        tracing::warn!("Error requesting tokens for ({},{}): {}", family, bucket, err);
    }

    let verdict = if admission.is_granted() {
        "Success"
    } else {
        "Failure"
    };
    tracing::info!("{}", verdict);
    verdict
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.is_quiet, cli.is_verbose);

    let tls = TlsPaths {
        root_ca: cli.root_ca.clone(),
        cert: cli.cert.clone(),
        key: cli.key.clone(),
    };
    let config = ClientConfig::new(&cli.remote).with_tls(tls);

    let ctx = RequestContext::with_timeout(Duration::from_millis(cli.timeout_ms));

    let client = connect_client(&config).await?;

    let admission = client
        .request_single(&ctx, &cli.family, &cli.bucket, cli.amount)
        .await;
    println!("{}", report(&admission, &cli.family, &cli.bucket));

    if let Err(e) = client.close().await {
        tracing::debug!("error closing client: {}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Collects warn-level messages.
    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            struct Message(String);

            impl Visit for Message {
                fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.0 = format!("{:?}", value);
                    }
                }
            }

            if *event.metadata().level() == Level::WARN {
                let mut message = Message(String::new());
                event.record(&mut message);
                self.0.lock().unwrap().push(message.0);
            }
        }
    }

    fn report_capturing_warnings(admission: &Admission) -> (&'static str, Vec<String>) {
        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let verdict = tracing::subscriber::with_default(subscriber, || {
            report(admission, "api", "user-1")
        });
        let logged = warnings.0.lock().unwrap().clone();
        (verdict, logged)
    }

    #[test]
    fn test_report_granted() {
        let (verdict, warnings) = report_capturing_warnings(&Admission::decided(true));
        assert_eq!(verdict, "Success");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_report_denied() {
        let (verdict, warnings) = report_capturing_warnings(&Admission::decided(false));
        assert_eq!(verdict, "Failure");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_report_fail_open_logs_error_and_succeeds() {
        let admission = Admission::fail_open(Some(ClientError::Context(
            ContextError::DeadlineExceeded,
        )));
        let (verdict, warnings) = report_capturing_warnings(&admission);

        assert_eq!(verdict, "Success");
        assert_eq!(warnings.len(), 1);
        assert_eq!(
            warnings[0],
            "Error requesting tokens for (api,user-1): context deadline exceeded"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_is_fatal() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config =
            ClientConfig::new(addr.to_string()).with_dial_timeout(Duration::from_millis(500));
        let err = connect_client(&config).await.err().unwrap();

        assert_eq!(err.to_string(), "Error connecting to token bucket service");
        assert!(matches!(
            err.downcast_ref::<ClientError>(),
            Some(ClientError::Transport(TransportError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_tls_files_are_fatal() {
        let config = ClientConfig::new("127.0.0.1:9").with_tls(TlsPaths::new(
            "/nonexistent/ca.pem",
            "/nonexistent/client.pem",
            "/nonexistent/client-key.pem",
        ));
        let err = connect_client(&config).await.err().unwrap();

        assert_eq!(err.to_string(), "Error reading TLS credentials");
    }

    #[test]
    fn test_parse_amount_accepts_signed_values() {
        assert_eq!(parse_amount("42"), Ok(42));
        assert_eq!(parse_amount("-7"), Ok(-7));
        assert_eq!(parse_amount("0"), Ok(0));
    }

    #[test]
    fn test_parse_amount_bounds() {
        assert_eq!(parse_amount("4611686018427387903"), Ok(AMOUNT_LIMIT - 1));
        assert_eq!(parse_amount("-4611686018427387904"), Ok(-AMOUNT_LIMIT));
        assert!(parse_amount("4611686018427387904").is_err());
        assert!(parse_amount("-4611686018427387905").is_err());
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        let err = parse_amount("ten").unwrap_err();
        assert!(err.contains("ten"));
        assert!(parse_amount("0x10").is_err());
    }

    #[test]
    fn test_cli_requires_three_positionals() {
        let result = Cli::try_parse_from(["tokenbucket-cli", "family", "bucket"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "tokenbucket-cli",
            "--remote",
            "bucket.example:9008",
            "--timeout",
            "250",
            "api",
            "user-1",
            "-3",
        ])
        .unwrap();

        assert_eq!(cli.remote, "bucket.example:9008");
        assert_eq!(cli.timeout_ms, 250);
        assert_eq!(cli.family, "api");
        assert_eq!(cli.bucket, "user-1");
        assert_eq!(cli.amount, -3);
        assert!(cli.cert.is_none());
    }

    #[test]
    fn test_cli_rejects_unparseable_amount() {
        let result = Cli::try_parse_from(["tokenbucket-cli", "f", "b", "lots"]);
        assert!(result.is_err());
    }
}
