// cardio-triage/crates/cardio-triage/src/telemetry.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: our own decisions at info, HTTP plumbing quieter.
const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn,reqwest=warn";

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    // A second call (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
