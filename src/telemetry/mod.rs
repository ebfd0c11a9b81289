//! Tracing initialisation and structured pipeline events.

pub mod events;

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub const ENV_LOG_FORMAT: &str = "PHONALIGN_LOG_FORMAT";

/// Installs the global subscriber. Filtering follows `RUST_LOG` and falls back
/// to `info`; `PHONALIGN_LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|format| format.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let subscriber = Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing subscriber already installed: {err}");
    }
}
