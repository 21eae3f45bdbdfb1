use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "linkvault=debug";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryFormat {
    Text,
    Json,
}

impl TelemetryFormat {
    /// `LOG_FORMAT=json` selects JSON; anything else is text.
    pub fn from_setting(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            TelemetryFormat::Json
        } else {
            TelemetryFormat::Text
        }
    }
}

/// `RUST_LOG` if set and valid, `linkvault=debug` otherwise.
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_DIRECTIVES.into())
}

/// Initialize tracing for a Linkvault process.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(
    format: TelemetryFormat,
    environment: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(default_filter());

    match format {
        TelemetryFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
        TelemetryFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
    }

    tracing::debug!(
        environment = %environment,
        format = ?format,
        "Telemetry initialized"
    );
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
