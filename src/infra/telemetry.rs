use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Per-statement sqlx logging and listener chatter stay below `info`.
const QUIET_DIRECTIVES: [&str; 2] = ["sqlx::query=warn", "sqlx::postgres::notice=warn"];

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let mut env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();
    for directive in QUIET_DIRECTIVES {
        let directive = directive.parse().map_err(|err| {
            InfraError::telemetry(format!("invalid log directive `{directive}`: {err}"))
        })?;
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })?;

    tracing::debug!(
        target = "marquee::telemetry",
        level = %logging.level,
        format = ?logging.format,
        "Tracing subscriber installed"
    );
    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "marquee_sync_snapshots_total",
            Unit::Count,
            "Snapshots received from the content store, by source."
        );
        describe_counter!(
            "marquee_sync_errors_total",
            Unit::Count,
            "Content store subscription errors, by source and kind."
        );
        describe_counter!(
            "marquee_content_saves_total",
            Unit::Count,
            "Admin content saves, by outcome."
        );
        describe_counter!(
            "marquee_contact_requests_total",
            Unit::Count,
            "Contact form submissions, by outcome."
        );
        describe_counter!(
            "marquee_rate_limited_total",
            Unit::Count,
            "Requests rejected by the per-client rate limiter."
        );
    });
}
