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

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

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
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "scrittoio_mutation_rollback_total",
            Unit::Count,
            "Optimistic mutations rolled back after a failed request."
        );
        describe_counter!(
            "scrittoio_mutation_guard_reject_total",
            Unit::Count,
            "Mutations refused because the same (id, kind) was already in flight."
        );
        describe_counter!(
            "scrittoio_cover_fetch_error_total",
            Unit::Count,
            "Cover image fetches that ended in the error state."
        );
        describe_counter!(
            "scrittoio_cover_handle_alloc_total",
            Unit::Count,
            "Local image handles allocated."
        );
        describe_counter!(
            "scrittoio_cover_handle_revoke_total",
            Unit::Count,
            "Local image handles revoked."
        );
        describe_counter!(
            "scrittoio_publish_stage_failure_total",
            Unit::Count,
            "Publish pipeline stage failures, labeled by stage."
        );
    });
}
