//! Metrics for gamekube provisioning
//!
//! OpenTelemetry instruments for provisioning outcomes and latency. When no
//! meter provider is installed the global no-op provider swallows them.

use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};

/// Global meter for gamekube metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("gamekube"));

/// Counter of provisioning invocations
///
/// Labels:
/// - `game`: game code (PZ, ARK)
/// - `result`: done, failed
/// - `stage`: the stage that failed, or `done`
pub static PROVISIONS_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("gamekube_provisions_total")
        .with_description("Total number of provisioning requests by result and stage")
        .with_unit("{requests}")
        .build()
});

/// Histogram of end-to-end provisioning duration
///
/// Labels:
/// - `game`: game code
/// - `result`: done, failed
pub static PROVISION_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("gamekube_provision_duration_seconds")
        .with_description("Duration of provisioning requests in seconds")
        .with_unit("s")
        .build()
});

/// Provisioning result label values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionResult {
    /// The pipeline reached `Done`
    Done,
    /// The pipeline stopped in a failed stage
    Failed,
}

impl ProvisionResult {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Times one provisioning invocation and records it on completion
pub struct ProvisionTimer {
    game: String,
    start: std::time::Instant,
}

impl ProvisionTimer {
    /// Start timing a provisioning request
    ///
    /// `game` is `unknown` until validation has produced one.
    pub fn start(game: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            start: std::time::Instant::now(),
        }
    }

    /// Replace the game label once it is known
    pub fn set_game(&mut self, game: impl Into<String>) {
        self.game = game.into();
    }

    /// Record a successful provision
    pub fn done(self) {
        self.record(ProvisionResult::Done, "done");
    }

    /// Record a provision that failed in `stage`
    pub fn failed(self, stage: &str) {
        self.record(ProvisionResult::Failed, stage);
    }

    fn record(self, result: ProvisionResult, stage: &str) {
        let duration = self.start.elapsed().as_secs_f64();

        PROVISIONS_TOTAL.add(
            1,
            &[
                KeyValue::new("game", self.game.clone()),
                KeyValue::new("result", result.as_str()),
                KeyValue::new("stage", stage.to_string()),
            ],
        );

        PROVISION_DURATION.record(
            duration,
            &[
                KeyValue::new("game", self.game),
                KeyValue::new("result", result.as_str()),
            ],
        );
    }
}
