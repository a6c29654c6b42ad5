//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - The import job is short-lived, so the registry can be flushed to a
//!   node-exporter textfile instead of being scraped over HTTP.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the import job.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    files_moved_total: IntCounter,
    files_replaced_total: IntCounter,
    faults_total: IntCounterVec,
    user_runs_total: IntCounterVec,
    previews_enqueued_total: IntCounter,
    polls_total: IntCounter,
    active_candidates: IntGauge,
}

/// Snapshot of selected counters for summaries and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Files relocated into user storage.
    pub files_moved_total: u64,
    /// Relocations that replaced an existing file.
    pub files_replaced_total: u64,
    /// Preview generation requests inserted.
    pub previews_enqueued_total: u64,
    /// Stability polling rounds executed.
    pub polls_total: u64,
    /// Candidates currently under observation.
    pub active_candidates: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the import collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let files_moved_total = counter("intake_files_moved_total", "Files moved into user storage")?;
        let files_replaced_total = counter(
            "intake_files_replaced_total",
            "Moves that replaced an existing destination file",
        )?;
        let faults_total = counter_vec(
            "intake_faults_total",
            "Per-file and per-user faults by kind",
            &["kind"],
        )?;
        let user_runs_total = counter_vec(
            "intake_user_runs_total",
            "Per-user import runs by outcome",
            &["outcome"],
        )?;
        let previews_enqueued_total = counter(
            "intake_previews_enqueued_total",
            "Preview generation requests inserted",
        )?;
        let polls_total = counter("intake_polls_total", "Stability polling rounds executed")?;
        let active_candidates = IntGauge::with_opts(Opts::new(
            "intake_active_candidates",
            "Candidates currently awaiting a stable size",
        ))
        .map_err(|source| {
            TelemetryError::collector("metrics.build", "intake_active_candidates", source)
        })?;

        register(&registry, "intake_files_moved_total", &files_moved_total)?;
        register(&registry, "intake_files_replaced_total", &files_replaced_total)?;
        register(&registry, "intake_faults_total", &faults_total)?;
        register(&registry, "intake_user_runs_total", &user_runs_total)?;
        register(&registry, "intake_previews_enqueued_total", &previews_enqueued_total)?;
        register(&registry, "intake_polls_total", &polls_total)?;
        register(&registry, "intake_active_candidates", &active_candidates)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                files_moved_total,
                files_replaced_total,
                faults_total,
                user_runs_total,
                previews_enqueued_total,
                polls_total,
                active_candidates,
            }),
        })
    }

    /// Record a completed move; `replaced` marks an overwritten destination.
    pub fn inc_files_moved(&self, replaced: bool) {
        self.inner.files_moved_total.inc();
        if replaced {
            self.inner.files_replaced_total.inc();
        }
    }

    /// Increment the fault counter for the given fault kind label.
    pub fn inc_fault(&self, kind: &str) {
        self.inner.faults_total.with_label_values(&[kind]).inc();
    }

    /// Increment the per-user run counter for the given outcome label.
    pub fn inc_user_run(&self, outcome: &str) {
        self.inner.user_runs_total.with_label_values(&[outcome]).inc();
    }

    /// Record an inserted preview generation request.
    pub fn inc_previews_enqueued(&self) {
        self.inner.previews_enqueued_total.inc();
    }

    /// Record one stability polling round.
    pub fn inc_polls(&self) {
        self.inner.polls_total.inc();
    }

    /// Set the number of candidates still awaiting a stable size.
    pub fn set_active_candidates(&self, value: usize) {
        self.inner
            .active_candidates
            .set(i64::try_from(value).unwrap_or(i64::MAX));
    }

    /// Read the current value of a fault counter.
    #[must_use]
    pub fn fault_count(&self, kind: &str) -> u64 {
        self.inner.faults_total.with_label_values(&[kind]).get()
    }

    /// Read the current value of a per-user run counter.
    #[must_use]
    pub fn user_run_count(&self, outcome: &str) -> u64 {
        self.inner.user_runs_total.with_label_values(&[outcome]).get()
    }

    /// Render the metrics registry in Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::RenderEncoding { source })
    }

    /// Write the rendered registry to `path`, replacing it atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        let staging = path.with_extension("prom.tmp");
        fs::write(&staging, rendered)
            .map_err(|source| TelemetryError::export("textfile.write", staging.clone(), source))?;
        fs::rename(&staging, path)
            .map_err(|source| TelemetryError::export("textfile.rename", path.to_path_buf(), source))
    }

    /// Produce a snapshot of the headline counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_moved_total: self.inner.files_moved_total.get(),
            files_replaced_total: self.inner.files_replaced_total.get(),
            previews_enqueued_total: self.inner.previews_enqueued_total.get(),
            polls_total: self.inner.polls_total.get(),
            active_candidates: self.inner.active_candidates.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::collector("metrics.build", name, source))
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::collector("metrics.build", name, source))
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::collector("metrics.register", name, source))
}
