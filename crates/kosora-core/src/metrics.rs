//! Global atomic counters for evaluation observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    evaluations_completed: AtomicU64,
    evaluations_failed: AtomicU64,
    agent_failures: AtomicU64,
    transport_retries: AtomicU64,
    retrieval_fallbacks: AtomicU64,
    cancellations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            evaluations_completed: AtomicU64::new(0),
            evaluations_failed: AtomicU64::new(0),
            agent_failures: AtomicU64::new(0),
            transport_retries: AtomicU64::new(0),
            retrieval_fallbacks: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
        }
    }

    /// An evaluation produced a report.
    pub fn inc_evaluations_completed(&self) {
        self.evaluations_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_completed", "counter incremented");
    }

    /// An evaluation ended in an error other than cancellation.
    pub fn inc_evaluations_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_failed", "counter incremented");
    }

    pub fn inc_agent_failures(&self) {
        self.agent_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agent_failures", "counter incremented");
    }

    pub fn inc_transport_retries(&self) {
        self.transport_retries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "transport_retries", "counter incremented");
    }

    /// Retrieval failed and the evaluation continued without passages.
    pub fn inc_retrieval_fallbacks(&self) {
        self.retrieval_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "retrieval_fallbacks", "counter incremented");
    }

    pub fn inc_cancellations(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cancellations", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            evaluations_completed = self.evaluations_completed(),
            evaluations_failed = self.evaluations_failed(),
            agent_failures = self.agent_failures(),
            transport_retries = self.transport_retries(),
            retrieval_fallbacks = self.retrieval_fallbacks(),
            cancellations = self.cancellations(),
        );
    }

    pub fn evaluations_completed(&self) -> u64 {
        self.evaluations_completed.load(Ordering::Relaxed)
    }

    pub fn evaluations_failed(&self) -> u64 {
        self.evaluations_failed.load(Ordering::Relaxed)
    }

    pub fn agent_failures(&self) -> u64 {
        self.agent_failures.load(Ordering::Relaxed)
    }

    pub fn transport_retries(&self) -> u64 {
        self.transport_retries.load(Ordering::Relaxed)
    }

    pub fn retrieval_fallbacks(&self) -> u64 {
        self.retrieval_fallbacks.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.evaluations_completed.store(0, Ordering::Relaxed);
        self.evaluations_failed.store(0, Ordering::Relaxed);
        self.agent_failures.store(0, Ordering::Relaxed);
        self.transport_retries.store(0, Ordering::Relaxed);
        self.retrieval_fallbacks.store(0, Ordering::Relaxed);
        self.cancellations.store(0, Ordering::Relaxed);
    }
}
