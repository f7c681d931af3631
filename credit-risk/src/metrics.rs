//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring limit adjustment.
//!
//! # Metrics
//!
//! - `credit_assessments_total` - Scoring passes that read new history
//! - `credit_assessment_noops_total` - Passes replayed from an unchanged ledger
//! - `credit_limit_changes_total{direction}` - Limit moves, by direction
//! - `credit_risk_score` - Histogram of risk scores

use crate::{Assessment, Error, Result};
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::fmt;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Fresh assessments
    pub assessments_total: IntCounter,

    /// Replayed assessments
    pub noops_total: IntCounter,

    /// Limit changes by direction (`increase` / `decrease`)
    pub limit_changes_total: IntCounterVec,

    /// Risk score distribution
    pub risk_score: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector on a private registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let assessments_total = IntCounter::new(
            "credit_assessments_total",
            "Scoring passes that read new history",
        )?;
        registry.register(Box::new(assessments_total.clone()))?;

        let noops_total = IntCounter::new(
            "credit_assessment_noops_total",
            "Scoring passes replayed from an unchanged ledger",
        )?;
        registry.register(Box::new(noops_total.clone()))?;

        let limit_changes_total = IntCounterVec::new(
            Opts::new("credit_limit_changes_total", "Credit limit changes"),
            &["direction"],
        )?;
        registry.register(Box::new(limit_changes_total.clone()))?;

        let risk_score = Histogram::with_opts(
            HistogramOpts::new("credit_risk_score", "Histogram of risk scores")
                .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        registry.register(Box::new(risk_score.clone()))?;

        Ok(Self {
            assessments_total,
            noops_total,
            limit_changes_total,
            risk_score,
            registry,
        })
    }

    /// Record a fresh assessment
    pub fn record_assessment(&self, assessment: &Assessment) {
        self.assessments_total.inc();
        self.risk_score.observe(assessment.risk_score.value());

        if assessment.increased() {
            self.limit_changes_total.with_label_values(&["increase"]).inc();
        } else if assessment.decreased() {
            self.limit_changes_total.with_label_values(&["decrease"]).inc();
        }
    }

    /// Record a replayed assessment
    pub fn record_noop(&self) {
        self.noops_total.inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Calculation(e.to_string()))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("assessments_total", &self.assessments_total.get())
            .field("noops_total", &self.noops_total.get())
            .finish_non_exhaustive()
    }
}
