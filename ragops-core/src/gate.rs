//! Metrics regression gate.
//!
//! Compares a current quality report against a baseline and decides whether
//! a CI run may proceed. The decision is relative: a tracked metric regresses
//! when `current < baseline - tolerance`. An optional absolute floor adds a
//! second, baseline-independent check per metric.
//!
//! [`RegressionGate::evaluate`] is a pure function; [`GateOutcome::render`]
//! turns its result into the lines printed for CI logs.

use crate::error::ConfigError;
use crate::metrics::{Metric, QualityReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

/// Maximum allowed absolute drop from baseline when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Per-metric result of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Improved,
    Maintained,
    /// Lower than baseline, but within tolerance.
    Degraded,
    Regressed,
    /// Current score is under the configured absolute floor.
    BelowFloor,
}

impl MetricStatus {
    pub fn passed(&self) -> bool {
        !matches!(self, MetricStatus::Regressed | MetricStatus::BelowFloor)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MetricStatus::Improved | MetricStatus::Maintained => "✅",
            MetricStatus::Degraded => "⚠️",
            MetricStatus::Regressed | MetricStatus::BelowFloor => "❌",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricStatus::Improved => "IMPROVED",
            MetricStatus::Maintained => "MAINTAINED",
            MetricStatus::Degraded => "DEGRADED",
            MetricStatus::Regressed => "REGRESSED",
            MetricStatus::BelowFloor => "BELOW FLOOR",
        }
    }
}

/// Verdict for a single tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricVerdict {
    pub metric: Metric,
    pub baseline: f64,
    pub current: f64,
    pub status: MetricStatus,
    /// Absolute floor that applied to this metric, if any.
    pub floor: Option<f64>,
}

impl MetricVerdict {
    pub fn delta(&self) -> f64 {
        self.current - self.baseline
    }

    pub fn passed(&self) -> bool {
        self.status.passed()
    }
}

/// Aggregate result of running the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub verdicts: Vec<MetricVerdict>,
    pub tolerance: f64,
}

impl GateOutcome {
    /// The run passes only if no tracked metric failed.
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(MetricVerdict::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MetricVerdict> {
        self.verdicts.iter().filter(|v| !v.passed())
    }

    pub fn passed_count(&self) -> usize {
        self.verdicts.iter().filter(|v| v.passed()).count()
    }

    /// Process completion code for CI: `0` on pass, `1` on any failure.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }

    /// Render the per-metric lines, the summary and the final verdict.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for v in &self.verdicts {
            let _ = write!(
                out,
                "{} {:<12} {:<20}: {:.3} (baseline: {:.3}, Δ {:+.3})",
                v.status.symbol(),
                v.status.label(),
                v.metric.as_str(),
                v.current,
                v.baseline,
                v.delta(),
            );
            if let (MetricStatus::BelowFloor, Some(floor)) = (v.status, v.floor) {
                let _ = write!(out, " [floor: {floor:.3}]");
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "\nSummary: {}/{} metrics passed (tolerance: {:.3})",
            self.passed_count(),
            self.verdicts.len(),
            self.tolerance
        );

        if self.passed() {
            out.push_str("✅ QUALITY GATE PASSED: all metrics within acceptable range\n");
        } else {
            out.push_str("❌ QUALITY GATE FAILED:\n");
            for v in self.failures() {
                let _ = writeln!(
                    out,
                    "   - {} {}: {:.3} -> {:.3}",
                    v.metric,
                    v.status.label().to_lowercase(),
                    v.baseline,
                    v.current
                );
            }
        }
        out
    }
}

/// Gate configuration: which metrics to check and how strictly.
#[derive(Debug, Clone)]
pub struct RegressionGate {
    tracked: Vec<Metric>,
    tolerance: f64,
    floors: BTreeMap<Metric, f64>,
}

impl Default for RegressionGate {
    fn default() -> Self {
        Self {
            tracked: Metric::ALL.to_vec(),
            tolerance: DEFAULT_TOLERANCE,
            floors: BTreeMap::new(),
        }
    }
}

impl RegressionGate {
    /// Create a gate over `tracked`, rejecting an empty list or a negative or
    /// non-finite tolerance.
    pub fn new(tracked: Vec<Metric>, tolerance: f64) -> Result<Self, ConfigError> {
        validate_tolerance(tolerance)?;
        if tracked.is_empty() {
            return Err(ConfigError::NoTrackedMetrics);
        }
        Ok(Self {
            tracked,
            tolerance,
            floors: BTreeMap::new(),
        })
    }

    /// Add absolute floors. Floors for untracked metrics are ignored.
    pub fn with_floors(mut self, floors: BTreeMap<Metric, f64>) -> Result<Self, ConfigError> {
        for (metric, floor) in &floors {
            if !floor.is_finite() {
                return Err(ConfigError::InvalidFloor {
                    spec: format!("{metric}={floor}"),
                    message: "floor must be a finite number".into(),
                });
            }
        }
        self.floors = floors;
        Ok(self)
    }

    pub fn tracked(&self) -> &[Metric] {
        &self.tracked
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn floors(&self) -> &BTreeMap<Metric, f64> {
        &self.floors
    }

    /// Compare `current` against `baseline` for every tracked metric.
    pub fn evaluate(&self, baseline: &QualityReport, current: &QualityReport) -> GateOutcome {
        let verdicts = self
            .tracked
            .iter()
            .map(|&metric| self.judge_metric(metric, baseline, current))
            .collect();
        let outcome = GateOutcome {
            verdicts,
            tolerance: self.tolerance,
        };

        if outcome.passed() {
            info!(
                metrics = outcome.verdicts.len(),
                tolerance = self.tolerance,
                "Quality gate passed"
            );
        } else {
            warn!(
                failed = outcome.failures().count(),
                tolerance = self.tolerance,
                "Quality gate failed"
            );
        }
        outcome
    }

    fn judge_metric(
        &self,
        metric: Metric,
        baseline: &QualityReport,
        current: &QualityReport,
    ) -> MetricVerdict {
        if !current.contains(metric) {
            warn!(metric = %metric, "Metric missing from current report, scoring as zero");
        }
        let baseline_score = baseline.score(metric);
        let current_score = current.score(metric);
        let floor = self.floors.get(&metric).copied();

        let status = if current_score < baseline_score - self.tolerance {
            MetricStatus::Regressed
        } else if floor.is_some_and(|f| current_score < f) {
            MetricStatus::BelowFloor
        } else if current_score > baseline_score {
            MetricStatus::Improved
        } else if current_score < baseline_score {
            MetricStatus::Degraded
        } else {
            MetricStatus::Maintained
        };

        debug!(
            metric = %metric,
            baseline = baseline_score,
            current = current_score,
            status = status.label(),
            "Compared metric"
        );

        MetricVerdict {
            metric,
            baseline: baseline_score,
            current: current_score,
            status,
            floor,
        }
    }
}

/// Tolerance must be finite and `>= 0`.
pub fn validate_tolerance(tolerance: f64) -> Result<(), ConfigError> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTolerance { value: tolerance })
    }
}

/// Parse a `metric=value` floor argument.
pub fn parse_floor(spec: &str) -> Result<(Metric, f64), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidFloor {
        spec: spec.to_string(),
        message: message.to_string(),
    };
    let (name, value) = spec
        .split_once('=')
        .ok_or_else(|| invalid("expected metric=value"))?;
    let metric: Metric = name.parse()?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid("value is not a number"))?;
    if !value.is_finite() {
        return Err(invalid("floor must be a finite number"));
    }
    Ok((metric, value))
}
