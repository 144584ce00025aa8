use std::fmt;

use covgate_core::ThresholdConfig;
use serde::Serialize;

/// Minimum percentages for the two metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub absolute: f64,
    pub incremental: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&ThresholdConfig::default())
    }
}

impl From<&ThresholdConfig> for Thresholds {
    fn from(config: &ThresholdConfig) -> Self {
        Self {
            absolute: config.absolute,
            incremental: config.incremental,
        }
    }
}

/// Which coverage figure a check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Absolute,
    Incremental,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Absolute => write!(f, "Absolute"),
            Metric::Incremental => write!(f, "Incremental"),
        }
    }
}

/// One metric compared against its floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCheck {
    pub metric: Metric,
    pub actual: f64,
    pub threshold: f64,
    pub passed: bool,
}

impl ThresholdCheck {
    fn new(metric: Metric, actual: f64, threshold: f64) -> Self {
        Self {
            metric,
            actual,
            threshold,
            passed: actual >= threshold,
        }
    }

    /// Distance from the floor; negative when failing.
    pub fn delta(&self) -> f64 {
        self.actual - self.threshold
    }

    /// Human-readable verdict line.
    ///
    /// # Examples
    ///
    /// ```
    /// use covgate_check::evaluate;
    /// use covgate_check::Thresholds;
    ///
    /// let result = evaluate(89.99, 100.0, &Thresholds::default());
    /// assert_eq!(result.absolute.message(), "Absolute coverage 89.99% is below 90%!");
    /// ```
    pub fn message(&self) -> String {
        if self.passed {
            format!(
                "{} coverage {:.2}% meets {}%",
                self.metric, self.actual, self.threshold
            )
        } else {
            format!(
                "{} coverage {:.2}% is below {}%!",
                self.metric, self.actual, self.threshold
            )
        }
    }
}

/// Verdict for both metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub absolute: ThresholdCheck,
    pub incremental: ThresholdCheck,
}

impl GateResult {
    pub fn passed(&self) -> bool {
        self.absolute.passed && self.incremental.passed
    }

    pub fn checks(&self) -> [&ThresholdCheck; 2] {
        [&self.absolute, &self.incremental]
    }

    /// Checks that missed their floor, absolute first.
    pub fn failures(&self) -> impl Iterator<Item = &ThresholdCheck> {
        self.checks().into_iter().filter(|c| !c.passed)
    }
}

/// Compare both percentages against `thresholds` with `>=`.
///
/// Values are compared as computed, without rounding to the two decimals
/// used for display.
pub fn evaluate(absolute: f64, incremental: f64, thresholds: &Thresholds) -> GateResult {
    let result = GateResult {
        absolute: ThresholdCheck::new(Metric::Absolute, absolute, thresholds.absolute),
        incremental: ThresholdCheck::new(Metric::Incremental, incremental, thresholds.incremental),
    };
    for check in result.failures() {
        tracing::debug!(metric = %check.metric, delta = check.delta(), "threshold missed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_only_failure() {
        let result = evaluate(89.99, 100.0, &Thresholds::default());
        assert!(!result.passed());
        assert!(!result.absolute.passed);
        assert!(result.incremental.passed);
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn incremental_only_failure() {
        let result = evaluate(95.0, 94.99, &Thresholds::default());
        assert!(!result.passed());
        assert!(result.absolute.passed);
        assert!(!result.incremental.passed);
        assert_eq!(
            result.incremental.message(),
            "Incremental coverage 94.99% is below 95%!"
        );
    }

    #[test]
    fn exact_thresholds_pass() {
        let result = evaluate(95.0, 95.0, &Thresholds::default());
        assert!(result.passed());
        assert_eq!(result.failures().count(), 0);
    }

    #[test]
    fn both_can_fail_together() {
        let result = evaluate(10.0, 20.0, &Thresholds::default());
        let failed: Vec<Metric> = result.failures().map(|c| c.metric).collect();
        assert_eq!(failed, vec![Metric::Absolute, Metric::Incremental]);
    }

    #[test]
    fn comparison_is_not_rounded() {
        let result = evaluate(89.999, 100.0, &Thresholds::default());
        assert!(!result.passed());
    }

    #[test]
    fn custom_thresholds_are_honoured() {
        let thresholds = Thresholds {
            absolute: 75.5,
            incremental: 0.0,
        };
        let result = evaluate(75.5, 0.0, &thresholds);
        assert!(result.passed());
        assert_eq!(result.absolute.delta(), 0.0);

        let result = evaluate(75.4, 0.0, &thresholds);
        assert_eq!(result.absolute.message(), "Absolute coverage 75.40% is below 75.5%!");
    }
}
