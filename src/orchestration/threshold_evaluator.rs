//! # Threshold Evaluator
//!
//! Compares a limit's measured usage with its effective ceiling. Count limits measure
//! the number of observations; instance-value limits measure the largest single
//! observation. Critical is checked before warning, so a value crossing both is
//! critical.

use super::types::{LimitReport, Verdict};
use crate::error::EvaluationError;
use crate::models::{EffectiveThresholds, Limit};

/// `usage` as a percentage of `ceiling`; multiplies first to avoid rounding drift
pub fn percent_of(usage: f64, ceiling: u64) -> f64 {
    usage * 100.0 / ceiling as f64
}

/// Severity for a measured usage that has a usable ceiling
pub fn classify(usage: f64, percent: f64, thresholds: &EffectiveThresholds) -> Verdict {
    let crosses = |percent_threshold: u8, count_threshold: Option<u64>| {
        percent >= f64::from(percent_threshold)
            || count_threshold.is_some_and(|count| usage >= count as f64)
    };

    if crosses(thresholds.critical_percent, thresholds.critical_count) {
        Verdict::Critical
    } else if crosses(thresholds.warning_percent, thresholds.warning_count) {
        Verdict::Warning
    } else {
        Verdict::Ok
    }
}

/// Evaluate one limit against its current usage
pub fn evaluate_limit(limit: &Limit) -> LimitReport {
    let usage = limit.measured_usage();
    let thresholds = limit.effective_thresholds();
    let ceiling = limit.get_limit();

    let (verdict, percent_used, evaluation_error) = match ceiling {
        None => (
            Verdict::CannotEvaluate,
            None,
            Some(EvaluationError::CeilingUnset {
                service: limit.service_name().to_string(),
                limit: limit.name().to_string(),
            }),
        ),
        Some(0) => (
            Verdict::CannotEvaluate,
            None,
            Some(EvaluationError::CeilingZero {
                service: limit.service_name().to_string(),
                limit: limit.name().to_string(),
            }),
        ),
        Some(ceiling) => {
            let percent = percent_of(usage, ceiling);
            (classify(usage, percent, &thresholds), Some(percent), None)
        }
    };

    LimitReport {
        service: limit.service_name().to_string(),
        limit: limit.name().to_string(),
        verdict,
        class: limit.class(),
        usage,
        ceiling,
        limit_source: limit.get_limit_source(),
        percent_used,
        thresholds,
        observations: limit.get_current_usage(),
        evaluation_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LimitSpec, ThresholdOverride, UsageObservation};

    fn count_limit(default: u64, warning: u8, critical: u8) -> Limit {
        Limit::from_spec(
            &LimitSpec::count("Things", default, "AWS::Test"),
            "Test",
            warning,
            critical,
        )
    }

    fn add(limit: &Limit, n: usize) {
        for i in 0..n {
            limit.add_current_usage(UsageObservation::new(1.0).with_resource_id(format!("r-{i}")));
        }
    }

    #[test]
    fn test_count_mode_scenario() {
        let limit = count_limit(10, 80, 95);
        add(&limit, 5);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::Ok);
        assert_eq!(report.percent_used, Some(50.0));

        add(&limit, 4);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::Warning);
        assert_eq!(report.percent_used, Some(90.0));

        add(&limit, 1);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::Critical);
        assert_eq!(report.percent_used, Some(100.0));
        assert_eq!(report.observations.len(), 10);
    }

    #[test]
    fn test_instance_value_uses_max_not_sum() {
        let limit = Limit::from_spec(
            &LimitSpec::instance_value("Capacity", 10, "AWS::Test"),
            "Test",
            80,
            99,
        );
        for v in [3.0, 7.0, 2.0] {
            limit.add_current_usage(UsageObservation::new(v));
        }
        let report = evaluate_limit(&limit);
        assert_eq!(report.usage, 7.0);
        assert_eq!(report.percent_used, Some(70.0));
        assert_eq!(report.verdict, Verdict::Ok);
    }

    #[test]
    fn test_zero_ceiling_cannot_evaluate() {
        let limit = count_limit(0, 80, 99);
        add(&limit, 1);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::CannotEvaluate);
        assert!(report.percent_used.is_none());
        assert!(matches!(
            report.evaluation_error,
            Some(EvaluationError::CeilingZero { .. })
        ));
    }

    #[test]
    fn test_unset_ceiling_cannot_evaluate() {
        let spec = LimitSpec::count("Things", 1, "AWS::Test").without_default();
        let limit = Limit::from_spec(&spec, "Test", 80, 99);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::CannotEvaluate);
        assert!(matches!(
            report.evaluation_error,
            Some(EvaluationError::CeilingUnset { .. })
        ));
    }

    #[test]
    fn test_override_rescues_zero_ceiling() {
        let limit = count_limit(0, 80, 99);
        add(&limit, 1);
        limit.set_limit_override(4, true);
        let report = evaluate_limit(&limit);
        assert_eq!(report.verdict, Verdict::Ok);
        assert_eq!(report.ceiling, Some(4));
    }

    #[test]
    fn test_count_thresholds() {
        let limit = count_limit(100, 80, 99);
        limit
            .set_threshold_override(ThresholdOverride {
                warning_count: Some(3),
                critical_count: Some(5),
                ..Default::default()
            })
            .unwrap();
        add(&limit, 2);
        assert_eq!(evaluate_limit(&limit).verdict, Verdict::Ok);
        add(&limit, 1);
        assert_eq!(evaluate_limit(&limit).verdict, Verdict::Warning);
        add(&limit, 2);
        assert_eq!(evaluate_limit(&limit).verdict, Verdict::Critical);
    }

    #[test]
    fn test_equal_thresholds_resolve_to_critical() {
        let thresholds = EffectiveThresholds {
            warning_percent: 90,
            critical_percent: 90,
            warning_count: None,
            critical_count: None,
        };
        assert_eq!(classify(9.0, 90.0, &thresholds), Verdict::Critical);
        assert_eq!(classify(8.0, 89.9, &thresholds), Verdict::Ok);
    }

    #[test]
    fn test_percent_of_is_exact_for_integer_ratios() {
        assert_eq!(percent_of(9.0, 10), 90.0);
        assert_eq!(percent_of(7.0, 10), 70.0);
        assert_eq!(percent_of(1.0, 3) >= 33.0, true);
    }
}
