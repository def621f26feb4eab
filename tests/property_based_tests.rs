mod common;

use common::strategies::*;
use limit_checker::models::{Limit, LimitSpec, UsageObservation};
use limit_checker::orchestration::{evaluate_limit, Verdict};
use limit_checker::LimitSource;
use proptest::prelude::*;

fn severity(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Ok => 0,
        Verdict::Warning => 1,
        Verdict::Critical => 2,
        Verdict::CannotEvaluate => u8::MAX,
    }
}

fn count_limit(ceiling: u64, warning: u8, critical: u8) -> Limit {
    Limit::from_spec(
        &LimitSpec::count("Things", ceiling, "AWS::Test::Thing"),
        "Test",
        warning,
        critical,
    )
}

fn record(limit: &Limit, n: u64) {
    for i in 0..n {
        limit.add_current_usage(UsageObservation::new(1.0).with_resource_id(format!("r-{i}")));
    }
}

proptest! {
    /// Property: the verdict matches the percent thresholds, critical first
    #[test]
    fn count_verdict_matches_thresholds(
        ceiling in ceiling_strategy(),
        (warning, critical) in threshold_pair_strategy(),
        fraction in 0.0f64..2.0,
    ) {
        let usage = (ceiling as f64 * fraction).floor() as u64;
        let limit = count_limit(ceiling, warning, critical);
        record(&limit, usage);

        let report = evaluate_limit(&limit);
        let percent = usage as f64 * 100.0 / ceiling as f64;
        let expected = if percent >= f64::from(critical) {
            Verdict::Critical
        } else if percent >= f64::from(warning) {
            Verdict::Warning
        } else {
            Verdict::Ok
        };

        prop_assert_eq!(report.verdict, expected);
        prop_assert_eq!(report.usage, usage as f64);
        prop_assert_eq!(report.percent_used, Some(percent));
    }

    /// Property: one more observation never lowers a count limit's severity
    #[test]
    fn severity_is_monotonic_in_usage(
        ceiling in ceiling_strategy(),
        (warning, critical) in threshold_pair_strategy(),
        usage in 0u64..300,
    ) {
        let limit = count_limit(ceiling, warning, critical);
        record(&limit, usage);
        let before = severity(evaluate_limit(&limit).verdict);

        limit.add_current_usage(UsageObservation::new(1.0));
        let after = severity(evaluate_limit(&limit).verdict);

        prop_assert!(after >= before);
    }

    /// Property: instance-value usage is the largest observation, never the sum
    #[test]
    fn instance_value_usage_is_max(values in instance_values_strategy()) {
        let limit = Limit::from_spec(
            &LimitSpec::instance_value("Capacity", 1_000, "AWS::Test::Fleet"),
            "Test",
            80,
            99,
        );
        for value in values.iter().rev() {
            limit.add_current_usage(UsageObservation::new(f64::from(*value)));
        }

        let expected = values.iter().copied().max().map_or(0.0, f64::from);
        prop_assert_eq!(limit.measured_usage(), expected);
        prop_assert_eq!(limit.usage_count(), values.len());
    }

    /// Property: reset leaves no usage behind and re-recording the same data is stable
    #[test]
    fn reset_then_recount_is_idempotent(ceiling in ceiling_strategy(), usage in 0u64..100) {
        let limit = count_limit(ceiling, 80, 99);
        record(&limit, usage);
        let first = evaluate_limit(&limit);

        limit.reset_usage();
        prop_assert_eq!(limit.usage_count(), 0);

        record(&limit, usage);
        prop_assert_eq!(evaluate_limit(&limit), first);
    }

    /// Property: an override beating the API limit always decides the ceiling
    #[test]
    fn override_wins_ceiling_resolution(
        default in 0u64..100,
        api in 1u64..100,
        value in 1u64..100,
    ) {
        let limit = count_limit(default, 80, 99);
        limit.set_api_limit(api);
        prop_assert_eq!(limit.get_limit(), Some(api));
        prop_assert_eq!(limit.get_limit_source(), LimitSource::Api);

        limit.set_limit_override(value, true);
        prop_assert_eq!(limit.get_limit(), Some(value));
        prop_assert_eq!(limit.get_limit_source(), LimitSource::Override);
    }
}
