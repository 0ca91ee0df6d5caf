//! Unit tests for pa-core primitives.

#[cfg(test)]
mod ids {
    use crate::{EntryId, EnvironmentId, PatientId};

    #[test]
    fn ordering() {
        assert!(PatientId(0) < PatientId(1));
        assert!(EnvironmentId(100) > EnvironmentId(99));
    }

    #[test]
    fn none_sentinel_is_invalid() {
        assert_eq!(EnvironmentId::NONE.0, u32::MAX);
        assert!(!EnvironmentId::NONE.is_valid());
        assert!(EnvironmentId(0).is_valid());
    }

    #[test]
    fn display() {
        assert_eq!(PatientId(7).to_string(), "PatientId(7)");
        assert_eq!(EnvironmentId(3).to_string(), "EnvironmentId(3)");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EntryId::new_v4();
        let b = EntryId::new_v4();
        assert_ne!(a, b);
        assert_eq!(a.simple().len(), 32);
    }
}

#[cfg(test)]
mod time {
    use chrono::NaiveDate;

    use crate::time::{format_date, format_datetime, start_of_day};
    use crate::{Step, TimeSpan};

    #[test]
    fn step_arithmetic() {
        assert_eq!(Step(3).next(), Step(4));
        assert_eq!(Step(3) + 2, Step(5));
        assert_eq!(Step(9).to_string(), "S9");
    }

    #[test]
    fn time_span_totals() {
        let span = TimeSpan { days: 1, hours: 2, minutes: 3, seconds: 4 };
        assert_eq!(span.total_seconds(), Some(86_400 + 7_200 + 180 + 4));
        assert_eq!(span.to_duration().map(|d| d.num_seconds()), span.total_seconds());
        assert_eq!(TimeSpan::days(90).to_duration().map(|d| d.num_days()), Some(90));
    }

    #[test]
    fn negative_span_clamps_for_wall_clock() {
        assert_eq!(TimeSpan::seconds(-5).to_std(), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn oversized_spans_are_none() {
        assert_eq!(TimeSpan::days(i64::MAX).total_seconds(), None);
        assert_eq!(TimeSpan { hours: 1, seconds: i64::MAX, ..TimeSpan::default() }.total_seconds(), None);
        // Fits in i64 seconds but not in a chrono duration.
        let huge = TimeSpan::days(i64::MAX / 86_400 / 2);
        assert!(huge.total_seconds().is_some());
        assert_eq!(huge.to_duration(), None);
        assert_eq!(TimeSpan::days(i64::MAX).to_std(), None);
    }

    #[test]
    fn fhir_formats() {
        let date = NaiveDate::from_ymd_opt(2020, 12, 1).unwrap();
        let t = start_of_day(date);
        assert_eq!(format_datetime(t), "2020-12-01T00:00:00Z");
        assert_eq!(format_date(date), "2020-12-01");
    }
}

#[cfg(test)]
mod rng {
    use crate::{PatientId, PatientRng};

    #[test]
    fn same_seed_same_sequence() {
        let mut a = PatientRng::new(42, PatientId(1));
        let mut b = PatientRng::new(42, PatientId(1));
        let xs: Vec<u32> = (0..16).map(|_| a.gen_range(0..1_000)).collect();
        let ys: Vec<u32> = (0..16).map(|_| b.gen_range(0..1_000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn different_patients_diverge() {
        let mut a = PatientRng::new(42, PatientId(1));
        let mut b = PatientRng::new(42, PatientId(2));
        let xs: Vec<u32> = (0..16).map(|_| a.gen_range(0..1_000_000)).collect();
        let ys: Vec<u32> = (0..16).map(|_| b.gen_range(0..1_000_000)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn pick_weighted_respects_zero_weights() {
        let mut rng = PatientRng::new(7, PatientId(0));
        for _ in 0..100 {
            assert_eq!(rng.pick_weighted(&[0.0, 1.0, 0.0]), Some(1));
        }
    }

    #[test]
    fn pick_weighted_rejects_degenerate_tables() {
        let mut rng = PatientRng::new(7, PatientId(3));
        assert_eq!(rng.pick_weighted(&[]), None);
        assert_eq!(rng.pick_weighted(&[0.0, 0.0]), None);
    }
}

#[cfg(test)]
mod config {
    use crate::{
        EnvironmentId, InitialEnvironment, SimConfig, StoppingCondition, TimeSpan,
    };

    #[test]
    fn default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
        assert_eq!(SimConfig::default().hard_stop, crate::config::DEFAULT_HARD_STOP);
    }

    #[test]
    fn zero_log_every_rejected() {
        let config = SimConfig { log_every: 0, ..SimConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_combinator_rejected() {
        let config = SimConfig {
            stopping_condition: StoppingCondition::Any(vec![]),
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_time_span_rejected() {
        for span in [TimeSpan::days(i64::MAX / 86_400 / 2), TimeSpan::days(i64::MAX)] {
            let config = SimConfig {
                stopping_condition: StoppingCondition::Any(vec![
                    StoppingCondition::MaxNumSteps(5),
                    StoppingCondition::MaxPatientTime(span),
                ]),
                ..SimConfig::default()
            };
            assert!(config.validate().is_err(), "{span:?} accepted");
        }
        let config = SimConfig {
            stopping_condition: StoppingCondition::MaxRealTime(TimeSpan::days(i64::MAX)),
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn nested_combinator_validated() {
        let config = SimConfig {
            stopping_condition: StoppingCondition::All(vec![
                StoppingCondition::MaxNumSteps(3),
                StoppingCondition::MaxPatientTime(TimeSpan::days(-1)),
            ]),
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn probability_table_checks() {
        let zero = SimConfig {
            initial_environment: InitialEnvironment::ByProbability(vec![
                (EnvironmentId(0), 0.0),
            ]),
            ..SimConfig::default()
        };
        assert!(zero.validate().is_err());

        let negative = SimConfig {
            initial_environment: InitialEnvironment::ByProbability(vec![
                (EnvironmentId(0), 1.0),
                (EnvironmentId(1), -0.5),
            ]),
            ..SimConfig::default()
        };
        assert!(negative.validate().is_err());

        let ok = SimConfig {
            initial_environment: InitialEnvironment::ByProbability(vec![
                (EnvironmentId(0), 0.3),
                (EnvironmentId(1), 0.7),
            ]),
            ..SimConfig::default()
        };
        assert!(ok.validate().is_ok());
    }
}
