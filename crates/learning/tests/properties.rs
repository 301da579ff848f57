use cadence_config::{LearningConfig, Sensitivity};
use cadence_core::{EventInput, EventKind};
use cadence_learning::{Learner, confidence};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = EventKind> {
    prop_oneof![
        Just(EventKind::Read),
        Just(EventKind::Grep),
        Just(EventKind::Edit),
        Just(EventKind::Write),
        Just(EventKind::TodoUpdate),
        Just(EventKind::from("Bash")),
    ]
}

fn sensitivity_strategy() -> impl Strategy<Value = Sensitivity> {
    prop_oneof![
        Just(Sensitivity::Low),
        Just(Sensitivity::Medium),
        Just(Sensitivity::High),
    ]
}

fn feed(learner: &mut Learner, kinds: &[(EventKind, u8)]) {
    let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    for (i, (kind, subject)) in kinds.iter().enumerate() {
        let input = EventInput::new(kind.clone(), format!("f{subject}.rs"))
            .at(start + Duration::seconds(i as i64));
        learner.observe(input, start);
    }
}

proptest! {
    #[test]
    fn confidence_stays_in_unit_interval(c in 0.0f64..=1.0, rate in 0.0f64..=1.0, n in 0u64..50, hours in 0.0f64..1000.0) {
        let r = confidence::reinforce(c, rate);
        prop_assert!((0.0..=1.0).contains(&r));
        let rn = confidence::reinforce_n(c, rate, n);
        prop_assert!((0.0..=1.0).contains(&rn));
        let d = confidence::decay(c, hours, 72.0);
        prop_assert!((0.0..=1.0).contains(&d));
        prop_assert!(d <= c);
    }

    #[test]
    fn library_respects_capacity(
        kinds in prop::collection::vec((kind_strategy(), 0u8..3), 0..80),
        max_patterns in 1usize..6,
        sensitivity in sensitivity_strategy(),
    ) {
        let config = LearningConfig {
            max_patterns,
            pattern_window_size: 12,
            event_log_capacity: 16,
            detection_sensitivity: sensitivity,
            ..LearningConfig::default()
        };
        let mut learner = Learner::new(&config);
        feed(&mut learner, &kinds);

        prop_assert!(learner.library().len() <= max_patterns);
        prop_assert!(learner.log().len() <= 16);
        prop_assert!(learner.log().window(config.pattern_window_size).len() <= 12);
        for pattern in learner.library().patterns() {
            prop_assert!((0.0..=1.0).contains(&pattern.confidence));
            prop_assert!(pattern.signature.len() >= 2);
            prop_assert!(pattern.signature.len() <= 6);
        }
    }

    #[test]
    fn learning_is_deterministic(kinds in prop::collection::vec((kind_strategy(), 0u8..3), 0..60)) {
        let config = LearningConfig::default();
        let mut a = Learner::new(&config);
        let mut b = Learner::new(&config);
        feed(&mut a, &kinds);
        feed(&mut b, &kinds);
        prop_assert_eq!(a.library().patterns(), b.library().patterns());
        prop_assert_eq!(a.predict(), b.predict());
    }
}
