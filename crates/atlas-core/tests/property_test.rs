//! Property tests: compiled filters agree with the reference evaluator, and
//! mapper laws hold over generated inputs

mod common;

use atlas_core::{Condition, ConditionValue, Conjunction, DataProvider, DomainMapper, Filter, LinearMapper, RankMapper};
use atlas_types::{DomainValue, ImageValue, ValueRange};
use common::{provider, sorted};
use proptest::prelude::*;
use std::sync::OnceLock;

fn shared_provider() -> &'static DataProvider {
    static PROVIDER: OnceLock<DataProvider> = OnceLock::new();
    PROVIDER.get_or_init(provider)
}

fn condition_value() -> impl Strategy<Value = ConditionValue> {
    prop_oneof![
        1 => Just(ConditionValue::None),
        4 => (-10.0f64..1000.0, 0.0f64..15000.0, any::<bool>()).prop_map(|(lower, upper, lower_open)| {
            ConditionValue::Numeric { range: ValueRange::new(lower, upper), lower_open, upper_open: false }
        }),
    ]
}

fn condition() -> impl Strategy<Value = Condition> {
    (prop::sample::select(vec!["Population", "Area"]), condition_value()).prop_map(|(id, value)| {
        let fact = shared_provider().registry().require(id).expect("fixture fact").clone();
        Condition::new(fact, value)
    })
}

fn filter() -> impl Strategy<Value = Filter> {
    prop::collection::vec(prop::collection::vec(condition(), 0..4).prop_map(Conjunction::new), 0..4)
        .prop_map(Filter::new)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn compiled_filter_matches_evaluator(filter in filter()) {
        let provider = shared_provider();
        let selected = sorted(provider.country_ids(&filter).unwrap());
        let expected = sorted(
            provider
                .countries(&Filter::all())
                .unwrap()
                .iter()
                .filter(|country| filter.matches(country))
                .map(|country| country.id().to_string())
                .collect(),
        );
        prop_assert_eq!(selected, expected);
    }

    #[test]
    fn linear_inverse_round_trips(lower in -1e6f64..1e6, span in 1e-3f64..1e6, t in 0.0f64..=1.0) {
        let upper = lower + span;
        let value = (lower + t * span).min(upper);
        let mapper = LinearMapper::new(ValueRange::new(lower, upper));

        let image = mapper.domain_to_image(&DomainValue::Numeric(value));
        let back = mapper.image_to_domain(&image).and_then(|d| d.as_f64()).unwrap();
        prop_assert!((back - value).abs() <= 1e-6 * value.abs().max(span).max(1.0));
    }

    #[test]
    fn rank_is_monotonic(mut table in prop::collection::vec(-1e3f64..1e3, 0..50), a in -2e3f64..2e3, b in -2e3f64..2e3) {
        table.sort_by(f64::total_cmp);
        let mapper = RankMapper::from_sorted(table);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let image = |v| match mapper.domain_to_image(&DomainValue::Numeric(v)) {
            ImageValue::Numeric(p) => p,
            ImageValue::Categorical(_) => f64::NAN,
        };
        prop_assert!(image(low) <= image(high));
        prop_assert!((0.0..=1.0).contains(&image(low)));
    }
}
