use proptest::prelude::*;

use tidal_rate::{RateError, RateRegistry};
use tidal_types::{Rate, Timestamp};

proptest! {
    /// Whatever sequence of requests arrives, the current rate never rises,
    /// and rejected requests are exactly the increases.
    #[test]
    fn current_rate_is_non_increasing(
        initial in 0u128..1_000_000,
        requests in prop::collection::vec(0u128..1_000_000, 1..40),
    ) {
        let mut registry = RateRegistry::new(Rate::from_raw(initial), Timestamp::new(0));
        for (i, raw) in requests.into_iter().enumerate() {
            let before = registry.current_rate();
            let result = registry.set_rate(Rate::from_raw(raw), Timestamp::new(i as u64 + 1));
            let after = registry.current_rate();
            prop_assert!(after <= before);
            if raw > before.raw() {
                let rejected = matches!(result, Err(RateError::RateIncreaseRejected { .. }));
                prop_assert!(rejected);
                prop_assert_eq!(after, before);
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(after.raw(), raw);
            }
        }
    }

    /// History length equals one genesis entry plus the number of accepted changes.
    #[test]
    fn history_records_only_accepted_changes(
        requests in prop::collection::vec(0u128..1_000, 0..30),
    ) {
        let mut registry = RateRegistry::new(Rate::from_raw(1_000), Timestamp::new(0));
        let mut accepted = 0usize;
        for raw in requests {
            if registry.set_rate(Rate::from_raw(raw), Timestamp::new(5)).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(registry.history().len(), accepted + 1);
    }
}
