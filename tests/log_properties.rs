//! Property-based tests for the Log monoid.

use breakwater::{Log, Monoid, Semigroup};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_empty_is_left_identity(entries in prop::collection::vec(any::<i32>(), 0..50)) {
        let log = Log::of(entries);
        prop_assert_eq!(Log::empty().combine(log.clone()), log);
    }

    #[test]
    fn prop_empty_is_right_identity(entries in prop::collection::vec(any::<i32>(), 0..50)) {
        let log = Log::of(entries);
        prop_assert_eq!(log.clone().combine(Log::empty()), log);
    }

    #[test]
    fn prop_combine_is_associative(
        xs in prop::collection::vec(any::<i32>(), 0..20),
        ys in prop::collection::vec(any::<i32>(), 0..20),
        zs in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let (x, y, z) = (Log::of(xs), Log::of(ys), Log::of(zs));
        let left = x.clone().combine(y.clone()).combine(z.clone());
        let right = x.combine(y.combine(z));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_combine_concatenates_in_order(
        xs in prop::collection::vec(any::<i32>(), 0..20),
        ys in prop::collection::vec(any::<i32>(), 0..20),
    ) {
        let merged = Log::of(xs.clone()).combine(Log::of(ys.clone()));
        let mut expected = xs;
        expected.extend(ys);
        prop_assert_eq!(merged.into_vec(), expected);
    }

    #[test]
    fn prop_tell_is_single_combine(entries in prop::collection::vec(any::<i32>(), 0..20), extra in any::<i32>()) {
        let told = Log::of(entries.clone()).tell(extra);
        let combined = Log::of(entries).combine(Log::single(extra));
        prop_assert_eq!(told, combined);
    }

}

#[test]
fn monoid_empty_matches_default() {
    let empty: Log<i32> = Monoid::empty();
    assert_eq!(empty, Log::<i32>::default());
}
