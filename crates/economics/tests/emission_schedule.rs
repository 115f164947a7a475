//! Emission schedule integration tests.
//!
//! Run with: cargo test -p tap-economics --test emission_schedule

use proptest::prelude::*;
use tap_economics::{compute_daily_pool, EmissionParams, EmissionState, EmissionTier};
use tap_types::{tap, DAILY_DISTRIBUTION_UNIT as D};

#[test]
fn reserve_above_medium_milestone_releases_one_unit_plus_remainder() {
    let p = EmissionParams::default();
    let balance = tap(300_000_000);
    let daily = compute_daily_pool(balance, D, &p).unwrap();
    assert_eq!(daily.pool, D + balance % D);
}

#[test]
fn tiny_reserve_caps_the_decayed_pool() {
    let p = EmissionParams::default();
    let daily = compute_daily_pool(100, D, &p).unwrap();
    let expected = tap(25_000).max(D * 995 / 1000).min(100);
    assert_eq!(daily.pool, expected);
}

#[test]
fn schedule_walks_from_release_into_decay() {
    let p = EmissionParams::default();
    let mut state = EmissionState::default();
    let mut balance = tap(264_000_000);

    let first = state.next_pool(balance, &p).unwrap();
    assert_eq!(first.tier, EmissionTier::DoubleRelease);
    balance -= first.pool;

    // Full releases until the reserve drops under the medium milestone.
    let mut releases = 0;
    loop {
        let daily = state.next_pool(balance, &p).unwrap();
        balance -= daily.pool;
        if daily.tier == EmissionTier::Decay {
            assert_eq!(daily.pool, D * 995 / 1000);
            break;
        }
        assert_eq!(daily.tier, EmissionTier::FullRelease);
        releases += 1;
    }
    assert_eq!(releases, 12);

    let next = state.next_pool(balance, &p).unwrap();
    assert_eq!(next.pool, D * 995 / 1000 * 995 / 1000);
}

proptest! {
    #[test]
    fn pool_never_exceeds_a_decaying_treasury(
        balance in 0u128..tap(251_000_000),
        last in 0u128..=2 * D,
    ) {
        let p = EmissionParams::default();
        let daily = compute_daily_pool(balance, last, &p).unwrap();
        prop_assert_eq!(daily.tier, EmissionTier::Decay);
        prop_assert!(daily.pool <= balance);
        prop_assert_eq!(daily.next_base, daily.pool);
        if balance >= p.floor {
            prop_assert!(daily.pool >= p.floor);
        }
    }
}
