use candela_core::timeseries::infer::{estimate_step_seconds, infer_cadence, interval_for};
use candela_core::{Cadence, Candle, Decimal, Interval, TimeSeries};
use chrono::{DateTime, TimeDelta};
use proptest::prelude::*;

fn c(ts: i64) -> Candle {
    Candle::flat(DateTime::from_timestamp(ts, 0).unwrap(), Decimal::ZERO, false)
}

fn series(ts: &[i64]) -> TimeSeries {
    ts.iter().copied().map(c).collect()
}

#[test]
fn tie_resolves_to_smallest_delta() {
    // deltas 120, 60, 120, 60
    let s = series(&[0, 120, 180, 300, 360]);
    assert_eq!(estimate_step_seconds(&s), Some(60));
}

#[test]
fn unique_mode_wins_over_smaller_deltas() {
    // deltas 30, 300, 300, 300
    let s = series(&[0, 30, 330, 630, 930]);
    assert_eq!(estimate_step_seconds(&s), Some(300));
}

#[test]
fn fewer_than_two_rows_is_insufficient() {
    assert_eq!(estimate_step_seconds(&series(&[42])), None);
    assert!(infer_cadence(&series(&[])).is_err());
}

#[test]
fn inferred_cadence_maps_back_to_interval() {
    let s = series(&[0, 300, 600, 1_200]);
    let cad = infer_cadence(&s).unwrap();
    assert_eq!(cad, Cadence::Fixed(TimeDelta::minutes(5)));
    assert_eq!(interval_for(cad), Some(Interval::I5m));
    assert_eq!(interval_for(Cadence::Fixed(TimeDelta::seconds(7))), None);
}

proptest! {
    #[test]
    fn constant_step_with_sparse_holes(step_idx in 0usize..4, n in 6usize..120, holes in proptest::collection::vec(any::<bool>(), 120)) {
        let steps = [60i64, 300, 3_600, 86_400];
        let step = steps[step_idx];
        // At most one hole per four slots keeps the regular step the mode.
        let ts: Vec<i64> = (0..n)
            .filter(|&i| i % 4 != 2 || !holes[i])
            .map(|i| i as i64 * step)
            .collect();
        prop_assert_eq!(estimate_step_seconds(&series(&ts)), Some(step));
    }
}
