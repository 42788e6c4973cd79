use candela_core::{Candle, TimeSeries};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rust_decimal::Decimal;

/// Deterministic fixture series by symbol.
pub fn by_symbol(s: &str) -> Option<TimeSeries> {
    match s {
        // Ten one-minute candles starting 2024-01-02 09:00 UTC with 09:04 missing.
        "KRW-BTC" => {
            let start = day("2024-01-02")? + TimeDelta::hours(9);
            let mut series = ramp(start, TimeDelta::minutes(1), 10, 58_000_000, 1_000);
            series.remove(&(start + TimeDelta::minutes(4)));
            Some(series)
        }
        "BTCUSDT" => {
            let start = day("2024-01-02")?;
            Some(ramp(start, TimeDelta::hours(1), 48, 42_000, 5))
        }
        "AAPL" => Some(daily_adjusted(&[
            ("2023-01-03", "130.28", "130.90", "124.17", "125.07", "124.54", 112_117_500),
            ("2023-01-04", "126.89", "128.66", "125.08", "126.36", "125.82", 89_113_600),
            ("2023-01-05", "127.13", "127.77", "124.76", "125.02", "124.49", 80_962_700),
            ("2023-01-09", "130.47", "133.41", "129.89", "130.15", "129.60", 70_790_800),
        ])),
        _ => None,
    }
}

/// `n` candles spaced by `step`, prices climbing by `tick` from `base`.
///
/// Each candle opens at the previous close, so the series is a smooth ramp
/// useful for checking carry-forward values.
#[must_use]
pub fn ramp(start: DateTime<Utc>, step: TimeDelta, n: usize, base: i64, tick: i64) -> TimeSeries {
    (0..n)
        .map(|i| {
            let i = i64::try_from(i).unwrap_or(i64::MAX);
            let open = Decimal::from(base + i * tick);
            let close = Decimal::from(base + (i + 1) * tick);
            let ts = start + step * i32::try_from(i).unwrap_or(i32::MAX);
            Candle::new(
                ts,
                open,
                close + Decimal::from(tick),
                open - Decimal::from(tick),
                close,
                Decimal::from(10 + i),
            )
        })
        .collect()
}

fn day(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc())
}

fn px(s: &str) -> Decimal {
    s.parse().unwrap_or_default()
}

fn daily_adjusted(rows: &[(&str, &str, &str, &str, &str, &str, i64)]) -> TimeSeries {
    rows.iter()
        .filter_map(|&(date, o, h, l, c, adj, v)| {
            Some(
                Candle::new(day(date)?, px(o), px(h), px(l), px(c), Decimal::from(v))
                    .with_adjclose(px(adj)),
            )
        })
        .collect()
}
