use async_trait::async_trait;
use chrono::TimeDelta;
use rust_decimal::Decimal;

use candela_core::{CandelaError, Interval, SeriesKey, TimeSeries};

use super::strategy::{Decision, Strategy, StrategyContext};

/// Simple moving-average crossover on stored closes.
///
/// Buys when the short average crosses above the long one on the latest
/// candle, sells on the opposite cross, and holds otherwise.
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    name: String,
    key: SeriesKey,
    short: usize,
    long: usize,
    fraction: Decimal,
    refresh: Option<TimeDelta>,
}

impl MovingAverageCross {
    /// Crossover of `short`- and `long`-candle averages on the stored `key` series.
    ///
    /// # Errors
    /// `InvalidArg` unless `0 < short < long` and the fraction is in `(0, 1]`.
    pub fn new(
        key: SeriesKey,
        short: usize,
        long: usize,
        fraction: Decimal,
    ) -> Result<Self, CandelaError> {
        if short == 0 || short >= long {
            return Err(CandelaError::InvalidArg(format!(
                "moving averages need 0 < short < long, got {short}/{long}"
            )));
        }
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(CandelaError::InvalidArg(format!(
                "order fraction {fraction} outside (0, 1]"
            )));
        }
        Ok(Self {
            name: "ma_cross".to_string(),
            key,
            short,
            long,
            fraction,
            refresh: None,
        })
    }

    /// Daily 5/20 crossover committing half the balance.
    ///
    /// # Errors
    /// `InvalidArg` for a blank ticker or source.
    pub fn daily(ticker: &str, source: &str) -> Result<Self, CandelaError> {
        Self::new(SeriesKey::new(ticker, Interval::D1, source)?, 5, 20, Decimal::new(5, 1))
    }

    /// Register under `name` instead of `ma_cross`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Backfill the last `lookback` of the series before every evaluation.
    #[must_use]
    pub const fn with_refresh(mut self, lookback: TimeDelta) -> Self {
        self.refresh = Some(lookback);
        self
    }

    /// Decision for `series`, whose last candle is the current one.
    ///
    /// # Errors
    /// `InsufficientData` with fewer than `long + 1` candles.
    pub fn decide(&self, series: &TimeSeries) -> Result<Decision, CandelaError> {
        let required = self.long + 1;
        if series.len() < required {
            return Err(CandelaError::InsufficientData {
                rows: series.len(),
                required,
            });
        }
        let closes: Vec<Decimal> = series.iter().rev().take(required).map(|c| c.close).collect();
        // closes[0] is the newest candle
        let now_short = mean(&closes[..self.short]);
        let now_long = mean(&closes[..self.long]);
        let prev_short = mean(&closes[1..=self.short]);
        let prev_long = mean(&closes[1..=self.long]);

        let ticker = self.key.ticker.as_str();
        Ok(if prev_short <= prev_long && now_short > now_long {
            Decision::buy(ticker, self.fraction)
        } else if prev_short >= prev_long && now_short < now_long {
            Decision::sell(ticker, self.fraction)
        } else {
            Decision::hold(ticker)
        })
    }
}

fn mean(xs: &[Decimal]) -> Decimal {
    let n = Decimal::from(xs.len());
    xs.iter().sum::<Decimal>() / n
}

#[async_trait]
impl Strategy for MovingAverageCross {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, ctx: &StrategyContext<'_>) -> Result<Decision, CandelaError> {
        if let Some(lookback) = self.refresh {
            ctx.candela
                .backfill(&self.key, ctx.now - lookback, ctx.now)
                .await?;
        }
        let series = ctx.candela.load(&self.key).await?;
        self.decide(&series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_core::Candle;
    use chrono::DateTime;

    fn series(closes: &[i64]) -> TimeSeries {
        let t0 = DateTime::from_timestamp(1_704_153_600, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Candle::flat(
                    t0 + TimeDelta::days(i64::try_from(i).unwrap()),
                    Decimal::from(*c),
                    false,
                )
            })
            .collect()
    }

    fn strategy() -> MovingAverageCross {
        MovingAverageCross::new(
            SeriesKey::new("KRW-BTC", Interval::D1, "upbit").unwrap(),
            2,
            4,
            Decimal::ONE,
        )
        .unwrap()
    }

    #[test]
    fn upward_cross_buys() {
        let d = strategy().decide(&series(&[10, 10, 10, 10, 20])).unwrap();
        assert_eq!(d, Decision::buy("KRW-BTC", Decimal::ONE));
    }

    #[test]
    fn downward_cross_sells() {
        let d = strategy().decide(&series(&[10, 10, 10, 10, 1])).unwrap();
        assert_eq!(d, Decision::sell("KRW-BTC", Decimal::ONE));
    }

    #[test]
    fn steady_trend_holds() {
        let d = strategy().decide(&series(&[1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(d, Decision::hold("KRW-BTC"));
    }

    #[test]
    fn short_history_is_insufficient() {
        assert!(matches!(
            strategy().decide(&series(&[1, 2, 3])),
            Err(CandelaError::InsufficientData { rows: 3, required: 5 })
        ));
    }

    #[test]
    fn windows_must_be_ordered() {
        let key = SeriesKey::new("KRW-BTC", Interval::D1, "upbit").unwrap();
        assert!(MovingAverageCross::new(key.clone(), 4, 2, Decimal::ONE).is_err());
        assert!(MovingAverageCross::new(key, 2, 4, Decimal::TWO).is_err());
    }
}
