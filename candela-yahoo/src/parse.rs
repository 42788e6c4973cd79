//! Decoding of the `Date,Open,High,Low,Close,Adj Close,Volume` download CSV.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use candela_core::{CandelaError, Candle};

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adjclose: Option<usize>,
    volume: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CandelaError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let need = |name: &str| {
            find(name).ok_or_else(|| CandelaError::Data(format!("download csv lacks {name} column")))
        };
        Ok(Self {
            date: need("Date")?,
            open: need("Open")?,
            high: need("High")?,
            low: need("Low")?,
            close: need("Close")?,
            adjclose: find("Adj Close"),
            volume: need("Volume")?,
        })
    }
}

/// Parse a download response into candles, skipping rows Yahoo marks `null`.
pub(crate) fn parse_download(body: &str) -> Result<Vec<Candle>, CandelaError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| CandelaError::Data(format!("download csv header: {e}")))?
        .clone();
    let cols = Columns::locate(&headers)?;

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CandelaError::Data(format!("download csv: {e}")))?;
        if record.iter().any(|f| f.eq_ignore_ascii_case("null") || f.is_empty()) {
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or_default();
        let dec = |i: usize| {
            Decimal::from_str(field(i))
                .map_err(|e| CandelaError::Data(format!("bad number {:?}: {e}", field(i))))
        };
        let mut candle = Candle::new(
            parse_date(field(cols.date))?,
            dec(cols.open)?,
            dec(cols.high)?,
            dec(cols.low)?,
            dec(cols.close)?,
            dec(cols.volume)?,
        );
        if let Some(i) = cols.adjclose {
            candle = candle.with_adjclose(dec(i)?);
        }
        out.push(candle);
    }
    Ok(out)
}

/// Daily rows carry a bare date; intraday rows carry an offset timestamp.
fn parse_date(s: &str) -> Result<DateTime<Utc>, CandelaError> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| CandelaError::Data(format!("bad date {s:?}: {e}")))
}
