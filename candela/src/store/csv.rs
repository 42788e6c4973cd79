use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use candela_core::{CandelaError, Candle, TimeSeries};

const HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub(super) fn encode<W: Write>(w: W, series: &TimeSeries) -> Result<(), CandelaError> {
    let with_adj = series.has_adjclose();
    let mut out = ::csv::Writer::from_writer(w);
    let csv_err = |e: ::csv::Error| CandelaError::Io(format!("csv write: {e}"));

    let mut header: Vec<&str> = HEADER.to_vec();
    if with_adj {
        header.push("adjclose");
    }
    out.write_record(&header).map_err(csv_err)?;

    for c in series {
        let mut record = vec![
            c.ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            c.open.to_string(),
            c.high.to_string(),
            c.low.to_string(),
            c.close.to_string(),
            c.volume.to_string(),
        ];
        if with_adj {
            record.push(c.adjclose.map(|a| a.to_string()).unwrap_or_default());
        }
        out.write_record(&record).map_err(csv_err)?;
    }
    out.flush()?;
    Ok(())
}

pub(super) fn decode(bytes: &[u8]) -> Result<TimeSeries, String> {
    let mut reader = ::csv::Reader::from_reader(bytes);
    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let leading: Vec<&str> = headers.iter().take(HEADER.len()).collect();
    if leading != HEADER {
        return Err(format!("unexpected header {headers:?}"));
    }
    let has_adj = headers.get(HEADER.len()) == Some("adjclose");

    let mut series = TimeSeries::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| e.to_string())?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let dec = |i: usize| {
            Decimal::from_str(field(i)).map_err(|e| format!("row {}: column {i}: {e}", line + 1))
        };
        let ts = DateTime::parse_from_rfc3339(field(0))
            .map_err(|e| format!("row {}: timestamp: {e}", line + 1))?
            .with_timezone(&Utc);
        let mut candle = Candle::new(ts, dec(1)?, dec(2)?, dec(3)?, dec(4)?, dec(5)?);
        if has_adj && !field(6).is_empty() {
            candle = candle.with_adjclose(dec(6)?);
        }
        series.insert(candle);
    }
    Ok(series)
}
