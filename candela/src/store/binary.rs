use std::io::Write;

use serde::{Deserialize, Serialize};

use candela_core::{CandelaError, SeriesKey, TimeSeries};

const MAGIC: [u8; 4] = *b"CNDL";
const FORMAT_VERSION: u16 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    magic: [u8; 4],
    version: u16,
    key: &'a SeriesKey,
    series: &'a TimeSeries,
}

#[derive(Deserialize)]
struct Envelope {
    magic: [u8; 4],
    version: u16,
    key: SeriesKey,
    series: TimeSeries,
}

pub(super) fn encode<W: Write>(w: &mut W, key: &SeriesKey, series: &TimeSeries) -> Result<(), CandelaError> {
    let env = EnvelopeRef {
        magic: MAGIC,
        version: FORMAT_VERSION,
        key,
        series,
    };
    bincode::serde::encode_into_std_write(&env, w, bincode::config::standard())
        .map_err(|e| CandelaError::Io(format!("encode {key}: {e}")))?;
    Ok(())
}

pub(super) fn decode(bytes: &[u8], expected: &SeriesKey) -> Result<TimeSeries, String> {
    let (env, used): (Envelope, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| e.to_string())?;
    if env.magic != MAGIC {
        return Err("bad magic".into());
    }
    if env.version != FORMAT_VERSION {
        return Err(format!("unknown format version {}", env.version));
    }
    if used != bytes.len() {
        return Err(format!("{} trailing bytes", bytes.len() - used));
    }
    if &env.key != expected {
        return Err(format!("file holds {} instead of {expected}", env.key));
    }
    Ok(env.series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candela_core::{Candle, Decimal, Interval};
    use chrono::DateTime;

    fn sample() -> (SeriesKey, TimeSeries) {
        let key = SeriesKey::new("AAPL", Interval::D1, "yf").unwrap();
        let ts = DateTime::from_timestamp(1_704_153_600, 0).unwrap();
        let row = Candle::flat(ts, Decimal::new(18564, 2), true);
        (key, vec![row].into())
    }

    #[test]
    fn envelope_keeps_adjclose() {
        let (key, series) = sample();
        let mut buf = Vec::new();
        encode(&mut buf, &key, &series).unwrap();
        let back = decode(&buf, &key).unwrap();
        assert_eq!(back.first().unwrap().adjclose, Some(Decimal::new(18564, 2)));
    }

    #[test]
    fn foreign_key_and_truncation_are_rejected() {
        let (key, series) = sample();
        let mut buf = Vec::new();
        encode(&mut buf, &key, &series).unwrap();

        let other = SeriesKey::new("MSFT", Interval::D1, "yf").unwrap();
        assert!(decode(&buf, &other).unwrap_err().contains("instead of"));
        assert!(decode(&buf[..buf.len() - 3], &key).is_err());
    }
}
