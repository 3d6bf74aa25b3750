//! Decoding of orderbook levels.
//!
//! Venues list levels either as arrays (`["price", "size", ...]`, strings or
//! numbers, trailing fields ignored) or as objects (`{"price": .., "size": ..}`).

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::ExchangeError;
use crate::types::{RawLevel, RawOrderBook};

/// The `asks`/`bids` body shared by every supported venue.
#[derive(Debug, Deserialize)]
pub struct DepthPayload {
    pub asks: Vec<Value>,
    pub bids: Vec<Value>,
}

impl DepthPayload {
    pub fn into_book(self) -> Result<RawOrderBook, ExchangeError> {
        Ok(RawOrderBook {
            asks: parse_levels(&self.asks)?,
            bids: parse_levels(&self.bids)?,
        })
    }
}

pub fn parse_levels(rows: &[Value]) -> Result<Vec<RawLevel>, ExchangeError> {
    rows.iter().map(parse_level).collect()
}

fn parse_level(row: &Value) -> Result<RawLevel, ExchangeError> {
    let (price, size) = match row {
        Value::Array(cols) if cols.len() >= 2 => (&cols[0], &cols[1]),
        Value::Object(obj) => match (obj.get("price"), obj.get("size")) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(invalid(row)),
        },
        _ => return Err(invalid(row)),
    };

    Ok(RawLevel::new(to_decimal(price)?, to_decimal(size)?))
}

pub fn to_decimal(v: &Value) -> Result<Decimal, ExchangeError> {
    let raw = match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(invalid(v)),
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(ExchangeError::from)
}

fn invalid(v: &Value) -> ExchangeError {
    ExchangeError::InvalidResponse(format!("unexpected orderbook level: {v}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn array_levels_with_trailing_fields() {
        let rows = vec![json!(["100.5", "0.25", 3]), json!([100.25, 1])];
        let levels = parse_levels(&rows).unwrap();

        assert_eq!(levels[0], RawLevel::new(dec!(100.5), dec!(0.25)));
        assert_eq!(levels[1], RawLevel::new(dec!(100.25), dec!(1)));
    }

    #[test]
    fn object_levels() {
        let rows = vec![json!({"price": "42.1", "size": "7"})];
        assert_eq!(
            parse_levels(&rows).unwrap()[0],
            RawLevel::new(dec!(42.1), dec!(7))
        );
    }

    #[test]
    fn scientific_notation_is_accepted() {
        assert_eq!(to_decimal(&json!("1e-5")).unwrap(), dec!(0.00001));
    }

    #[test]
    fn malformed_levels_are_rejected() {
        assert!(parse_levels(&[json!(["1"])]).is_err());
        assert!(parse_levels(&[json!({"px": "1"})]).is_err());
        assert!(parse_levels(&[json!(["abc", "1"])]).is_err());
    }
}
