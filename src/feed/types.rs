// src/feed/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParseError;

/// One trade as returned by `/trades`. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub guid: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "type", default)]
    pub trade_type: String,
    #[serde(rename = "User", default)]
    pub user: TradeUser,
    #[serde(default)]
    pub price_filled: Option<f64>,
    #[serde(default)]
    pub price_closed: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub short_put: Option<Strike>,
    #[serde(default)]
    pub short_call: Option<Strike>,
    #[serde(default)]
    pub long_put: Option<Strike>,
    #[serde(default)]
    pub long_call: Option<Strike>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub close_date: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

/// Strike legs come back either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Strike {
    Num(f64),
    Text(String),
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strike::Num(n) if n.fract() == 0.0 => write!(f, "{n:.0}"),
            Strike::Num(n) => write!(f, "{n}"),
            Strike::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Position lifecycle state. Part of a trade's identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Open,
    Closed,
}

impl Lifecycle {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Open => "open",
            Lifecycle::Closed => "closed",
        }
    }
}

impl Trade {
    pub fn from_value(raw: &serde_json::Value) -> Result<Self, ParseError> {
        Ok(Trade::deserialize(raw)?)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.close_date.is_some() {
            Lifecycle::Closed
        } else {
            Lifecycle::Open
        }
    }

    pub fn is_patron(&self) -> bool {
        self.user.role == "patron"
    }

    pub fn is_stock(&self) -> bool {
        self.trade_type.contains("COMMON STOCK")
    }

    /// Strike legs in display order: short put, short call, long put, long call.
    pub fn strikes(&self) -> [Option<&Strike>; 4] {
        [
            self.short_put.as_ref(),
            self.short_call.as_ref(),
            self.long_put.as_ref(),
            self.long_call.as_ref(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_trade_with_nulls_and_string_strikes() {
        let raw = json!({
            "guid": "abc-123",
            "symbol": "amd",
            "type": "PUT CREDIT SPREAD",
            "User": {"username": "major", "role": "patron"},
            "price_filled": 1.25,
            "quantity": 2,
            "short_put": "95",
            "long_put": 90,
            "short_call": null,
            "expiry_date": "2030-01-17T00:00:00.000Z",
            "close_date": null,
            "note": null,
            "extra_field": true
        });
        let t = Trade::from_value(&raw).unwrap();
        assert_eq!(t.guid, "abc-123");
        assert_eq!(t.lifecycle(), Lifecycle::Open);
        assert!(t.is_patron());
        assert_eq!(t.short_put, Some(Strike::Text("95".into())));
        assert_eq!(t.long_put, Some(Strike::Num(90.0)));
        assert_eq!(t.short_call, None);
    }

    #[test]
    fn missing_guid_is_a_parse_error() {
        let raw = json!({"symbol": "AMD", "User": {"role": "patron"}});
        assert!(matches!(Trade::from_value(&raw), Err(ParseError::Json(_))));
    }

    #[test]
    fn strike_display_drops_trailing_zero() {
        assert_eq!(Strike::Num(50.0).to_string(), "50");
        assert_eq!(Strike::Num(52.5).to_string(), "52.5");
        assert_eq!(Strike::Text(" 7.5 ".into()).to_string(), "7.5");
    }
}
