use std::cmp::Ordering;
use std::num::IntErrorKind;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PlnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Buy,
    Sell,
}

impl TryFrom<&str> for Action {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            other => Err(format!("unsupported action: {}", other)),
        }
    }
}

/// One entry of the user activity feed, kept as close to the wire as possible.
///
/// Every field is optional: the fetcher and the accountant each reject only
/// the records missing what they need.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Trade {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub action: Option<Value>,
    #[serde(default)]
    pub token: Option<Value>,
    #[serde(default)]
    pub amount_token: Option<Value>,
    #[serde(default)]
    pub amount_btc: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
}

impl Trade {
    /// Decodes a raw feed entry. Non-object entries yield `None`.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        if !entry.is_object() {
            return None;
        }
        serde_json::from_value(entry.clone()).ok()
    }

    /// Identifier normalised to text so `17` and `"17"` dedup together.
    pub fn id_key(&self) -> Option<String> {
        self.id.as_ref().and_then(value_to_string)
    }

    pub fn action(&self) -> Option<Action> {
        self.action
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| Action::try_from(s).ok())
    }

    pub fn token_id(&self) -> Option<String> {
        self.token
            .as_ref()
            .and_then(|token| token.get("id"))
            .and_then(value_to_string)
    }

    pub fn is_for_token(&self, token_id: &str) -> bool {
        self.token_id().as_deref() == Some(token_id)
    }

    /// `Ok(None)` for a missing or non-integer amount, `Err` for one too
    /// large to hold.
    pub fn quantity(&self) -> Result<Option<i128>, PlnError> {
        integer_from_value(self.amount_token.as_ref())
    }

    pub fn btc_amount(&self) -> Result<Option<i128>, PlnError> {
        integer_from_value(self.amount_btc.as_ref())
    }

    pub fn timestamp(&self) -> TradeTime {
        TradeTime::from_value(self.time.as_ref())
    }
}

/// Sort key for the `time` field, which the API may send as epoch seconds,
/// epoch milliseconds or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeTime {
    Missing,
    Unparsed(String),
    At(DateTime<Utc>),
}

impl TradeTime {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => TradeTime::Missing,
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(float_to_epoch))
                .and_then(epoch_to_datetime)
                .map(TradeTime::At)
                .unwrap_or_else(|| TradeTime::Unparsed(n.to_string())),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(epoch) = trimmed.parse::<i64>() {
                    if let Some(dt) = epoch_to_datetime(epoch) {
                        return TradeTime::At(dt);
                    }
                }
                parse_datetime_text(trimmed)
                    .map(TradeTime::At)
                    .unwrap_or_else(|| TradeTime::Unparsed(trimmed.to_string()))
            }
            Some(other) => TradeTime::Unparsed(other.to_string()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            TradeTime::Missing => 0,
            TradeTime::Unparsed(_) => 1,
            TradeTime::At(_) => 2,
        }
    }
}

impl PartialOrd for TradeTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Missing times sort first, like an empty string would.
impl Ord for TradeTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (TradeTime::At(a), TradeTime::At(b)) => a.cmp(b),
            (TradeTime::Unparsed(a), TradeTime::Unparsed(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Decoded body of one `/user/{id}/activity` response.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPage {
    pub data: Option<Vec<Value>>,
    pub limit: Option<usize>,
}

impl ActivityPage {
    /// A missing, non-array `data` field is reported as `None`.
    pub fn from_response(response: &Value) -> Self {
        ActivityPage {
            data: response.get("data").and_then(Value::as_array).cloned(),
            limit: response
                .get("limit")
                .and_then(Value::as_u64)
                .and_then(|limit| usize::try_from(limit).ok())
                .filter(|limit| *limit > 0),
        }
    }
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whole numbers only: `"100"`, `100` and `100.0` parse, `"1.5"` and `"abc"` do not.
fn integer_from_value(value: Option<&Value>) -> Result<Option<i128>, PlnError> {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i128::from(i)));
            }
            if let Some(u) = n.as_u64() {
                return Ok(Some(i128::from(u)));
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => {
                    // 2^127 is the first float outside the i128 range.
                    if f.abs() < i128::MAX as f64 {
                        Ok(Some(f as i128))
                    } else {
                        Err(PlnError::Overflow("trade amount"))
                    }
                }
                _ => Ok(None),
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i128>() {
            Ok(i) => Ok(Some(i)),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    Err(PlnError::Overflow("trade amount"))
                }
                _ => Ok(None),
            },
        },
        _ => Ok(None),
    }
}

/// Fractional epochs are truncated to whole seconds.
fn float_to_epoch(f: f64) -> Option<i64> {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn epoch_to_datetime(epoch: i64) -> Option<DateTime<Utc>> {
    // Anything past year ~33658 in seconds is assumed to be milliseconds.
    if epoch.abs() >= 1_000_000_000_000 {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

fn parse_datetime_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    None
}
