// =============================================================================
// Shared types used across the forecasting engine
// =============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::trace;

/// The two categories every outcome reduces to: digits 0..=4 are SMALL,
/// 5..=9 are BIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Big,
    Small,
}

impl Category {
    /// Map a raw outcome digit to its category. Digits above 9 are rejected.
    pub fn from_outcome(outcome: u8) -> Option<Self> {
        match outcome {
            0..=4 => Some(Self::Small),
            5..=9 => Some(Self::Big),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Big => Self::Small,
            Self::Small => Self::Big,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Big => write!(f, "BIG"),
            Self::Small => write!(f, "SMALL"),
        }
    }
}

/// Settlement status of a recorded period.
///
/// Parsed case-insensitively. Anything unrecognised reads as `Pending`, so
/// the record is kept but never counted as confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordStatus {
    Win,
    Loss,
    Pending,
}

impl RecordStatus {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("win") {
            Self::Win
        } else if raw.eq_ignore_ascii_case("loss") {
            Self::Loss
        } else {
            Self::Pending
        }
    }
}

impl<'de> Deserialize<'de> for RecordStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Self::parse).unwrap_or_default())
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One period of history as supplied by the caller (newest first).
///
/// The outcome is kept as raw JSON so that a malformed value (a string, an
/// out-of-range number) filters the record out instead of failing the whole
/// batch at deserialisation time. Periods may arrive as strings or numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "lenient_period")]
    pub period: String,
    #[serde(default)]
    pub outcome: Option<serde_json::Value>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl HistoryRecord {
    pub fn new(period: impl Into<String>, outcome: u8, status: RecordStatus) -> Self {
        Self {
            period: period.into(),
            outcome: Some(serde_json::Value::from(outcome)),
            status,
        }
    }

    pub fn pending(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            outcome: None,
            status: RecordStatus::Pending,
        }
    }

    /// Parsed outcome digit. Accepts JSON numbers and numeric strings.
    pub fn outcome_digit(&self) -> Option<u8> {
        let value = self.outcome.as_ref()?;
        let digit = match value {
            serde_json::Value::Number(n) => n.as_u64()?,
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
            _ => return None,
        };
        if digit <= 9 {
            Some(digit as u8)
        } else {
            None
        }
    }

    /// A record is confirmed when it has settled and carries a valid digit.
    pub fn is_confirmed(&self) -> bool {
        self.status != RecordStatus::Pending && self.outcome_digit().is_some()
    }

    pub fn category(&self) -> Option<Category> {
        self.outcome_digit().and_then(Category::from_outcome)
    }
}

fn lenient_period<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Deserialise a history array, dropping entries that are not records at
/// all instead of rejecting the batch.
pub fn lenient_records<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<HistoryRecord>, D::Error> {
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let records: Vec<HistoryRecord> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    if records.len() < total {
        trace!(dropped = total - records.len(), "History: unreadable entries dropped");
    }
    Ok(records)
}

/// Numeric and categorical view of the confirmed history, newest first.
///
/// This is the only history shape the indicator, regime and signal layers
/// ever see; pending and malformed records are dropped on construction.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSeries {
    pub values: Vec<f64>,
    pub categories: Vec<Category>,
    pub periods: Vec<String>,
}

impl OutcomeSeries {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let mut series = Self::default();
        for record in records.iter().filter(|r| r.is_confirmed()) {
            let Some(digit) = record.outcome_digit() else {
                continue;
            };
            let Some(category) = Category::from_outcome(digit) else {
                continue;
            };
            series.values.push(f64::from(digit));
            series.categories.push(category);
            series.periods.push(record.period.clone());
        }
        series
    }

    /// Build directly from digits (newest first). Digits above 9 are skipped.
    #[cfg(test)]
    pub fn from_digits(digits: &[u8]) -> Self {
        let records: Vec<HistoryRecord> = digits
            .iter()
            .enumerate()
            .map(|(i, &d)| HistoryRecord::new(format!("{i}"), d, RecordStatus::Win))
            .collect();
        Self::from_records(&records)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest_category(&self) -> Option<Category> {
        self.categories.first().copied()
    }
}

/// Increment the trailing digits of a period identifier, preserving width.
///
/// `"20240101001"` becomes `"20240101002"`; identifiers without trailing
/// digits yield `None`.
pub fn next_period_id(period: &str) -> Option<String> {
    let digit_start = period
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let (prefix, digits) = period.split_at(digit_start);
    let mut bytes: Vec<u8> = digits.bytes().collect();

    // Manual carry so arbitrarily long identifiers never overflow.
    let mut idx = bytes.len();
    loop {
        if idx == 0 {
            bytes.insert(0, b'1');
            break;
        }
        idx -= 1;
        if bytes[idx] == b'9' {
            bytes[idx] = b'0';
        } else {
            bytes[idx] += 1;
            break;
        }
    }

    let incremented = String::from_utf8(bytes).ok()?;
    Some(format!("{prefix}{incremented}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(Category::from_outcome(0), Some(Category::Small));
        assert_eq!(Category::from_outcome(4), Some(Category::Small));
        assert_eq!(Category::from_outcome(5), Some(Category::Big));
        assert_eq!(Category::from_outcome(9), Some(Category::Big));
        assert_eq!(Category::from_outcome(10), None);
        assert_eq!(Category::Big.opposite(), Category::Small);
    }

    #[test]
    fn malformed_records_are_filtered() {
        let records: Vec<HistoryRecord> = serde_json::from_str(
            r#"[
                {"period": "5", "outcome": 7, "status": "Win"},
                {"period": "4", "outcome": "3", "status": "Loss"},
                {"period": "3", "outcome": "x", "status": "Win"},
                {"period": "2", "outcome": 12, "status": "Win"},
                {"period": "1", "status": "Win"},
                {"period": "0", "outcome": 6, "status": "Pending"}
            ]"#,
        )
        .unwrap();
        let series = OutcomeSeries::from_records(&records);
        assert_eq!(series.values, vec![7.0, 3.0]);
        assert_eq!(series.categories, vec![Category::Big, Category::Small]);
        assert_eq!(series.periods, vec!["5".to_string(), "4".to_string()]);
    }

    #[test]
    fn loose_periods_and_statuses_do_not_sink_the_batch() {
        let records: Vec<HistoryRecord> = serde_json::from_str(
            r#"[
                {"period": "4", "outcome": 7, "status": "Win"},
                {"period": 3, "outcome": 2, "status": "WIN"},
                {"period": "2", "outcome": 8, "status": "settled"},
                {"period": null, "outcome": 1, "status": 5}
            ]"#,
        )
        .unwrap();
        assert_eq!(records[1].period, "3");
        assert_eq!(records[1].status, RecordStatus::Win);
        assert_eq!(records[2].status, RecordStatus::Pending);
        assert_eq!(records[3].period, "");

        let series = OutcomeSeries::from_records(&records);
        assert_eq!(series.values, vec![7.0, 2.0]);
        assert_eq!(series.periods, vec!["4".to_string(), "3".to_string()]);
    }

    #[test]
    fn category_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&Category::Big).unwrap(), "\"BIG\"");
        let c: Category = serde_json::from_str("\"SMALL\"").unwrap();
        assert_eq!(c, Category::Small);
    }

    #[test]
    fn next_period_increments_with_carry() {
        assert_eq!(next_period_id("20240101001").as_deref(), Some("20240101002"));
        assert_eq!(next_period_id("P-0099").as_deref(), Some("P-0100"));
        assert_eq!(next_period_id("999").as_deref(), Some("1000"));
        assert_eq!(next_period_id("abc"), None);
        assert_eq!(next_period_id(""), None);
    }
}
