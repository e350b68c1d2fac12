//! Market types from the Polymarket Gamma API and the local market cache.

use chrono::DateTime;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// Cache TTL for resolved market metadata.
pub const MARKET_CACHE_TTL_SECS: i64 = 86_400;

/// A market as returned by the Gamma API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub condition_id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub question: String,
    /// RFC 3339 end date; empty when the market has none.
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub volume_num: Decimal,
    #[serde(default)]
    pub liquidity_num: Decimal,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub closed: bool,
    /// Outcome labels; the API serializes these either as a JSON array or a
    /// delimited string, sometimes double-encoded.
    #[serde(default)]
    pub outcomes: StringList,
    #[serde(default)]
    pub outcome_prices: StringList,
}

impl GammaMarket {
    /// The end date as Unix seconds, when present and parseable.
    pub fn end_date_ts(&self) -> Option<i64> {
        if self.end_date.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(&self.end_date)
            .ok()
            .map(|dt| dt.timestamp())
    }
}

/// A list the upstream serializes either as a JSON array of strings or as a
/// single delimited string. Elements are trimmed on parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a raw string form: a JSON-encoded array when it looks like one,
    /// otherwise comma-delimited.
    pub fn parse_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self(Vec::new());
        }

        if trimmed.starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
                return Self(items.iter().map(|s| s.trim().to_string()).collect());
            }
        }

        Self(
            trimmed
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Self(Vec::new())),
            serde_json::Value::String(s) => Ok(Self::parse_raw(&s)),
            serde_json::Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        serde_json::Value::String(s) => out.push(s.trim().to_string()),
                        serde_json::Value::Number(n) => out.push(n.to_string()),
                        other => {
                            return Err(de::Error::custom(format!(
                                "unexpected list element: {other}"
                            )))
                        }
                    }
                }
                Ok(Self(out))
            }
            other => Err(de::Error::custom(format!(
                "expected string or array, got {other}"
            ))),
        }
    }
}

/// Resolved market metadata used by the trade pipeline.
#[derive(Debug, Clone, Default)]
pub struct MarketInfo {
    pub title: String,
    pub slug: String,
    pub url: String,
    pub category: String,
    /// Unix seconds; zero when unknown, which disables the temporal filter.
    pub end_date: i64,
    /// Zero when unknown, which disables the liquidity-ratio multiplier.
    pub liquidity: Decimal,
    pub volume: Decimal,
}

/// A `market_map` cache row.
#[derive(Debug, Clone)]
pub struct MarketMapEntry {
    pub condition_id: String,
    pub market_slug: String,
    pub market_title: String,
    pub market_url: String,
    pub category: String,
    pub end_date: i64,
    pub volume_num: Decimal,
    pub liquidity_num: Decimal,
    pub is_active: bool,
    pub updated_ts: i64,
}

impl MarketMapEntry {
    pub fn is_fresh(&self, now: i64) -> bool {
        now - self.updated_ts < MARKET_CACHE_TTL_SECS
    }

    pub fn to_info(&self) -> MarketInfo {
        MarketInfo {
            title: self.market_title.clone(),
            slug: self.market_slug.clone(),
            url: self.market_url.clone(),
            category: self.category.clone(),
            end_date: self.end_date,
            liquidity: self.liquidity_num,
            volume: self.volume_num,
        }
    }
}

/// A resolved market and its winning outcome.
#[derive(Debug, Clone)]
pub struct MarketResolution {
    pub condition_id: String,
    pub winning_outcome: String,
    pub resolved_ts: i64,
    pub market_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_list_accepts_json_array() {
        let list: StringList = serde_json::from_str(r#"["Yes", "No"]"#).unwrap();
        assert_eq!(list.0, vec!["Yes", "No"]);
    }

    #[test]
    fn string_list_accepts_delimited_string() {
        let list: StringList = serde_json::from_str(r#""Yes,No""#).unwrap();
        assert_eq!(list.0, vec!["Yes", "No"]);
    }

    #[test]
    fn string_list_accepts_double_encoded_array() {
        let list: StringList = serde_json::from_str(r#""[\"0.97\", \"0.03\"]""#).unwrap();
        assert_eq!(list.0, vec!["0.97", "0.03"]);
    }

    #[test]
    fn string_list_trims_whitespace() {
        let list = StringList::parse_raw(" Yes , No ");
        assert_eq!(list.0, vec!["Yes", "No"]);
    }

    #[test]
    fn string_list_empty_string_is_empty() {
        assert!(StringList::parse_raw("").is_empty());
        let list: StringList = serde_json::from_str("null").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn gamma_market_decodes_both_outcome_encodings() {
        let json = r#"{
            "conditionId": "0xcond",
            "slug": "who-wins",
            "question": "Who wins?",
            "endDate": "2026-09-01T12:00:00Z",
            "category": "Politics",
            "volumeNum": 120000.5,
            "liquidityNum": 40000.0,
            "active": true,
            "closed": false,
            "outcomes": ["Yes", "No"],
            "outcomePrices": "0.62,0.38"
        }"#;
        let market: GammaMarket = serde_json::from_str(json).unwrap();
        assert_eq!(market.outcomes.0, vec!["Yes", "No"]);
        assert_eq!(market.outcome_prices.0, vec!["0.62", "0.38"]);
        assert!(market.end_date_ts().unwrap() > 1_700_000_000);
    }

    #[test]
    fn end_date_parse_failures_are_none() {
        let market = GammaMarket {
            end_date: "not-a-date".into(),
            ..Default::default()
        };
        assert_eq!(market.end_date_ts(), None);
    }

    #[test]
    fn cache_entry_ttl() {
        let entry = MarketMapEntry {
            condition_id: "0xcond".into(),
            market_slug: "s".into(),
            market_title: "t".into(),
            market_url: "u".into(),
            category: String::new(),
            end_date: 0,
            volume_num: Decimal::ZERO,
            liquidity_num: Decimal::ZERO,
            is_active: true,
            updated_ts: 1_000_000,
        };
        assert!(entry.is_fresh(1_000_000 + MARKET_CACHE_TTL_SECS - 1));
        assert!(!entry.is_fresh(1_000_000 + MARKET_CACHE_TTL_SECS));
    }
}
