use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::providers::{NormalizedRecord, PlatformKind};
use crate::store::RecordQuery;

/// Dashboard period selector. Fixed periods end at the filter's `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "7dias")]
    SevenDays,
    #[default]
    #[serde(rename = "30dias")]
    ThirtyDays,
    #[serde(rename = "90dias")]
    NinetyDays,
    #[serde(rename = "todos")]
    All,
    /// Both ends inclusive.
    #[serde(skip)]
    Custom {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl Period {
    fn days(self) -> Option<i64> {
        match self {
            Period::SevenDays => Some(7),
            Period::ThirtyDays => Some(30),
            Period::NinetyDays => Some(90),
            Period::All | Period::Custom { .. } => None,
        }
    }

    /// Inclusive `(from, to)` bounds relative to `now`.
    pub fn bounds(self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            Period::Custom { from, to } => (Some(from), Some(to)),
            Period::All => (None, None),
            fixed => {
                let days = fixed.days().unwrap_or_default();
                (Some(now - Duration::days(days)), Some(now))
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::SevenDays => f.write_str("7dias"),
            Period::ThirtyDays => f.write_str("30dias"),
            Period::NinetyDays => f.write_str("90dias"),
            Period::All => f.write_str("todos"),
            Period::Custom { from, to } => write!(f, "{}..{}", from.to_rfc3339(), to.to_rfc3339()),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "7dias" | "7d" => Ok(Period::SevenDays),
            "30dias" | "30d" => Ok(Period::ThirtyDays),
            "90dias" | "90d" => Ok(Period::NinetyDays),
            "todos" | "all" => Ok(Period::All),
            other => Err(format!("unknown period: {other}")),
        }
    }
}

/// Record predicate for aggregation. `now` anchors the fixed periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsFilter {
    pub platform: Option<PlatformKind>,
    pub account_id: Option<String>,
    pub product_id: Option<String>,
    pub period: Period,
    pub now: DateTime<Utc>,
}

impl MetricsFilter {
    pub fn new(period: Period, now: DateTime<Utc>) -> Self {
        Self {
            platform: None,
            account_id: None,
            product_id: None,
            period,
            now,
        }
    }

    #[must_use]
    pub fn platform(mut self, platform: PlatformKind) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn matches(&self, record: &NormalizedRecord) -> bool {
        let (from, to) = self.period.bounds(self.now);
        self.platform.is_none_or(|p| record.platform == p)
            && self
                .account_id
                .as_deref()
                .is_none_or(|a| record.account_id == a)
            && self
                .product_id
                .as_deref()
                .is_none_or(|p| record.product_id.as_deref() == Some(p))
            && from.is_none_or(|from| record.timestamp >= from)
            && to.is_none_or(|to| record.timestamp <= to)
    }

    /// Same narrowing, pushed down to the store for `user_id`.
    pub fn to_query(&self, user_id: &str) -> RecordQuery {
        let (from, to) = self.period.bounds(self.now);
        RecordQuery {
            user_id: user_id.to_string(),
            platform: self.platform,
            account_id: self.account_id.clone(),
            product_id: self.product_id.clone(),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::NormalizedMetrics;
    use chrono::TimeZone;

    fn record_at(ts: DateTime<Utc>) -> NormalizedRecord {
        NormalizedRecord {
            user_id: "u".into(),
            platform: PlatformKind::Hotmart,
            account_id: "acc".into(),
            product_id: Some("p1".into()),
            timestamp: ts,
            window_end: ts + Duration::days(1),
            synced_at: ts,
            metrics: NormalizedMetrics::default(),
        }
    }

    #[test]
    fn fixed_periods_have_an_inclusive_lower_bound() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let filter = MetricsFilter::new(Period::SevenDays, now);

        assert!(filter.matches(&record_at(now - Duration::days(7))));
        assert!(!filter.matches(&record_at(now - Duration::days(7) - Duration::seconds(1))));
        assert!(filter.matches(&record_at(now)));
        assert!(!filter.matches(&record_at(now + Duration::seconds(1))));
    }

    #[test]
    fn todos_has_no_bounds_and_custom_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let old = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert!(MetricsFilter::new(Period::All, now).matches(&record_at(old)));

        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let custom = MetricsFilter::new(Period::Custom { from, to }, now);
        assert!(custom.matches(&record_at(from)));
        assert!(custom.matches(&record_at(to)));
        assert!(!custom.matches(&record_at(to + Duration::seconds(1))));
    }

    #[test]
    fn product_filter_requires_equal_product() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let mut record = record_at(now);
        let filter = MetricsFilter::new(Period::All, now).product("p1");
        assert!(filter.matches(&record));

        record.product_id = None;
        assert!(!filter.matches(&record));
    }

    #[test]
    fn period_parses_dashboard_ids() {
        assert_eq!("7dias".parse::<Period>(), Ok(Period::SevenDays));
        assert_eq!(" 90DIAS ".parse::<Period>(), Ok(Period::NinetyDays));
        assert_eq!("todos".parse::<Period>(), Ok(Period::All));
        assert!("semana".parse::<Period>().is_err());
    }
}
