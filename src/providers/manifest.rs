use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Facebook,
    Hotmart,
    PerfectPay,
    MercadoPago,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 4] = [
        PlatformKind::Facebook,
        PlatformKind::Hotmart,
        PlatformKind::PerfectPay,
        PlatformKind::MercadoPago,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlatformKind::Facebook => "facebook",
            PlatformKind::Hotmart => "hotmart",
            PlatformKind::PerfectPay => "perfectpay",
            PlatformKind::MercadoPago => "mercadopago",
        }
    }

    /// Parses a platform id case-insensitively, accepting the legacy aliases.
    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "facebook" | "facebook_ads" | "fb" => Some(PlatformKind::Facebook),
            "hotmart" => Some(PlatformKind::Hotmart),
            "perfectpay" | "perfect_pay" => Some(PlatformKind::PerfectPay),
            "mercadopago" | "mercado_pago" => Some(PlatformKind::MercadoPago),
            _ => None,
        }
    }

    /// Credential keys that must be present and non-empty before any network call.
    pub fn required_credentials(self) -> &'static [&'static str] {
        match self {
            PlatformKind::Facebook | PlatformKind::MercadoPago => &["access_token"],
            PlatformKind::Hotmart => &["client_id", "client_secret"],
            PlatformKind::PerfectPay => &["api_token"],
        }
    }

    /// Optional credential key that scopes a connection to a single product.
    pub fn product_scope_key(self) -> Option<&'static str> {
        match self {
            PlatformKind::Hotmart => Some("product_id"),
            PlatformKind::PerfectPay => Some("product_code"),
            PlatformKind::Facebook | PlatformKind::MercadoPago => None,
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlatformKind::parse(s).ok_or_else(|| AdapterError::UnsupportedPlatform(s.to_string()))
    }
}

/// Opaque platform credentials. `Debug` prints key names only.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformCredentials(BTreeMap<String, String>);

impl PlatformCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Trimmed value of `key`, `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, platform: PlatformKind, key: &'static str) -> Result<&str, AdapterError> {
        self.get(key)
            .ok_or(AdapterError::InvalidCredentials { platform, key })
    }

    /// Checks every key `platform` declares as required.
    pub fn validate_for(&self, platform: PlatformKind) -> Result<(), AdapterError> {
        for key in platform.required_credentials() {
            self.require(platform, key)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlatformCredentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Remote account details reported by a successful `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Duration,
}

impl CallOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Half-open time range `[start, end)` covered by one sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// The UTC calendar day containing `instant`.
    pub fn day_of(instant: DateTime<Utc>) -> Self {
        let start = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            start,
            end: start + ChronoDuration::days(1),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Inclusive last second of the window, for date or second granular APIs.
    pub fn last_second(&self) -> DateTime<Utc> {
        self.end - ChronoDuration::seconds(1)
    }

    /// Inclusive last millisecond of the window, for APIs taking millisecond timestamps.
    pub fn last_millisecond(&self) -> DateTime<Utc> {
        self.end - ChronoDuration::milliseconds(1)
    }

    /// Whether the window is exactly one UTC calendar day.
    pub fn is_utc_day(&self) -> bool {
        *self == Self::day_of(self.start)
    }

    /// UTC calendar days touched by the window, in order.
    pub fn days(&self) -> impl Iterator<Item = SyncWindow> + use<> {
        let last = Self::day_of(self.end - ChronoDuration::nanoseconds(1)).start;
        std::iter::successors(Some(Self::day_of(self.start)), |day| {
            Some(Self::day_of(day.end))
        })
        .take_while(move |day| day.start <= last)
    }
}

pub struct ConnectRequest<'a> {
    pub credentials: &'a PlatformCredentials,
    pub account_id: &'a str,
    pub call: CallOptions,
}

pub struct FetchRequest<'a> {
    pub credentials: &'a PlatformCredentials,
    pub account_id: &'a str,
    pub window: SyncWindow,
    pub call: CallOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Pix,
    Card,
    Boleto,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    pub pix_cents: i64,
    pub card_cents: i64,
    pub boleto_cents: i64,
    pub other_cents: i64,
}

impl PaymentBreakdown {
    pub fn add(&mut self, method: PaymentMethod, cents: i64) {
        let slot = match method {
            PaymentMethod::Pix => &mut self.pix_cents,
            PaymentMethod::Card => &mut self.card_cents,
            PaymentMethod::Boleto => &mut self.boleto_cents,
            PaymentMethod::Other => &mut self.other_cents,
        };
        *slot += cents;
    }

    pub fn merge(&mut self, other: &PaymentBreakdown) {
        self.pix_cents += other.pix_cents;
        self.card_cents += other.card_cents;
        self.boleto_cents += other.boleto_cents;
        self.other_cents += other.other_cents;
    }
}

/// Adapter output for one account and one window. Amounts are in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetrics {
    pub revenue_cents: i64,
    pub ad_spend_cents: i64,
    pub transaction_count: u64,
    pub refunded_amount_cents: i64,
    pub refunded_count: u64,
    pub chargeback_count: u64,
    pub pending_amount_cents: i64,
    pub pending_count: u64,
    pub tax_cents: i64,
    pub payments: PaymentBreakdown,
    /// Some remote fields were missing or unparseable and were counted as zero.
    pub partial: bool,
}

impl NormalizedMetrics {
    /// Adds one approved sale. A missing amount counts the sale with zero value.
    pub fn record_sale(&mut self, amount: Option<f64>, method: PaymentMethod) {
        let cents = self.cents_or_partial(amount);
        self.revenue_cents += cents;
        self.transaction_count += 1;
        self.payments.add(method, cents);
    }

    pub fn record_refund(&mut self, amount: Option<f64>) {
        self.refunded_amount_cents += self.cents_or_partial(amount);
        self.refunded_count += 1;
    }

    pub fn record_chargeback(&mut self) {
        self.chargeback_count += 1;
    }

    pub fn record_pending(&mut self, amount: Option<f64>) {
        self.pending_amount_cents += self.cents_or_partial(amount);
        self.pending_count += 1;
    }

    pub fn record_tax(&mut self, amount: Option<f64>) {
        // Absent tax is the common case, not missing data.
        if let Some(cents) = amount.and_then(cents_from_units) {
            self.tax_cents += cents;
        }
    }

    pub fn record_ad_spend(&mut self, amount: Option<f64>) {
        self.ad_spend_cents += self.cents_or_partial(amount);
    }

    pub fn mark_partial(&mut self) {
        self.partial = true;
    }

    fn cents_or_partial(&mut self, amount: Option<f64>) -> i64 {
        if let Some(cents) = amount.and_then(cents_from_units) {
            cents
        } else {
            self.partial = true;
            0
        }
    }
}

/// Converts currency units to centavos, rounding half away from zero.
#[allow(clippy::cast_possible_truncation)]
pub fn cents_from_units(value: f64) -> Option<i64> {
    let scaled = (value * 100.0).round();
    (scaled.is_finite() && scaled.abs() < 9.0e15).then_some(scaled as i64)
}

pub fn units_from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// One stored sync result, keyed by `(user_id, platform, account_id, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub user_id: String,
    pub platform: PlatformKind,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Window start.
    pub timestamp: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
    pub metrics: NormalizedMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn platform_ids_parse_with_aliases() {
        assert_eq!(PlatformKind::parse("FB"), Some(PlatformKind::Facebook));
        assert_eq!(PlatformKind::parse("facebook_ads"), Some(PlatformKind::Facebook));
        assert_eq!(PlatformKind::parse(" Mercado_Pago "), Some(PlatformKind::MercadoPago));
        assert_eq!(PlatformKind::parse("perfect_pay"), Some(PlatformKind::PerfectPay));
        assert_eq!(PlatformKind::parse("kiwify"), None);
        assert!(matches!(
            "kiwify".parse::<PlatformKind>(),
            Err(AdapterError::UnsupportedPlatform(id)) if id == "kiwify"
        ));
    }

    #[test]
    fn credentials_debug_hides_values() {
        let creds = PlatformCredentials::new()
            .with("client_id", "abc")
            .with("client_secret", "super-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("client_secret"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn blank_credentials_are_missing() {
        let creds = PlatformCredentials::new().with("access_token", "   ");
        assert!(matches!(
            creds.validate_for(PlatformKind::Facebook),
            Err(AdapterError::InvalidCredentials { key: "access_token", .. })
        ));
    }

    #[test]
    fn day_window_covers_utc_calendar_day() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 10, 17, 45, 0).unwrap();
        let window = SyncWindow::day_of(instant);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap());
        assert!(window.contains(instant));
        assert!(!window.contains(window.end));
        assert!(SyncWindow::new(window.end, window.start).is_none());
        assert!(window.is_utc_day());
        assert_eq!(
            window.last_millisecond(),
            Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap() + ChronoDuration::milliseconds(999)
        );
    }

    #[test]
    fn range_splits_into_touched_utc_days() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let whole = SyncWindow::new(start, start + ChronoDuration::days(2)).unwrap();
        assert!(!whole.is_utc_day());
        let days: Vec<_> = whole.days().map(|d| d.start).collect();
        assert_eq!(days, vec![start, start + ChronoDuration::days(1)]);

        let ragged = SyncWindow::new(
            start + ChronoDuration::hours(20),
            start + ChronoDuration::days(1) + ChronoDuration::hours(1),
        )
        .unwrap();
        assert!(!ragged.is_utc_day());
        let days: Vec<_> = ragged.days().collect();
        assert_eq!(days.len(), 2);
        assert!(days.iter().all(SyncWindow::is_utc_day));
    }

    #[test]
    fn cents_round_half_away_from_zero() {
        assert_eq!(cents_from_units(10.125), Some(1013));
        assert_eq!(cents_from_units(-0.125), Some(-13));
        assert_eq!(cents_from_units(19.9), Some(1990));
        assert_eq!(cents_from_units(f64::NAN), None);
    }

    #[test]
    fn missing_amounts_count_as_zero_and_flag_partial() {
        let mut metrics = NormalizedMetrics::default();
        metrics.record_sale(Some(97.0), PaymentMethod::Pix);
        assert!(!metrics.partial);
        metrics.record_sale(None, PaymentMethod::Card);
        assert!(metrics.partial);
        assert_eq!(metrics.transaction_count, 2);
        assert_eq!(metrics.revenue_cents, 9700);
        assert_eq!(metrics.payments.pix_cents, 9700);
        assert_eq!(metrics.payments.card_cents, 0);
    }
}
