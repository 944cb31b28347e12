use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::MetricsFilter;
use crate::providers::{NormalizedMetrics, NormalizedRecord, PaymentBreakdown, PlatformKind, units_from_cents};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub pix: f64,
    pub cartao: f64,
    pub boleto: f64,
    pub outros: f64,
}

/// Dashboard figures derived from a set of records. Amounts are currency units;
/// `roi`, `margemLucro`, `reembolso` and `chargeback` are percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    pub faturamento_liquido: f64,
    pub gastos_anuncios: f64,
    pub roas: f64,
    pub lucro: f64,
    pub vendas_pendentes: f64,
    pub vendas_reembolsadas: f64,
    pub imposto: f64,
    pub roi: f64,
    pub margem_lucro: f64,
    pub reembolso: f64,
    pub arpu: f64,
    pub chargeback: f64,
    pub pagamentos: PaymentTotals,
    pub total_vendas: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub faturamento: f64,
    pub gastos: f64,
    pub lucro: f64,
    pub roas: f64,
}

/// Exact running sums in cents.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    revenue: i64,
    ad_spend: i64,
    tax: i64,
    pending: i64,
    refunded: i64,
    transactions: u64,
    chargebacks: u64,
    payments: PaymentBreakdown,
}

impl Totals {
    fn add(&mut self, m: &NormalizedMetrics) {
        self.revenue = self.revenue.saturating_add(m.revenue_cents);
        self.ad_spend = self.ad_spend.saturating_add(m.ad_spend_cents);
        self.tax = self.tax.saturating_add(m.tax_cents);
        self.pending = self.pending.saturating_add(m.pending_amount_cents);
        self.refunded = self.refunded.saturating_add(m.refunded_amount_cents);
        self.transactions = self.transactions.saturating_add(m.transaction_count);
        self.chargebacks = self.chargebacks.saturating_add(m.chargeback_count);
        self.payments.merge(&m.payments);
    }

    fn profit(&self) -> i64 {
        self.revenue
            .saturating_sub(self.ad_spend)
            .saturating_sub(self.tax)
    }

    fn finish(&self) -> AggregatedMetrics {
        let lucro = self.profit();
        AggregatedMetrics {
            faturamento_liquido: units_from_cents(self.revenue),
            gastos_anuncios: units_from_cents(self.ad_spend),
            roas: ratio(self.revenue as f64, self.ad_spend as f64),
            lucro: units_from_cents(lucro),
            vendas_pendentes: units_from_cents(self.pending),
            vendas_reembolsadas: units_from_cents(self.refunded),
            imposto: units_from_cents(self.tax),
            roi: 100.0 * ratio(lucro as f64, self.ad_spend as f64),
            margem_lucro: 100.0 * ratio(lucro as f64, self.revenue as f64),
            reembolso: 100.0 * ratio(self.refunded as f64, self.revenue as f64),
            arpu: ratio(units_from_cents(self.revenue), self.transactions as f64),
            chargeback: 100.0 * ratio(self.chargebacks as f64, self.transactions as f64),
            pagamentos: PaymentTotals {
                pix: units_from_cents(self.payments.pix_cents),
                cartao: units_from_cents(self.payments.card_cents),
                boleto: units_from_cents(self.payments.boleto_cents),
                outros: units_from_cents(self.payments.other_cents),
            },
            total_vendas: self.transactions,
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Sums every record matching `filter`. Empty input yields all zeros.
pub fn aggregate(records: &[NormalizedRecord], filter: &MetricsFilter) -> AggregatedMetrics {
    let mut totals = Totals::default();
    for record in records.iter().filter(|r| filter.matches(r)) {
        totals.add(&record.metrics);
    }
    totals.finish()
}

/// One aggregate per platform present in the filtered set.
pub fn aggregate_by_platform(
    records: &[NormalizedRecord],
    filter: &MetricsFilter,
) -> BTreeMap<PlatformKind, AggregatedMetrics> {
    let mut per_platform: BTreeMap<PlatformKind, Totals> = BTreeMap::new();
    for record in records.iter().filter(|r| filter.matches(r)) {
        per_platform
            .entry(record.platform)
            .or_default()
            .add(&record.metrics);
    }
    per_platform
        .into_iter()
        .map(|(platform, totals)| (platform, totals.finish()))
        .collect()
}

/// Per UTC day of the record timestamp, ascending.
pub fn daily_series(records: &[NormalizedRecord], filter: &MetricsFilter) -> Vec<DailyPoint> {
    let mut per_day: BTreeMap<NaiveDate, Totals> = BTreeMap::new();
    for record in records.iter().filter(|r| filter.matches(r)) {
        per_day
            .entry(record.timestamp.date_naive())
            .or_default()
            .add(&record.metrics);
    }
    per_day
        .into_iter()
        .map(|(date, totals)| DailyPoint {
            date,
            faturamento: units_from_cents(totals.revenue),
            gastos: units_from_cents(totals.ad_spend),
            lucro: units_from_cents(totals.profit()),
            roas: ratio(totals.revenue as f64, totals.ad_spend as f64),
        })
        .collect()
}
