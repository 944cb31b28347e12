//! Pure dashboard aggregation over stored records.

mod aggregate;
mod filter;

pub use aggregate::{
    AggregatedMetrics, DailyPoint, PaymentTotals, aggregate, aggregate_by_platform, daily_series,
};
pub use filter::{MetricsFilter, Period};
