use super::parse_platform;
use crate::error::PainelError;
use crate::metrics::{
    AggregatedMetrics, DailyPoint, MetricsFilter, Period, aggregate, aggregate_by_platform,
    daily_series,
};
use crate::providers::{NormalizedRecord, PlatformKind};
use crate::server::guards::auth::VerifiedUser;
use crate::server::router::PainelState;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

pub fn router() -> Router<PainelState> {
    Router::new()
        .route("/dashboard/metrics", get(metrics_handler))
        .route("/dashboard/metrics/platforms", get(platforms_handler))
        .route("/dashboard/metrics/daily", get(daily_handler))
}

/// `?periodo=7dias|30dias|90dias|todos&plataforma=&conta=&produto=`, or `de`/`ate`
/// (RFC 3339) for a custom range.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub periodo: Option<String>,
    pub plataforma: Option<String>,
    pub conta: Option<String>,
    pub produto: Option<String>,
    pub de: Option<DateTime<Utc>>,
    pub ate: Option<DateTime<Utc>>,
}

impl DashboardQuery {
    fn period(&self) -> Result<Period, PainelError> {
        match (self.de, self.ate) {
            (Some(from), Some(to)) if from <= to => return Ok(Period::Custom { from, to }),
            (Some(_), Some(_)) => {
                return Err(PainelError::BadRequest("`de` must not be after `ate`".into()));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(PainelError::BadRequest(
                    "custom range needs both `de` and `ate`".into(),
                ));
            }
            (None, None) => {}
        }
        match self.periodo.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => raw.parse().map_err(PainelError::BadRequest),
            None => Ok(Period::default()),
        }
    }

    pub fn into_filter(self, now: DateTime<Utc>) -> Result<MetricsFilter, PainelError> {
        let mut filter = MetricsFilter::new(self.period()?, now);
        if let Some(platform) = non_empty(self.plataforma.as_deref()) {
            filter = filter.platform(parse_platform(platform)?);
        }
        if let Some(account) = non_empty(self.conta.as_deref()) {
            filter = filter.account(account);
        }
        if let Some(product) = non_empty(self.produto.as_deref()) {
            filter = filter.product(product);
        }
        Ok(filter)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != "todas")
}

async fn load(
    state: &PainelState,
    user_id: &str,
    query: DashboardQuery,
) -> Result<(Vec<NormalizedRecord>, MetricsFilter), PainelError> {
    let filter = query.into_filter(Utc::now())?;
    let records = state
        .orchestrator
        .store()
        .list_records(&filter.to_query(user_id))
        .await?;
    debug!(user_id, period = %filter.period, records = records.len(), "Dashboard records loaded");
    Ok((records, filter))
}

async fn metrics_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<AggregatedMetrics>, PainelError> {
    let (records, filter) = load(&state, &user_id, query).await?;
    if !records.iter().any(|r| filter.matches(r)) {
        return Err(PainelError::NoMetrics);
    }
    Ok(Json(aggregate(&records, &filter)))
}

async fn platforms_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<BTreeMap<PlatformKind, AggregatedMetrics>>, PainelError> {
    let (records, filter) = load(&state, &user_id, query).await?;
    Ok(Json(aggregate_by_platform(&records, &filter)))
}

async fn daily_handler(
    State(state): State<PainelState>,
    VerifiedUser(user_id): VerifiedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Vec<DailyPoint>>, PainelError> {
    let (records, filter) = load(&state, &user_id, query).await?;
    Ok(Json(daily_series(&records, &filter)))
}
