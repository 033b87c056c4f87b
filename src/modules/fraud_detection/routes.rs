use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use super::store::{
    self, AlertFilter, FraudAlert, FraudAlertCreate, FraudCase, FraudCaseCreate, FraudCaseUpdate,
    FraudRule, FraudRuleCreate, FraudStats,
};
use super::FraudConfig;
use crate::api::AppState;
use crate::Result;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cases", get(list_cases).post(create_case))
        .route("/cases/:case_id", get(get_case).put(update_case))
        .route("/alerts", get(list_alerts).post(create_alert))
        .route("/rules", get(list_rules).post(create_rule))
        .route("/stats", get(stats))
}

#[derive(Debug, Deserialize)]
struct CaseListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlertListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
    case_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RuleListQuery {
    skip: Option<u32>,
    limit: Option<u32>,
    enabled: Option<bool>,
}

async fn list_cases(
    State(state): State<AppState>,
    Query(query): Query<CaseListQuery>,
) -> Result<Json<Vec<FraudCase>>> {
    let page = state.page(query.skip, query.limit)?;
    let status = query.status.filter(|s| !s.is_empty());
    let cases = state
        .db
        .with_connection(move |conn| store::list_cases(conn, status.as_deref(), page))
        .await?;
    Ok(Json(cases))
}

async fn create_case(
    State(state): State<AppState>,
    Extension(config): Extension<FraudConfig>,
    Json(input): Json<FraudCaseCreate>,
) -> Result<(StatusCode, Json<FraudCase>)> {
    let prefix = config.case_number_prefix;
    let created = state
        .db
        .with_connection(move |conn| {
            // Numbering reads the count, so it shares a transaction with the insert
            let tx = conn.transaction()?;
            let created = store::create_case(&tx, &prefix, &input)?;
            tx.commit()?;
            Ok(created)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<i64>,
) -> Result<Json<FraudCase>> {
    let found = state
        .db
        .with_connection(move |conn| store::get_case(conn, case_id))
        .await?;
    Ok(Json(found))
}

async fn update_case(
    State(state): State<AppState>,
    Path(case_id): Path<i64>,
    Json(input): Json<FraudCaseUpdate>,
) -> Result<Json<FraudCase>> {
    let updated = state
        .db
        .with_connection(move |conn| store::update_case(conn, case_id, &input))
        .await?;
    Ok(Json(updated))
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<Vec<FraudAlert>>> {
    let page = state.page(query.skip, query.limit)?;
    let filter = AlertFilter {
        status: query.status.filter(|s| !s.is_empty()),
        case_id: query.case_id,
    };
    let alerts = state
        .db
        .with_connection(move |conn| store::list_alerts(conn, &filter, page))
        .await?;
    Ok(Json(alerts))
}

async fn create_alert(
    State(state): State<AppState>,
    Json(input): Json<FraudAlertCreate>,
) -> Result<(StatusCode, Json<FraudAlert>)> {
    let created = state
        .db
        .with_connection(move |conn| store::create_alert(conn, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<RuleListQuery>,
) -> Result<Json<Vec<FraudRule>>> {
    let page = state.page(query.skip, query.limit)?;
    let rules = state
        .db
        .with_connection(move |conn| store::list_rules(conn, query.enabled, page))
        .await?;
    Ok(Json(rules))
}

async fn create_rule(
    State(state): State<AppState>,
    Json(input): Json<FraudRuleCreate>,
) -> Result<(StatusCode, Json<FraudRule>)> {
    let created = state
        .db
        .with_connection(move |conn| store::create_rule(conn, &input))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn stats(State(state): State<AppState>) -> Result<Json<FraudStats>> {
    let stats = state.db.with_connection(|conn| store::stats(conn)).await?;
    Ok(Json(stats))
}
