//! Fraud case, alert and rule records.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{OntographError, Result};
use crate::ontology::{
    check_length, deserialize_some, entities, now_timestamp, parse_json_column,
    parse_optional_timestamp, parse_timestamp, to_json_column, Page, Properties,
};

// ============================================================================
// Cases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudCase {
    pub id: i64,
    pub case_number: String,
    pub title: String,
    pub description: Option<String>,
    /// open, investigating or closed
    pub status: String,
    /// low, medium, high or critical
    pub priority: String,
    pub risk_score: f64,
    pub subject_entity_id: Option<i64>,
    pub fraud_type: Option<String>,
    pub detection_method: Option<String>,
    pub metadata: Properties,
    pub detected_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_case_status() -> String {
    "open".to_string()
}

fn default_level() -> String {
    "medium".to_string()
}

fn default_detection_method() -> Option<String> {
    Some("manual".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct FraudCaseCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_case_status")]
    pub status: String,
    #[serde(default = "default_level")]
    pub priority: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub subject_entity_id: Option<i64>,
    #[serde(default)]
    pub fraud_type: Option<String>,
    #[serde(default = "default_detection_method")]
    pub detection_method: Option<String>,
    #[serde(default)]
    pub metadata: Properties,
}

/// Partial update; absent fields are left unchanged and `null` clears
/// nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FraudCaseUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub risk_score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub subject_entity_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub fraud_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub detection_method: Option<Option<String>>,
    pub metadata: Option<Properties>,
}

impl FraudCaseUpdate {
    fn apply(&self, target: &mut FraudCase) -> Result<()> {
        if let Some(title) = &self.title {
            check_length("title", title, 500)?;
            target.title = title.clone();
        }
        if let Some(description) = &self.description {
            target.description = description.clone();
        }
        if let Some(status) = &self.status {
            target.status = status.clone();
        }
        if let Some(priority) = &self.priority {
            target.priority = priority.clone();
        }
        if let Some(risk_score) = self.risk_score {
            target.risk_score = risk_score;
        }
        if let Some(subject) = self.subject_entity_id {
            target.subject_entity_id = subject;
        }
        if let Some(fraud_type) = &self.fraud_type {
            target.fraud_type = fraud_type.clone();
        }
        if let Some(method) = &self.detection_method {
            target.detection_method = method.clone();
        }
        if let Some(metadata) = &self.metadata {
            target.metadata = metadata.clone();
        }
        if target.status == "closed" && target.closed_at.is_none() {
            target.closed_at = Some(Utc::now());
        }
        Ok(())
    }
}

const CASE_COLUMNS: &str = "id, case_number, title, description, status, priority, risk_score, \
     subject_entity_id, fraud_type, detection_method, metadata, detected_at, closed_at, \
     created_at, updated_at";

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<FraudCase> {
    Ok(FraudCase {
        id: row.get(0)?,
        case_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        risk_score: row.get(6)?,
        subject_entity_id: row.get(7)?,
        fraud_type: row.get(8)?,
        detection_method: row.get(9)?,
        metadata: parse_json_column(10, row.get(10)?)?,
        detected_at: parse_timestamp(11, row.get(11)?)?,
        closed_at: parse_optional_timestamp(12, row.get(12)?)?,
        created_at: parse_timestamp(13, row.get(13)?)?,
        updated_at: parse_optional_timestamp(14, row.get(14)?)?,
    })
}

fn case_not_found() -> OntographError {
    OntographError::NotFound("Fraud case not found".to_string())
}

fn check_subject(conn: &Connection, subject_entity_id: Option<i64>) -> Result<()> {
    if let Some(id) = subject_entity_id {
        if entities::find(conn, id)?.is_none() {
            return Err(OntographError::InvalidInput("Subject entity not found".to_string()));
        }
    }
    Ok(())
}

/// `<prefix>-NNNNNN`, numbered after the current case count.
pub fn next_case_number(conn: &Connection, prefix: &str) -> Result<String> {
    let count = count_cases(conn, None)?;
    Ok(format!("{}-{:06}", prefix, count + 1))
}

/// Newest first
pub fn list_cases(conn: &Connection, status: Option<&str>, page: Page) -> Result<Vec<FraudCase>> {
    let sql = format!(
        "SELECT {} FROM fraud_cases WHERE (?1 IS NULL OR status = ?1) \
         ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
        CASE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![status, page.limit as i64, page.skip as i64], case_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn find_case(conn: &Connection, id: i64) -> Result<Option<FraudCase>> {
    let sql = format!("SELECT {} FROM fraud_cases WHERE id = ?1", CASE_COLUMNS);
    Ok(conn.query_row(&sql, [id], case_from_row).optional()?)
}

pub fn get_case(conn: &Connection, id: i64) -> Result<FraudCase> {
    find_case(conn, id)?.ok_or_else(case_not_found)
}

pub fn create_case(conn: &Connection, prefix: &str, input: &FraudCaseCreate) -> Result<FraudCase> {
    check_length("title", &input.title, 500)?;
    check_subject(conn, input.subject_entity_id)?;

    let case_number = next_case_number(conn, prefix)?;
    let now = now_timestamp();
    let closed_at = (input.status == "closed").then(|| now.clone());
    conn.execute(
        "INSERT INTO fraud_cases (case_number, title, description, status, priority, risk_score, \
         subject_entity_id, fraud_type, detection_method, metadata, detected_at, closed_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?11)",
        params![
            case_number,
            input.title,
            input.description,
            input.status,
            input.priority,
            input.risk_score,
            input.subject_entity_id,
            input.fraud_type,
            input.detection_method,
            to_json_column(&input.metadata)?,
            now,
            closed_at,
        ],
    )?;
    let id = conn.last_insert_rowid();
    log::info!("Opened fraud case {} ({})", case_number, id);
    get_case(conn, id)
}

/// Apply a partial update. Moving a case to `closed` stamps `closed_at`
/// once; later updates keep the original stamp.
pub fn update_case(conn: &Connection, id: i64, input: &FraudCaseUpdate) -> Result<FraudCase> {
    let mut current = get_case(conn, id)?;
    input.apply(&mut current)?;
    if input.subject_entity_id.is_some() {
        check_subject(conn, current.subject_entity_id)?;
    }

    conn.execute(
        "UPDATE fraud_cases SET title = ?1, description = ?2, status = ?3, priority = ?4, \
         risk_score = ?5, subject_entity_id = ?6, fraud_type = ?7, detection_method = ?8, \
         metadata = ?9, closed_at = ?10, updated_at = ?11 WHERE id = ?12",
        params![
            current.title,
            current.description,
            current.status,
            current.priority,
            current.risk_score,
            current.subject_entity_id,
            current.fraud_type,
            current.detection_method,
            to_json_column(&current.metadata)?,
            current.closed_at.map(|t| t.to_rfc3339()),
            now_timestamp(),
            id,
        ],
    )?;
    get_case(conn, id)
}

pub fn count_cases(conn: &Connection, status: Option<&str>) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM fraud_cases WHERE (?1 IS NULL OR status = ?1)",
        params![status],
        |row| row.get(0),
    )?)
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAlert {
    pub id: i64,
    pub case_id: i64,
    pub alert_type: String,
    pub severity: String,
    pub risk_score: f64,
    pub title: String,
    pub description: Option<String>,
    pub rule_name: Option<String>,
    pub triggered_by: Properties,
    /// new, reviewed, false_positive or confirmed
    pub status: String,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FraudAlertCreate {
    pub case_id: i64,
    pub alert_type: String,
    pub title: String,
    #[serde(default = "default_level")]
    pub severity: String,
    #[serde(default)]
    pub risk_score: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub triggered_by: Properties,
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<String>,
    pub case_id: Option<i64>,
}

const ALERT_COLUMNS: &str = "id, case_id, alert_type, severity, risk_score, title, description, \
     rule_name, triggered_by, status, reviewed_by, reviewed_at, created_at";

fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<FraudAlert> {
    Ok(FraudAlert {
        id: row.get(0)?,
        case_id: row.get(1)?,
        alert_type: row.get(2)?,
        severity: row.get(3)?,
        risk_score: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        rule_name: row.get(7)?,
        triggered_by: parse_json_column(8, row.get(8)?)?,
        status: row.get(9)?,
        reviewed_by: row.get(10)?,
        reviewed_at: parse_optional_timestamp(11, row.get(11)?)?,
        created_at: parse_timestamp(12, row.get(12)?)?,
    })
}

/// Newest first
pub fn list_alerts(conn: &Connection, filter: &AlertFilter, page: Page) -> Result<Vec<FraudAlert>> {
    let mut sql = format!("SELECT {} FROM fraud_alerts", ALERT_COLUMNS);
    let mut clauses = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();

    if let Some(status) = &filter.status {
        clauses.push("status = ?");
        values.push(SqlValue::Text(status.clone()));
    }
    if let Some(case_id) = filter.case_id {
        clauses.push("case_id = ?");
        values.push(SqlValue::Integer(case_id));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?");
    values.push(SqlValue::Integer(page.limit as i64));
    values.push(SqlValue::Integer(page.skip as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(values), alert_from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn get_alert(conn: &Connection, id: i64) -> Result<FraudAlert> {
    let sql = format!("SELECT {} FROM fraud_alerts WHERE id = ?1", ALERT_COLUMNS);
    conn.query_row(&sql, [id], alert_from_row)
        .optional()?
        .ok_or_else(|| OntographError::NotFound("Fraud alert not found".to_string()))
}

pub fn create_alert(conn: &Connection, input: &FraudAlertCreate) -> Result<FraudAlert> {
    check_length("title", &input.title, 500)?;
    check_length("alert_type", &input.alert_type, 100)?;
    if find_case(conn, input.case_id)?.is_none() {
        return Err(OntographError::InvalidInput("Fraud case not found".to_string()));
    }

    conn.execute(
        "INSERT INTO fraud_alerts (case_id, alert_type, severity, risk_score, title, description, \
         rule_name, triggered_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            input.case_id,
            input.alert_type,
            input.severity,
            input.risk_score,
            input.title,
            input.description,
            input.rule_name,
            to_json_column(&input.triggered_by)?,
            now_timestamp(),
        ],
    )?;
    get_alert(conn, conn.last_insert_rowid())
}

pub fn count_alerts(conn: &Connection, status: Option<&str>) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM fraud_alerts WHERE (?1 IS NULL OR status = ?1)",
        params![status],
        |row| row.get(0),
    )?)
}

// ============================================================================
// Rules
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRule {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// velocity, threshold, pattern or ml
    pub rule_type: String,
    pub enabled: bool,
    pub priority: i64,
    pub conditions: Properties,
    pub actions: Properties,
    pub threshold_config: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

fn default_rule_priority() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct FraudRuleCreate {
    pub name: String,
    pub display_name: String,
    pub rule_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_rule_priority")]
    pub priority: i64,
    #[serde(default)]
    pub conditions: Properties,
    #[serde(default)]
    pub actions: Properties,
    #[serde(default)]
    pub threshold_config: Properties,
}

const RULE_COLUMNS: &str = "id, name, display_name, description, rule_type, enabled, priority, \
     conditions, actions, threshold_config, created_at, updated_at";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<FraudRule> {
    Ok(FraudRule {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        rule_type: row.get(4)?,
        enabled: row.get::<_, i64>(5)? != 0,
        priority: row.get(6)?,
        conditions: parse_json_column(7, row.get(7)?)?,
        actions: parse_json_column(8, row.get(8)?)?,
        threshold_config: parse_json_column(9, row.get(9)?)?,
        created_at: parse_timestamp(10, row.get(10)?)?,
        updated_at: parse_optional_timestamp(11, row.get(11)?)?,
    })
}

/// Highest priority first
pub fn list_rules(conn: &Connection, enabled: Option<bool>, page: Page) -> Result<Vec<FraudRule>> {
    let sql = format!(
        "SELECT {} FROM fraud_rules WHERE (?1 IS NULL OR enabled = ?1) \
         ORDER BY priority DESC, id LIMIT ?2 OFFSET ?3",
        RULE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![enabled.map(i64::from), page.limit as i64, page.skip as i64],
            rule_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
    Ok(rows)
}

pub fn get_rule(conn: &Connection, id: i64) -> Result<FraudRule> {
    let sql = format!("SELECT {} FROM fraud_rules WHERE id = ?1", RULE_COLUMNS);
    conn.query_row(&sql, [id], rule_from_row)
        .optional()?
        .ok_or_else(|| OntographError::NotFound("Fraud rule not found".to_string()))
}

pub fn create_rule(conn: &Connection, input: &FraudRuleCreate) -> Result<FraudRule> {
    check_length("name", &input.name, 200)?;
    check_length("display_name", &input.display_name, 200)?;
    check_length("rule_type", &input.rule_type, 100)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM fraud_rules WHERE name = ?1)",
        [&input.name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(OntographError::Duplicate("Fraud rule already exists".to_string()));
    }

    conn.execute(
        "INSERT INTO fraud_rules (name, display_name, description, rule_type, enabled, priority, \
         conditions, actions, threshold_config, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            input.name,
            input.display_name,
            input.description,
            input.rule_type,
            input.enabled as i64,
            input.priority,
            to_json_column(&input.conditions)?,
            to_json_column(&input.actions)?,
            to_json_column(&input.threshold_config)?,
            now_timestamp(),
        ],
    )?;
    get_rule(conn, conn.last_insert_rowid())
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudStats {
    pub total_cases: i64,
    pub open_cases: i64,
    pub closed_cases: i64,
    pub total_alerts: i64,
    pub new_alerts: i64,
}

pub fn stats(conn: &Connection) -> Result<FraudStats> {
    Ok(FraudStats {
        total_cases: count_cases(conn, None)?,
        open_cases: count_cases(conn, Some("open"))?,
        closed_cases: count_cases(conn, Some("closed"))?,
        total_alerts: count_alerts(conn, None)?,
        new_alerts: count_alerts(conn, Some("new"))?,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;
    use tempfile::TempDir;

    use crate::db::migrate;
    use crate::modules::fraud_detection::FraudDetectionPlugin;
    use crate::modules::ModulePlugin;
    use crate::ontology::test_support::migrated_connection;

    /// Core schema plus the fraud tables
    pub fn fraud_connection() -> (Connection, TempDir) {
        let (mut conn, temp) = migrated_connection();
        migrate::apply_migrations(&mut conn, &FraudDetectionPlugin.migrations()).unwrap();
        (conn, temp)
    }
}
