//! Fraud case tracking module.
//!
//! Stores investigation cases, the alerts attached to them and the rule
//! definitions a detection engine would evaluate. No detection runs here;
//! records are created and read through the API only.

mod routes;
pub mod store;

use axum::{Extension, Router};
use serde::Deserialize;

use super::{ModuleContext, ModulePlugin};
use crate::api::AppState;
use crate::db::migrate::Migration;

pub const MODULE_NAME: &str = "fraud-detection";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS fraud_cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_number TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'open',
    priority TEXT NOT NULL DEFAULT 'medium',
    risk_score REAL NOT NULL DEFAULT 0.0,
    subject_entity_id INTEGER REFERENCES entities(id) ON DELETE SET NULL,
    fraud_type TEXT,
    detection_method TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    detected_at TEXT NOT NULL,
    closed_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_fraud_cases_status ON fraud_cases(status);

CREATE TABLE IF NOT EXISTS fraud_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    case_id INTEGER NOT NULL REFERENCES fraud_cases(id) ON DELETE CASCADE,
    alert_type TEXT NOT NULL,
    severity TEXT NOT NULL DEFAULT 'medium',
    risk_score REAL NOT NULL DEFAULT 0.0,
    title TEXT NOT NULL,
    description TEXT,
    rule_name TEXT,
    triggered_by TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'new',
    reviewed_by INTEGER,
    reviewed_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fraud_alerts_case ON fraud_alerts(case_id);
CREATE INDEX IF NOT EXISTS idx_fraud_alerts_status ON fraud_alerts(status);

CREATE TABLE IF NOT EXISTS fraud_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    description TEXT,
    rule_type TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    priority INTEGER NOT NULL DEFAULT 100,
    conditions TEXT NOT NULL DEFAULT '{}',
    actions TEXT NOT NULL DEFAULT '{}',
    threshold_config TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT
);
";

fn default_case_number_prefix() -> String {
    "FRAUD".to_string()
}

/// Settings read from the module's effective configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FraudConfig {
    #[serde(default = "default_case_number_prefix")]
    pub case_number_prefix: String,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            case_number_prefix: default_case_number_prefix(),
        }
    }
}

impl FraudConfig {
    /// Unknown keys are ignored; an unreadable config falls back to defaults.
    pub fn from_context(ctx: &ModuleContext) -> Self {
        match serde_json::from_value(ctx.config.clone()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid {} config, using defaults: {}", ctx.name, e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FraudDetectionPlugin;

impl ModulePlugin for FraudDetectionPlugin {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration::new(1, "001_fraud_tables", SCHEMA)]
    }

    fn router(&self, ctx: &ModuleContext) -> Router<AppState> {
        routes::router().layer(Extension(FraudConfig::from_context(ctx)))
    }
}
