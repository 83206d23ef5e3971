use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "environment": state.environment,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::query::TableRef;
    use sqlx::postgres::PgConnectOptions;

    #[tokio::test]
    async fn health_reports_ok_with_valid_timestamp() {
        // Lazy pool, never connects.
        let opts = PgConnectOptions::new().host("localhost");
        let pool = db::init_pool_with_options(opts).await.unwrap();
        let state = AppState {
            pool,
            table: TableRef::new("public", "avaliacoes").unwrap(),
            environment: "test".to_string(),
        };

        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "OK");
        assert_eq!(body["environment"], "test");
        let ts = body["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
