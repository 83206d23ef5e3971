use crate::error::{AvaliaError, AvaliaResult};
use sqlx::postgres::PgSslMode;
use std::env;

/// Runtime configuration, sourced from environment variables (with a
/// `.env` file loaded beforehand by `main`).
#[derive(Debug, Clone)]
pub struct Config {
    pub pg_host: String,
    pub pg_port: u16,
    pub pg_user: String,
    pub pg_password: String,
    pub pg_database: String,
    pub pg_ssl_mode: PgSslMode,
    pub db_schema: String,
    pub db_table: String,
    pub listen_host: String,
    pub listen_port: u16,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> AvaliaResult<Self> {
        let pg_port = env::var("PGPORT")
            .unwrap_or_else(|_| "5432".to_string())
            .parse::<u16>()
            .map_err(|e| AvaliaError::Internal(format!("Invalid PGPORT: {}", e)))?;

        let listen_port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|e| AvaliaError::Internal(format!("Invalid PORT: {}", e)))?;

        // "require" encrypts without verifying the server certificate,
        // which is what the managed-Postgres deployment needs.
        let pg_ssl_mode = match env::var("PGSSLMODE")
            .unwrap_or_else(|_| "require".to_string())
            .as_str()
        {
            "disable" => PgSslMode::Disable,
            "allow" => PgSslMode::Allow,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            other => {
                return Err(AvaliaError::Internal(format!(
                    "Invalid PGSSLMODE: {}",
                    other
                )))
            }
        };

        Ok(Self {
            pg_host: env::var("PGHOST").unwrap_or_else(|_| "localhost".to_string()),
            pg_port,
            pg_user: env::var("PGUSER").unwrap_or_else(|_| "postgres".to_string()),
            pg_password: env::var("PGPASSWORD").unwrap_or_default(),
            pg_database: env::var("PGDATABASE").unwrap_or_else(|_| "railway".to_string()),
            pg_ssl_mode,
            db_schema: env::var("DB_SCHEMA").unwrap_or_else(|_| "public".to_string()),
            db_table: env::var("DB_TABLE").unwrap_or_else(|_| "avaliacoes".to_string()),
            listen_host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            listen_port,
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        })
    }
}
