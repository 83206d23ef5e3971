use crate::config::Config;
use crate::error::AvaliaResult;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn init_pool_with_options(opts: PgConnectOptions) -> AvaliaResult<DbPool> {
    // connect_lazy_with returns the pool immediately. It does not validate connection.
    Ok(PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .idle_timeout(std::time::Duration::from_secs(120))
        .max_lifetime(std::time::Duration::from_secs(300))
        .connect_lazy_with(opts))
}

pub async fn init_pool(config: &Config) -> AvaliaResult<DbPool> {
    let opts = PgConnectOptions::new()
        .host(&config.pg_host)
        .port(config.pg_port)
        .username(&config.pg_user)
        .password(&config.pg_password)
        .database(&config.pg_database)
        .ssl_mode(config.pg_ssl_mode);

    init_pool_with_options(opts).await
}

/// Startup connectivity probe. The pool is lazy, so this is the first
/// statement that actually touches the server.
pub async fn ping(pool: &DbPool) -> AvaliaResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
