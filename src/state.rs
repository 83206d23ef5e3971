use crate::db::DbPool;
use crate::query::TableRef;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub table: TableRef,
    pub environment: String,
}

impl axum::extract::FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
