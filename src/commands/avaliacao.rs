use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::db::DbPool;
use crate::error::{AvaliaError, AvaliaResult};
use crate::query::{self, BindValue, DistinctColumn, TableRef};
use crate::shaper::shape_avaliacao;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvaliacaoFilter {
    pub fazenda: Option<String>,
    pub talhao: Option<String>,
}

pub async fn list_avaliacoes(
    State(state): State<AppState>,
    Query(filter): Query<AvaliacaoFilter>,
) -> AvaliaResult<Json<Vec<Value>>> {
    let (sql, params) = query::build_list_query(
        &state.table,
        filter.fazenda.as_deref(),
        filter.talhao.as_deref(),
    );

    let mut q = sqlx::query_scalar::<_, Value>(&sql);
    for param in params {
        q = q.bind(param);
    }
    let rows = q.fetch_all(&state.pool).await?;

    let avaliacoes: Vec<Value> = rows
        .into_iter()
        .map(|row| match row {
            Value::Object(map) => Value::Object(shape_avaliacao(map)),
            other => other,
        })
        .collect();

    tracing::info!("Fetched {} avaliacoes from database", avaliacoes.len());
    Ok(Json(avaliacoes))
}

pub async fn list_fazendas(State(state): State<AppState>) -> AvaliaResult<Json<Vec<String>>> {
    let sql = query::build_distinct_query(&state.table, DistinctColumn::Fazenda);
    let fazendas = sqlx::query_scalar::<_, String>(&sql)
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(fazendas))
}

pub async fn list_talhoes(State(state): State<AppState>) -> AvaliaResult<Json<Vec<String>>> {
    let sql = query::build_distinct_query(&state.table, DistinctColumn::Talhao);
    let talhoes = sqlx::query_scalar::<_, String>(&sql)
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(talhoes))
}

pub async fn update_avaliacao(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(updates): Json<Map<String, Value>>,
) -> AvaliaResult<Json<Value>> {
    let avaliacao = update_avaliacao_internal(&state.pool, &state.table, id, &updates)
        .await?
        .ok_or_else(|| AvaliaError::NotFound("Avaliação não encontrada".to_string()))?;

    Ok(Json(json!({
        "message": "Avaliação atualizada com sucesso",
        "avaliacao": avaliacao,
    })))
}

/// Body shape: `{ "<id>": { "<coluna>": <valor>, ... }, ... }`. Entries
/// with an empty field map are skipped and produce no result entry.
/// Updates run sequentially without a wrapping transaction, so a
/// failure mid-way leaves the earlier updates committed.
pub async fn bulk_update_avaliacoes(
    State(state): State<AppState>,
    Json(updates): Json<Map<String, Value>>,
) -> AvaliaResult<Json<Value>> {
    let mut results: Vec<Value> = Vec::new();

    for (avaliacao_id, fields) in &updates {
        let fields = fields.as_object().ok_or_else(|| {
            AvaliaError::Validation(format!("Campos inválidos para a avaliação {}", avaliacao_id))
        })?;
        if fields.is_empty() {
            continue;
        }

        let id: i32 = avaliacao_id.parse().map_err(|_| {
            AvaliaError::Validation(format!("Identificador inválido: {}", avaliacao_id))
        })?;

        let updated = update_avaliacao_internal(&state.pool, &state.table, id, fields)
            .await?
            .is_some();
        results.push(json!({ "id": avaliacao_id, "updated": updated }));
    }

    Ok(Json(json!({
        "message": "Alterações salvas com sucesso",
        "results": results,
    })))
}

/// Returns the updated row, or `None` when no row matched the id.
pub(crate) async fn update_avaliacao_internal(
    pool: &DbPool,
    table: &TableRef,
    id: i32,
    updates: &Map<String, Value>,
) -> AvaliaResult<Option<Value>> {
    let stmt = query::build_update(table, updates)?;

    let mut q = sqlx::query_scalar::<_, Value>(&stmt.sql);
    for value in &stmt.values {
        q = match value {
            BindValue::Int(v) => q.bind(*v),
            BindValue::Text(v) => q.bind(v.clone()),
            BindValue::Date(v) => q.bind(*v),
        };
    }
    let row = q.bind(id).fetch_optional(pool).await?;

    Ok(row)
}
