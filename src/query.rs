//! Dynamic SQL assembly for the evaluations table: filtered listings,
//! distinct-value lookups, and allow-listed partial updates.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::{AvaliaError, AvaliaResult};
use crate::shaper::{parse_date_flex, CAMPOS_FALHAS};

/// Schema-qualified table reference, validated once at startup so the
/// builders below can interpolate it into SQL text.
#[derive(Debug, Clone)]
pub struct TableRef {
    qualified: String,
}

impl TableRef {
    pub fn new(schema: &str, table: &str) -> AvaliaResult<Self> {
        for ident in [schema, table] {
            if !is_valid_ident(ident) {
                return Err(AvaliaError::Internal(format!(
                    "Invalid SQL identifier: {:?}",
                    ident
                )));
            }
        }
        Ok(Self {
            qualified: format!("{}.{}", schema, table),
        })
    }

    pub fn qualified(&self) -> &str {
        &self.qualified
    }
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    Date,
}

/// Allow-list of updatable columns and their bind types. Update payload
/// keys never reach SQL text without passing through here.
pub fn updatable_column(name: &str) -> Option<ColumnKind> {
    match name {
        "fazenda" | "talhao" => Some(ColumnKind::Text),
        "data_avaliacao" | "data_plantio" => Some(ColumnKind::Date),
        "mudas_avaliadas" => Some(ColumnKind::Int),
        _ if CAMPOS_FALHAS.contains(&name) => Some(ColumnKind::Int),
        _ => None,
    }
}

/// A coerced update value, ready to bind. Nulls bind as SQL NULL of the
/// column's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(Option<i64>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
}

pub fn coerce_value(column: &str, kind: ColumnKind, value: &Value) -> AvaliaResult<BindValue> {
    if value.is_null() {
        return Ok(match kind {
            ColumnKind::Int => BindValue::Int(None),
            ColumnKind::Text => BindValue::Text(None),
            ColumnKind::Date => BindValue::Date(None),
        });
    }
    match kind {
        ColumnKind::Int => {
            // Numeric strings are accepted because form-sourced payloads
            // send counters as strings.
            let parsed = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            parsed.map(|n| BindValue::Int(Some(n))).ok_or_else(|| {
                AvaliaError::Validation(format!("Valor inválido para a coluna {}: {}", column, value))
            })
        }
        ColumnKind::Text => match value {
            Value::String(s) => Ok(BindValue::Text(Some(s.clone()))),
            Value::Number(n) => Ok(BindValue::Text(Some(n.to_string()))),
            _ => Err(AvaliaError::Validation(format!(
                "Valor inválido para a coluna {}: {}",
                column, value
            ))),
        },
        ColumnKind::Date => match value {
            Value::String(s) => parse_date_flex(s).map(|d| BindValue::Date(Some(d))).ok_or_else(|| {
                AvaliaError::Validation(format!("Data inválida para a coluna {}: {}", column, s))
            }),
            _ => Err(AvaliaError::Validation(format!(
                "Data inválida para a coluna {}: {}",
                column, value
            ))),
        },
    }
}

/// Builds the filtered listing query. Filters apply only when present
/// and non-empty, fazenda before talhao, bound positionally. Rows are
/// projected through `to_jsonb` so unlisted columns pass through.
pub fn build_list_query(
    table: &TableRef,
    fazenda: Option<&str>,
    talhao: Option<&str>,
) -> (String, Vec<String>) {
    let mut sql = format!("SELECT to_jsonb(t.*) FROM {} AS t", table.qualified());
    let mut params: Vec<String> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();

    if let Some(fazenda) = fazenda.filter(|s| !s.is_empty()) {
        conditions.push(format!("fazenda = ${}", params.len() + 1));
        params.push(fazenda.to_string());
    }
    if let Some(talhao) = talhao.filter(|s| !s.is_empty()) {
        conditions.push(format!("talhao = ${}", params.len() + 1));
        params.push(talhao.to_string());
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY data_avaliacao DESC");
    (sql, params)
}

#[derive(Debug, Clone, Copy)]
pub enum DistinctColumn {
    Fazenda,
    Talhao,
}

impl DistinctColumn {
    fn as_str(self) -> &'static str {
        match self {
            DistinctColumn::Fazenda => "fazenda",
            DistinctColumn::Talhao => "talhao",
        }
    }
}

pub fn build_distinct_query(table: &TableRef, column: DistinctColumn) -> String {
    let col = column.as_str();
    format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {col}",
        col = col,
        table = table.qualified()
    )
}

#[derive(Debug)]
pub struct UpdateStatement {
    pub sql: String,
    pub values: Vec<BindValue>,
}

/// Builds a single-record update: `SET` entries in payload insertion
/// order, the id bound last, `RETURNING` the full updated row as JSON.
pub fn build_update(table: &TableRef, updates: &Map<String, Value>) -> AvaliaResult<UpdateStatement> {
    let mut set_clause: Vec<String> = Vec::new();
    let mut values: Vec<BindValue> = Vec::new();

    for (column, value) in updates {
        let kind = updatable_column(column)
            .ok_or_else(|| AvaliaError::Validation(format!("Coluna desconhecida: {}", column)))?;
        values.push(coerce_value(column, kind, value)?);
        set_clause.push(format!("{} = ${}", column, values.len()));
    }

    if set_clause.is_empty() {
        return Err(AvaliaError::Validation(
            "Nenhum campo para atualizar".to_string(),
        ));
    }

    let sql = format!(
        "UPDATE {} AS t SET {} WHERE t.id = ${} RETURNING to_jsonb(t.*)",
        table.qualified(),
        set_clause.join(", "),
        values.len() + 1
    );

    Ok(UpdateStatement { sql, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> TableRef {
        TableRef::new("avaliacao", "avaliacoes_campo").unwrap()
    }

    #[test]
    fn list_query_without_filters() {
        let (sql, params) = build_list_query(&table(), None, None);
        assert_eq!(
            sql,
            "SELECT to_jsonb(t.*) FROM avaliacao.avaliacoes_campo AS t ORDER BY data_avaliacao DESC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn list_query_with_both_filters() {
        let (sql, params) = build_list_query(&table(), Some("A"), Some("1"));
        assert!(sql.contains("WHERE fazenda = $1 AND talhao = $2"));
        assert_eq!(params, vec!["A".to_string(), "1".to_string()]);
    }

    #[test]
    fn list_query_skips_empty_filters() {
        let (sql, params) = build_list_query(&table(), Some(""), Some("T-02"));
        assert!(sql.contains("WHERE talhao = $1"));
        assert!(!sql.contains("fazenda ="));
        assert_eq!(params, vec!["T-02".to_string()]);
    }

    #[test]
    fn update_with_empty_map_is_rejected() {
        let updates = Map::new();
        let err = build_update(&table(), &updates).unwrap_err();
        assert!(matches!(err, AvaliaError::Validation(_)));
    }

    #[test]
    fn update_preserves_insertion_order() {
        let mut updates = Map::new();
        updates.insert("fazenda".to_string(), json!("Santa Fé"));
        updates.insert("mudas_avaliadas".to_string(), json!(250));
        updates.insert("quebradas".to_string(), json!("3"));
        let stmt = build_update(&table(), &updates).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE avaliacao.avaliacoes_campo AS t SET fazenda = $1, mudas_avaliadas = $2, quebradas = $3 WHERE t.id = $4 RETURNING to_jsonb(t.*)"
        );
        assert_eq!(stmt.values[0], BindValue::Text(Some("Santa Fé".to_string())));
        assert_eq!(stmt.values[1], BindValue::Int(Some(250)));
        assert_eq!(stmt.values[2], BindValue::Int(Some(3)));
    }

    #[test]
    fn update_rejects_unknown_columns() {
        let mut updates = Map::new();
        updates.insert("id = 1; DROP TABLE x; --".to_string(), json!(1));
        assert!(matches!(
            build_update(&table(), &updates),
            Err(AvaliaError::Validation(_))
        ));
    }

    #[test]
    fn coerce_null_binds_sql_null() {
        assert_eq!(
            coerce_value("formigas", ColumnKind::Int, &Value::Null).unwrap(),
            BindValue::Int(None)
        );
        assert_eq!(
            coerce_value("data_plantio", ColumnKind::Date, &Value::Null).unwrap(),
            BindValue::Date(None)
        );
    }

    #[test]
    fn coerce_rejects_non_numeric_counter() {
        assert!(coerce_value("formigas", ColumnKind::Int, &json!("muitas")).is_err());
    }

    #[test]
    fn coerce_parses_dates() {
        assert_eq!(
            coerce_value("data_plantio", ColumnKind::Date, &json!("2024-03-05")).unwrap(),
            BindValue::Date(Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
        );
        assert!(coerce_value("data_plantio", ColumnKind::Date, &json!("n/a")).is_err());
    }

    #[test]
    fn table_ref_rejects_bad_identifiers() {
        assert!(TableRef::new("public", "avaliacoes").is_ok());
        assert!(TableRef::new("public", "avaliacoes; DROP TABLE x").is_err());
        assert!(TableRef::new("", "avaliacoes").is_err());
        assert!(TableRef::new("public", "1table").is_err());
    }

    #[test]
    fn all_falha_counters_are_updatable() {
        for field in CAMPOS_FALHAS {
            assert_eq!(updatable_column(field), Some(ColumnKind::Int), "{}", field);
        }
    }
}
