//! Row shaping for the listing endpoint: derived failure totals and
//! canonical `YYYY-MM-DD` date strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// The fixed failure-cause counter columns of an evaluation row.
pub const CAMPOS_FALHAS: [&str; 21] = [
    "quebradas",
    "formigas",
    "pisoteadas",
    "sem_plantar",
    "coleto_afogado",
    "substrato_exposto",
    "queima_adubo",
    "raiz_paralisada",
    "canela_preta",
    "gafanhotos",
    "escaldadura",
    "outros",
    "ausencia_de_cova",
    "erosao",
    "pragas",
    "quebradas_vivas",
    "tombadas_vivas",
    "escaldadura_vivas",
    "falsa_subsolagem_toco",
    "queimada_viva",
    "raspagem_grilo_2_nivel",
];

fn int_or_zero(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// Tolerant date parsing: canonical dates, the datetime renderings
/// `to_jsonb` emits for timestamp columns, and the compact/Brazilian
/// forms that show up in hand-entered data.
pub fn parse_date_flex(date_str: &str) -> Option<NaiveDate> {
    let s = date_str.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc().date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y%m%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Unparseable values pass through unchanged; nulls stay null.
fn normalize_date(value: &Value) -> Value {
    match value {
        Value::String(s) => match parse_date_flex(s) {
            Some(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Shapes one raw evaluation row for the listing endpoint: sums the
/// failure counters into `totalFalhas`, derives `percentualFalhas`
/// against `mudas_avaliadas`, and normalizes the two date columns.
/// Every other field passes through untouched.
pub fn shape_avaliacao(mut row: Map<String, Value>) -> Map<String, Value> {
    let total_falhas: i64 = CAMPOS_FALHAS
        .iter()
        .map(|field| int_or_zero(row.get(*field)))
        .sum();

    let mudas_avaliadas = int_or_zero(row.get("mudas_avaliadas"));
    let percentual_falhas = if mudas_avaliadas > 0 {
        ((total_falhas as f64 / mudas_avaliadas as f64) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    for field in ["data_avaliacao", "data_plantio"] {
        if let Some(value) = row.get(field) {
            let normalized = normalize_date(value);
            row.insert(field.to_string(), normalized);
        }
    }

    row.insert("totalFalhas".to_string(), Value::from(total_falhas));
    row.insert("percentualFalhas".to_string(), Value::from(percentual_falhas));
    row
}
