//! Row decoding into positional JSON cells.
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach:
//! 1. `categorize_type` classifies the driver's column type name
//! 2. Engine-specific decoders extract the value for that category
//!
//! Every cell ends up as a string, number, boolean or null. Only native NULLs
//! become null; values without a dedicated decoder fall back to their text or
//! raw bytes.

use crate::models::QueryResult;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::PgRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Json,
    Uuid,
    Date,
    Time,
    DateTime,
    DateTimeTz,
    Binary,
    Text,
}

/// Classify a driver type name (e.g. `INT UNSIGNED`, `INT8`, `TIMESTAMPTZ`).
///
/// Names are matched exactly; substring checks would misfile types such as
/// `INTERVAL` or `POINT` as integers.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.trim().to_ascii_uppercase();
    let base = upper.strip_suffix(" UNSIGNED").unwrap_or(&upper);

    match base {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" | "BIT"
        | "INT2" | "INT4" | "INT8" | "SMALLSERIAL" | "SERIAL" | "BIGSERIAL" => {
            TypeCategory::Integer
        }
        "FLOAT" | "DOUBLE" | "REAL" | "FLOAT4" | "FLOAT8" | "DOUBLE PRECISION" => {
            TypeCategory::Float
        }
        "DECIMAL" | "NUMERIC" => TypeCategory::Decimal,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "DATETIME" | "TIMESTAMP" => TypeCategory::DateTime,
        "TIMESTAMPTZ" => TypeCategory::DateTimeTz,
        "BYTEA" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            TypeCategory::Binary
        }
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Raw MySQL DECIMAL text. MySQL sends decimals as ASCII in both protocols,
/// so this keeps every digit without going through a fixed-precision type.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_ascii_uppercase();
        name.starts_with("DECIMAL") || name.starts_with("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Scalar Helpers
// =============================================================================

/// Binary data becomes UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Finite floats become numbers; NaN and infinities become their text form.
pub fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// PostgreSQL's default (`postgres` style) rendering of an interval.
pub fn interval_text(months: i32, days: i32, microseconds: i64) -> String {
    fn unit(n: i64, name: &str) -> String {
        if n == 1 {
            format!("{n} {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        parts.push(unit(years.into(), "year"));
    }
    if months != 0 {
        parts.push(unit(months.into(), "mon"));
    }
    if days != 0 {
        parts.push(unit(days.into(), "day"));
    }
    if microseconds != 0 || parts.is_empty() {
        let sign = if microseconds < 0 { "-" } else { "" };
        let total = microseconds.unsigned_abs();
        let (secs, frac) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        if frac != 0 {
            time.push('.');
            time.push_str(format!("{frac:06}").trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

/// Text form of a binary-encoded `inet`/`cidr` value.
///
/// Layout: family, prefix bits, is-cidr flag, address length, address bytes.
pub fn inet_text(bytes: &[u8]) -> Option<String> {
    let [family, bits, is_cidr, len, addr @ ..] = bytes else {
        return None;
    };
    let (ip, full_bits) = match (*family, *len as usize) {
        (2, 4) => {
            let octets: [u8; 4] = addr.get(..4)?.try_into().ok()?;
            (IpAddr::V4(Ipv4Addr::from(octets)), 32)
        }
        (3, 16) => {
            let octets: [u8; 16] = addr.get(..16)?.try_into().ok()?;
            (IpAddr::V6(Ipv6Addr::from(octets)), 128)
        }
        _ => return None,
    };
    if *is_cidr != 0 || *bits != full_bits {
        Some(format!("{ip}/{bits}"))
    } else {
        Some(ip.to_string())
    }
}

/// PostgreSQL array literal (`{1,NULL,"a b"}`) for one-dimensional arrays.
pub fn pg_array_literal<I>(items: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    fn needs_quotes(s: &str) -> bool {
        s.is_empty()
            || s.eq_ignore_ascii_case("NULL")
            || s.chars()
                .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
    }

    let elements: Vec<String> = items
        .into_iter()
        .map(|item| match item {
            None => "NULL".to_string(),
            Some(s) if needs_quotes(&s) => {
                format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Some(s) => s,
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

fn naive_datetime_value(v: chrono::NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Positional access to a driver row.
pub trait RowValues {
    /// Column names in result order.
    fn column_names(&self) -> Vec<String>;

    /// Decode exactly `width` cells. Missing trailing cells are null; extra
    /// cells are dropped.
    fn values(&self, width: usize) -> Vec<JsonValue>;
}

impl RowValues for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn values(&self, width: usize) -> Vec<JsonValue> {
        (0..width)
            .map(|idx| match self.columns().get(idx) {
                Some(col) => {
                    let category = categorize_type(col.type_info().name());
                    mysql::decode_column(self, idx, category)
                }
                None => JsonValue::Null,
            })
            .collect()
    }
}

impl RowValues for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn values(&self, width: usize) -> Vec<JsonValue> {
        (0..width)
            .map(|idx| match self.columns().get(idx) {
                Some(col) => {
                    let category = categorize_type(col.type_info().name());
                    postgres::decode_column(self, idx, category)
                }
                None => JsonValue::Null,
            })
            .collect()
    }
}

/// Build a result whose rows are aligned to `columns`.
pub fn rows_to_result<R: RowValues>(columns: Vec<String>, rows: &[R]) -> QueryResult {
    let width = columns.len();
    QueryResult {
        rows: rows.iter().map(|row| row.values(width)).collect(),
        columns,
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Time => row
                .try_get::<Option<chrono::NaiveTime>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::DateTime | TypeCategory::DateTimeTz => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
                .ok()
                .flatten()
                .map(naive_datetime_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => decode_bytes(row, idx),
            TypeCategory::Uuid | TypeCategory::Text => decode_text(row, idx),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return JsonValue::from(v);
        }
        JsonValue::Null
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(error = %e, column = idx, "Failed to decode DECIMAL");
                JsonValue::Null
            }
        }
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(JsonValue::Bool).unwrap_or(JsonValue::Null);
        }
        decode_integer(row, idx)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<JsonValue>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_bytes(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v))
            .unwrap_or(JsonValue::Null)
    }

    /// Text, then raw bytes for ENUM/SET/GEOMETRY and friends.
    fn decode_text(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<String>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(_) => decode_bytes(row, idx),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::ValueRef;
    use sqlx::postgres::PgValueFormat;
    use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(JsonValue::Bool)
                .unwrap_or(JsonValue::Null),
            TypeCategory::Json => row
                .try_get::<Option<JsonValue>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Uuid => row
                .try_get::<Option<sqlx::types::Uuid>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Time => row
                .try_get::<Option<chrono::NaiveTime>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_string()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::DateTime => row
                .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
                .ok()
                .flatten()
                .map(naive_datetime_value)
                .unwrap_or(JsonValue::Null),
            TypeCategory::DateTimeTz => row
                .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| JsonValue::String(v.to_rfc3339()))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| decode_binary_value(&v))
                .unwrap_or(JsonValue::Null),
            TypeCategory::Text => decode_other(row, idx),
        }
    }

    /// Strings first. Anything else non-null is kept: text-protocol values
    /// verbatim, binary values through a type-specific decoder and finally as
    /// raw bytes.
    fn decode_other(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(JsonValue::String).unwrap_or(JsonValue::Null);
        }
        let Ok(value) = row.try_get_raw(idx) else {
            return JsonValue::Null;
        };
        if value.is_null() {
            return JsonValue::Null;
        }
        if matches!(value.format(), PgValueFormat::Text) {
            return value
                .as_str()
                .map(|s| JsonValue::String(s.to_string()))
                .unwrap_or(JsonValue::Null);
        }

        let type_name = row
            .columns()
            .get(idx)
            .map(|c| c.type_info().name().to_ascii_uppercase())
            .unwrap_or_default();
        let decoded = match type_name.as_str() {
            "INTERVAL" => row
                .try_get::<PgInterval, _>(idx)
                .ok()
                .map(|v| interval_text(v.months, v.days, v.microseconds)),
            "\"CHAR\"" => row
                .try_get::<i8, _>(idx)
                .ok()
                .map(|v| char::from(v as u8).to_string()),
            "OID" => row.try_get::<Oid, _>(idx).ok().map(|v| v.0.to_string()),
            "TIMETZ" => row
                .try_get::<PgTimeTz<chrono::NaiveTime, chrono::FixedOffset>, _>(idx)
                .ok()
                .map(|v| format!("{}{}", v.time, v.offset)),
            "MONEY" => row
                .try_get::<PgMoney, _>(idx)
                .ok()
                .map(|v| v.to_decimal(2).to_string()),
            "INET" | "CIDR" => value.as_bytes().ok().and_then(inet_text),
            name if name.ends_with("[]") => decode_array(row, idx),
            _ => None,
        };

        match decoded {
            Some(text) => JsonValue::String(text),
            None => value
                .as_bytes()
                .map(decode_binary_value)
                .unwrap_or(JsonValue::Null),
        }
    }

    fn decode_array(row: &PgRow, idx: usize) -> Option<String> {
        fn render<T: ToString>(items: Vec<Option<T>>) -> String {
            pg_array_literal(items.into_iter().map(|v| v.map(|v| v.to_string())))
        }

        if let Ok(v) = row.try_get::<Vec<Option<String>>, _>(idx) {
            return Some(pg_array_literal(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<i64>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<i32>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<i16>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<f64>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<f32>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<sqlx::types::Decimal>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<sqlx::types::Uuid>>, _>(idx) {
            return Some(render(v));
        }
        if let Ok(v) = row.try_get::<Vec<Option<bool>>, _>(idx) {
            return Some(pg_array_literal(
                v.into_iter()
                    .map(|b| b.map(|b| if b { "t" } else { "f" }.to_string())),
            ));
        }
        None
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(JsonValue::from).unwrap_or(JsonValue::Null);
        }
        JsonValue::Null
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    /// NUMERIC values outside the decimal range (or NaN) come back as null.
    fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<sqlx::types::Decimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.to_string()),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(error = %e, column = idx, "Failed to decode NUMERIC");
                JsonValue::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT8"), TypeCategory::Integer);
        assert_eq!(categorize_type("int4"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_does_not_match_substrings() {
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Text);
        assert_eq!(categorize_type("POINT"), TypeCategory::Text);
        assert_eq!(categorize_type("INT4[]"), TypeCategory::Text);
    }

    #[test]
    fn test_categorize_type_decimal_and_float() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("FLOAT4"), TypeCategory::Float);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::DateTimeTz);
    }

    #[test]
    fn test_categorize_type_misc() {
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("BOOL"), TypeCategory::Boolean);
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
    }

    #[test]
    fn test_decode_binary_value() {
        assert_eq!(
            decode_binary_value(b"hello world"),
            JsonValue::String("hello world".to_string())
        );
        assert_eq!(
            decode_binary_value(&[0xFF, 0xFE, 0x00, 0x01]),
            JsonValue::String("//4AAQ==".to_string())
        );
        assert_eq!(decode_binary_value(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_float_value() {
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
        assert_eq!(float_value(f64::NAN), JsonValue::String("NaN".to_string()));
        assert_eq!(
            float_value(f64::INFINITY),
            JsonValue::String("inf".to_string())
        );
    }

    #[test]
    fn test_naive_datetime_is_iso8601() {
        let v = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(
            naive_datetime_value(v),
            JsonValue::String("2024-03-09T14:05:00".to_string())
        );
    }

    #[test]
    fn test_interval_text() {
        assert_eq!(interval_text(0, 1, 0), "1 day");
        assert_eq!(interval_text(0, 0, 0), "00:00:00");
        assert_eq!(
            interval_text(14, 3, 3_723_000_000),
            "1 year 2 mons 3 days 01:02:03"
        );
        assert_eq!(interval_text(0, -1, 0), "-1 days");
        assert_eq!(interval_text(0, 0, 1_500_000), "00:00:01.5");
        assert_eq!(interval_text(0, 0, -90_000_000), "-00:01:30");
    }

    #[test]
    fn test_inet_text() {
        assert_eq!(inet_text(&[2, 32, 0, 4, 10, 0, 0, 1]).as_deref(), Some("10.0.0.1"));
        assert_eq!(
            inet_text(&[2, 24, 1, 4, 10, 0, 0, 0]).as_deref(),
            Some("10.0.0.0/24")
        );
        let mut v6 = vec![3, 128, 0, 16];
        v6.extend_from_slice(&[0; 15]);
        v6.push(1);
        assert_eq!(inet_text(&v6).as_deref(), Some("::1"));
        assert_eq!(inet_text(&[2, 32, 0, 4, 10]), None);
        assert_eq!(inet_text(&[9, 0, 0, 0]), None);
    }

    #[test]
    fn test_pg_array_literal() {
        assert_eq!(
            pg_array_literal(vec![Some("1".to_string()), None, Some("2".to_string())]),
            "{1,NULL,2}"
        );
        assert_eq!(
            pg_array_literal(vec![
                Some("a b".to_string()),
                Some(String::new()),
                Some("null".to_string()),
                Some("say \"hi\"".to_string()),
            ]),
            r#"{"a b","","null","say \"hi\""}"#
        );
        assert_eq!(pg_array_literal(Vec::new()), "{}");
    }

    struct FakeRow(Vec<JsonValue>);

    impl RowValues for FakeRow {
        fn column_names(&self) -> Vec<String> {
            (0..self.0.len()).map(|i| format!("c{i}")).collect()
        }

        fn values(&self, width: usize) -> Vec<JsonValue> {
            (0..width)
                .map(|i| self.0.get(i).cloned().unwrap_or(JsonValue::Null))
                .collect()
        }
    }

    #[test]
    fn test_rows_to_result_aligns_every_row() {
        let rows = vec![
            FakeRow(vec![serde_json::json!(1)]),
            FakeRow(vec![serde_json::json!(2), serde_json::json!("x"), serde_json::json!(3)]),
        ];
        let result = rows_to_result(vec!["a".to_string(), "b".to_string()], &rows);
        assert!(result.rows.iter().all(|r| r.len() == result.columns.len()));
        assert_eq!(result.rows[0], vec![serde_json::json!(1), JsonValue::Null]);
        assert_eq!(result.rows[1], vec![serde_json::json!(2), serde_json::json!("x")]);
    }
}
