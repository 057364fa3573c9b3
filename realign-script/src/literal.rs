//! Rendering captured values as SQL.
//!
//! Three renderings exist: generation-time literals for `VALUES` lists,
//! CSV fields for bulk loads, and run-time expressions that turn a live
//! column value back into literal text for the verbose data audit.

use realign_model::{Engine, Value};

use crate::dialect::Dialect;
use crate::error::{ScriptError, ScriptResult};

/// Broad type families, as far as comparison and rendering care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Exact or approximate numbers, including bit.
    Numeric,
    /// Character data.
    Text,
    /// Dates, times and timestamps.
    Temporal,
    /// Byte strings.
    Binary,
    /// Types without usable equality; only NULL-ness is compared.
    Lob,
    /// Anything else; compared as-is, rendered as quoted text.
    Other,
}

const MSSQL_LOB: &[&str] = &[
    "text",
    "ntext",
    "image",
    "xml",
    "sql_variant",
    "geography",
    "geometry",
    "hierarchyid",
];

const POSTGRES_LOB: &[&str] = &[
    "json", "xml", "point", "line", "lseg", "box", "path", "polygon", "circle",
];

/// Classify an engine type name.
pub fn classify(engine: Engine, type_name: &str) -> TypeClass {
    let ty = type_name.to_ascii_lowercase();
    let ty = ty.as_str();
    let lob = match engine {
        Engine::Mssql => MSSQL_LOB,
        Engine::Postgres => POSTGRES_LOB,
    };
    if lob.contains(&ty) {
        return TypeClass::Lob;
    }
    match ty {
        "bit" | "tinyint" | "smallint" | "int" | "bigint" | "decimal" | "numeric" | "money"
        | "smallmoney" | "float" | "real" | "int2" | "int4" | "int8" | "float4" | "float8"
        | "bool" | "boolean" | "oid" => TypeClass::Numeric,
        "char" | "nchar" | "varchar" | "nvarchar" | "sysname" | "bpchar" | "name" | "citext" => {
            TypeClass::Text
        }
        "date" | "time" | "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset"
        | "timestamp" | "timestamptz" | "timetz" | "interval" => TypeClass::Temporal,
        "binary" | "varbinary" | "bytea" => TypeClass::Binary,
        _ => TypeClass::Other,
    }
}

/// Whether a value of this class can be compared for exact text equality.
pub fn is_text(engine: Engine, type_name: &str) -> bool {
    classify(engine, type_name) == TypeClass::Text
}

/// Render a value as a literal for the dialect.
pub fn sql_literal(dialect: Dialect, value: &Value) -> ScriptResult<String> {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => dialect.bool_literal(*b).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_literal(dialect, *f)?,
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => dialect.string(s),
        Value::Bytes(bytes) => match dialect.engine {
            Engine::Mssql => format!("0x{}", hex::encode_upper(bytes)),
            Engine::Postgres => format!("'\\x{}'::bytea", hex::encode(bytes)),
        },
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        Value::Timestamp(ts) => format!("'{}'", timestamp_text(dialect, ts)),
        Value::TimestampTz(ts) => {
            format!("'{}'", ts.format(timestamp_pattern(dialect, true)))
        }
        Value::Uuid(u) => format!("'{u}'"),
        Value::Json(j) => dialect.string(&j.to_string()),
    };
    Ok(text)
}

fn float_literal(dialect: Dialect, f: f64) -> ScriptResult<String> {
    if f.is_finite() {
        let text = format!("{f:?}");
        return Ok(match dialect.engine {
            Engine::Mssql => format!("CAST({text} AS FLOAT)"),
            Engine::Postgres => text,
        });
    }
    match dialect.engine {
        Engine::Postgres if f.is_nan() => Ok("'NaN'::float8".to_string()),
        Engine::Postgres if f > 0.0 => Ok("'Infinity'::float8".to_string()),
        Engine::Postgres => Ok("'-Infinity'::float8".to_string()),
        Engine::Mssql => Err(ScriptError::unsupported_value(
            "",
            "",
            format!("{f} has no SQL Server representation"),
        )),
    }
}

fn timestamp_pattern(dialect: Dialect, with_zone: bool) -> &'static str {
    match (dialect.engine, with_zone) {
        (Engine::Mssql, false) => "%Y-%m-%dT%H:%M:%S%.f",
        (Engine::Mssql, true) => "%Y-%m-%dT%H:%M:%S%.f%:z",
        (Engine::Postgres, false) => "%Y-%m-%d %H:%M:%S%.f",
        (Engine::Postgres, true) => "%Y-%m-%d %H:%M:%S%.f%:z",
    }
}

fn timestamp_text(dialect: Dialect, ts: &chrono::NaiveDateTime) -> String {
    ts.format(timestamp_pattern(dialect, false)).to_string()
}

/// Render a value as an unquoted CSV field; `None` stands for NULL.
///
/// Byte strings have no portable CSV form; callers fall back to inline
/// literals for tables carrying them.
pub fn csv_field(dialect: Dialect, value: &Value) -> ScriptResult<Option<String>> {
    let text = match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => match dialect.engine {
            Engine::Mssql => if *b { "1" } else { "0" }.to_string(),
            Engine::Postgres => if *b { "t" } else { "f" }.to_string(),
        },
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => format!("{f:?}"),
        Value::Float(f) => match dialect.engine {
            Engine::Postgres if f.is_nan() => "NaN".to_string(),
            Engine::Postgres if *f > 0.0 => "Infinity".to_string(),
            Engine::Postgres => "-Infinity".to_string(),
            Engine::Mssql => {
                return Err(ScriptError::unsupported_value(
                    "",
                    "",
                    format!("{f} has no SQL Server representation"),
                ));
            }
        },
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(_) => {
            return Err(ScriptError::unsupported_value("", "", "binary values cannot be bulk loaded"));
        }
        Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        Value::Timestamp(ts) => timestamp_text(dialect, ts),
        Value::TimestampTz(ts) => ts.format(timestamp_pattern(dialect, true)).to_string(),
        Value::Uuid(u) => u.to_string(),
        Value::Json(j) => j.to_string(),
    };
    Ok(Some(text))
}

/// Run-time expression rendering `column` as literal text, `NULL` included.
pub fn audit_literal(dialect: Dialect, column: &str, type_name: &str) -> String {
    match dialect.engine {
        Engine::Postgres => format!("quote_nullable({column})"),
        Engine::Mssql => {
            let quoted = |inner: String| {
                format!(
                    "ISNULL(N'N''' + REPLACE({inner}, N'''', N'''''') + N'''', N'NULL')"
                )
            };
            match classify(dialect.engine, type_name) {
                TypeClass::Numeric => {
                    format!("ISNULL(CONVERT(NVARCHAR(MAX), {column}), N'NULL')")
                }
                TypeClass::Binary => {
                    format!("ISNULL(CONVERT(NVARCHAR(MAX), {column}, 1), N'NULL')")
                }
                TypeClass::Temporal => format!(
                    "ISNULL(N'''' + CONVERT(NVARCHAR(MAX), {column}, 126) + N'''', N'NULL')"
                ),
                TypeClass::Text | TypeClass::Lob | TypeClass::Other => {
                    quoted(format!("CONVERT(NVARCHAR(MAX), {column})"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;

    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(8, 5, 1, 250)
            .unwrap()
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Engine::Mssql, "NVARCHAR"), TypeClass::Text);
        assert_eq!(classify(Engine::Mssql, "xml"), TypeClass::Lob);
        assert_eq!(classify(Engine::Postgres, "json"), TypeClass::Lob);
        assert_eq!(classify(Engine::Postgres, "jsonb"), TypeClass::Other);
        assert_eq!(classify(Engine::Postgres, "int4"), TypeClass::Numeric);
        assert_eq!(classify(Engine::Mssql, "datetime2"), TypeClass::Temporal);
    }

    #[test]
    fn test_literals_mssql() {
        let d = Dialect::MSSQL;
        assert_eq!(sql_literal(d, &Value::Null).unwrap(), "NULL");
        assert_eq!(sql_literal(d, &Value::Bool(true)).unwrap(), "1");
        assert_eq!(sql_literal(d, &Value::Text("O'Hara".into())).unwrap(), "N'O''Hara'");
        assert_eq!(sql_literal(d, &Value::Bytes(vec![0xca, 0xfe])).unwrap(), "0xCAFE");
        assert_eq!(sql_literal(d, &Value::Timestamp(ts())).unwrap(), "'2024-03-09T08:05:01.250'");
        assert_eq!(
            sql_literal(d, &Value::Decimal(Decimal::new(12345, 2))).unwrap(),
            "123.45"
        );
    }

    #[test]
    fn test_literals_postgres() {
        let d = Dialect::POSTGRES;
        assert_eq!(sql_literal(d, &Value::Bool(false)).unwrap(), "FALSE");
        assert_eq!(sql_literal(d, &Value::Bytes(vec![0xca, 0xfe])).unwrap(), "'\\xcafe'::bytea");
        assert_eq!(sql_literal(d, &Value::Timestamp(ts())).unwrap(), "'2024-03-09 08:05:01.250'");
        assert_eq!(sql_literal(d, &Value::Float(f64::NAN)).unwrap(), "'NaN'::float8");
    }

    #[test]
    fn test_non_finite_float_is_rejected_on_mssql() {
        assert!(sql_literal(Dialect::MSSQL, &Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_csv_fields() {
        let d = Dialect::POSTGRES;
        assert_eq!(csv_field(d, &Value::Null).unwrap(), None);
        assert_eq!(csv_field(d, &Value::Bool(true)).unwrap().as_deref(), Some("t"));
        assert!(csv_field(d, &Value::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_audit_literal() {
        assert_eq!(audit_literal(Dialect::POSTGRES, "s.name", "text"), "quote_nullable(s.name)");
        let text = audit_literal(Dialect::MSSQL, "s.name", "nvarchar");
        assert!(text.starts_with("ISNULL(N'N''' + REPLACE(CONVERT(NVARCHAR(MAX), s.name)"));
        let date = audit_literal(Dialect::MSSQL, "s.at", "datetime2");
        assert!(date.contains(", 126)"));
    }
}
