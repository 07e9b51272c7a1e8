//! Postgres implementation of [`QueryBackend`].
//!
//! Each call opens a private connection with a bounded connect timeout,
//! prepares the statement to learn its parameter and column types, binds the
//! JSON parameters to those types, and runs it inside a transaction.

use crate::backend::QueryBackend;
use crate::credentials::{CredentialSource, Credentials, EnvCredentials};
use crate::error::GatewayError;
use crate::query::QueryOutcome;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use mirage_core::StoreConfig;
use serde_json::{Map, Value, json};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow, PgTypeInfo};
use sqlx::{Arguments, Column, Connection, Either, Executor, Row, Statement, TypeInfo};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Runs statements against a Postgres database.
pub struct PostgresBackend {
    store: StoreConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl PostgresBackend {
    /// Backend reading credentials from the environment.
    pub fn new(store: StoreConfig) -> Self {
        Self::with_credentials(store, Arc::new(EnvCredentials))
    }

    pub fn with_credentials(store: StoreConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        Self { store, credentials }
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    /// Resolve credentials and open a connection.
    pub async fn connect(&self) -> Result<PgConnection, GatewayError> {
        let credentials = self.credentials.resolve(&self.store)?;
        connect(&self.store, &credentials).await
    }
}

/// Open one connection, bounded by the configured connect timeout.
pub async fn connect(
    store: &StoreConfig,
    credentials: &Credentials,
) -> Result<PgConnection, GatewayError> {
    let options = PgConnectOptions::new()
        .host(&store.host)
        .port(store.port)
        .database(&store.dbname)
        .username(&credentials.user)
        .password(&credentials.password);

    let timeout = Duration::from_secs(store.connect_timeout_seconds);
    match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(GatewayError::ConnectionFailed(e.to_string())),
        Err(_) => Err(GatewayError::ConnectionFailed(format!(
            "timed out connecting to {} after {}s",
            store.display_url(),
            store.connect_timeout_seconds
        ))),
    }
}

#[async_trait]
impl QueryBackend for PostgresBackend {
    async fn execute(
        &self,
        statement: &str,
        parameters: &[Value],
        commit: bool,
    ) -> Result<QueryOutcome, GatewayError> {
        let mut conn = self.connect().await?;

        let result = run(&mut conn, statement, parameters, commit).await;

        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "Error closing connection");
        }

        result.map_err(|detail| GatewayError::ExecutionFailed {
            statement: statement.to_string(),
            detail,
        })
    }
}

async fn run(
    conn: &mut PgConnection,
    statement: &str,
    parameters: &[Value],
    commit: bool,
) -> Result<QueryOutcome, String> {
    let mut tx = conn.begin().await.map_err(|e| e.to_string())?;

    let prepared = (&mut *tx)
        .prepare(statement)
        .await
        .map_err(|e| e.to_string())?;

    let param_types: &[PgTypeInfo] = match prepared.parameters() {
        Some(Either::Left(types)) => types,
        _ => &[],
    };
    if param_types.len() != parameters.len() {
        return Err(format!(
            "statement expects {} parameter(s) but {} were supplied",
            param_types.len(),
            parameters.len()
        ));
    }

    let mut args = PgArguments::default();
    for (index, (value, type_info)) in parameters.iter().zip(param_types).enumerate() {
        add_arg_for_type(&mut args, type_info, value)
            .map_err(|e| format!("parameter ${}: {}", index + 1, e))?;
    }

    let outcome = if prepared.columns().is_empty() {
        let done = prepared
            .query_with(args)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.to_string())?;
        QueryOutcome::affected(done.rows_affected())
    } else {
        let rows = prepared
            .query_with(args)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| e.to_string())?;
        QueryOutcome::with_rows(rows.iter().map(row_to_json).collect())
    };

    if commit {
        tx.commit().await.map_err(|e| e.to_string())?;
    } else {
        tx.rollback().await.map_err(|e| e.to_string())?;
    }

    Ok(outcome)
}

fn args_add<T>(args: &mut PgArguments, v: T) -> Result<(), String>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| e.to_string())
}

/// Bind a JSON value as the Postgres type inferred for its placeholder.
fn add_arg_for_type(args: &mut PgArguments, type_info: &PgTypeInfo, v: &Value) -> Result<(), String> {
    let type_name = type_info.name();

    if v.is_null() {
        return match type_name {
            "INT2" => args_add(args, Option::<i16>::None),
            "INT4" => args_add(args, Option::<i32>::None),
            "INT8" => args_add(args, Option::<i64>::None),
            "FLOAT4" => args_add(args, Option::<f32>::None),
            "FLOAT8" => args_add(args, Option::<f64>::None),
            "NUMERIC" => args_add(args, Option::<BigDecimal>::None),
            "BOOL" => args_add(args, Option::<bool>::None),
            "UUID" => args_add(args, Option::<uuid::Uuid>::None),
            "JSON" | "JSONB" => args_add(args, Option::<sqlx::types::Json<Value>>::None),
            "DATE" => args_add(args, Option::<NaiveDate>::None),
            "TIME" => args_add(args, Option::<NaiveTime>::None),
            "TIMESTAMP" => args_add(args, Option::<NaiveDateTime>::None),
            "TIMESTAMPTZ" => args_add(args, Option::<DateTime<Utc>>::None),
            _ => args_add(args, Option::<String>::None),
        };
    }

    match type_name {
        "INT2" => {
            let n = as_integer(v)?;
            args_add(args, i16::try_from(n).map_err(|_| out_of_range(n, type_name))?)
        }
        "INT4" => {
            let n = as_integer(v)?;
            args_add(args, i32::try_from(n).map_err(|_| out_of_range(n, type_name))?)
        }
        "INT8" => args_add(args, as_integer(v)?),
        "FLOAT4" => args_add(args, as_float(v)? as f32),
        "FLOAT8" => args_add(args, as_float(v)?),
        "NUMERIC" => {
            let text = match v {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.trim().to_string(),
                other => return Err(format!("expected number, got {}", other)),
            };
            let d = BigDecimal::from_str(&text).map_err(|e| format!("invalid numeric '{}': {}", text, e))?;
            args_add(args, d)
        }
        "BOOL" => {
            let b = match v {
                Value::Bool(b) => *b,
                Value::String(s) if s.eq_ignore_ascii_case("true") => true,
                Value::String(s) if s.eq_ignore_ascii_case("false") => false,
                Value::Number(n) if n.as_i64() == Some(1) => true,
                Value::Number(n) if n.as_i64() == Some(0) => false,
                other => return Err(format!("expected boolean, got {}", other)),
            };
            args_add(args, b)
        }
        "UUID" => {
            let s = as_text(v, "uuid string")?;
            let id = uuid::Uuid::parse_str(s).map_err(|e| e.to_string())?;
            args_add(args, id)
        }
        "JSON" | "JSONB" => args_add(args, sqlx::types::Json(v.clone())),
        "DATE" => {
            let s = as_text(v, "date string")?;
            let d = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())?;
            args_add(args, d)
        }
        "TIME" => {
            let s = as_text(v, "time string")?;
            let t = NaiveTime::from_str(s).map_err(|e| e.to_string())?;
            args_add(args, t)
        }
        "TIMESTAMP" => {
            let s = as_text(v, "timestamp string")?;
            args_add(args, parse_naive_timestamp(s)?)
        }
        "TIMESTAMPTZ" => {
            let s = as_text(v, "timestamp string")?;
            let ts = match DateTime::<FixedOffset>::parse_from_rfc3339(s) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(_) => parse_naive_timestamp(s)?.and_utc(),
            };
            args_add(args, ts)
        }
        _ => {
            // default to string
            let s = match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            args_add(args, s)
        }
    }
}

/// Whether an integral float converts to `i64` without saturating.
fn fits_i64(f: f64) -> bool {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (-LIMIT..LIMIT).contains(&f)
}

fn as_integer(v: &Value) -> Result<i64, String> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && fits_i64(*f)).map(|f| f as i64))
            .ok_or_else(|| format!("expected integer, got {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("expected integer, got '{}'", s)),
        other => Err(format!("expected integer, got {}", other)),
    }
}

fn as_float(v: &Value) -> Result<f64, String> {
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("expected number, got {}", n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected number, got '{}'", s)),
        other => Err(format!("expected number, got {}", other)),
    }
}

fn as_text<'a>(v: &'a Value, expected: &str) -> Result<&'a str, String> {
    v.as_str()
        .ok_or_else(|| format!("expected {}, got {}", expected, v))
}

fn out_of_range(n: i64, type_name: &str) -> String {
    format!("{} is out of range for {}", n, type_name)
}

fn parse_naive_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::from_str(s)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))
}

/// Convert a row into a column-name keyed JSON object.
///
/// Temporal values become ISO-8601 strings; numerics become decimal strings
/// so no precision is lost.
pub fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut obj = Map::new();

    for (index, col) in row.columns().iter().enumerate() {
        let value = decode_column(row, index, col.type_info().name()).unwrap_or_else(|e| {
            tracing::debug!(column = col.name(), error = %e, "Undecodable column value");
            Value::Null
        });
        obj.insert(col.name().to_string(), value);
    }

    obj
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(|f| json!(f)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(|f| json!(f)),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)?
            .map(|d| Value::String(d.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|u| Value::String(u.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|t| Value::String(t.format("%H:%M:%S%.f").to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|ts| Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|ts| Value::String(ts.to_rfc3339())),
        "TEXT[]" | "VARCHAR[]" | "NAME[]" => row
            .try_get::<Option<Vec<String>>, _>(index)?
            .map(Value::from),
        "INT4[]" => row.try_get::<Option<Vec<i32>>, _>(index)?.map(Value::from),
        "INT8[]" => row.try_get::<Option<Vec<i64>>, _>(index)?.map(Value::from),
        // Enums and other text-like types arrive as their text form.
        _ => row
            .try_get_unchecked::<Option<String>, _>(index)?
            .map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::error::ErrorKind;

    fn store_on_closed_port() -> StoreConfig {
        StoreConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            dbname: "shop".to_string(),
            connect_timeout_seconds: 2,
            ..Default::default()
        }
    }

    struct NoCredentials;

    impl CredentialSource for NoCredentials {
        fn resolve(&self, store: &StoreConfig) -> Result<Credentials, GatewayError> {
            Err(GatewayError::MissingCredential {
                what: "password",
                variable: store.password_env.clone(),
            })
        }
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(as_integer(&json!(5)).unwrap(), 5);
        assert_eq!(as_integer(&json!(5.0)).unwrap(), 5);
        assert_eq!(as_integer(&json!(" 12 ")).unwrap(), 12);
        assert!(as_integer(&json!(5.5)).is_err());
        assert!(as_integer(&json!("abc")).is_err());
        assert!(as_integer(&json!(true)).is_err());
        assert!(as_integer(&json!(1e20)).is_err());
        assert!(as_integer(&json!(-1e20)).is_err());
        assert!(as_integer(&json!(9_223_372_036_854_775_808.0)).is_err());
        assert_eq!(as_integer(&json!(-9_223_372_036_854_775_808.0)).unwrap(), i64::MIN);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(as_float(&json!(2)).unwrap(), 2.0);
        assert_eq!(as_float(&json!("2.5")).unwrap(), 2.5);
        assert!(as_float(&json!([1])).is_err());
    }

    #[test]
    fn test_timestamp_parsing() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_naive_timestamp("2024-03-01T10:30:00").unwrap(), expected);
        assert_eq!(parse_naive_timestamp("2024-03-01 10:30:00").unwrap(), expected);
        assert_eq!(
            parse_naive_timestamp("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_time(NaiveTime::MIN)
        );
        assert!(parse_naive_timestamp("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_missing_credentials_do_not_connect() {
        let backend = PostgresBackend::with_credentials(store_on_closed_port(), Arc::new(NoCredentials));
        let err = backend.execute("select 1", &[], false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredential);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connection_failure() {
        let backend = PostgresBackend::with_credentials(
            store_on_closed_port(),
            Arc::new(StaticCredentials(Credentials {
                user: "app".to_string(),
                password: "pw".to_string(),
            })),
        );
        let err = backend.execute("select 1", &[], false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }
}
