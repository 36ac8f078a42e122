//! Partial updates shared by the entity access modules.
//!
//! Each entity defines a typed patch (`UserChanges`, `CompanyPatch`,
//! `JobPatch`) whose fields are exactly the columns a caller may write.
//! A patch writes its present fields into [`Assignments`]; [`UpdateBuilder`]
//! turns those into a single parameterized statement:
//!
//! ```text
//! UPDATE <table> SET c1 = $1, c2 = $2::jsonb, updated_at = CURRENT_TIMESTAMP
//! WHERE id = $3 RETURNING *
//! ```
//!
//! An empty patch never reaches the database as an UPDATE; [`apply`] falls
//! back to a fetch-by-id so callers always get the current row (or `None`).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgRow},
    FromRow, PgPool,
};

use crate::config;
use crate::database::manager::{log_query_error, DatabaseError};

/// A single bound value, tagged with how it must be bound.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i32>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
    /// JSON text, cast to `jsonb` in the statement.
    Json(Option<String>),
}

impl SqlValue {
    fn placeholder(&self, index: usize) -> String {
        match self {
            SqlValue::Json(_) => format!("${}::jsonb", index),
            _ => format!("${}", index),
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Option<i32>> for SqlValue {
    fn from(v: Option<i32>) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<Option<bool>> for SqlValue {
    fn from(v: Option<bool>) -> Self {
        SqlValue::Boolean(v)
    }
}

impl From<Option<NaiveDate>> for SqlValue {
    fn from(v: Option<NaiveDate>) -> Self {
        SqlValue::Date(v)
    }
}

/// Column assignments collected from a patch, in the order they were written.
#[derive(Debug, Default)]
pub struct Assignments(Vec<(&'static str, SqlValue)>);

impl Assignments {
    /// Write a NOT NULL column when the patch carries a value.
    pub fn required<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        Option<T>: Into<SqlValue>,
    {
        if let Some(v) = value {
            self.0.push((column, Some(v).into()));
        }
        self
    }

    /// Write a nullable column; `Some(None)` clears it.
    pub fn nullable<T>(&mut self, column: &'static str, value: Option<Option<T>>) -> &mut Self
    where
        Option<T>: Into<SqlValue>,
    {
        if let Some(v) = value {
            self.0.push((column, v.into()));
        }
        self
    }

    /// Write a jsonb column from whatever shape the client sent.
    pub fn json(&mut self, column: &'static str, value: Option<Value>) -> &mut Self {
        if let Some(v) = value {
            self.0.push((column, SqlValue::Json(normalize_json_text(v))));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.0.iter().map(|(c, _)| *c).collect()
    }
}

/// A typed set of column changes for one table.
pub trait Patch {
    const TABLE: &'static str;

    fn write(self, out: &mut Assignments);
}

/// Builds and runs `UPDATE ... RETURNING *` for one patch.
#[derive(Debug)]
pub struct UpdateBuilder {
    table: &'static str,
    assignments: Assignments,
}

impl UpdateBuilder {
    pub fn new<P: Patch>(patch: P) -> Self {
        let mut assignments = Assignments::default();
        patch.write(&mut assignments);
        Self {
            table: P::TABLE,
            assignments,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments.columns()
    }

    pub fn values(&self) -> Vec<&SqlValue> {
        self.assignments.0.iter().map(|(_, v)| v).collect()
    }

    /// Statement text; the id is always the last parameter.
    pub fn sql(&self) -> String {
        let mut sets: Vec<String> = self
            .assignments
            .0
            .iter()
            .enumerate()
            .map(|(i, (column, value))| format!("{} = {}", column, value.placeholder(i + 1)))
            .collect();
        sets.push("updated_at = CURRENT_TIMESTAMP".to_string());

        format!(
            "UPDATE {} SET {} WHERE id = ${} RETURNING *",
            self.table,
            sets.join(", "),
            self.assignments.0.len() + 1
        )
    }

    pub async fn fetch_optional<T>(self, pool: &PgPool, id: i32) -> Result<Option<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = self.sql();
        if config::config().database.enable_query_logging {
            tracing::debug!("{}", sql);
        }
        let mut q = sqlx::query_as::<_, T>(&sql);
        for (_, value) in self.assignments.0 {
            q = bind_value(q, value);
        }

        q.bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| log_query_error(self.table, e))
    }
}

/// Apply a patch to the row with `id`. An empty patch is a plain fetch.
pub async fn apply<P, T>(pool: &PgPool, id: i32, patch: P) -> Result<Option<T>, DatabaseError>
where
    P: Patch,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let builder = UpdateBuilder::new(patch);
    if builder.is_empty() {
        return fetch_by_id(pool, P::TABLE, id).await;
    }

    tracing::debug!("Updating {} {} ({:?})", P::TABLE, id, builder.columns());
    builder.fetch_optional(pool, id).await
}

pub(crate) async fn fetch_by_id<T>(pool: &PgPool, table: &'static str, id: i32) -> Result<Option<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {} WHERE id = $1", table);
    sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| log_query_error(table, e))
}

pub(crate) fn bind_value<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: SqlValue,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        SqlValue::Text(s) => q.bind(s),
        SqlValue::Integer(i) => q.bind(i),
        SqlValue::Boolean(b) => q.bind(b),
        SqlValue::Date(d) => q.bind(d),
        SqlValue::Json(j) => q.bind(j),
    }
}

/// Normalize a client value destined for a jsonb column.
///
/// Structured values and scalars are serialized; strings are parsed and
/// re-serialized, or passed through untouched when they are not JSON (the
/// column then rejects them with a typed `InvalidInput` error).
pub fn normalize_json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => Some(parsed.to_string()),
            Err(_) => Some(raw),
        },
        other => Some(other.to_string()),
    }
}

/// `#[serde(default, deserialize_with = "double_option")]`: absent stays
/// `None`, explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Keeps an explicit `null` as `Some(Value::Null)` for jsonb fields.
pub fn present_json<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Salary-style integers: numbers or numeric strings; empty, zero or
/// unparsable input means "no value".
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(parse_lenient_int(&Value::deserialize(deserializer)?)))
}

pub fn parse_lenient_int(value: &Value) -> Option<i32> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => leading_integer(s),
        _ => None,
    }?;

    match i32::try_from(parsed) {
        Ok(0) | Err(_) => None,
        Ok(v) => Some(v),
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().map(|v| sign * v)
}

/// Dates from form inputs: `YYYY-MM-DD` (or an RFC 3339 timestamp); an
/// empty string or `null` clears the column.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Some(None)),
        Some(s) => parse_date(s)
            .map(|d| Some(Some(d)))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", s))),
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.date_naive())
    })
}
