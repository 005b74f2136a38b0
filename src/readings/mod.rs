pub mod gas;
pub mod motion;
pub mod service;

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use crate::error::{Error, Result};

pub use gas::{GasFields, GasReading};
pub use motion::{MotionFields, MotionFlag, MotionReading};
pub use service::{Page, ReadingService};

/// Column holding the capture time in every readings table.
pub const TIMESTAMP_COLUMN: &str = "recorded_at";
/// Wire name of the capture time, as the dashboards expect it.
pub const TIMESTAMP_FIELD: &str = "fecha_hora";

/// Inclusive bounds for `gas_level`, in ppm.
pub const GAS_LEVEL_MIN: i64 = 0;
pub const GAS_LEVEL_MAX: i64 = 10_000;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A timestamped sensor observation stored in its own table.
///
/// Everything that differs between reading types (columns, payload fields,
/// validation, statistics) lives behind this trait so that the query, storage
/// and service layers are written once.
///
/// Payload columns are all small integers (`INTEGER` in Postgres). `COLUMNS`
/// and `FIELDS` are parallel: column name in the database, field name on the
/// wire, in the same order as [`Reading::values`].
pub trait Reading:
    Clone + Debug + PartialEq + Send + Sync + Unpin + for<'r> FromRow<'r, PgRow> + 'static
{
    /// Create/update payload. Every field is optional; `create` decides which
    /// ones are required.
    type Fields: Debug + Send + 'static;
    /// Boolean columns a listing can be restricted to.
    type Flag: Flag<Self>;
    /// Summary produced by the aggregator.
    type Stats: Debug + Send + 'static;
    /// Unrounded aggregate row; a store computes it and it converts into `Stats`.
    type Totals: Debug + Send + Unpin + for<'r> FromRow<'r, PgRow> + Into<Self::Stats> + 'static;

    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const FIELDS: &'static [&'static str];
    /// Spanish noun used in user-facing messages ("Registro de gas ...").
    const NOUN: &'static str;
    /// SQL select list yielding one `Totals` row.
    const TOTALS_SQL: &'static str;

    fn id(&self) -> Uuid;
    fn recorded_at(&self) -> DateTime<Utc>;

    /// Payload column values, in `COLUMNS` order.
    fn values(&self) -> Vec<i32>;

    /// Build a new record, failing with `Error::Validation` when a required
    /// field is absent or out of domain. `now` is used when no timestamp is given.
    fn create(id: Uuid, now: DateTime<Utc>, fields: Self::Fields) -> Result<Self>;

    /// Apply the fields present in `fields`, leaving the others untouched.
    /// The record is left unchanged if any provided field is invalid.
    fn apply(&mut self, fields: Self::Fields) -> Result<()>;

    /// Fold `records` in process, for stores without a query engine.
    fn totals(records: &[Self]) -> Self::Totals;

    /// Resolve a sort field, given by wire or column name, to its column.
    fn sort_column(field: &str) -> Option<&'static str> {
        if field == TIMESTAMP_FIELD || field == TIMESTAMP_COLUMN {
            return Some(TIMESTAMP_COLUMN);
        }
        Self::COLUMNS
            .iter()
            .zip(Self::FIELDS)
            .find(|(column, wire)| **column == field || **wire == field)
            .map(|(column, _)| *column)
    }

    /// Comparable key for `column`, used by stores that sort in process.
    fn sort_key(&self, column: &str) -> i64 {
        if column == TIMESTAMP_COLUMN {
            return self.recorded_at().timestamp_micros();
        }
        Self::COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.values().get(i).copied())
            .map(i64::from)
            .unwrap_or_default()
    }
}

/// A `{0, 1}` column that can be used as a listing predicate (`column = 1`).
pub trait Flag<R>: Copy + Debug + Send + Sync + 'static {
    fn column(self) -> &'static str;
    fn is_set(self, record: &R) -> bool;
}

/// Flag type for readings that expose no flag listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoFlag {}

impl<R> Flag<R> for NoFlag {
    fn column(self) -> &'static str {
        match self {}
    }

    fn is_set(self, _record: &R) -> bool {
        match self {}
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

pub(crate) fn gas_level(value: i64) -> Result<i32> {
    if !(GAS_LEVEL_MIN..=GAS_LEVEL_MAX).contains(&value) {
        return Err(Error::Validation(format!(
            "nivel_gas debe estar entre {GAS_LEVEL_MIN} y {GAS_LEVEL_MAX}, se recibió {value}"
        )));
    }
    // Range-checked above.
    Ok(value as i32)
}

/// Boolean-as-integer fields only accept 0 and 1.
pub(crate) fn binary(field: &str, value: i64) -> Result<i32> {
    match value {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(Error::Validation(format!(
            "{field} debe ser 0 o 1, se recibió {other}"
        ))),
    }
}
