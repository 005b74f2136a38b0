use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::Error,
    query::{self, PageSpec},
    readings::{GasFields, GasReading, MotionFields, MotionReading, Page},
};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Gas reading as served to the dashboards.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GasReadingDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "fecha_hora")]
    pub recorded_at: DateTime<Utc>,
    /// Parts per million, 0 to 10000.
    #[serde(rename = "nivel_gas")]
    pub gas_level: i32,
    /// Ventilator state: 0 = off, 1 = on.
    #[serde(rename = "ventilador")]
    pub fan_state: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MotionReadingDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "fecha_hora")]
    pub recorded_at: DateTime<Utc>,
    /// 0 = no motion, 1 = motion detected.
    #[serde(rename = "movimiento")]
    pub motion_detected: i32,
    /// 0 = idle, 1 = alarm raised.
    #[serde(rename = "alarma")]
    pub alarm_triggered: i32,
}

impl From<GasReading> for GasReadingDto {
    fn from(r: GasReading) -> Self {
        Self {
            id: r.id,
            recorded_at: r.recorded_at,
            gas_level: r.gas_level,
            fan_state: r.fan_state,
        }
    }
}

impl From<MotionReading> for MotionReadingDto {
    fn from(r: MotionReading) -> Self {
        Self {
            id: r.id,
            recorded_at: r.recorded_at,
            motion_detected: r.motion_detected,
            alarm_triggered: r.alarm_triggered,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /api/gas` (all fields but `fecha_hora` required) and
/// `PUT /api/gas/{id}` (any subset).
///
/// Outer `None` is an absent field, `Some(None)` an explicit `null`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GasReadingPayload {
    /// Capture time. Defaults to the time of creation.
    #[serde(rename = "fecha_hora", default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub recorded_at: Option<Option<String>>,
    #[serde(rename = "nivel_gas", default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub gas_level: Option<Option<i64>>,
    #[serde(rename = "ventilador", default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub fan_state: Option<Option<i64>>,
}

/// Body for `POST /api/motion` and `PUT /api/motion/{id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MotionReadingPayload {
    #[serde(rename = "fecha_hora", default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub recorded_at: Option<Option<String>>,
    #[serde(rename = "movimiento", default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub motion_detected: Option<Option<i64>>,
    #[serde(rename = "alarma", default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>)]
    pub alarm_triggered: Option<Option<i64>>,
}

// Only called when the key is present, so `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn not_null<T>(field: &str, value: Option<Option<T>>) -> Result<Option<T>, Error> {
    match value {
        Some(None) => Err(Error::Validation(format!("{field} no puede ser nulo"))),
        Some(Some(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}

fn timestamp(raw: Option<Option<String>>) -> Result<Option<DateTime<Utc>>, Error> {
    not_null("fecha_hora", raw)?
        .map(|raw| {
            query::parse_timestamp(&raw)
                .ok_or_else(|| Error::Validation(format!("fecha_hora inválida: {raw:?}")))
        })
        .transpose()
}

impl TryFrom<GasReadingPayload> for GasFields {
    type Error = Error;

    fn try_from(p: GasReadingPayload) -> Result<Self, Error> {
        Ok(Self {
            recorded_at: timestamp(p.recorded_at)?,
            gas_level: not_null("nivel_gas", p.gas_level)?,
            fan_state: not_null("ventilador", p.fan_state)?,
        })
    }
}

impl TryFrom<MotionReadingPayload> for MotionFields {
    type Error = Error;

    fn try_from(p: MotionReadingPayload) -> Result<Self, Error> {
        Ok(Self {
            recorded_at: timestamp(p.recorded_at)?,
            motion_detected: not_null("movimiento", p.motion_detected)?,
            alarm_triggered: not_null("alarma", p.alarm_triggered)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// `{ success, message?, data }`
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Paginated listing. `totalRecords` counts the whole matching set.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub total_pages: u64,
    pub current_page: u64,
    pub total_records: u64,
}

impl<T> PageEnvelope<T> {
    pub fn from_page<R: Into<T>>(page: Page<R>, spec: &PageSpec) -> Self {
        Self {
            success: true,
            data: page.records.into_iter().map(Into::into).collect(),
            total_pages: spec.total_pages(page.total),
            current_page: spec.page,
            total_records: page.total,
        }
    }
}

/// Unpaginated listing with its length.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListEnvelope<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub count: usize,
}

impl<T> ListEnvelope<T> {
    pub fn from_records<R: Into<T>>(records: Vec<R>) -> Self {
        let data: Vec<T> = records.into_iter().map(Into::into).collect();
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// `{ success, message }`, used for deletions and every failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

impl MessageEnvelope {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
