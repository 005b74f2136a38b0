//! Summary statistics over a set of readings.
//!
//! Every field is always present and numeric: an empty set yields zeros,
//! never `NaN` or `null`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::readings::{GasReading, MotionReading};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GasStats {
    #[serde(rename = "totalRecords")]
    pub total_records: u64,
    /// Mean gas level in ppm, rounded to 2 decimals.
    #[serde(rename = "avgNivelGas")]
    pub avg_gas_level: f64,
    #[serde(rename = "maxNivelGas")]
    pub max_gas_level: i32,
    #[serde(rename = "minNivelGas")]
    pub min_gas_level: i32,
    /// Readings with the fan on.
    #[serde(rename = "ventiladorActivado")]
    pub fan_activations: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MotionStats {
    #[serde(rename = "totalRecords")]
    pub total_records: u64,
    #[serde(rename = "movimientoDetectado")]
    pub motion_detected: u64,
    #[serde(rename = "alarmaActivada")]
    pub alarm_activated: u64,
    /// `100 * motion_detected / total_records`, rounded to 2 decimals.
    #[serde(rename = "porcentajeMovimiento")]
    pub motion_pct: f64,
    #[serde(rename = "porcentajeAlarma")]
    pub alarm_pct: f64,
}

// ---------------------------------------------------------------------------
// Raw aggregates
// ---------------------------------------------------------------------------

/// Unrounded gas aggregates as a store computes them. `None` on an empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct GasTotals {
    pub total_records: i64,
    pub avg_gas_level: Option<f64>,
    pub max_gas_level: Option<i32>,
    pub min_gas_level: Option<i32>,
    pub fan_activations: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, FromRow)]
pub struct MotionTotals {
    pub total_records: i64,
    pub motion_detected: i64,
    pub alarm_activated: i64,
}

/// Select list producing a [`GasTotals`] row over `gas_readings`.
pub const GAS_TOTALS_SQL: &str = "COUNT(*) AS total_records, \
     AVG(gas_level)::DOUBLE PRECISION AS avg_gas_level, \
     MAX(gas_level) AS max_gas_level, \
     MIN(gas_level) AS min_gas_level, \
     COUNT(*) FILTER (WHERE fan_state = 1) AS fan_activations";

/// Select list producing a [`MotionTotals`] row over `motion_readings`.
pub const MOTION_TOTALS_SQL: &str = "COUNT(*) AS total_records, \
     COUNT(*) FILTER (WHERE motion_detected = 1) AS motion_detected, \
     COUNT(*) FILTER (WHERE alarm_triggered = 1) AS alarm_activated";

impl From<GasTotals> for GasStats {
    fn from(t: GasTotals) -> Self {
        Self {
            total_records: count(t.total_records),
            avg_gas_level: t.avg_gas_level.map(round2).unwrap_or_default(),
            max_gas_level: t.max_gas_level.unwrap_or_default(),
            min_gas_level: t.min_gas_level.unwrap_or_default(),
            fan_activations: count(t.fan_activations),
        }
    }
}

impl From<MotionTotals> for MotionStats {
    fn from(t: MotionTotals) -> Self {
        let total = count(t.total_records);
        let motion_detected = count(t.motion_detected);
        let alarm_activated = count(t.alarm_activated);
        Self {
            total_records: total,
            motion_detected,
            alarm_activated,
            motion_pct: percentage(motion_detected, total),
            alarm_pct: percentage(alarm_activated, total),
        }
    }
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// In-process folds
// ---------------------------------------------------------------------------

pub fn gas_totals(records: &[GasReading]) -> GasTotals {
    let Some(first) = records.first() else {
        return GasTotals::default();
    };

    let mut sum = 0i64;
    let mut min = first.gas_level;
    let mut max = first.gas_level;
    let mut fan_activations = 0i64;

    for r in records {
        sum += i64::from(r.gas_level);
        min = min.min(r.gas_level);
        max = max.max(r.gas_level);
        if r.fan_state == 1 {
            fan_activations += 1;
        }
    }

    let total = records.len() as i64;
    GasTotals {
        total_records: total,
        avg_gas_level: Some(sum as f64 / total as f64),
        max_gas_level: Some(max),
        min_gas_level: Some(min),
        fan_activations,
    }
}

pub fn motion_totals(records: &[MotionReading]) -> MotionTotals {
    MotionTotals {
        total_records: records.len() as i64,
        motion_detected: records.iter().filter(|r| r.motion_detected == 1).count() as i64,
        alarm_activated: records.iter().filter(|r| r.alarm_triggered == 1).count() as i64,
    }
}

pub fn gas(records: &[GasReading]) -> GasStats {
    gas_totals(records).into()
}

pub fn motion(records: &[MotionReading]) -> MotionStats {
    motion_totals(records).into()
}

/// `100 * part / total` rounded to 2 decimals; 0 when `total` is 0.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
