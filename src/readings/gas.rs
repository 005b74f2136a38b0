use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{binary, gas_level, NoFlag, Reading};
use crate::{
    error::{Error, Result},
    stats::{self, GasStats, GasTotals},
};

/// One gas-sensor observation. `fan_state` is the ventilator status at capture time.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GasReading {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// Parts per million, `0..=10000`.
    pub gas_level: i32,
    /// 0 = off, 1 = on.
    pub fan_state: i32,
}

/// Create/update payload. `gas_level` and `fan_state` are required on create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasFields {
    pub recorded_at: Option<DateTime<Utc>>,
    pub gas_level: Option<i64>,
    pub fan_state: Option<i64>,
}

impl Reading for GasReading {
    type Fields = GasFields;
    type Flag = NoFlag;
    type Stats = GasStats;
    type Totals = GasTotals;

    const TABLE: &'static str = "gas_readings";
    const COLUMNS: &'static [&'static str] = &["gas_level", "fan_state"];
    const FIELDS: &'static [&'static str] = &["nivel_gas", "ventilador"];
    const NOUN: &'static str = "gas";
    const TOTALS_SQL: &'static str = stats::GAS_TOTALS_SQL;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    fn values(&self) -> Vec<i32> {
        vec![self.gas_level, self.fan_state]
    }

    fn create(id: Uuid, now: DateTime<Utc>, fields: GasFields) -> Result<Self> {
        let (Some(level), Some(fan)) = (fields.gas_level, fields.fan_state) else {
            return Err(Error::Validation(
                "nivel_gas y ventilador son campos requeridos".to_owned(),
            ));
        };
        Ok(Self {
            id,
            recorded_at: fields.recorded_at.unwrap_or(now),
            gas_level: gas_level(level)?,
            fan_state: binary("ventilador", fan)?,
        })
    }

    fn apply(&mut self, fields: GasFields) -> Result<()> {
        let level = fields.gas_level.map(gas_level).transpose()?;
        let fan = fields.fan_state.map(|v| binary("ventilador", v)).transpose()?;

        if let Some(ts) = fields.recorded_at {
            self.recorded_at = ts;
        }
        if let Some(level) = level {
            self.gas_level = level;
        }
        if let Some(fan) = fan {
            self.fan_state = fan;
        }
        Ok(())
    }

    fn totals(records: &[Self]) -> GasTotals {
        stats::gas_totals(records)
    }
}
