use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{binary, Flag, Reading};
use crate::{
    error::{Error, Result},
    stats::{self, MotionStats, MotionTotals},
};

/// One motion-sensor observation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MotionReading {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    /// 0 = no motion, 1 = motion detected.
    pub motion_detected: i32,
    /// 0 = idle, 1 = alarm raised.
    pub alarm_triggered: i32,
}

/// Create/update payload. Both flags are required on create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionFields {
    pub recorded_at: Option<DateTime<Utc>>,
    pub motion_detected: Option<i64>,
    pub alarm_triggered: Option<i64>,
}

/// Subsets exposed as their own paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionFlag {
    MotionDetected,
    AlarmTriggered,
}

impl Flag<MotionReading> for MotionFlag {
    fn column(self) -> &'static str {
        match self {
            MotionFlag::MotionDetected => "motion_detected",
            MotionFlag::AlarmTriggered => "alarm_triggered",
        }
    }

    fn is_set(self, record: &MotionReading) -> bool {
        match self {
            MotionFlag::MotionDetected => record.motion_detected == 1,
            MotionFlag::AlarmTriggered => record.alarm_triggered == 1,
        }
    }
}

impl Reading for MotionReading {
    type Fields = MotionFields;
    type Flag = MotionFlag;
    type Stats = MotionStats;
    type Totals = MotionTotals;

    const TABLE: &'static str = "motion_readings";
    const COLUMNS: &'static [&'static str] = &["motion_detected", "alarm_triggered"];
    const FIELDS: &'static [&'static str] = &["movimiento", "alarma"];
    const NOUN: &'static str = "movimiento";
    const TOTALS_SQL: &'static str = stats::MOTION_TOTALS_SQL;

    fn id(&self) -> Uuid {
        self.id
    }

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    fn values(&self) -> Vec<i32> {
        vec![self.motion_detected, self.alarm_triggered]
    }

    fn create(id: Uuid, now: DateTime<Utc>, fields: MotionFields) -> Result<Self> {
        let (Some(motion), Some(alarm)) = (fields.motion_detected, fields.alarm_triggered) else {
            return Err(Error::Validation(
                "movimiento y alarma son campos requeridos".to_owned(),
            ));
        };
        Ok(Self {
            id,
            recorded_at: fields.recorded_at.unwrap_or(now),
            motion_detected: binary("movimiento", motion)?,
            alarm_triggered: binary("alarma", alarm)?,
        })
    }

    fn apply(&mut self, fields: MotionFields) -> Result<()> {
        let motion = fields.motion_detected.map(|v| binary("movimiento", v)).transpose()?;
        let alarm = fields.alarm_triggered.map(|v| binary("alarma", v)).transpose()?;

        if let Some(ts) = fields.recorded_at {
            self.recorded_at = ts;
        }
        if let Some(motion) = motion {
            self.motion_detected = motion;
        }
        if let Some(alarm) = alarm {
            self.alarm_triggered = alarm;
        }
        Ok(())
    }

    fn totals(records: &[Self]) -> MotionTotals {
        stats::motion_totals(records)
    }
}
