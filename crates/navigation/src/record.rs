//! Control-loop log records

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One control update's worth of telemetry.
///
/// Emitted by the machine every time a PID step drove the motors; collected
/// over a channel and persisted as CSV by the binary on shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub frame_index: u64,
    pub error_lower: i32,
    pub error_upper: i32,
    pub mass: i32,
    pub p: f32,
    pub i: f32,
    pub d: f32,
    pub correction: f32,
    pub speed_left: u8,
    pub speed_right: u8,
    pub speed_ref_left: f32,
    pub speed_ref_right: f32,
    pub tacho_left: Option<i32>,
    pub tacho_right: Option<i32>,
}

impl LogRecord {
    /// CSV header matching [`LogRecord::to_csv_row`]
    pub const CSV_HEADER: &'static str = "timestamp,frame_index,error_lower,error_upper,mass,\
        p,i,d,correction,speed_left,speed_right,speed_ref_left,speed_ref_right,\
        tacho_left,tacho_right";

    /// Render one CSV row; optional tachometer columns are left empty
    pub fn to_csv_row(&self) -> String {
        let tacho = |v: Option<i32>| v.map(|t| t.to_string()).unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.timestamp.to_rfc3339(),
            self.frame_index,
            self.error_lower,
            self.error_upper,
            self.mass,
            self.p,
            self.i,
            self.d,
            self.correction,
            self.speed_left,
            self.speed_right,
            self.speed_ref_left,
            self.speed_ref_right,
            tacho(self.tacho_left),
            tacho(self.tacho_right),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_row_column_count() {
        let record = LogRecord {
            timestamp: Utc::now(),
            frame_index: 7,
            error_lower: -12,
            error_upper: 3,
            mass: 5400,
            p: 1.5,
            i: 0.25,
            d: -0.5,
            correction: 1.25,
            speed_left: 90,
            speed_right: 110,
            speed_ref_left: 88.75,
            speed_ref_right: 111.25,
            tacho_left: None,
            tacho_right: None,
        };
        let row = record.to_csv_row();
        assert_eq!(
            row.matches(',').count(),
            LogRecord::CSV_HEADER.matches(',').count()
        );
        assert!(row.ends_with(",,"));
    }
}
