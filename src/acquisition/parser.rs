//! Frame validation and decoding.
//!
//! A frame is one line from the sensor bus: tab-separated fields terminated by
//! a newline. The parser accepts a frame only when it splits into exactly the
//! schema's transmitted field count and the voltage and current fields are
//! numbers. Accepted frames become a [`Reading`] with the receipt time
//! prepended and the derived power value inserted.

use crate::acquisition::data::{format_value, round2, Reading};
use crate::error::{Result, TelemetryError};
use crate::schema::FrameSchema;
use chrono::{DateTime, Local};

/// Turns raw frames into readings.
#[derive(Debug, Clone)]
pub struct FrameParser {
    schema: FrameSchema,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self {
            schema: FrameSchema::default(),
        }
    }
}

impl FrameParser {
    /// Create a parser for the given schema.
    pub fn new(schema: FrameSchema) -> Result<Self> {
        schema.validate()?;
        Ok(Self { schema })
    }

    /// The schema this parser validates against.
    pub fn schema(&self) -> &FrameSchema {
        &self.schema
    }

    /// Parse a frame, stamping it with the current local time.
    pub fn parse(&self, raw: &[u8]) -> Result<Reading> {
        self.parse_at(raw, Local::now())
    }

    /// Parse a frame received at `received`.
    pub fn parse_at(&self, raw: &[u8], received: DateTime<Local>) -> Result<Reading> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| TelemetryError::malformed_frame(format!("not UTF-8: {}", e)))?;
        let fields: Vec<&str> = text.trim_end().split('\t').collect();

        if fields.len() != self.schema.transmitted_fields {
            return Err(TelemetryError::malformed_frame(format!(
                "expected {} fields, got {}",
                self.schema.transmitted_fields,
                fields.len()
            )));
        }

        let voltage = parse_number(&fields, self.schema.voltage_field)?;
        let current = parse_number(&fields, self.schema.current_field)?;
        let power = round2(current * voltage);

        let mut channels: Vec<String> = fields.iter().map(|f| f.trim().to_string()).collect();
        // Row column N is channel N - 1 once the timestamp is prepended.
        channels.insert(self.schema.power_column - 1, format_value(power));

        Ok(Reading::new(received, channels, power))
    }
}

fn parse_number(fields: &[&str], index: usize) -> Result<f64> {
    let raw = fields[index].trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TelemetryError::MalformedNumber {
            field: index,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::COLUMN_LABELS;
    use chrono::TimeZone;

    const SCENARIO_A: &str = "1.0\t12.5\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t0";

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 4, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_accepts_twelve_fields() {
        let parser = FrameParser::default();
        let reading = parser.parse_at(SCENARIO_A.as_bytes(), at()).unwrap();

        assert_eq!(reading.power, 25.0);
        assert_eq!(reading.width(), COLUMN_LABELS.len());
        assert_eq!(
            reading.row(),
            vec![
                "10:30:00", "1.0", "12.5", "25.0", "2.0", "10", "5", "1", "90", "1000", "50",
                "40", "0", "0"
            ]
        );
    }

    #[test]
    fn test_strips_line_terminators() {
        let parser = FrameParser::default();
        let raw = format!("{}\r\n", SCENARIO_A);
        let reading = parser.parse_at(raw.as_bytes(), at()).unwrap();
        assert_eq!(reading.column(13).as_deref(), Some("0"));
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        let parser = FrameParser::default();
        let eleven = "1.0\t12.5\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0";
        let thirteen = format!("{}\t7", SCENARIO_A);

        for raw in [eleven, thirteen.as_str(), "", "\n", "garbage"] {
            let err = parser.parse_at(raw.as_bytes(), at()).unwrap_err();
            assert!(matches!(err, TelemetryError::MalformedFrame(_)), "{:?}", raw);
        }
    }

    #[test]
    fn test_rejects_non_numeric_voltage() {
        let parser = FrameParser::default();
        let raw = "1.0\tX\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t0";
        let err = parser.parse_at(raw.as_bytes(), at()).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedNumber { field: 1, .. }));
    }

    #[test]
    fn test_rejects_non_numeric_current() {
        let parser = FrameParser::default();
        let raw = "1.0\t12.5\t--\t10\t5\t1\t90\t1000\t50\t40\t0\t0";
        let err = parser.parse_at(raw.as_bytes(), at()).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedNumber { field: 2, .. }));
    }

    #[test]
    fn test_trailing_tab_is_stripped() {
        // The trailing tab goes with the rest of the trailing whitespace,
        // leaving eleven fields.
        let parser = FrameParser::default();
        let raw = "1.0\t12.5\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t";
        let err = parser.parse_at(raw.as_bytes(), at()).unwrap_err();
        assert!(matches!(err, TelemetryError::MalformedFrame(_)));
    }

    #[test]
    fn test_rejects_non_finite_numbers() {
        let parser = FrameParser::default();
        let raw = "1.0\tNaN\t2.0\t10\t5\t1\t90\t1000\t50\t40\t0\t0";
        assert!(parser.parse_at(raw.as_bytes(), at()).is_err());
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let parser = FrameParser::default();
        let mut raw = SCENARIO_A.as_bytes().to_vec();
        raw[0] = 0xff;
        let err = parser.parse_at(&raw, at()).unwrap_err();
        assert!(err.is_frame_rejection());
    }

    #[test]
    fn test_power_rounding() {
        let parser = FrameParser::default();
        let raw = "0\t48.37\t3.21\t0\t0\t0\t0\t0\t0\t0\t0\t0";
        let reading = parser.parse_at(raw.as_bytes(), at()).unwrap();
        assert_eq!(reading.power, round2(48.37 * 3.21));
        assert_eq!(reading.column(3).as_deref(), Some("155.27"));
    }

    #[test]
    fn test_power_ties_round_to_even() {
        let parser = FrameParser::default();
        let raw = "1.0\t12.5\t0.01\t10\t5\t1\t90\t1000\t50\t40\t0\t0";
        let reading = parser.parse_at(raw.as_bytes(), at()).unwrap();
        assert_eq!(reading.power, 0.12);
        assert_eq!(reading.column(3).as_deref(), Some("0.12"));

        let raw = "1.0\t2.5\t0.05\t10\t5\t1\t90\t1000\t50\t40\t0\t0";
        let reading = parser.parse_at(raw.as_bytes(), at()).unwrap();
        assert_eq!(reading.column(3).as_deref(), Some("0.12"));
    }

    #[test]
    fn test_configured_field_count() {
        let schema = FrameSchema::default().with_transmitted_fields(4);
        let parser = FrameParser::new(schema).unwrap();
        let reading = parser.parse_at(b"1\t10\t2\t7\n", at()).unwrap();
        assert_eq!(reading.row(), vec!["10:30:00", "1", "10", "20.0", "2", "7"]);
        assert!(parser.parse_at(SCENARIO_A.as_bytes(), at()).is_err());
    }
}
