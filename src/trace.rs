use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::Configuration;
use crate::error::{Result, TraceError};

/// Literal prefix of the header row that precedes the data rows.
pub const HEADER_PREFIX: &str = "TIME,CH1,";

/// Volts-to-strain scale applied to the CH1 column.
pub const STRAIN_CALIBRATION: f64 = 0.00132 * 1.25;

/// Fixed offset added to the interferometer column.
pub const INTERFEROMETER_OFFSET: f64 = 0.04;

const TIME_COLUMN: usize = 0;
const STRAIN_COLUMN: usize = 1;
const INTERFEROMETER_COLUMN: usize = 3;
const MIN_FIELDS: usize = 5;

/// Time-aligned strain and interferometer samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    time: Vec<f64>,
    strain: Vec<f64>,
    interferometer: Vec<f64>,
}

impl Trace {
    /// Assembles a trace from already calibrated columns.
    pub fn new(time: Vec<f64>, strain: Vec<f64>, interferometer: Vec<f64>) -> Result<Self> {
        if time.len() != strain.len() || time.len() != interferometer.len() {
            return Err(TraceError::LengthMismatch {
                time: time.len(),
                strain: strain.len(),
                interferometer: interferometer.len(),
            });
        }
        Ok(Self {
            time,
            strain,
            interferometer,
        })
    }

    /// Parses oscilloscope CSV text.
    ///
    /// Lines before the `TIME,CH1,` header are ignored. Data rows are counted
    /// from 1 after the header; rows before `start_line_index` are skipped and
    /// parsing stops after `end_line_index`. A row needs at least five fields
    /// with numeric columns 0, 1 and 3, anything else is dropped silently.
    pub fn parse(text: &str, config: &Configuration) -> Self {
        let mut trace = Trace::default();

        let Some(body) = body_after_header(text) else {
            log::debug!("no {:?} header found, trace is empty", HEADER_PREFIX);
            return trace;
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(body.as_bytes());

        let mut skipped = 0usize;
        let mut record = csv::StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    log::trace!("unreadable row skipped: {}", e);
                    skipped += 1;
                    continue;
                }
            }

            let row = record.position().map_or(0, |p| p.line() as usize);
            if row < config.start_line_index {
                continue;
            }
            if row > config.end_line_index {
                break;
            }

            match parse_row(&record) {
                Some((t, strain, interferometer)) => {
                    trace.time.push(t);
                    trace.strain.push(strain * STRAIN_CALIBRATION);
                    trace.interferometer.push(interferometer + INTERFEROMETER_OFFSET);
                }
                None => {
                    log::trace!("malformed row {} skipped", row);
                    skipped += 1;
                }
            }
        }

        log::debug!("parsed {} samples, skipped {} malformed rows", trace.len(), skipped);
        trace
    }

    /// Reads and parses a trace file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: &Configuration) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text, config))
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn strain(&self) -> &[f64] {
        &self.strain
    }

    pub fn interferometer(&self) -> &[f64] {
        &self.interferometer
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Returns a copy with constant offsets added to both signal channels.
    pub fn with_offsets(&self, strain_offset: f64, interferometer_offset: f64) -> Self {
        Self {
            time: self.time.clone(),
            strain: self.strain.iter().map(|v| v + strain_offset).collect(),
            interferometer: self
                .interferometer
                .iter()
                .map(|v| v + interferometer_offset)
                .collect(),
        }
    }
}

fn body_after_header(text: &str) -> Option<&str> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim_start().starts_with(HEADER_PREFIX) {
            return Some(&text[offset..]);
        }
    }
    None
}

fn parse_row(record: &csv::StringRecord) -> Option<(f64, f64, f64)> {
    if record.len() < MIN_FIELDS {
        return None;
    }
    let field = |i: usize| {
        record
            .get(i)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    Some((
        field(TIME_COLUMN)?,
        field(STRAIN_COLUMN)?,
        field(INTERFEROMETER_COLUMN)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE: &str = "\
Model,DS1104Z
Sampling,1e-9
TIME,CH1,CH2,CH3,CH4
0.0e-9,1.0,9,0.10,0
1.0e-9,2.0,9,0.20,0
2.0e-9,oops,9,0.30,0
3.0e-9,4.0,9,0.40
4.0e-9,5.0,9,0.50,0
5.0e-9,6.0,9,0.60,0
";

    fn unbounded() -> Configuration {
        Configuration::default().with_line_range(0, usize::MAX)
    }

    #[test]
    fn test_parse_applies_calibration() {
        let trace = Trace::parse(SAMPLE, &unbounded());
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.time(), &[0.0, 1.0e-9, 4.0e-9, 5.0e-9]);
        assert_abs_diff_eq!(trace.strain()[0], 0.00165, epsilon = 1e-15);
        assert_abs_diff_eq!(trace.strain()[1], 2.0 * STRAIN_CALIBRATION, epsilon = 1e-15);
        assert_abs_diff_eq!(trace.interferometer()[0], 0.14, epsilon = 1e-15);
        assert_abs_diff_eq!(trace.interferometer()[3], 0.64, epsilon = 1e-15);
    }

    #[test]
    fn test_line_range_is_inclusive() {
        // Rows 2..=5: row 3 has a bad CH1, row 4 has too few fields
        let config = Configuration::default().with_line_range(2, 5);
        let trace = Trace::parse(SAMPLE, &config);
        assert_eq!(trace.time(), &[1.0e-9, 4.0e-9]);
    }

    #[test]
    fn test_blank_lines_still_count() {
        let text = "TIME,CH1,CH2,CH3,CH4\n0,1,0,1,0\n\n2,1,0,1,0\n3,1,0,1,0\n";
        let config = Configuration::default().with_line_range(3, 3);
        let trace = Trace::parse(text, &config);
        assert_eq!(trace.time(), &[2.0]);
    }

    #[test]
    fn test_missing_header_gives_empty_trace() {
        let trace = Trace::parse("0,1,2,3,4\n1,2,3,4,5\n", &unbounded());
        assert!(trace.is_empty());
        assert!(Trace::parse("", &unbounded()).is_empty());
    }

    #[test]
    fn test_non_finite_rows_skipped() {
        let text = "TIME,CH1,CH2,CH3,CH4\nNaN,1,0,1,0\n1,inf,0,1,0\n2,1,0,1,0\n";
        let trace = Trace::parse(text, &unbounded());
        assert_eq!(trace.time(), &[2.0]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Trace::from_file("/nonexistent/trace.csv", &Configuration::default());
        assert!(matches!(result, Err(TraceError::Io { .. })));
    }

    #[test]
    fn test_new_rejects_mismatched_columns() {
        let result = Trace::new(vec![0.0, 1.0], vec![0.0], vec![0.0, 1.0]);
        assert!(matches!(result, Err(TraceError::LengthMismatch { strain: 1, .. })));
    }

    #[test]
    fn test_with_offsets() {
        let trace = Trace::new(vec![0.0, 1.0], vec![1.0, 2.0], vec![0.5, 0.5]).unwrap();
        let shifted = trace.with_offsets(-1.0, 0.25);
        assert_eq!(shifted.time(), trace.time());
        assert_eq!(shifted.strain(), &[0.0, 1.0]);
        assert_eq!(shifted.interferometer(), &[0.75, 0.75]);
    }
}
