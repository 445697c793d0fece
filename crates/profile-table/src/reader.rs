//! Strict table reader and nearest-row lookup.
//!
//! This is the consumer side of the table contract, as the drag simulator
//! uses it: load every row, then answer "what is the atmosphere closest to
//! this time and altitude". Unlike a permissive scanner, any row that does not
//! carry all fourteen columns is an error, and so is a file whose last row is
//! not newline-terminated. A truncated table is rejected, never half-used.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use atmos_common::{parse_iso8601, AtmosphericSample, SpeciesDensities, TableError};

use crate::COLUMNS;

/// One data row of a profile table.
pub type ProfileRow = AtmosphericSample;

/// An in-memory profile table.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    rows: Vec<ProfileRow>,
}

impl ProfileTable {
    /// Read and parse a table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| TableError::io(path, e))?;
        let table = Self::parse(&text)?;
        debug!(path = %path.display(), rows = table.len(), "Loaded profile table");
        Ok(table)
    }

    /// Parse table text.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

        let (header_no, header) = lines
            .by_ref()
            .find(|(_, l)| !l.trim().is_empty())
            .ok_or(TableError::MissingHeader)?;
        check_header(header_no, header)?;

        let mut rows = Vec::new();
        let mut last_line = header_no;
        for (line_no, line) in lines {
            last_line = line_no;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            rows.push(parse_row(line_no, trimmed)?);
        }

        if !text.ends_with('\n') {
            return Err(TableError::malformed(
                last_line,
                "last row is not newline-terminated (truncated table?)",
            ));
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row closest to a time and altitude.
    ///
    /// Distance is `|Δt| in seconds + |Δaltitude| in meters / 1000`, so one
    /// kilometer weighs as much as one second. Ties go to the earlier row.
    pub fn nearest(&self, time: DateTime<Utc>, altitude_m: f64) -> Option<&ProfileRow> {
        let mut best: Option<(&ProfileRow, f64)> = None;
        for row in &self.rows {
            let dt = (row.time - time).num_milliseconds() as f64 / 1000.0;
            let score = dt.abs() + (row.altitude_m - altitude_m).abs() / 1000.0;
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((row, score));
            }
        }
        best.map(|(row, _)| row)
    }
}

fn check_header(line_no: usize, line: &str) -> Result<(), TableError> {
    let Some(body) = line.trim().strip_prefix('#') else {
        return Err(TableError::MissingHeader);
    };
    let names: Vec<&str> = body.split(',').map(str::trim).collect();
    if names != COLUMNS {
        return Err(TableError::malformed(
            line_no,
            format!("unexpected columns: {}", body.trim()),
        ));
    }
    Ok(())
}

fn parse_row(line_no: usize, line: &str) -> Result<ProfileRow, TableError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != COLUMNS.len() {
        return Err(TableError::malformed(
            line_no,
            format!("expected {} fields, found {}", COLUMNS.len(), fields.len()),
        ));
    }

    let time = parse_iso8601(fields[0]).map_err(|e| TableError::malformed(line_no, e.to_string()))?;

    let mut values = [0.0_f64; 13];
    for (slot, (name, raw)) in values
        .iter_mut()
        .zip(COLUMNS[1..].iter().zip(&fields[1..]))
    {
        *slot = raw.parse::<f64>().map_err(|_| {
            TableError::malformed(line_no, format!("column {}: '{}' is not a number", name, raw))
        })?;
    }

    Ok(AtmosphericSample {
        time,
        latitude_deg: values[0],
        longitude_deg: values[1],
        altitude_m: values[2],
        densities: SpeciesDensities {
            he: values[3],
            o: values[4],
            n2: values[5],
            o2: values[6],
            ar: values[7],
            h: values[8],
            n: values[9],
        },
        mass_density: values[10],
        exospheric_temperature: values[11],
        local_temperature: values[12],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header_line;
    use chrono::TimeZone;

    fn row(time: &str, alt: &str, o: &str) -> String {
        format!("{time}, 0, 0, {alt}, 1, {o}, 3, 4, 5, 6, 7, 0.000000000001, 900, 800\n")
    }

    fn table(rows: &[String]) -> String {
        let mut text = format!("{}\n", header_line());
        for r in rows {
            text.push_str(r);
        }
        text
    }

    #[test]
    fn test_parse_rows_in_order() {
        let text = table(&[
            row("2025-08-17T00:00:00", "300000", "10"),
            row("2025-08-17T00:00:00", "400000", "20"),
        ]);
        let t = ProfileTable::parse(&text).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[1].altitude_m, 400000.0);
        assert_eq!(t.rows()[1].densities.o, 20.0);
        assert_eq!(t.rows()[0].mass_density, 1e-12);
        assert_eq!(t.rows()[0].local_temperature, 800.0);
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let t = ProfileTable::parse(&table(&[])).unwrap();
        assert!(t.is_empty());
        assert!(t.nearest(Utc::now(), 0.0).is_none());
    }

    #[test]
    fn test_missing_header_rejected() {
        let text = row("2025-08-17T00:00:00", "300000", "10");
        assert!(matches!(ProfileTable::parse(&text), Err(TableError::MissingHeader)));
        assert!(matches!(ProfileTable::parse(""), Err(TableError::MissingHeader)));
    }

    #[test]
    fn test_wrong_columns_rejected() {
        let text = "# time_iso, lat_deg\n";
        assert!(matches!(
            ProfileTable::parse(text),
            Err(TableError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_short_row_rejected() {
        let mut text = table(&[row("2025-08-17T00:00:00", "300000", "10")]);
        text.push_str("2025-08-17T00:01:00, 0, 0, 400000, 1, 2\n");
        match ProfileTable::parse(&text) {
            Err(TableError::Malformed { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 14 fields"));
            }
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_last_row_rejected() {
        let mut text = table(&[row("2025-08-17T00:00:00", "300000", "10")]);
        text.push_str("2025-08-17T00:01:00, 0, 0, 400000, 1, 2, 3, 4, 5, 6, 7, 0.00000, 900, 8");
        assert!(matches!(
            ProfileTable::parse(&text),
            Err(TableError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_non_numeric_field_rejected() {
        let text = table(&[row("2025-08-17T00:00:00", "high", "10")]);
        match ProfileTable::parse(&text) {
            Err(TableError::Malformed { message, .. }) => assert!(message.contains("alt_m")),
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_nearest_prefers_time_then_altitude() {
        let text = table(&[
            row("2025-08-17T00:00:00", "300000", "1"),
            row("2025-08-17T00:00:00", "400000", "2"),
            row("2025-08-17T00:30:00", "300000", "3"),
            row("2025-08-17T00:30:00", "400000", "4"),
        ]);
        let t = ProfileTable::parse(&text).unwrap();

        let at = |h, m, s| Utc.with_ymd_and_hms(2025, 8, 17, h, m, s).unwrap();

        assert_eq!(t.nearest(at(0, 0, 0), 390000.0).unwrap().densities.o, 2.0);
        assert_eq!(t.nearest(at(0, 29, 0), 310000.0).unwrap().densities.o, 3.0);
        // 100 km off in altitude costs 100 s, less than 20 min in time
        assert_eq!(t.nearest(at(0, 20, 0), 500000.0).unwrap().densities.o, 4.0);
    }

    #[test]
    fn test_nearest_tie_goes_to_first_row() {
        let text = table(&[
            row("2025-08-17T00:00:00", "300000", "1"),
            row("2025-08-17T00:00:00", "300000", "2"),
        ]);
        let t = ProfileTable::parse(&text).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 8, 17, 0, 0, 0).unwrap();
        assert_eq!(t.nearest(at, 300000.0).unwrap().densities.o, 1.0);
    }
}
