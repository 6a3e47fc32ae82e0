//! Parser for the station database CSV.
//!
//! The file is a plain CSV with a header row naming at least `icao`, `lat`
//! and `lon`; `elevation_ft` and `name` columns are used when present.
//! Malformed rows are skipped with a warning so one bad record never takes
//! down the whole database.

use std::io::{BufRead, BufReader, Read};

use super::Station;

/// Error type for station CSV parsing.
#[derive(Debug, thiserror::Error)]
pub enum StationParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("missing header row")]
    MissingHeader,
    #[error("header is missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// Parse all stations from a CSV reader.
///
/// Rows that fail to parse are skipped and logged; the error cases are
/// reserved for a file the parser cannot work with at all.
pub fn parse_stations_csv<R: Read>(reader: R) -> Result<Vec<Station>, StationParseError> {
    let mut lines = BufReader::new(reader).lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(StationParseError::MissingHeader),
    };
    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_lowercase()).collect();

    let icao_col = column_index(&columns, "icao")?;
    let lat_col = column_index(&columns, "lat")?;
    let lon_col = column_index(&columns, "lon")?;
    let elevation_col = columns.iter().position(|c| c == "elevation_ft");
    let name_col = columns.iter().position(|c| c == "name");

    let mut stations = Vec::new();
    for (line_number, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_row(&line, icao_col, lat_col, lon_col, elevation_col, name_col) {
            Some(station) => stations.push(station),
            None => {
                tracing::warn!(line = line_number + 2, "Skipping malformed station row");
            }
        }
    }

    Ok(stations)
}

fn column_index(columns: &[String], name: &'static str) -> Result<usize, StationParseError> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or(StationParseError::MissingColumn(name))
}

fn parse_row(
    line: &str,
    icao_col: usize,
    lat_col: usize,
    lon_col: usize,
    elevation_col: Option<usize>,
    name_col: Option<usize>,
) -> Option<Station> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let icao = fields.get(icao_col)?.to_uppercase();
    if icao.len() != 4 {
        return None;
    }
    let lat: f64 = fields.get(lat_col)?.parse().ok()?;
    let lon: f64 = fields.get(lon_col)?.parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    let mut station = Station::new(&icao, lat, lon);
    if let Some(col) = elevation_col {
        station.elevation_ft = fields.get(col).and_then(|f| f.parse().ok());
    }
    if let Some(col) = name_col {
        station.name = fields.get(col).filter(|f| !f.is_empty()).map(|f| f.to_string());
    }

    Some(station)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
icao,lat,lon,elevation_ft,name
EGLL,51.4775,-0.4614,83,London Heathrow
KJFK,40.6398,-73.7789,13,John F Kennedy Intl
EGKK,51.1481,-0.1903,202,London Gatwick
";

    #[test]
    fn test_parses_all_rows() {
        let stations = parse_stations_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].icao, "EGLL");
        assert_eq!(stations[0].elevation_ft, Some(83.0));
        assert_eq!(stations[0].name.as_deref(), Some("London Heathrow"));
    }

    #[test]
    fn test_minimal_columns() {
        let csv = "icao,lat,lon\nEGLL,51.4775,-0.4614\n";
        let stations = parse_stations_csv(csv.as_bytes()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].elevation_ft, None);
        assert_eq!(stations[0].name, None);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let csv = "icao,lat,lon\nEGLL,51.4775,-0.4614\nBAD,not-a-number,0\nTOOLONGX,0,0\nKJFK,40.6398,-73.7789\n";
        let stations = parse_stations_csv(csv.as_bytes()).unwrap();
        assert_eq!(stations.len(), 2);
    }

    #[test]
    fn test_out_of_range_coordinates_skipped() {
        let csv = "icao,lat,lon\nEGLL,91.0,-0.4614\nKJFK,40.6398,-73.7789\n";
        let stations = parse_stations_csv(csv.as_bytes()).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].icao, "KJFK");
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let csv = "icao,latitude,lon\nEGLL,51.4,-0.4\n";
        assert!(matches!(
            parse_stations_csv(csv.as_bytes()),
            Err(StationParseError::MissingColumn("lat"))
        ));
    }

    #[test]
    fn test_empty_file_is_an_error() {
        assert!(matches!(
            parse_stations_csv("".as_bytes()),
            Err(StationParseError::MissingHeader)
        ));
    }
}
