//! CSV model-table directory reader.
//!
//! Layout: one file per grid key under `<dir>/<photometry>/`, named
//! `feh_{p|m}{|feh|:.2}_vvcrit{v:.1}_i{i:.0}_{tag}.csv`, for example
//! `UBVRIplus/feh_m0.15_vvcrit0.4_i45_TP.csv`.
//!
//! Each file has a header row (leading physical columns, filters, `phase`)
//! followed by rows for every age. Rows of one age must be contiguous and
//! ordered by initial mass; age runs must appear in increasing order.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::debug;

use crate::data::{RawAgeBlock, RawTable, TableReader, AGE_COLUMN, MASS_COLUMN};
use crate::domain::{GridKey, PhotometricSet};
use crate::error::{GridError, GridResult};

/// Ages closer than this belong to the same bucket.
const AGE_EPS: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct CsvTableReader {
    root: PathBuf,
}

impl CsvTableReader {
    pub fn new(root: impl Into<PathBuf>) -> GridResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(GridError::Configuration(format!(
                "model directory '{}' does not exist",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn table_path(&self, key: GridKey, extra_tag: &str, photometry: PhotometricSet) -> PathBuf {
        self.root.join(photometry.tag()).join(table_file_name(key, extra_tag))
    }
}

pub fn table_file_name(key: GridKey, extra_tag: &str) -> String {
    let feh = key.metallicity();
    let sign = if feh < 0.0 { 'm' } else { 'p' };
    format!(
        "feh_{sign}{:.2}_vvcrit{:.1}_i{:.0}_{extra_tag}.csv",
        feh.abs(),
        key.rotation(),
        key.inclination()
    )
}

impl TableReader for CsvTableReader {
    fn load_table(&self, key: GridKey, extra_tag: &str, photometry: PhotometricSet) -> GridResult<RawTable> {
        let path = self.table_path(key, extra_tag, photometry);
        debug!(path = %path.display(), "reading model table");
        read_table(&path).map_err(|message| GridError::Reader { key, message })
    }
}

fn read_table(path: &Path) -> Result<RawTable, String> {
    let file = File::open(path).map_err(|e| format!("failed to open '{}': {e}", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| format!("failed to read header: {e}"))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let age_idx = column_index(&header, AGE_COLUMN)?;
    let mass_idx = column_index(&header, MASS_COLUMN)?;

    let mut blocks: Vec<RawAgeBlock> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, plus the header row.
        let line = idx + 2;
        let record = result.map_err(|e| format!("line {line}: {e}"))?;
        let row = parse_row(&record).map_err(|e| format!("line {line}: {e}"))?;

        let age = row[age_idx];
        let mass = row[mass_idx];

        match blocks.last_mut() {
            Some(block) if (block.log_age - age).abs() < AGE_EPS => {
                if let Some(&prev) = block.initial_mass.last() {
                    if !(prev <= mass) {
                        return Err(format!(
                            "line {line}: initial mass {mass} after {prev} at age {age}; masses must not decrease"
                        ));
                    }
                }
                block.initial_mass.push(mass);
                block.rows.push(row);
            }
            Some(block) if age < block.log_age => {
                return Err(format!(
                    "line {line}: age {age} after {}; ages must increase",
                    block.log_age
                ));
            }
            _ => blocks.push(RawAgeBlock {
                log_age: age,
                initial_mass: vec![mass],
                rows: vec![row],
            }),
        }
    }

    if blocks.is_empty() {
        return Err(format!("'{}' has no rows", path.display()));
    }

    Ok(RawTable { header, blocks })
}

fn parse_row(record: &StringRecord) -> Result<Vec<f64>, String> {
    record
        .iter()
        .enumerate()
        .map(|(col, s)| {
            s.parse::<f64>()
                .map_err(|_| format!("column {}: invalid number '{s}'", col + 1))
        })
        .collect()
}

fn column_index(header: &[String], name: &str) -> Result<usize, String> {
    header
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| format!("missing required column `{name}`"))
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM some tools put on the first header cell.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::data::header_for;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("isox-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("Tycho")).unwrap();
        dir
    }

    fn write_table(path: &Path, rows: &[(f64, f64)]) {
        let mut f = File::create(path).unwrap();
        writeln!(f, "{}", header_for(PhotometricSet::Tycho).join(",")).unwrap();
        for (i, (age, mass)) in rows.iter().enumerate() {
            writeln!(
                f,
                "{},{age},{mass},{mass},3.7,4.4,0.0,0.0,0.0,5.0,4.8,4.5,0",
                i + 1
            )
            .unwrap();
        }
    }

    #[test]
    fn file_names_encode_key() {
        let key = GridKey::snap(-0.15, 0.4, 45.0).unwrap();
        assert_eq!(table_file_name(key, "TP"), "feh_m0.15_vvcrit0.4_i45_TP.csv");
        let key = GridKey::snap(0.0, 0.0, 0.0).unwrap();
        assert_eq!(table_file_name(key, "TP"), "feh_p0.00_vvcrit0.0_i0_TP.csv");
    }

    #[test]
    fn groups_rows_by_age() {
        let root = temp_root("groups");
        let reader = CsvTableReader::new(&root).unwrap();
        let key = GridKey::snap(0.0, 0.0, 0.0).unwrap();
        let path = reader.table_path(key, "TP", PhotometricSet::Tycho);
        write_table(&path, &[(8.0, 0.1), (8.0, 0.5), (8.5, 0.1), (8.5, 0.4), (8.5, 0.9)]);

        let raw = reader.load_table(key, "TP", PhotometricSet::Tycho).unwrap();
        assert_eq!(raw.header, header_for(PhotometricSet::Tycho));
        assert_eq!(raw.blocks.len(), 2);
        assert_eq!(raw.blocks[1].initial_mass, vec![0.1, 0.4, 0.9]);
        assert_eq!(raw.blocks[1].rows[2].len(), raw.header.len());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn decreasing_age_is_a_reader_error() {
        let root = temp_root("decreasing");
        let reader = CsvTableReader::new(&root).unwrap();
        let key = GridKey::snap(0.0, 0.0, 0.0).unwrap();
        let path = reader.table_path(key, "TP", PhotometricSet::Tycho);
        write_table(&path, &[(8.5, 0.1), (8.0, 0.1)]);

        let err = reader.load_table(key, "TP", PhotometricSet::Tycho).unwrap_err();
        assert!(matches!(err, GridError::Reader { .. }));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn decreasing_mass_is_a_reader_error() {
        let root = temp_root("mass-order");
        let reader = CsvTableReader::new(&root).unwrap();
        let key = GridKey::snap(0.0, 0.0, 0.0).unwrap();
        let path = reader.table_path(key, "TP", PhotometricSet::Tycho);
        write_table(&path, &[(8.5, 2.0), (8.5, 0.5), (8.5, 1.0)]);

        let err = reader.load_table(key, "TP", PhotometricSet::Tycho).unwrap_err();
        assert!(matches!(err, GridError::Reader { .. }));
        assert!(err.to_string().contains("line 3"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_file_is_a_reader_error() {
        let root = temp_root("missing");
        let reader = CsvTableReader::new(&root).unwrap();
        let key = GridKey::snap(0.3, 0.6, 90.0).unwrap();
        let err = reader.load_table(key, "TP", PhotometricSet::Tycho).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_directory_is_configuration_error() {
        let err = CsvTableReader::new("/definitely/not/here").unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }
}
