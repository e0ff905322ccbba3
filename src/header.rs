//! Bronze file header parsing and sanitizing.
//!
//! Reads the first line of a delimited text file and turns it into a list
//! of usable, unique column names: blank cells become `_c<index>` and
//! names repeated anywhere in the header (ignoring case) get their column
//! index appended, so `Tipo Estab` at 41 and 42 become `Tipo Estab41` and
//! `Tipo Estab42`.

use crate::constants::BLANK_HEADER_PREFIX;
use crate::error::{RaisError, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read and sanitize the header line of a UTF-8 delimited file
pub fn read_header(file_path: &Path, delimiter: u8) -> Result<Vec<String>> {
    let file = File::open(file_path).map_err(|e| RaisError::storage(file_path, e))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut record = csv::StringRecord::new();
    let found = reader
        .read_record(&mut record)
        .map_err(|e| RaisError::HeaderParsingFailed {
            path: file_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !found || record.is_empty() {
        return Err(RaisError::HeaderParsingFailed {
            path: file_path.to_path_buf(),
            reason: "file has no header line".to_string(),
        });
    }

    let raw: Vec<&str> = record.iter().collect();
    let names = sanitize_header(&raw);

    debug!(
        "Parsed header for {}: {} columns",
        file_path.display(),
        names.len()
    );

    Ok(names)
}

/// Make raw header cells unique and non-empty
pub fn sanitize_header(raw: &[&str]) -> Vec<String> {
    let cleaned: Vec<&str> = raw
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let cell = if index == 0 {
                cell.trim_start_matches('\u{feff}')
            } else {
                cell
            };
            cell.trim()
        })
        .collect();

    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for cell in cleaned.iter().filter(|cell| !cell.is_empty()) {
        *occurrences.entry(cell.to_lowercase()).or_insert(0) += 1;
    }

    cleaned
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            if cell.is_empty() {
                format!("{}{}", BLANK_HEADER_PREFIX, index)
            } else if occurrences
                .get(&cell.to_lowercase())
                .is_some_and(|count| *count > 1)
            {
                format!("{}{}", cell, index)
            } else {
                cell.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_blank_cells_get_positional_names() {
        let names = sanitize_header(&["Idade", "", "  ", "Sexo Trabalhador"]);
        assert_eq!(names, vec!["Idade", "_c1", "_c2", "Sexo Trabalhador"]);
    }

    #[test]
    fn test_duplicates_get_index_suffix() {
        let names = sanitize_header(&["Tipo Defic", "Tipo Estab", "TIPO ESTAB", "Idade"]);
        assert_eq!(
            names,
            vec!["Tipo Defic", "Tipo Estab1", "TIPO ESTAB2", "Idade"]
        );
    }

    #[test]
    fn test_bom_and_whitespace_trimmed() {
        let names = sanitize_header(&["\u{feff}Bairros SP", " Idade "]);
        assert_eq!(names, vec!["Bairros SP", "Idade"]);
    }

    #[test]
    fn test_read_header_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rais.txt");
        fs::write(&path, "Bairros SP;;Tipo Estab;Tipo Estab\r\n1;2;3;4\r\n").unwrap();

        let names = read_header(&path, b';').unwrap();
        assert_eq!(names, vec!["Bairros SP", "_c1", "Tipo Estab2", "Tipo Estab3"]);
    }

    #[test]
    fn test_read_header_empty_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let err = read_header(&path, b';').unwrap_err();
        assert!(matches!(err, RaisError::HeaderParsingFailed { .. }));
    }

    #[test]
    fn test_read_header_missing_file_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_header(&temp_dir.path().join("nope.txt"), b';').unwrap_err();
        assert!(matches!(err, RaisError::Storage { .. }));
    }
}
