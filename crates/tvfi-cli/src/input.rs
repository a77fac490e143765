//! CSV input: header check, then one [`RawRow`] per record.

use std::{fs::File, io::Read, path::Path};

use anyhow::{Context as _, Result};
use tvfi_core::row::{RawRow, check_headers};

pub fn read_csv_file(path: &Path) -> Result<Vec<RawRow>> {
  let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  read_rows(file).with_context(|| format!("failed to read {}", path.display()))
}

/// Fails before reading any record when a required column is missing.
pub fn read_rows(reader: impl Read) -> Result<Vec<RawRow>> {
  let mut csv = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::Headers)
    .from_reader(reader);

  let headers = csv.headers().context("failed to read header row")?.clone();
  let names: Vec<&str> = headers.iter().collect();
  check_headers(names.iter().copied())?;

  let mut rows = Vec::new();
  for (i, record) in csv.records().enumerate() {
    let record = record.with_context(|| format!("malformed record {}", i + 1))?;
    let row: RawRow = headers
      .iter()
      .zip(record.iter())
      .map(|(h, v)| (h.to_owned(), v.to_owned()))
      .collect();
    rows.push(row);
  }
  Ok(rows)
}
