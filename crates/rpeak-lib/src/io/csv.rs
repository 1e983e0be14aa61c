use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read one named numeric column from a headed CSV file.
pub fn read_csv_column(path: &Path, column: &str) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_csv_column(file, column).with_context(|| format!("reading {}", path.display()))
}

/// Parse one named numeric column (case-insensitive header match).
///
/// Empty cells are rejected rather than skipped so sample positions keep their
/// meaning.
pub fn parse_csv_column<R: Read>(reader: R, column: &str) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers().context("reading header")?.clone();
    let idx = locate_column(&headers, column)?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.context("reading record")?;
        let cell = record
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("row {} has no '{}' cell", row + 1, column))?;
        let value = cell
            .parse::<f64>()
            .with_context(|| format!("row {} column '{}' is not f64: {:?}", row + 1, column, cell))?;
        samples.push(value);
    }
    if samples.is_empty() {
        anyhow::bail!("column '{}' has no samples", column);
    }
    Ok(samples)
}

fn locate_column(headers: &csv::StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "missing column '{}' (available: {})",
                requested,
                headers.iter().collect::<Vec<_>>().join(", ")
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "time, MLII ,V5\n0.000,-0.145,-0.065\n0.003,-0.145,-0.065\n0.006,-0.120,-0.080\n";

    #[test]
    fn selects_column_by_header() {
        let lead = parse_csv_column(SAMPLE.as_bytes(), "mlii").unwrap();
        assert_eq!(lead, vec![-0.145, -0.145, -0.120]);
        let v5 = parse_csv_column(SAMPLE.as_bytes(), "V5").unwrap();
        assert_eq!(v5.len(), 3);
    }

    #[test]
    fn missing_column_lists_headers() {
        let err = parse_csv_column(SAMPLE.as_bytes(), "II").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("MLII"), "{msg}");
    }

    #[test]
    fn rejects_blank_cells() {
        let text = "ecg\n1.0\n\"\"\n2.0\n";
        assert!(parse_csv_column(text.as_bytes(), "ecg").is_err());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lead.csv");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(read_csv_column(&path, "time").unwrap()[2], 0.006);
    }
}
