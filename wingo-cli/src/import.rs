use std::path::Path;

use anyhow::{Context, Result};
use wingo_core::issue::IssueId;
use wingo_core::models::DrawRecord;

fn parse_record(record: &csv::StringRecord) -> Result<DrawRecord> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };

    let issue = IssueId::parse(get(0)?)?;
    let raw = get(1)?;
    let number = raw
        .parse::<u8>()
        .with_context(|| format!("Impossible de parser '{}' (index 1)", raw))?;
    DrawRecord::new(issue, number)
}

pub struct ImportResult {
    pub draws: Vec<DrawRecord>,
    pub total_records: u32,
    pub errors: u32,
}

/// Lit un fichier `periode;numero`, une ligne d'en-tête optionnelle.
pub fn import_csv(path: &Path) -> Result<ImportResult> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    read_records(reader)
}

fn read_records<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<ImportResult> {
    let mut result = ImportResult {
        draws: Vec::new(),
        total_records: 0,
        errors: 0,
    };

    for (line, record_result) in reader.records().enumerate() {
        let record = record_result.with_context(|| format!("Erreur de lecture ligne {}", line + 1))?;
        if line == 0 && record.get(0).is_some_and(|s| IssueId::parse(s).is_err()) {
            continue;
        }
        result.total_records += 1;
        match parse_record(&record) {
            Ok(draw) => result.draws.push(draw),
            Err(e) => {
                log::warn!("Erreur parsing ligne {}: {}", line + 1, e);
                result.errors += 1;
            }
        }
    }

    Ok(result)
}
