use log::debug;
use msa_document::EntityCounts;
use regex::RegexBuilder;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::config::INPUT_FILE_NAME;
use crate::error::{Result, ReuseError};
use crate::store::{load_document, write_atomically};

/// Enzyme plus cofactor jobs, e.g. `SETD2-SAM`.
static COFACTOR_JOB: LazyLock<regex::Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[^-]+-(SAM|SAH)$")
        .case_insensitive(true)
        .build()
        .expect("valid cofactor job pattern")
});

pub const TSV_HEADER: &str = "# job_name\tstatus\tn_proteins\tn_ligands\tn_other\tnotes";
pub const REPORT_TSV_NAME: &str = "single_enzyme_ligand_jobs.tsv";
pub const REPORT_LIST_NAME: &str = "single_enzyme_ligand_jobs.list";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LigandJobStatus {
    OkSingle,
    MissingJson,
    NotSingle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LigandJobRow {
    pub job_name: String,
    pub status: LigandJobStatus,
    pub n_proteins: usize,
    pub n_ligands: usize,
    pub n_other: usize,
    pub notes: String,
}

impl fmt::Display for LigandJobRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            LigandJobStatus::OkSingle => "OK_SINGLE".to_string(),
            LigandJobStatus::MissingJson => "MISSING_JSON".to_string(),
            LigandJobStatus::NotSingle => format!(
                "NOT_SINGLE(p{},l{},o{})",
                self.n_proteins, self.n_ligands, self.n_other
            ),
        };
        write!(
            f,
            "{}\t{status}\t{}\t{}\t{}\t{}",
            self.job_name, self.n_proteins, self.n_ligands, self.n_other, self.notes
        )
    }
}

fn inspect(job_dir: &Path, job_name: String) -> LigandJobRow {
    let input = job_dir.join(INPUT_FILE_NAME);
    let mut row = LigandJobRow {
        job_name,
        status: LigandJobStatus::MissingJson,
        n_proteins: 0,
        n_ligands: 0,
        n_other: 0,
        notes: String::new(),
    };
    if !input.is_file() {
        return row;
    }
    match load_document(&input) {
        Ok(document) => {
            let EntityCounts {
                proteins,
                ligands,
                other,
            } = document.entity_counts();
            row.n_proteins = proteins;
            row.n_ligands = ligands;
            row.n_other = other;
        }
        Err(e) => {
            debug!("{e}");
            row.notes = match e {
                ReuseError::UnreadableDocument { .. } => "JSON_ERROR:parse",
                ReuseError::NotAJobDocument { .. } => "JSON_ERROR:root",
                _ => "JSON_ERROR:io",
            }
            .to_string();
        }
    }
    row.status = if (row.n_proteins, row.n_ligands, row.n_other) == (1, 1, 0) {
        LigandJobStatus::OkSingle
    } else {
        LigandJobStatus::NotSingle
    };
    row
}

/// One row per `<enzyme>-SAM`/`<enzyme>-SAH` job directory under `root`,
/// sorted by name.
pub fn scan_ligand_jobs(root: &Path) -> Result<Vec<LigandJobRow>> {
    let mut dirs = fs::read_dir(root)
        .map_err(|e| ReuseError::io(root, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            COFACTOR_JOB.is_match(&name).then_some((name, path))
        })
        .collect::<Vec<_>>();
    dirs.sort();
    Ok(dirs
        .into_iter()
        .map(|(name, path)| inspect(&path, name))
        .collect())
}

/// Names of the rows that hold exactly one protein and one ligand.
pub fn verified_jobs(rows: &[LigandJobRow]) -> Vec<&str> {
    rows.iter()
        .filter(|row| row.status == LigandJobStatus::OkSingle)
        .map(|row| row.job_name.as_str())
        .collect()
}

/// Writes the TSV report and the list of verified jobs into `out_dir`.
/// Returns both paths.
pub fn write_reports(out_dir: &Path, rows: &[LigandJobRow]) -> Result<(PathBuf, PathBuf)> {
    let mut tsv = format!("{TSV_HEADER}\n");
    for row in rows {
        tsv.push_str(&format!("{row}\n"));
    }
    let tsv_path = out_dir.join(REPORT_TSV_NAME);
    write_atomically(&tsv_path, &tsv)?;

    let list = verified_jobs(rows)
        .iter()
        .map(|name| format!("{name}\n"))
        .collect::<String>();
    let list_path = out_dir.join(REPORT_LIST_NAME);
    write_atomically(&list_path, &list)?;
    Ok((tsv_path, list_path))
}
