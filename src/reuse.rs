use log::{debug, error, info, warn};
use msa_document::JobDocument;
use std::fmt;
use std::path::Path;

use crate::batch_table::{read_batch_table, write_job_table};
use crate::completeness::check_merged;
use crate::config::{ReuseConfig, INPUT_FILE_NAME, OUTPUT_DIR_NAME, OUTPUT_FILE_NAME};
use crate::donors::DonorLocator;
use crate::error::{Result, ReuseError};
use crate::job_key::JobKey;
use crate::merge::{merge_documents, render_document};
use crate::store::{display_name, load_document, recover_output, write_atomically, Recovery};
use crate::triage::{TriageQueues, TriageState};

/// Totals of one reuse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReuseReport {
    pub copied: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub queues: TriageQueues,
}

impl fmt::Display for ReuseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary")?;
        writeln!(f, "-------")?;
        writeln!(f, "copied MSAs : {}", self.copied)?;
        writeln!(f, "skipped     : {} (already had MSA)", self.skipped)?;
        writeln!(f, "warnings    : {}", self.warnings)?;
        writeln!(f, "to_generate : {}", self.queues.generate.len())?;
        write!(f, "waiting     : {}", self.queues.wait.len())
    }
}

/// Why a job needs no new alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Satisfied {
    SingleProteinLigand,
    AlreadyPresent,
    Reused,
}

/// Name of the job directory that owns a donor document
/// (`{job}/output_msa/.../*.json`).
fn donor_job_name(donor: &Path) -> String {
    donor
        .ancestors()
        .find(|p| p.file_name().is_some_and(|n| n == OUTPUT_DIR_NAME))
        .and_then(Path::parent)
        .map(display_name)
        .unwrap_or_else(|| donor.display().to_string())
}

struct ReuseBatch<'a> {
    config: &'a ReuseConfig,
    locator: DonorLocator,
    state: TriageState,
    report: ReuseReport,
}

impl ReuseBatch<'_> {
    fn process(&mut self, job: &str) {
        let key = match JobKey::parse(job) {
            Ok(key) => key,
            Err(e) => {
                warn!("{e}");
                self.report.warnings += 1;
                return;
            }
        };
        let Some(job_dir) = self.locator.find_job_dir(job) else {
            warn!("job dir missing: {job}");
            self.report.warnings += 1;
            return;
        };

        match self.try_satisfy(job, &key, &job_dir) {
            Ok(Some(reason)) => {
                match reason {
                    Satisfied::Reused if !self.config.dry_run => self.report.copied += 1,
                    Satisfied::Reused => {}
                    Satisfied::SingleProteinLigand | Satisfied::AlreadyPresent => {
                        self.report.skipped += 1
                    }
                }
                self.state.mark_satisfied(&key.base_key);
                return;
            }
            Ok(None) => {}
            Err(e) => {
                error!("{job}: {e}");
                self.report.warnings += 1;
            }
        }

        let queue = self.state.classify(&key.base_key);
        debug!("{job} -> {queue:?}");
        self.report.queues.push(queue, job);
    }

    fn try_satisfy(&self, job: &str, key: &JobKey, job_dir: &Path) -> Result<Option<Satisfied>> {
        let destination = load_document(&job_dir.join(INPUT_FILE_NAME))?;
        if destination.is_single_protein_ligand() {
            return Ok(Some(Satisfied::SingleProteinLigand));
        }

        let out_dir = job_dir.join(OUTPUT_DIR_NAME);
        let output = out_dir.join(OUTPUT_FILE_NAME);
        if out_dir.is_dir() && self.resume(job, &output, &destination)? {
            return Ok(Some(Satisfied::AlreadyPresent));
        }

        let candidates = self.locator.candidates(key, job_dir);
        let Some(donor_path) = candidates.first() else {
            return Ok(None);
        };
        let donor_name = donor_job_name(donor_path);
        if self.config.dry_run {
            println!("[COPY] {job:30} <- {donor_name}");
            return Ok(Some(Satisfied::Reused));
        }

        let donor = load_document(donor_path)?;
        let merged = merge_documents(&donor, donor_path, &destination)?;
        check_merged(&merged, &destination).map_err(|reason| ReuseError::ValidationFailed {
            path: output.clone(),
            reason,
        })?;
        let text = render_document(&merged).map_err(|source| ReuseError::Render {
            path: output.clone(),
            source,
        })?;
        write_atomically(&output, &text)?;
        println!("[COPY] {job:30} <- {donor_name}");
        Ok(Some(Satisfied::Reused))
    }

    /// True when the existing `output_msa/` already satisfies the job. A
    /// leftover staged file is promoted or discarded first. An output that
    /// exists but fails the merged profile came from elsewhere and is kept.
    fn resume(&self, job: &str, output: &Path, destination: &JobDocument) -> Result<bool> {
        let recovery = recover_output(
            output,
            |doc| check_merged(doc, destination),
            !self.config.dry_run,
        )?;
        Ok(match recovery {
            Recovery::Complete => true,
            Recovery::Finalized => {
                println!("[FIX ] {job:30} finalized {}", display_name(output));
                true
            }
            Recovery::Regenerate if output.is_file() => {
                debug!("{job}: keeping existing {}", output.display());
                true
            }
            Recovery::Regenerate => false,
        })
    }
}

fn print_preview(path: &Path, jobs: &[String]) {
    println!("\nWould write {}:", path.display());
    if jobs.is_empty() {
        println!("  (none)");
    }
    for job in jobs {
        println!("  {job}");
    }
}

/// One reuse-and-triage pass over the batch table.
///
/// Fails only when the batch table or jobs root cannot be read, or when the
/// queue tables cannot be written. Every per-job problem is logged, counted
/// as a warning, and the job falls through to triage.
pub fn run_reuse(config: &ReuseConfig) -> Result<ReuseReport> {
    let jobs = read_batch_table(&config.batch_table)?;
    let mut batch = ReuseBatch {
        config,
        locator: DonorLocator::new(&config.jobs_dir)?,
        state: TriageState::default(),
        report: ReuseReport::default(),
    };
    for job in &jobs {
        batch.process(job);
    }
    let report = batch.report;

    let queues = &report.queues;
    if config.dry_run {
        print_preview(&config.generate_table, &queues.generate);
        print_preview(&config.waiting_table, &queues.wait);
    } else {
        write_job_table(&config.generate_table, &queues.generate)?;
        write_job_table(&config.waiting_table, &queues.wait)?;
        println!(
            "\nWrote {}  ({} jobs)",
            config.generate_table.display(),
            queues.generate.len()
        );
        println!(
            "Wrote {} ({} jobs)",
            config.waiting_table.display(),
            queues.wait.len()
        );
    }
    info!(
        "{} jobs: {} copied, {} skipped, {} warnings",
        jobs.len(),
        report.copied,
        report.skipped,
        report.warnings
    );
    Ok(report)
}
