use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use msa_reuse::about;
use msa_reuse::config::{
    ExtractConfig, ReuseConfig, DEFAULT_BATCH_TABLE, DEFAULT_EXTRACT_LIST, DEFAULT_EXTRACT_ROOT,
    DEFAULT_GENERATE_TABLE, DEFAULT_JOBS_DIR, DEFAULT_WAITING_TABLE,
};
use msa_reuse::extract::run_extract;
use msa_reuse::ligand_jobs::{scan_ligand_jobs, verified_jobs, write_reports, TSV_HEADER};
use msa_reuse::reuse::run_reuse;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msa_reuse")]
#[command(version = about::MSA_REUSE_DISPLAY_VERSION)]
#[command(about = "Reuse precomputed MSAs across AlphaFold3 job batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge existing MSAs into matching jobs and triage the rest into
    /// generation and waiting tables
    Reuse {
        /// Root of the job tree
        #[arg(long, default_value = DEFAULT_JOBS_DIR, env = "MSA_REUSE_JOBS_DIR")]
        jobs_dir: PathBuf,

        /// Batch table with an input_folder_name (or folder) column
        #[arg(long, default_value = DEFAULT_BATCH_TABLE, env = "MSA_REUSE_BATCH_TABLE")]
        csv: PathBuf,

        /// Jobs whose MSA must be computed
        #[arg(long, default_value = DEFAULT_GENERATE_TABLE)]
        generate_table: PathBuf,

        /// Jobs waiting for an MSA computed for another job
        #[arg(long, default_value = DEFAULT_WAITING_TABLE)]
        waiting_table: PathBuf,

        /// Report intended actions without touching the filesystem
        #[arg(short = 'n', long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Build single-chain MSA inputs from a completed multi-chain job with
    /// the same prefix
    ExtractChain {
        /// Job list, one name per line (a header row is allowed)
        #[arg(long, default_value = DEFAULT_EXTRACT_LIST)]
        csv: PathBuf,

        /// Directory holding the job directories
        #[arg(long, default_value = DEFAULT_EXTRACT_ROOT, env = "MSA_EXTRACT_ROOT")]
        root: PathBuf,

        /// Scan and report; do not write files
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,

        /// Print the selected donor chain per job
        #[arg(long, action = ArgAction::SetTrue)]
        verbose: bool,
    },
    /// Report enzyme-SAM/SAH jobs and whether they hold exactly one protein
    /// and one ligand
    SingleLigandJobs {
        #[arg(long, default_value = DEFAULT_EXTRACT_ROOT, env = "MSA_EXTRACT_ROOT")]
        root: PathBuf,

        /// Print rows as JSON instead of TSV
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,

        /// Also write single_enzyme_ligand_jobs.tsv and .list here
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print version and build number
    Version,
}

fn reuse(config: ReuseConfig) -> Result<()> {
    let report = run_reuse(&config)
        .with_context(|| format!("reuse pass over {} failed", config.batch_table.display()))?;
    println!("\n{report}");
    Ok(())
}

fn extract_chain(config: ExtractConfig) -> Result<()> {
    if !config.root.is_dir() {
        anyhow::bail!("root not found: {}", config.root.display());
    }
    let summaries = run_extract(&config)?;
    for summary in summaries {
        println!("{summary}");
    }
    Ok(())
}

fn single_ligand_jobs(root: PathBuf, json: bool, out_dir: Option<PathBuf>) -> Result<()> {
    let rows = scan_ligand_jobs(&root)
        .with_context(|| format!("could not scan {}", root.display()))?;
    if let Some(out_dir) = out_dir {
        let (tsv, list) = write_reports(&out_dir, &rows)?;
        log::info!("wrote {} and {}", tsv.display(), list.display());
    }
    if json {
        let text = serde_json::to_string_pretty(&rows)
            .context("could not serialize JSON output")?;
        println!("{text}");
        return Ok(());
    }

    println!("{TSV_HEADER}");
    for row in &rows {
        println!("{row}");
    }
    let ok = verified_jobs(&rows);
    println!("\n# Single-protein-ligand jobs (verified):");
    for name in &ok {
        println!("{name}");
    }
    println!("\nTotal OK single-protein-ligand: {}", ok.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Reuse {
            jobs_dir,
            csv,
            generate_table,
            waiting_table,
            dry_run,
        } => reuse(ReuseConfig {
            jobs_dir,
            batch_table: csv,
            generate_table,
            waiting_table,
            dry_run,
        }),
        Commands::ExtractChain {
            csv,
            root,
            dry_run,
            verbose,
        } => extract_chain(ExtractConfig {
            root,
            job_list: csv,
            dry_run,
            verbose,
        }),
        Commands::SingleLigandJobs {
            root,
            json,
            out_dir,
        } => single_ligand_jobs(root, json, out_dir),
        Commands::Version => {
            println!("{}", about::version_cli_text());
            Ok(())
        }
    }
}
