use std::path::PathBuf;

pub const DEFAULT_JOBS_DIR: &str = "jobs";
pub const DEFAULT_BATCH_TABLE: &str = "folding_jobs.csv";
pub const DEFAULT_GENERATE_TABLE: &str = "msa_array_jobs.csv";
pub const DEFAULT_WAITING_TABLE: &str = "waiting_for_msa.csv";
pub const DEFAULT_EXTRACT_ROOT: &str = "jobs/human_test_set";
pub const DEFAULT_EXTRACT_LIST: &str = "folding_jobs_nsd2i.csv";

/// Job directory layout.
pub const INPUT_FILE_NAME: &str = "alphafold_input.json";
pub const OUTPUT_DIR_NAME: &str = "output_msa";
pub const OUTPUT_FILE_NAME: &str = "alphafold_input_with_msa.json";

/// Settings for one reuse-and-triage pass over a batch table.
#[derive(Debug, Clone)]
pub struct ReuseConfig {
    pub jobs_dir: PathBuf,
    pub batch_table: PathBuf,
    pub generate_table: PathBuf,
    pub waiting_table: PathBuf,
    pub dry_run: bool,
}

impl Default for ReuseConfig {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from(DEFAULT_JOBS_DIR),
            batch_table: PathBuf::from(DEFAULT_BATCH_TABLE),
            generate_table: PathBuf::from(DEFAULT_GENERATE_TABLE),
            waiting_table: PathBuf::from(DEFAULT_WAITING_TABLE),
            dry_run: false,
        }
    }
}

/// Settings for one single-chain extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub root: PathBuf,
    pub job_list: PathBuf,
    pub dry_run: bool,
    pub verbose: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_EXTRACT_ROOT),
            job_list: PathBuf::from(DEFAULT_EXTRACT_LIST),
            dry_run: false,
            verbose: false,
        }
    }
}
