pub mod about;
pub mod batch_table;
pub mod chain_select;
pub mod completeness;
pub mod config;
pub mod donors;
pub mod error;
pub mod extract;
pub mod job_key;
pub mod ligand_jobs;
pub mod merge;
pub mod paired;
pub mod prune;
pub mod recognize;
pub mod reuse;
pub mod store;
pub mod triage;

pub use error::{Result, ReuseError};
