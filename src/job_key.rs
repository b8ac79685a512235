use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, ReuseError};

pub const ENTRY_SEPARATOR: char = '-';
pub const NO_MODIFICATION_MARKER: &str = "_noM";

static NO_MOD_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^_]*?_noM").expect("valid no-modification pattern")
});
static PLAIN_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^_-]+").expect("valid entry pattern"));
static MODIFICATION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_[KHQ]\d.*$").expect("valid modification pattern"));

/// Entry pair and base key derived from a job identifier `e1-e2[...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub entry1: String,
    pub entry2: String,
    pub base_key: String,
}

impl JobKey {
    pub fn parse(job: &str) -> Result<Self> {
        let malformed = || ReuseError::MalformedIdentifier(job.to_string());
        let (entry1, rest) = job.split_once(ENTRY_SEPARATOR).ok_or_else(malformed)?;
        let entry2 = if rest.contains(NO_MODIFICATION_MARKER) {
            NO_MOD_ENTRY.find(rest).map(|m| m.as_str())
        } else {
            PLAIN_ENTRY.find(rest).map(|m| m.as_str())
        }
        .ok_or_else(malformed)?;
        if entry1.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            base_key: base_key(entry1, entry2),
            entry1: entry1.to_string(),
            entry2: entry2.to_string(),
        })
    }

    /// Directory-name prefix shared by every job on this entry pair.
    pub fn pair_prefix(&self) -> String {
        format!("{}{ENTRY_SEPARATOR}{}", self.entry1, self.entry2)
    }
}

/// `entry1-entry2` with a trailing `_K…`/`_H…`/`_Q…` modification suffix
/// removed from `entry2`. `_noM` never matches the suffix pattern.
pub fn base_key(entry1: &str, entry2: &str) -> String {
    let stripped = MODIFICATION_SUFFIX.replace(entry2, "");
    format!("{entry1}{ENTRY_SEPARATOR}{stripped}")
}
