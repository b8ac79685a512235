use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{INPUT_FILE_NAME, OUTPUT_DIR_NAME, OUTPUT_FILE_NAME};
use crate::error::{Result, ReuseError};
use crate::job_key::{JobKey, ENTRY_SEPARATOR};

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = fs::read_dir(dir)
        .map_err(|e| ReuseError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect::<Vec<_>>();
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Pushes every `*.json` file below `dir` and returns how many directories
/// or entries could not be read. A missing `dir` is not a failure.
fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!("could not read donor directory {}: {e}", dir.display());
            return 1;
        }
    };
    let mut unreadable = 0;
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("could not read entry in {}: {e}", dir.display());
                unreadable += 1;
                continue;
            }
        };
        if path.is_dir() {
            unreadable += collect_json(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    unreadable
}

/// Finds job directories and donor documents below a jobs root.
///
/// Jobs live either directly under the root or one level down inside a
/// grouping directory (a child whose name has no `-`).
#[derive(Debug, Clone)]
pub struct DonorLocator {
    roots: Vec<PathBuf>,
}

impl DonorLocator {
    pub fn new(jobs_root: &Path) -> Result<Self> {
        let mut roots = vec![jobs_root.to_path_buf()];
        roots.extend(
            subdirectories(jobs_root)?
                .into_iter()
                .filter(|dir| !dir_name(dir).contains(ENTRY_SEPARATOR)),
        );
        debug!("search roots: {roots:?}");
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// First root holding `{root}/{job}/alphafold_input.json`.
    pub fn find_job_dir(&self, job: &str) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| root.join(job))
            .find(|dir| dir.join(INPUT_FILE_NAME).is_file())
    }

    /// Every JSON document under the `output_msa/` of a job on the same
    /// entry pair, excluding the requester's own directory, sorted by path.
    pub fn candidates(&self, key: &JobKey, exclude: &Path) -> Vec<PathBuf> {
        let prefix = key.pair_prefix();
        let mut found = Vec::new();
        let mut unreadable = 0;
        for root in &self.roots {
            let dirs = match subdirectories(root) {
                Ok(dirs) => dirs,
                Err(e) => {
                    warn!("skipping search root: {e}");
                    continue;
                }
            };
            for dir in dirs.iter().filter(|d| dir_name(d).starts_with(&prefix)) {
                unreadable += collect_json(&dir.join(OUTPUT_DIR_NAME), &mut found);
            }
        }
        found.retain(|path| !path.starts_with(exclude));
        found.sort();
        found.dedup();
        debug!(
            "{} donor candidates for {prefix} ({unreadable} unreadable)",
            found.len()
        );
        found
    }
}

/// Completed jobs directly under a root, grouped by the text before the
/// first `-` of their name.
#[derive(Debug, Clone, Default)]
pub struct PrefixDonorIndex {
    groups: BTreeMap<String, Vec<String>>,
}

impl PrefixDonorIndex {
    pub fn scan(root: &Path) -> Result<Self> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for dir in subdirectories(root)? {
            let name = dir_name(&dir);
            let Some((prefix, _)) = name.split_once(ENTRY_SEPARATOR) else {
                continue;
            };
            if dir.join(OUTPUT_DIR_NAME).join(OUTPUT_FILE_NAME).is_file() {
                groups
                    .entry(prefix.to_string())
                    .or_default()
                    .push(name.to_string());
            }
        }
        for names in groups.values_mut() {
            names.sort();
        }
        Ok(Self { groups })
    }

    /// First completed job sharing `job`'s prefix, other than `job` itself.
    pub fn donor_for(&self, job: &str) -> Option<&str> {
        let prefix = job.split_once(ENTRY_SEPARATOR).map_or(job, |(p, _)| p);
        self.groups
            .get(prefix)?
            .iter()
            .map(String::as_str)
            .find(|name| *name != job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, "{}").expect("write");
    }

    #[test]
    fn candidates_span_grouping_dirs_and_exclude_requester() {
        let td = tempdir().unwrap();
        let root = td.path();
        touch(&root.join("SETD7-H3_K4/output_msa/alphafold_input_with_msa.json"));
        touch(&root.join("SETD7-H3_K4/output_msa/nested/extra.json"));
        touch(&root.join("SETD7-H3_K4/output_msa/notes.txt"));
        touch(&root.join("batch1/SETD7-H3/output_msa/alphafold_input_with_msa.json"));
        touch(&root.join("batch1/SETD7-H3/alphafold_input.json"));
        touch(&root.join("SETD7-H4/output_msa/alphafold_input_with_msa.json"));
        touch(&root.join("SETD7-H3-grouped/inner/output_msa/x.json"));

        let locator = DonorLocator::new(root).unwrap();
        assert_eq!(locator.roots().len(), 2);

        let key = JobKey::parse("SETD7-H3_K9").unwrap();
        let own = root.join("batch1/SETD7-H3");
        let found = locator.candidates(&key, &own);
        assert_eq!(
            found,
            vec![
                root.join("SETD7-H3_K4/output_msa/alphafold_input_with_msa.json"),
                root.join("SETD7-H3_K4/output_msa/nested/extra.json"),
            ]
        );
        assert_eq!(locator.candidates(&key, &own), found);

        assert_eq!(locator.find_job_dir("SETD7-H3"), Some(own));
        assert_eq!(locator.find_job_dir("SETD7-H5"), None);
    }

    #[test]
    fn no_candidates_is_empty_not_error() {
        let td = tempdir().unwrap();
        let locator = DonorLocator::new(td.path()).unwrap();
        let key = JobKey::parse("A-B").unwrap();
        assert!(locator.candidates(&key, &td.path().join("A-B")).is_empty());
    }

    #[test]
    fn unreadable_output_dirs_are_counted_not_fatal() {
        let td = tempdir().unwrap();
        let root = td.path();
        let mut found = Vec::new();
        assert_eq!(collect_json(&root.join("absent/output_msa"), &mut found), 0);

        touch(&root.join("SETD7-H3_K4/output_msa"));
        assert_eq!(collect_json(&root.join("SETD7-H3_K4/output_msa"), &mut found), 1);
        assert!(found.is_empty());

        touch(&root.join("SETD7-H3_K9/output_msa/alphafold_input_with_msa.json"));
        let locator = DonorLocator::new(root).unwrap();
        let key = JobKey::parse("SETD7-H3").unwrap();
        assert_eq!(
            locator.candidates(&key, &root.join("SETD7-H3")),
            vec![root.join("SETD7-H3_K9/output_msa/alphafold_input_with_msa.json")]
        );
    }

    #[test]
    fn prefix_index_picks_first_completed_sibling() {
        let td = tempdir().unwrap();
        let root = td.path();
        touch(&root.join("NSD2i-H3_K36/output_msa/alphafold_input_with_msa.json"));
        touch(&root.join("NSD2i-H3_K27/output_msa/alphafold_input_with_msa.json"));
        fs::create_dir_all(root.join("NSD2i-H4/output_msa")).unwrap();
        touch(&root.join("ungrouped/output_msa/alphafold_input_with_msa.json"));

        let index = PrefixDonorIndex::scan(root).unwrap();
        assert_eq!(index.donor_for("NSD2i-H4"), Some("NSD2i-H3_K27"));
        assert_eq!(index.donor_for("NSD2i-H3_K27"), Some("NSD2i-H3_K36"));
        assert_eq!(index.donor_for("SETD2-H3"), None);
    }
}
