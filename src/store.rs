use log::{debug, warn};
use msa_document::{JobDocument, Node};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::completeness::Incomplete;
use crate::error::{Result, ReuseError};

pub fn load_document(path: &Path) -> Result<JobDocument> {
    let text = fs::read_to_string(path).map_err(|e| ReuseError::io(path, e))?;
    let node = Node::from_json_str(&text).map_err(|source| ReuseError::UnreadableDocument {
        path: path.to_path_buf(),
        source,
    })?;
    JobDocument::try_from(node).map_err(|_| ReuseError::NotAJobDocument {
        path: path.to_path_buf(),
    })
}

/// Sibling path a document is staged at before it replaces `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `text` to `path` through a synced temporary file and a rename, so
/// readers only ever see the old or the complete new content.
pub fn write_atomically(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReuseError::io(parent, e))?;
    }
    let tmp = temp_path(path);
    let mut file = File::create(&tmp).map_err(|e| ReuseError::io(&tmp, e))?;
    file.write_all(text.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| ReuseError::io(&tmp, e))?;
    drop(file);
    fs::rename(&tmp, path).map_err(|e| ReuseError::io(path, e))
}

/// State of a job's produced document after looking at leftovers of an
/// earlier, possibly interrupted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The canonical output already validates.
    Complete,
    /// A staged temporary validated and was (or, in preview, would be)
    /// promoted to the canonical path.
    Finalized,
    /// Nothing usable; the output must be produced again.
    Regenerate,
}

fn validates(path: &Path, check: &impl Fn(&JobDocument) -> Result<(), Incomplete>) -> bool {
    match load_document(path) {
        Ok(document) => match check(&document) {
            Ok(()) => true,
            Err(reason) => {
                debug!("{} is incomplete: {reason}", path.display());
                false
            }
        },
        Err(e) => {
            debug!("{e}");
            false
        }
    }
}

/// Never trusts file existence alone: the canonical output and any staged
/// temporary are re-validated with `check`. A valid temporary is promoted,
/// an invalid one deleted. With `mutate == false` nothing on disk changes.
pub fn recover_output(
    path: &Path,
    check: impl Fn(&JobDocument) -> Result<(), Incomplete>,
    mutate: bool,
) -> Result<Recovery> {
    let tmp = temp_path(path);
    let tmp_exists = tmp.is_file();

    if path.is_file() && validates(path, &check) {
        if tmp_exists && mutate {
            remove_stale(&tmp);
        }
        return Ok(Recovery::Complete);
    }

    if tmp_exists {
        if validates(&tmp, &check) {
            if mutate {
                fs::rename(&tmp, path).map_err(|e| ReuseError::io(path, e))?;
            }
            return Ok(Recovery::Finalized);
        }
        if mutate {
            remove_stale(&tmp);
        }
    }
    Ok(Recovery::Regenerate)
}

fn remove_stale(tmp: &Path) {
    match fs::remove_file(tmp) {
        Ok(()) => debug!("discarded partial output {}", tmp.display()),
        Err(e) => warn!("could not remove partial output {}: {e}", tmp.display()),
    }
}

/// Final path component as text, for report lines.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
