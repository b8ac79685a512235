use log::{debug, info};
use msa_document::document::{LIGANDS_KEY, LIGAND_KEY, MODIFICATIONS_KEY, NAME_KEY, PROTEIN_KEY};
use msa_document::{JobDocument, Node};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::batch_table::{is_header_like, read_job_list};
use crate::chain_select::{longest_sequence, select_chain, ChainSelection};
use crate::completeness::check_single_chain;
use crate::config::{ExtractConfig, INPUT_FILE_NAME, OUTPUT_DIR_NAME, OUTPUT_FILE_NAME};
use crate::donors::PrefixDonorIndex;
use crate::error::{Result, ReuseError};
use crate::job_key::ENTRY_SEPARATOR;
use crate::merge::render_document;
use crate::paired::strip_paired;
use crate::prune::prune_to_chain;
use crate::store::{load_document, recover_output, temp_path, write_atomically, Recovery};

/// Root-level fields that only make sense for the donor's own complex.
const DONOR_ONLY_KEYS: [&str; 2] = ["bondedAtomPairs", "userCCD"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Header,
    NoInput,
    NoDonor { prefix: String },
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Skip(SkipReason),
    /// A staged output from an interrupted run validated and was promoted.
    Fixed,
    WouldWrite { donor: String, output: PathBuf },
    Ok { donor: String },
    Error(String),
}

/// One report line per listed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job: String,
    pub outcome: ExtractOutcome,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.job)?;
        match &self.outcome {
            ExtractOutcome::Skip(SkipReason::Header) => write!(f, "SKIP (header)"),
            ExtractOutcome::Skip(SkipReason::NoInput) => {
                write!(f, "SKIP (no {INPUT_FILE_NAME})")
            }
            ExtractOutcome::Skip(SkipReason::NoDonor { prefix }) => {
                write!(f, "SKIP (no donor with MSA for prefix {prefix})")
            }
            ExtractOutcome::Skip(SkipReason::AlreadyComplete) => write!(f, "SKIP (already complete)"),
            ExtractOutcome::Fixed => write!(f, "FIXED (finalized partial)"),
            ExtractOutcome::WouldWrite { donor, output } => {
                write!(f, "WOULD WRITE (donor={donor}) -> {}", output.display())
            }
            ExtractOutcome::Ok { donor } => write!(f, "OK (donor={donor})"),
            ExtractOutcome::Error(message) => write!(f, "ERROR ({message})"),
        }
    }
}

/// Replaces every `ligand` value with `ligand` and every `ligands` value
/// with it as a list, at any depth.
pub fn override_ligand(node: &Node, ligand: &Node) -> Node {
    match node {
        Node::Mapping(map) => Node::Mapping(
            map.iter()
                .map(|(key, value)| {
                    let replaced = match key.as_str() {
                        LIGAND_KEY => ligand.clone(),
                        LIGANDS_KEY if matches!(ligand, Node::Sequence(_)) => ligand.clone(),
                        LIGANDS_KEY => Node::Sequence(vec![ligand.clone()]),
                        _ => override_ligand(value, ligand),
                    };
                    (key.clone(), replaced)
                })
                .collect(),
        ),
        Node::Sequence(items) => {
            Node::Sequence(items.iter().map(|item| override_ligand(item, ligand)).collect())
        }
        Node::Scalar(_) => node.clone(),
    }
}

fn destination_sequence(destination: &JobDocument) -> Option<&str> {
    destination
        .root()
        .values()
        .filter_map(longest_sequence)
        .fold(None, |best: Option<&str>, s| {
            if best.is_none_or(|b| s.len() > b.len()) {
                Some(s)
            } else {
                best
            }
        })
}

/// Builds the single-chain document for `destination` out of a multi-chain
/// donor: picks the matching chain, drops paired data and the other chain,
/// and carries over the destination's ligand and name.
pub fn build_single_chain(
    donor: Node,
    donor_path: &Path,
    destination: &JobDocument,
) -> Result<(JobDocument, ChainSelection)> {
    let selection = select_chain(&donor, destination_sequence(destination));
    let pruned = prune_to_chain(&strip_paired(&donor), selection.slot);
    let pruned = match destination.ligand() {
        Some(ligand) => override_ligand(&pruned, ligand),
        None => pruned,
    };

    let mut output = JobDocument::try_from(pruned).map_err(|_| ReuseError::NotAJobDocument {
        path: donor_path.to_path_buf(),
    })?;
    if let Some(name) = destination.name() {
        output.root_mut().insert(NAME_KEY.to_string(), name.clone());
    }
    for key in DONOR_ONLY_KEYS {
        output.root_mut().shift_remove(key);
    }
    for entry in output.sequences_mut().into_iter().flatten() {
        if let Some(protein) = entry
            .as_mapping_mut()
            .and_then(|map| map.get_mut(PROTEIN_KEY))
            .and_then(Node::as_mapping_mut)
        {
            protein.shift_remove(MODIFICATIONS_KEY);
        }
    }
    Ok((output, selection))
}

struct Extraction<'a> {
    config: &'a ExtractConfig,
    donors: PrefixDonorIndex,
}

impl Extraction<'_> {
    fn outcome(&self, job: &str) -> ExtractOutcome {
        if is_header_like(job) {
            return ExtractOutcome::Skip(SkipReason::Header);
        }
        let job_dir = self.config.root.join(job);
        let input = job_dir.join(INPUT_FILE_NAME);
        if !input.is_file() {
            return ExtractOutcome::Skip(SkipReason::NoInput);
        }
        let Some(donor) = self.donors.donor_for(job) else {
            let prefix = job.split(ENTRY_SEPARATOR).next().unwrap_or(job);
            return ExtractOutcome::Skip(SkipReason::NoDonor {
                prefix: prefix.to_string(),
            });
        };
        match self.extract(job, &input, &job_dir, donor) {
            Ok(outcome) => outcome,
            Err(e) => ExtractOutcome::Error(e.to_string()),
        }
    }

    fn extract(&self, job: &str, input: &Path, job_dir: &Path, donor: &str) -> Result<ExtractOutcome> {
        let destination = load_document(input)?;
        let output = job_dir.join(OUTPUT_DIR_NAME).join(OUTPUT_FILE_NAME);

        if output.is_file() || temp_path(&output).is_file() {
            let check = |doc: &JobDocument| check_single_chain(doc, &destination);
            match recover_output(&output, check, !self.config.dry_run)? {
                Recovery::Complete => return Ok(ExtractOutcome::Skip(SkipReason::AlreadyComplete)),
                Recovery::Finalized => return Ok(ExtractOutcome::Fixed),
                Recovery::Regenerate => debug!("{job}: regenerating {}", output.display()),
            }
        }

        if self.config.dry_run {
            return Ok(ExtractOutcome::WouldWrite {
                donor: donor.to_string(),
                output,
            });
        }

        let donor_path = self
            .config
            .root
            .join(donor)
            .join(OUTPUT_DIR_NAME)
            .join(OUTPUT_FILE_NAME);
        let donor_node = Node::from(load_document(&donor_path)?);
        let (document, selection) = build_single_chain(donor_node, &donor_path, &destination)?;
        if self.config.verbose {
            println!(
                "{job}: donor={donor} chain={} confidence={:?}",
                selection.slot.index() + 1,
                selection.confidence
            );
        }
        check_single_chain(&document, &destination).map_err(|reason| {
            ReuseError::ValidationFailed {
                path: output.clone(),
                reason,
            }
        })?;
        let text = render_document(&document).map_err(|source| ReuseError::Render {
            path: output.clone(),
            source,
        })?;
        write_atomically(&output, &text)?;
        Ok(ExtractOutcome::Ok {
            donor: donor.to_string(),
        })
    }
}

/// Single-chain extraction over every job in the configured list.
pub fn run_extract(config: &ExtractConfig) -> Result<Vec<JobSummary>> {
    let jobs = read_job_list(&config.job_list)?;
    if jobs.is_empty() {
        return Err(ReuseError::BatchTable {
            path: config.job_list.clone(),
            message: "no jobs found".to_string(),
        });
    }
    let extraction = Extraction {
        config,
        donors: PrefixDonorIndex::scan(&config.root)?,
    };
    let summaries: Vec<JobSummary> = jobs
        .into_iter()
        .map(|job| JobSummary {
            outcome: extraction.outcome(&job),
            job,
        })
        .collect();

    let written = summaries
        .iter()
        .filter(|s| matches!(s.outcome, ExtractOutcome::Ok { .. } | ExtractOutcome::Fixed))
        .count();
    let failed = summaries
        .iter()
        .filter(|s| matches!(s.outcome, ExtractOutcome::Error(_)))
        .count();
    info!("{} jobs: {written} written, {failed} failed", summaries.len());
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paired::find_paired_key;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::tempdir;

    const SEQ_1: &str = "MSTNPKPQRKTKRNTNRRPQDVKFPGGGQIVGGVYLLPRRGPRLGVRATRKTSERSQPRGRRQPIPKARR";
    const SEQ_2: &str = "GAWYDCLEHTWCGSLAVHNCYWMEDSITMFYLYCQHNEIAWGQDYYCLHMFETGDYWVAIYC";

    fn write_json(path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, serde_json::to_string_pretty(value).expect("json")).expect("write");
    }

    fn destination() -> Value {
        json!({
            "name": "NSD2i-H4",
            "sequences": [
                {"protein": {"id": "1", "sequence": SEQ_1, "modifications": [{"ptmType": "MLY", "ptmPosition": 5}]}},
                {"ligand": {"id": "L", "smiles": "CCO"}}
            ]
        })
    }

    fn donor() -> Value {
        json!({
            "name": "NSD2i-H3_K36",
            "version": 2,
            "pairedMsa": "top-level",
            "sequences": [
                {"protein": {
                    "id": "1", "sequence": SEQ_1,
                    "modifications": [{"ptmType": "MLY", "ptmPosition": 36}],
                    "unpairedMsa": ">u1", "pairedMsa": ">p1", "templates": []
                }},
                {"protein": {"id": "2", "sequence": SEQ_2, "unpairedMsa": ">u2", "pairedMsa": ">p2"}},
                {"ligand": {"id": "L", "ccdCodes": ["SAM"]}}
            ],
            "bondedAtomPairs": [[["1", 1, "SG"], ["L", 1, "C1"]]],
            "userCCD": "data_SAM"
        })
    }

    fn setup(root: &Path) -> ExtractConfig {
        write_json(&root.join("NSD2i-H4").join(INPUT_FILE_NAME), &destination());
        write_json(
            &root.join("NSD2i-H3_K36/output_msa").join(OUTPUT_FILE_NAME),
            &donor(),
        );
        write_json(&root.join("SETD2-H3").join(INPUT_FILE_NAME), &destination());
        let list = root.join("jobs.csv");
        fs::write(&list, "job_name\nNSD2i-H4\nNSD2i-H3_K36\nSETD2-H3\n").unwrap();
        ExtractConfig {
            root: root.to_path_buf(),
            job_list: list,
            dry_run: false,
            verbose: false,
        }
    }

    fn outcomes(summaries: &[JobSummary]) -> Vec<&ExtractOutcome> {
        summaries.iter().map(|s| &s.outcome).collect()
    }

    #[test]
    fn builds_single_chain_output_with_destination_ligand() {
        let dest = JobDocument::try_from(Node::from(destination())).unwrap();
        let (output, selection) =
            build_single_chain(Node::from(donor()), Path::new("donor.json"), &dest).unwrap();
        assert_eq!(selection.slot.index(), 0);
        assert_eq!(check_single_chain(&output, &dest), Ok(()));

        let value: Value = Node::from(output).into();
        assert_eq!(find_paired_key(&Node::from(value.clone())), None);
        assert_eq!(value["name"], json!("NSD2i-H4"));
        assert_eq!(value["version"], json!(2));
        assert_eq!(value.get("bondedAtomPairs"), None);
        assert_eq!(value.get("userCCD"), None);
        assert_eq!(
            value["sequences"],
            json!([
                {"protein": {"id": "1", "sequence": SEQ_1, "unpairedMsa": ">u1", "templates": []}},
                {"ligand": {"id": "L", "smiles": "CCO"}}
            ])
        );
    }

    #[test]
    fn second_chain_is_kept_when_it_matches() {
        let mut dest_value = destination();
        dest_value["sequences"][0]["protein"]["sequence"] = json!(SEQ_2);
        let dest = JobDocument::try_from(Node::from(dest_value)).unwrap();
        let (output, selection) =
            build_single_chain(Node::from(donor()), Path::new("donor.json"), &dest).unwrap();
        assert_eq!(selection.slot.index(), 1);
        let value: Value = Node::from(output).into();
        assert_eq!(value["sequences"][0]["protein"]["id"], json!("2"));
    }

    #[test]
    fn ligands_lists_are_overridden_as_lists() {
        let ligand = Node::from(json!({"id": "L"}));
        let node = Node::from(json!({"x": {"ligands": [{"id": "Z"}], "ligand": 1}}));
        assert_eq!(
            Value::from(override_ligand(&node, &ligand)),
            json!({"x": {"ligands": [{"id": "L"}], "ligand": {"id": "L"}}})
        );
    }

    #[test]
    fn batch_writes_once_and_then_skips() {
        let td = tempdir().unwrap();
        let config = setup(td.path());

        let summaries = run_extract(&config).unwrap();
        assert_eq!(
            outcomes(&summaries),
            vec![
                &ExtractOutcome::Skip(SkipReason::Header),
                &ExtractOutcome::Ok {
                    donor: "NSD2i-H3_K36".to_string()
                },
                &ExtractOutcome::Skip(SkipReason::NoInput),
                &ExtractOutcome::Skip(SkipReason::NoDonor {
                    prefix: "SETD2".to_string()
                }),
            ]
        );
        assert_eq!(summaries[1].to_string(), "NSD2i-H4: OK (donor=NSD2i-H3_K36)");

        let output = td.path().join("NSD2i-H4/output_msa").join(OUTPUT_FILE_NAME);
        let text = fs::read_to_string(&output).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(!temp_path(&output).exists());

        let again = run_extract(&config).unwrap();
        assert_eq!(again[1].outcome, ExtractOutcome::Skip(SkipReason::AlreadyComplete));
        assert_eq!(fs::read_to_string(&output).unwrap(), text);
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let td = tempdir().unwrap();
        let mut config = setup(td.path());
        config.dry_run = true;
        let summaries = run_extract(&config).unwrap();
        let output = td.path().join("NSD2i-H4/output_msa").join(OUTPUT_FILE_NAME);
        assert_eq!(
            summaries[1].outcome,
            ExtractOutcome::WouldWrite {
                donor: "NSD2i-H3_K36".to_string(),
                output: output.clone()
            }
        );
        assert!(!output.exists());
    }

    #[test]
    fn leftover_staged_output_is_fixed_or_discarded() {
        let td = tempdir().unwrap();
        let config = setup(td.path());
        let output = td.path().join("NSD2i-H4/output_msa").join(OUTPUT_FILE_NAME);

        run_extract(&config).unwrap();
        fs::rename(&output, temp_path(&output)).unwrap();
        let summaries = run_extract(&config).unwrap();
        assert_eq!(summaries[1].outcome, ExtractOutcome::Fixed);
        assert!(output.is_file());

        fs::remove_file(&output).unwrap();
        fs::write(temp_path(&output), "{\"name\": ").unwrap();
        let summaries = run_extract(&config).unwrap();
        assert!(matches!(summaries[1].outcome, ExtractOutcome::Ok { .. }));
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn empty_job_list_is_an_error() {
        let td = tempdir().unwrap();
        let config = setup(td.path());
        fs::write(&config.job_list, "\n").unwrap();
        assert!(matches!(
            run_extract(&config),
            Err(ReuseError::BatchTable { .. })
        ));
    }
}
