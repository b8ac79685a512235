use msa_document::document::PROTEIN_KEY;
use msa_document::{chain_id, JobDocument, Node, CORE_PROTEIN_KEYS};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Result, ReuseError};

pub const DEFAULT_VERSION: u64 = 1;

static TEMPLATE_INDICES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("templateIndices"\s*:\s*\[)([\s0-9,]+?)(\])"#)
        .expect("valid templateIndices pattern")
});

/// Copies the donor's alignment bundle onto every protein chain of
/// `destination`.
///
/// All destination chain ids must exist in the donor; otherwise nothing is
/// merged. Core fields (`id`, `sequence`, `modifications`) always keep the
/// destination's values. The result's `version` is the larger of both
/// documents' versions.
pub fn merge_documents(
    donor: &JobDocument,
    donor_path: &Path,
    destination: &JobDocument,
) -> Result<JobDocument> {
    let donor_chains = donor.protein_chains();
    let missing = destination
        .protein_chains()
        .into_keys()
        .filter(|id| !donor_chains.contains_key(id))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(ReuseError::MissingChains {
            missing,
            donor: donor_path.to_path_buf(),
        });
    }

    let mut merged = destination.clone();
    for entry in merged.sequences_mut().into_iter().flatten() {
        let Some(protein) = entry
            .as_mapping_mut()
            .and_then(|map| map.get_mut(PROTEIN_KEY))
            .and_then(Node::as_mapping_mut)
        else {
            continue;
        };
        let Some(source) = chain_id(protein).and_then(|id| donor_chains.get(&id).copied()) else {
            continue;
        };
        for (key, value) in source {
            if !CORE_PROTEIN_KEYS.contains(&key.as_str()) {
                protein.insert(key.clone(), value.clone());
            }
        }
    }

    let version = destination
        .version()
        .unwrap_or(DEFAULT_VERSION)
        .max(donor.version().unwrap_or(DEFAULT_VERSION));
    merged.set_version(version);
    Ok(merged)
}

/// Removes all whitespace inside `"templateIndices": [...]` arrays.
pub fn canonicalize(text: &str) -> String {
    TEMPLATE_INDICES
        .replace_all(text, |caps: &Captures| {
            let indices: String = caps[2].chars().filter(|c| !c.is_whitespace()).collect();
            format!("{}{indices}{}", &caps[1], &caps[3])
        })
        .into_owned()
}

/// Canonical on-disk text of a produced document: two-space pretty JSON,
/// compact template index arrays, trailing newline.
pub fn render_document(document: &JobDocument) -> Result<String, serde_json::Error> {
    let pretty = document.to_pretty_json()?;
    let mut text = canonicalize(&pretty);
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completeness::check_merged;
    use serde_json::{json, Value};

    fn doc(value: Value) -> JobDocument {
        JobDocument::try_from(Node::from(value)).expect("mapping root")
    }

    fn donor() -> JobDocument {
        doc(json!({
            "name": "SETD7-H3_K4",
            "version": 3,
            "sequences": [
                {"protein": {
                    "id": "A", "sequence": "DONORSEQ", "modifications": [{"ptmType": "MLY"}],
                    "unpairedMsa": ">u", "pairedMsa": ">p",
                    "templates": [{"mmcif": "x", "queryIndices": [0, 1], "templateIndices": [0, 1]}]
                }},
                {"protein": {"id": "B", "sequence": "OTHER", "unpairedMsa": ">b"}},
                {"ligand": {"id": "L", "ccdCodes": ["SAH"]}}
            ]
        }))
    }

    fn destination() -> JobDocument {
        doc(json!({
            "name": "SETD7-H3",
            "sequences": [
                {"protein": {"id": "A", "sequence": "DESTSEQ", "unpairedMsa": null}},
                {"ligand": {"id": "L", "ccdCodes": ["SAM"]}}
            ]
        }))
    }

    #[test]
    fn copies_alignment_fields_but_keeps_core_fields() {
        let merged = merge_documents(&donor(), Path::new("donor.json"), &destination())
            .expect("merge");
        let value: Value = Node::from(merged).into();
        let protein = &value["sequences"][0]["protein"];
        assert_eq!(protein["sequence"], json!("DESTSEQ"));
        assert_eq!(protein.get("modifications"), None);
        assert_eq!(protein["unpairedMsa"], json!(">u"));
        assert_eq!(protein["pairedMsa"], json!(">p"));
        assert_eq!(protein["templates"][0]["mmcif"], json!("x"));
        assert_eq!(value["sequences"][1]["ligand"]["ccdCodes"], json!(["SAM"]));
        assert_eq!(value["version"], json!(3));
        assert_eq!(value["name"], json!("SETD7-H3"));
    }

    #[test]
    fn version_defaults_to_one_when_absent() {
        let mut donor_value: Value = Node::from(donor()).into();
        donor_value
            .as_object_mut()
            .expect("object")
            .remove("version");
        let merged = merge_documents(&doc(donor_value), Path::new("d.json"), &destination())
            .expect("merge");
        assert_eq!(merged.version(), Some(1));
    }

    #[test]
    fn missing_destination_chain_aborts_merge() {
        let dest = doc(json!({
            "name": "x",
            "sequences": [{"protein": {"id": "A"}}, {"protein": {"id": "C"}}, {"protein": {"id": "D"}}]
        }));
        let err = merge_documents(&donor(), Path::new("donor.json"), &dest).expect_err("missing");
        match err {
            ReuseError::MissingChains { missing, .. } => assert_eq!(missing, vec!["C", "D"]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn merged_output_passes_merged_profile() {
        let merged = merge_documents(&donor(), Path::new("donor.json"), &destination())
            .expect("merge");
        assert_eq!(check_merged(&merged, &destination()), Ok(()));
    }

    #[test]
    fn canonicalize_collapses_template_indices() {
        let text = "{\n  \"templateIndices\": [\n    0,\n    1,\n    2\n  ],\n  \"queryIndices\": [\n    0\n  ]\n}";
        assert_eq!(
            canonicalize(text),
            "{\n  \"templateIndices\": [0,1,2],\n  \"queryIndices\": [\n    0\n  ]\n}"
        );
        assert_eq!(canonicalize("\"templateIndices\": []"), "\"templateIndices\": []");
    }

    #[test]
    fn rendering_is_stable_regardless_of_donor_formatting() {
        let compact = JobDocument::try_from(
            Node::from_json_str(r#"{"name":"n","t":{"templateIndices":[4,5]}}"#).expect("parse"),
        )
        .expect("doc");
        let spaced = JobDocument::try_from(
            Node::from_json_str("{ \"name\" : \"n\",\n \"t\": { \"templateIndices\" : [ 4 ,\n 5 ] } }")
                .expect("parse"),
        )
        .expect("doc");
        let a = render_document(&compact).expect("render");
        assert_eq!(a, render_document(&spaced).expect("render"));
        assert!(a.contains("\"templateIndices\": [4,5]"));
        assert!(a.ends_with("}\n"));
    }
}
