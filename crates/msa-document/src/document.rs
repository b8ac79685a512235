use crate::node::{Mapping, Node, Scalar};
use indexmap::IndexMap;
use std::collections::VecDeque;
use thiserror::Error;

pub const NAME_KEY: &str = "name";
pub const VERSION_KEY: &str = "version";
pub const SEQUENCES_KEY: &str = "sequences";
pub const PROTEIN_KEY: &str = "protein";
pub const LIGAND_KEY: &str = "ligand";
pub const LIGANDS_KEY: &str = "ligands";
pub const ID_KEY: &str = "id";
pub const SEQUENCE_KEY: &str = "sequence";
pub const MODIFICATIONS_KEY: &str = "modifications";
pub const UNPAIRED_MSA_KEY: &str = "unpairedMsa";
pub const PAIRED_MSA_KEY: &str = "pairedMsa";

/// Protein fields that identify a chain. Everything else on a protein
/// entry is alignment/template payload.
pub const CORE_PROTEIN_KEYS: [&str; 3] = [ID_KEY, SEQUENCE_KEY, MODIFICATIONS_KEY];

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document root is not a JSON object")]
    RootNotMapping,
}

/// One element of a `sequences` list.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'a> {
    Protein(&'a Mapping),
    Ligand(&'a Node),
    Other(&'a Node),
}

impl<'a> Entity<'a> {
    pub fn classify(node: &'a Node) -> Self {
        let Some(map) = node.as_mapping() else {
            return Entity::Other(node);
        };
        if let Some(protein) = map.get(PROTEIN_KEY).and_then(Node::as_mapping) {
            return Entity::Protein(protein);
        }
        match map.get(LIGAND_KEY) {
            Some(ligand) => Entity::Ligand(ligand),
            None => Entity::Other(node),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub proteins: usize,
    pub ligands: usize,
    pub other: usize,
}

/// Join key of a protein entry. String ids are used verbatim, anything else
/// (e.g. a list of ids for a homomer) by its compact JSON text.
pub fn chain_id(protein: &Mapping) -> Option<String> {
    match protein.get(ID_KEY)? {
        Node::Scalar(Scalar::String(id)) => Some(id.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

/// A job input document: a named root with an ordered `sequences` list.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDocument {
    root: Mapping,
}

impl TryFrom<Node> for JobDocument {
    type Error = DocumentError;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        match node {
            Node::Mapping(root) => Ok(Self { root }),
            _ => Err(DocumentError::RootNotMapping),
        }
    }
}

impl From<JobDocument> for Node {
    fn from(doc: JobDocument) -> Self {
        Node::Mapping(doc.root)
    }
}

impl JobDocument {
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    pub fn name(&self) -> Option<&Node> {
        self.root.get(NAME_KEY)
    }

    pub fn version(&self) -> Option<u64> {
        self.root.get(VERSION_KEY).and_then(Node::as_u64)
    }

    pub fn set_version(&mut self, version: u64) {
        self.root
            .insert(VERSION_KEY.to_string(), Node::Scalar(Scalar::Number(version.into())));
    }

    pub fn sequences(&self) -> &[Node] {
        self.root
            .get(SEQUENCES_KEY)
            .and_then(Node::as_sequence)
            .unwrap_or(&[])
    }

    pub fn sequences_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.root
            .get_mut(SEQUENCES_KEY)
            .and_then(Node::as_sequence_mut)
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity<'_>> {
        self.sequences().iter().map(Entity::classify)
    }

    pub fn entity_counts(&self) -> EntityCounts {
        self.entities()
            .fold(EntityCounts::default(), |mut counts, entity| {
                match entity {
                    Entity::Protein(_) => counts.proteins += 1,
                    Entity::Ligand(_) => counts.ligands += 1,
                    Entity::Other(_) => counts.other += 1,
                }
                counts
            })
    }

    /// Exactly one protein and exactly one ligand entry.
    pub fn is_single_protein_ligand(&self) -> bool {
        let counts = self.entity_counts();
        counts.proteins == 1 && counts.ligands == 1
    }

    /// Protein payloads keyed by chain id, in document order.
    pub fn protein_chains(&self) -> IndexMap<String, &Mapping> {
        self.entities()
            .filter_map(|entity| match entity {
                Entity::Protein(protein) => chain_id(protein).map(|id| (id, protein)),
                _ => None,
            })
            .collect()
    }

    pub fn ligand(&self) -> Option<&Node> {
        find_ligand(&self.root)
    }
}

fn ligand_field(map: &Mapping) -> Option<&Node> {
    map.get(LIGAND_KEY).or_else(|| map.get(LIGANDS_KEY))
}

/// The ligand a document exposes: the first `sequences` ligand entry, else
/// the first `ligand`/`ligands` field found breadth first.
pub fn find_ligand(root: &Mapping) -> Option<&Node> {
    if let Some(ligand) = root
        .get(SEQUENCES_KEY)
        .and_then(Node::as_sequence)
        .and_then(|items| {
            items.iter().find_map(|item| match Entity::classify(item) {
                Entity::Ligand(ligand) => Some(ligand),
                _ => None,
            })
        })
    {
        return Some(ligand);
    }

    if let Some(found) = ligand_field(root) {
        return Some(found);
    }
    let mut queue: VecDeque<&Node> = root.values().collect();
    while let Some(node) = queue.pop_front() {
        match node {
            Node::Mapping(map) => {
                if let Some(found) = ligand_field(map) {
                    return Some(found);
                }
                queue.extend(map.values());
            }
            Node::Sequence(items) => queue.extend(items.iter()),
            Node::Scalar(_) => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> JobDocument {
        JobDocument::try_from(Node::from(value)).expect("mapping root")
    }

    #[test]
    fn counts_and_chains_follow_document_order() {
        let d = doc(json!({
            "name": "KMT5A-H4",
            "sequences": [
                {"protein": {"id": "B", "sequence": "MKV"}},
                {"ligand": {"id": "L", "ccdCodes": ["SAM"]}},
                {"protein": {"id": "A", "sequence": "MST"}},
                {"dna": {"id": "D"}}
            ]
        }));
        assert_eq!(
            d.entity_counts(),
            EntityCounts {
                proteins: 2,
                ligands: 1,
                other: 1
            }
        );
        let ids = d.protein_chains().keys().cloned().collect::<Vec<_>>();
        assert_eq!(ids, vec!["B", "A"]);
        assert!(!d.is_single_protein_ligand());
    }

    #[test]
    fn list_ids_join_by_compact_json() {
        let d = doc(json!({"sequences": [{"protein": {"id": ["A", "B"], "sequence": "M"}}]}));
        assert!(d.protein_chains().contains_key("[\"A\",\"B\"]"));
    }

    #[test]
    fn find_ligand_prefers_sequences_then_searches_breadth_first() {
        let with_entry = doc(json!({
            "sequences": [{"protein": {"id": "A"}}, {"ligand": {"ccdCodes": ["SAH"]}}],
            "extra": {"ligand": "elsewhere"}
        }));
        assert_eq!(
            with_entry.ligand(),
            Some(&Node::from(json!({"ccdCodes": ["SAH"]})))
        );

        let nested = doc(json!({"a": {"b": {"ligand": "deep"}}, "c": {"ligands": ["near"]}}));
        assert_eq!(nested.ligand(), Some(&Node::from(json!(["near"]))));
        assert_eq!(doc(json!({"a": 1})).ligand(), None);
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        assert!(JobDocument::try_from(Node::from(json!([1, 2]))).is_err());
    }
}
