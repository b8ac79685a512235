use msa_document::document::{LIGAND_KEY, PROTEIN_KEY};
use msa_document::{Mapping, Node};

use crate::paired::is_paired_key;
use crate::recognize::{list_shape, two_chain_convention, ChainKeyConvention, ChainSlot, ListShape};

/// Row-level field that may hold one sequence per chain label.
const ROW_SEQUENCE_KEY: &str = "seq";

/// Collapses a donor tree to the chain in `slot`.
///
/// Children are pruned before their parent is inspected, so every
/// recognizer sees an already-reduced subtree and the result is a fixed
/// point: pruning it again with the same slot returns it unchanged.
/// Paired-alignment fields are dropped at every mapping.
pub fn prune_to_chain(node: &Node, slot: ChainSlot) -> Node {
    match node {
        Node::Mapping(map) => prune_mapping(map, slot),
        Node::Sequence(items) => prune_sequence(items, slot),
        Node::Scalar(_) => node.clone(),
    }
}

fn prune_mapping(map: &Mapping, slot: ChainSlot) -> Node {
    let mut out = Mapping::with_capacity(map.len());
    for (key, value) in map {
        if is_paired_key(key) {
            continue;
        }
        let pruned = prune_to_chain(value, slot);
        let pruned = if key == ROW_SEQUENCE_KEY {
            select_row_label(pruned, slot)
        } else {
            pruned
        };
        out.insert(key.clone(), pruned);
    }

    if let Some(convention) = two_chain_convention(&out) {
        if let Some(kept) = out.swap_remove(convention.key(slot)) {
            return kept;
        }
    }
    Node::Mapping(out)
}

/// `{"seq": {"A": "..."}}` rows keep only the selected chain's string.
fn select_row_label(node: Node, slot: ChainSlot) -> Node {
    let Node::Mapping(mut labels) = node else {
        return node;
    };
    for convention in [ChainKeyConvention::Lettered, ChainKeyConvention::Numbered] {
        let label = convention.key(slot);
        if labels.get(label).is_some_and(Node::is_scalar) {
            if let Some(kept) = labels.swap_remove(label) {
                return kept;
            }
        }
    }
    Node::Mapping(labels)
}

fn prune_sequence(items: &[Node], slot: ChainSlot) -> Node {
    let mut pruned: Vec<Node> = items.iter().map(|item| prune_to_chain(item, slot)).collect();
    match list_shape(&pruned) {
        ListShape::Entities => Node::Sequence(keep_entities(pruned, slot)),
        ListShape::ChainLike if pruned.len() > slot.index() => pruned.swap_remove(slot.index()),
        _ => Node::Sequence(pruned),
    }
}

/// Ligands are never chain-indexed and always survive; of the protein
/// entries only the one at the selected position is kept. Entries that are
/// neither are dropped.
fn keep_entities(items: Vec<Node>, slot: ChainSlot) -> Vec<Node> {
    let has = |item: &Node, key: &str| item.as_mapping().is_some_and(|m| m.contains_key(key));
    let proteins = items
        .iter()
        .filter(|item| !has(item, LIGAND_KEY) && has(item, PROTEIN_KEY))
        .count();
    let keep_position = if proteins <= 1 { 0 } else { slot.index() };

    let mut protein_seen = 0;
    items
        .into_iter()
        .filter(|item| {
            if has(item, LIGAND_KEY) {
                true
            } else if has(item, PROTEIN_KEY) {
                let keep = protein_seen == keep_position;
                protein_seen += 1;
                keep
            } else {
                false
            }
        })
        .collect()
}
