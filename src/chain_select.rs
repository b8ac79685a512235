use log::debug;
use msa_document::document::{PROTEIN_KEY, SEQUENCES_KEY};
use msa_document::{Entity, Node};

use crate::recognize::{is_chain_like_list, is_entity_list, ChainSlot};

pub const MIN_SEQUENCE_LEN: usize = 30;

/// Top-level fields checked for chain lists before scanning the whole tree.
const KNOWN_CHAIN_CONTAINERS: [&str; 6] =
    ["chains", SEQUENCES_KEY, "entities", "monomers", "inputs", "targets"];
const SEQUENCE_FIELDS: [&str; 4] = ["sequence", "seq", "query_sequence", "target_sequence"];

/// Flat score of a chain whose sequence contains, or is contained in, the
/// destination sequence.
pub const CONTAINED_SCORE: u8 = 3;

/// How a donor chain compares to the destination sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Contained,
    Identity(u8),
}

impl Score {
    /// Ranking value: `CONTAINED_SCORE` for containment, else the identity
    /// percentage. A close non-substring match beats a substring one.
    pub fn value(self) -> u8 {
        match self {
            Score::Contained => CONTAINED_SCORE,
            Score::Identity(pct) => pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// One sequence contains the other.
    Contained,
    /// Percent positional identity over the shared prefix.
    Identity(u8),
    /// Nothing comparable was found; the first chain was kept by default.
    Defaulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainSelection {
    pub slot: ChainSlot,
    pub confidence: Confidence,
}

impl ChainSelection {
    fn defaulted() -> Self {
        Self {
            slot: ChainSlot::First,
            confidence: Confidence::Defaulted,
        }
    }
}

pub fn is_amino_acid_sequence(s: &str) -> bool {
    s.len() >= MIN_SEQUENCE_LEN && s.bytes().all(|b| b"ACDEFGHIKLMNPQRSTVWY".contains(&b))
}

/// Longest amino-acid string anywhere in the tree.
pub fn longest_sequence(node: &Node) -> Option<&str> {
    let mut best: Option<&str> = None;
    node.visit_strings(&mut |s| {
        if is_amino_acid_sequence(s) && best.is_none_or(|b| s.len() > b.len()) {
            best = Some(s);
        }
    });
    best
}

pub fn score(candidate: &str, target: &str) -> Score {
    if candidate.contains(target) || target.contains(candidate) {
        return Score::Contained;
    }
    let overlap = candidate.len().min(target.len());
    let matches = candidate
        .bytes()
        .zip(target.bytes())
        .take(overlap)
        .filter(|(a, b)| a == b)
        .count();
    Score::Identity((100 * matches / overlap.max(1)) as u8)
}

/// Chain payloads of a recognized list, in chain order.
fn chains_of(items: &[Node]) -> Vec<&Node> {
    if is_entity_list(items) {
        items
            .iter()
            .filter(|item| matches!(Entity::classify(item), Entity::Protein(_)))
            .filter_map(|item| item.get(PROTEIN_KEY))
            .collect()
    } else {
        items.iter().collect()
    }
}

fn is_chain_list(items: &[Node]) -> bool {
    is_entity_list(items) || is_chain_like_list(items)
}

fn collect_chain_lists<'a>(node: &'a Node, out: &mut Vec<&'a [Node]>) {
    match node {
        Node::Mapping(map) => map.values().for_each(|v| collect_chain_lists(v, out)),
        Node::Sequence(items) if is_chain_list(items) => out.push(items),
        Node::Sequence(items) => items.iter().for_each(|v| collect_chain_lists(v, out)),
        Node::Scalar(_) => {}
    }
}

fn candidate_lists(donor: &Node) -> Vec<&[Node]> {
    let mut lists: Vec<&[Node]> = KNOWN_CHAIN_CONTAINERS
        .iter()
        .filter_map(|key| donor.get(key).and_then(Node::as_sequence))
        .filter(|items| is_chain_list(items))
        .collect();
    if lists.is_empty() {
        collect_chain_lists(donor, &mut lists);
    }
    lists
}

fn chain_sequence(chain: &Node) -> Option<&str> {
    SEQUENCE_FIELDS
        .iter()
        .filter_map(|key| chain.get(key).and_then(Node::as_str))
        .find(|s| is_amino_acid_sequence(s))
}

/// Picks which of the donor's first two chains corresponds to `target`.
///
/// The first candidate seen wins ties; no target sequence, or no comparable
/// donor sequence, keeps the first chain with `Confidence::Defaulted`.
pub fn select_chain(donor: &Node, target: Option<&str>) -> ChainSelection {
    let Some(target) = target else {
        return ChainSelection::defaulted();
    };

    // (slot, ranking value, score from a real sequence)
    let mut best: Option<(ChainSlot, u8, Option<Score>)> = None;
    for list in candidate_lists(donor) {
        for (index, chain) in chains_of(list).into_iter().take(2).enumerate() {
            let Some(slot) = ChainSlot::from_index(index) else {
                continue;
            };
            let found = chain_sequence(chain).map(|s| score(s, target));
            let rank = found.map_or(0, Score::value);
            if best.is_none_or(|(_, best_rank, _)| rank > best_rank) {
                best = Some((slot, rank, found));
            }
        }
    }

    let selection = match best {
        Some((slot, _, Some(Score::Contained))) => ChainSelection {
            slot,
            confidence: Confidence::Contained,
        },
        Some((slot, _, Some(Score::Identity(pct)))) => ChainSelection {
            slot,
            confidence: Confidence::Identity(pct),
        },
        Some((slot, _, None)) => ChainSelection {
            slot,
            confidence: Confidence::Defaulted,
        },
        None => ChainSelection::defaulted(),
    };
    debug!("chain selection: {selection:?}");
    selection
}
