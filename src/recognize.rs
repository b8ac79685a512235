//! Shape recognizers for the chain containers found in donor documents.
//!
//! Donors written by different pipeline versions encode chains in several
//! ways. Each recognizer here is an independent predicate over a `Node`;
//! chain selection and pruning try them in a fixed priority order.

use msa_document::document::{LIGAND_KEY, PROTEIN_KEY};
use msa_document::{Mapping, Node};

/// Keys whose presence marks a mapping as describing one chain.
pub const CHAIN_HINT_KEYS: [&str; 8] = [
    "msa",
    "templates",
    "sequence",
    "seq",
    "chain_id",
    "alignments",
    "unpairedMsa",
    "pairedMsa",
];

/// Which of the (at most two) chains of a donor to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainSlot {
    #[default]
    First,
    Second,
}

impl ChainSlot {
    pub fn index(self) -> usize {
        match self {
            ChainSlot::First => 0,
            ChainSlot::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ChainSlot::First),
            1 => Some(ChainSlot::Second),
            _ => None,
        }
    }
}

/// Two-key conventions for mappings that hold one subtree per chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKeyConvention {
    /// `chain_1` / `chain_2`
    Prefixed,
    /// `A` / `B`
    Lettered,
    /// `1` / `2`
    Numbered,
}

impl ChainKeyConvention {
    const PRIORITY: [ChainKeyConvention; 3] = [
        ChainKeyConvention::Prefixed,
        ChainKeyConvention::Lettered,
        ChainKeyConvention::Numbered,
    ];

    pub fn keys(self) -> [&'static str; 2] {
        match self {
            ChainKeyConvention::Prefixed => ["chain_1", "chain_2"],
            ChainKeyConvention::Lettered => ["A", "B"],
            ChainKeyConvention::Numbered => ["1", "2"],
        }
    }

    pub fn key(self, slot: ChainSlot) -> &'static str {
        self.keys()[slot.index()]
    }
}

/// The convention a mapping uses to hold both chains, if any.
pub fn two_chain_convention(map: &Mapping) -> Option<ChainKeyConvention> {
    ChainKeyConvention::PRIORITY
        .into_iter()
        .find(|convention| convention.keys().iter().all(|k| map.contains_key(*k)))
}

/// How a list relates to chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `sequences`-style list of `{protein: ..}` / `{ligand: ..}` entries.
    Entities,
    /// List whose elements are per-chain mappings.
    ChainLike,
    Plain,
}

pub fn list_shape(items: &[Node]) -> ListShape {
    if is_entity_list(items) {
        ListShape::Entities
    } else if is_chain_like_list(items) {
        ListShape::ChainLike
    } else {
        ListShape::Plain
    }
}

pub fn is_entity_list(items: &[Node]) -> bool {
    !items.is_empty()
        && items.iter().all(|item| item.as_mapping().is_some())
        && items.iter().any(|item| {
            item.as_mapping()
                .is_some_and(|map| map.contains_key(PROTEIN_KEY) || map.contains_key(LIGAND_KEY))
        })
}

pub fn looks_chain_like(node: &Node) -> bool {
    node.as_mapping()
        .is_some_and(|map| CHAIN_HINT_KEYS.iter().any(|k| map.contains_key(*k)))
}

/// At least two elements, mostly mappings, one of them chain-like.
pub fn is_chain_like_list(items: &[Node]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let mappings = items.iter().filter(|item| item.as_mapping().is_some()).count();
    if mappings < 2.max(items.len() / 2) {
        return false;
    }
    items.iter().any(looks_chain_like)
}
