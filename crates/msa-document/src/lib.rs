//! Tagged tree model of AlphaFold3 job input documents.

pub mod document;
pub mod node;

pub use document::{
    chain_id, find_ligand, DocumentError, Entity, EntityCounts, JobDocument, CORE_PROTEIN_KEYS,
};
pub use node::{Mapping, Node, Scalar};
