use msa_document::document::{MODIFICATIONS_KEY, PAIRED_MSA_KEY, SEQUENCE_KEY, UNPAIRED_MSA_KEY};
use msa_document::{Entity, JobDocument};
use std::fmt;

use crate::paired::find_paired_key_in;

/// Why a produced document cannot be treated as durable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incomplete {
    NameMismatch,
    ProteinCount(usize),
    NoLigand,
    MissingUnpairedMsa,
    ProteinCarriesPairedMsa,
    PairedResidue(String),
    LigandMismatch,
    ChainSetMismatch,
    CoreFieldChanged(String),
}

impl fmt::Display for Incomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incomplete::NameMismatch => write!(f, "name differs from destination"),
            Incomplete::ProteinCount(n) => write!(f, "expected exactly one protein entry, found {n}"),
            Incomplete::NoLigand => write!(f, "no ligand entry"),
            Incomplete::MissingUnpairedMsa => write!(f, "protein has no unpairedMsa"),
            Incomplete::ProteinCarriesPairedMsa => write!(f, "protein still carries pairedMsa"),
            Incomplete::PairedResidue(key) => write!(f, "paired alignment field '{key}' remains"),
            Incomplete::LigandMismatch => write!(f, "ligand differs from destination"),
            Incomplete::ChainSetMismatch => write!(f, "protein chain ids differ from destination"),
            Incomplete::CoreFieldChanged(id) => {
                write!(f, "sequence or modifications of chain '{id}' changed")
            }
        }
    }
}

/// A single-chain output must match the destination's name, hold one
/// protein (with unpaired and without paired alignment) plus at least one
/// ligand, carry no paired residue anywhere and keep the destination ligand.
/// Checks run in that order; the first failure is returned.
pub fn check_single_chain(output: &JobDocument, destination: &JobDocument) -> Result<(), Incomplete> {
    check_name(output, destination)?;

    let counts = output.entity_counts();
    if counts.proteins != 1 {
        return Err(Incomplete::ProteinCount(counts.proteins));
    }
    if counts.ligands == 0 {
        return Err(Incomplete::NoLigand);
    }

    let protein = output
        .entities()
        .find_map(|entity| match entity {
            Entity::Protein(protein) => Some(protein),
            _ => None,
        })
        .ok_or(Incomplete::ProteinCount(0))?;
    if !protein.contains_key(UNPAIRED_MSA_KEY) {
        return Err(Incomplete::MissingUnpairedMsa);
    }
    if protein.contains_key(PAIRED_MSA_KEY) {
        return Err(Incomplete::ProteinCarriesPairedMsa);
    }

    if let Some(key) = find_paired_key_in(output.root()) {
        return Err(Incomplete::PairedResidue(key.to_string()));
    }

    check_ligand(output, destination)
}

/// A merged output must keep the destination's name, chain ids (in order),
/// per-chain sequence and modifications, and ligand. Paired data copied
/// from the donor is legitimate here.
pub fn check_merged(output: &JobDocument, destination: &JobDocument) -> Result<(), Incomplete> {
    check_name(output, destination)?;

    let produced = output.protein_chains();
    let expected = destination.protein_chains();
    if !produced.keys().eq(expected.keys()) {
        return Err(Incomplete::ChainSetMismatch);
    }
    for (id, want) in &expected {
        let Some(got) = produced.get(id) else {
            return Err(Incomplete::ChainSetMismatch);
        };
        for key in [SEQUENCE_KEY, MODIFICATIONS_KEY] {
            if got.get(key) != want.get(key) {
                return Err(Incomplete::CoreFieldChanged(id.clone()));
            }
        }
    }

    check_ligand(output, destination)
}

fn check_name(output: &JobDocument, destination: &JobDocument) -> Result<(), Incomplete> {
    if output.name() == destination.name() {
        Ok(())
    } else {
        Err(Incomplete::NameMismatch)
    }
}

fn check_ligand(output: &JobDocument, destination: &JobDocument) -> Result<(), Incomplete> {
    match (output.ligand(), destination.ligand()) {
        (Some(produced), Some(expected)) if produced != expected => Err(Incomplete::LigandMismatch),
        _ => Ok(()),
    }
}
