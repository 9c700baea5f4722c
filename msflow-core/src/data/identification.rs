use serde::{Deserialize, Serialize};

/// One ranked hit within a peptide identification: the called sequence, its
/// score, and the protein accessions it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideHit {
    /// The called sequence (left opaque here; sequence semantics are a
    /// search-engine concern this core only consumes through this interface).
    pub sequence: String,
    /// The search-engine score for this hit.
    pub score: f64,
    /// Protein accessions this peptide maps to.
    pub protein_accessions: Vec<String>,
    /// Charge state, if reported by the search engine.
    pub charge: Option<i32>,
    /// Residue preceding the peptide in the parent protein, if known.
    pub preceding_residue: Option<char>,
    /// Residue following the peptide in the parent protein, if known.
    pub following_residue: Option<char>,
}

/// A peptide identification for one precursor: run-scoped, with a ranked
/// list of hits from a single search. Consumed through this narrow
/// interface; this core does not implement a search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeptideIdentification {
    /// Identifier of the run this identification belongs to.
    pub identifier: String,
    /// Name of the score reported by `hits`, e.g. `"q-value"`.
    pub score_type: String,
    /// Whether a higher score is better for `score_type`.
    pub higher_score_better: bool,
    /// Acceptance threshold for `score_type`, if one was applied upstream.
    pub significance_threshold: Option<f64>,
    /// Precursor retention time this identification was made against.
    pub rt: Option<f64>,
    /// Precursor m/z this identification was made against.
    pub mz: Option<f64>,
    /// Hits ranked best-first.
    pub hits: Vec<PeptideHit>,
}

impl PeptideIdentification {
    /// The best (rank 0) hit, if any were reported.
    #[must_use]
    pub fn best_hit(&self) -> Option<&PeptideHit> {
        self.hits.first()
    }

    /// `true` if exactly one hit was reported, making this identification
    /// unambiguous for identification-based alignment anchoring.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.hits.len() == 1
    }
}

/// One ranked hit within a protein identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinHit {
    /// Protein accession.
    pub accession: String,
    /// The search-engine score for this hit.
    pub score: f64,
}

/// A protein identification, run-scoped, mirroring [`PeptideIdentification`]'s shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProteinIdentification {
    /// Identifier of the run this identification belongs to.
    pub identifier: String,
    /// Name of the score reported by `hits`.
    pub score_type: String,
    /// Whether a higher score is better for `score_type`.
    pub higher_score_better: bool,
    /// Acceptance threshold for `score_type`, if one was applied upstream.
    pub significance_threshold: Option<f64>,
    /// Hits ranked best-first.
    pub hits: Vec<ProteinHit>,
}
