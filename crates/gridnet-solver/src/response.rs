//! Inbound solve response.
//!
//! A response always carries an `info` block. Successful responses add one
//! list of result blocks per element category, each block keyed by the id of
//! the element it belongs to. Branch results may come as a single `branches`
//! list or split into `lines`, `transformers` and `switches`.

use gridnet_core::{ElementCategory, ElementId, ElementResults};
use gridnet_io::schema::{
    BranchResultsData, BusResultsData, GroundResultsData, LoadResultsData,
    PotentialRefResultsData, SourceResultsData,
};
use serde::{Deserialize, Serialize};

/// Outcome reported by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SolveStatus {
    Success,
    Failure,
    Other(String),
}

impl SolveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Success)
    }
}

impl From<&str> for SolveStatus {
    fn from(status: &str) -> Self {
        match status {
            "success" => SolveStatus::Success,
            "failure" => SolveStatus::Failure,
            other => SolveStatus::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Success => write!(f, "success"),
            SolveStatus::Failure => write!(f, "failure"),
            SolveStatus::Other(status) => write!(f, "{status}"),
        }
    }
}

/// The `info` block of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status: String,
    #[serde(default)]
    pub iterations: u32,
    /// Residual norm at the last iteration
    #[serde(rename = "finalError", alias = "final_error", default)]
    pub final_error: f64,
}

impl ResponseInfo {
    pub fn status(&self) -> SolveStatus {
        SolveStatus::from(self.status.as_str())
    }
}

/// A result block with the id of its element.
#[derive(Debug, Clone, Deserialize)]
pub struct Keyed<T> {
    pub id: ElementId,
    #[serde(flatten)]
    pub results: T,
}

/// Result lists of a successful response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResponseResults {
    pub buses: Vec<Keyed<BusResultsData>>,
    pub branches: Vec<Keyed<BranchResultsData>>,
    pub lines: Vec<Keyed<BranchResultsData>>,
    pub transformers: Vec<Keyed<BranchResultsData>>,
    pub switches: Vec<Keyed<BranchResultsData>>,
    pub loads: Vec<Keyed<LoadResultsData>>,
    pub sources: Vec<Keyed<SourceResultsData>>,
    pub grounds: Vec<Keyed<GroundResultsData>>,
    pub potential_refs: Vec<Keyed<PotentialRefResultsData>>,
}

fn tagged<T: Into<ElementResults>>(
    category: ElementCategory,
    blocks: Vec<Keyed<T>>,
) -> impl Iterator<Item = (ElementCategory, ElementId, ElementResults)> {
    blocks
        .into_iter()
        .map(move |block| (category, block.id, block.results.into()))
}

impl ResponseResults {
    /// Every result block with the category and id it applies to.
    pub fn into_entries(self) -> Vec<(ElementCategory, ElementId, ElementResults)> {
        let branches = self
            .branches
            .into_iter()
            .chain(self.lines)
            .chain(self.transformers)
            .chain(self.switches)
            .collect();
        tagged(ElementCategory::Bus, self.buses)
            .chain(tagged(ElementCategory::Branch, branches))
            .chain(tagged(ElementCategory::Load, self.loads))
            .chain(tagged(ElementCategory::Source, self.sources))
            .chain(tagged(ElementCategory::Ground, self.grounds))
            .chain(tagged(ElementCategory::PotentialRef, self.potential_refs))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn info_accepts_both_error_spellings() {
        let info: ResponseInfo =
            serde_json::from_value(json!({"status": "failure", "iterations": 20, "final_error": 0.5}))
                .unwrap();
        assert_eq!(info.status(), SolveStatus::Failure);
        assert_eq!(info.final_error, 0.5);

        let info: ResponseInfo =
            serde_json::from_value(json!({"status": "success", "iterations": 3, "finalError": 1e-9}))
                .unwrap();
        assert!(info.status().is_success());
        assert_eq!(info.iterations, 3);
    }

    #[test]
    fn split_branch_lists_are_merged() {
        let results: ResponseResults = serde_json::from_value(json!({
            "lines": [{"id": "l", "currents1": [], "currents2": [], "potentials1": [], "potentials2": []}],
            "switches": [{"id": 7, "currents1": [], "currents2": [], "potentials1": [], "potentials2": []}],
            "grounds": [{"id": "g", "potential": [0.0, 0.0]}]
        }))
        .unwrap();
        let entries = results.into_entries();
        let keys: Vec<(ElementCategory, ElementId)> =
            entries.into_iter().map(|(c, id, _)| (c, id)).collect();
        assert_eq!(
            keys,
            vec![
                (ElementCategory::Branch, ElementId::from("l")),
                (ElementCategory::Branch, ElementId::from(7)),
                (ElementCategory::Ground, ElementId::from("g")),
            ]
        );
    }
}
