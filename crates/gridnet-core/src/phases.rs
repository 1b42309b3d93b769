//! Phase sets.
//!
//! Conductors are `a`, `b`, `c` and the neutral `n`. Every element works on a
//! recognized subset of them, spelled in a canonical order (`ca` rather than
//! `ac`, `can` rather than `acn`).

use std::{collections::HashMap, fmt, str::FromStr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{GridError, GridResult};

/// Canonical spellings of the phase sets an element may use.
pub const RECOGNIZED_PHASES: &[&str] = &[
    "abc", "abcn", "ab", "bc", "ca", "an", "bn", "cn", "abn", "bcn", "can",
];

/// Sorted letters -> canonical spelling.
static CANONICAL_BY_LETTERS: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    RECOGNIZED_PHASES
        .iter()
        .map(|spelling| (sorted_letters(spelling), *spelling))
        .collect()
});

fn sorted_letters(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    chars.sort_unstable();
    chars.into_iter().collect()
}

/// A single conductor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    A,
    B,
    C,
    N,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::A, Phase::B, Phase::C, Phase::N];

    pub fn as_char(&self) -> char {
        match self {
            Phase::A => 'a',
            Phase::B => 'b',
            Phase::C => 'c',
            Phase::N => 'n',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(Phase::A),
            'b' => Some(Phase::B),
            'c' => Some(Phase::C),
            'n' => Some(Phase::N),
            _ => None,
        }
    }

    /// Position of this conductor in the fixed `a, b, c, n` layout.
    pub fn slot(&self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
            Phase::N => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Phase {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(Phase::from_char), chars.next()) {
            (Some(phase), None) => Ok(phase),
            _ => Err(GridError::BadPhase(format!(
                "Phase {s:?} is not a valid phase, expected one of 'a', 'b', 'c' or 'n'."
            ))),
        }
    }
}

/// A recognized phase set in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phases(Vec<Phase>);

impl Phases {
    /// Parse a canonical spelling such as `"abcn"` or `"ca"`.
    pub fn parse(s: &str) -> GridResult<Self> {
        if !RECOGNIZED_PHASES.contains(&s) {
            return Err(GridError::BadPhase(format!(
                "Phases {s:?} are not allowed, expected one of {RECOGNIZED_PHASES:?}."
            )));
        }
        Ok(Phases(s.chars().filter_map(Phase::from_char).collect()))
    }

    /// Map any ordering of a recognized set to its canonical spelling.
    ///
    /// Returns the canonical phases and, for each canonical position, the index
    /// of that phase in the input string. Per-phase values stored in the input
    /// order can be reordered with it.
    pub fn normalize(s: &str) -> GridResult<(Self, Vec<usize>)> {
        let canonical = CANONICAL_BY_LETTERS
            .get(&sorted_letters(s))
            .copied()
            .ok_or_else(|| {
                GridError::BadPhase(format!(
                    "Phases {s:?} are not allowed, expected a permutation of one of {RECOGNIZED_PHASES:?}."
                ))
            })?;
        let input: Vec<char> = s.chars().collect();
        let order = canonical
            .chars()
            .map(|c| input.iter().position(|&i| i == c).unwrap_or_default())
            .collect();
        Ok((Phases::parse(canonical)?, order))
    }

    pub fn abc() -> Self {
        Phases(vec![Phase::A, Phase::B, Phase::C])
    }

    pub fn abcn() -> Self {
        Phases(vec![Phase::A, Phase::B, Phase::C, Phase::N])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_neutral(&self) -> bool {
        self.0.contains(&Phase::N)
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.0.contains(&phase)
    }

    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        self.0.iter().copied()
    }

    /// Slots of the fixed `a, b, c, n` layout occupied by these phases.
    pub fn slots(&self) -> Vec<usize> {
        self.0.iter().map(Phase::slot).collect()
    }

    /// Phases without the neutral (one flexible parameter per such phase).
    pub fn live_count(&self) -> usize {
        self.0.iter().filter(|p| **p != Phase::N).count()
    }

    /// Number of per-phase values (powers, currents, voltages...) an element
    /// on these phases carries: one per phase-to-neutral pair with a neutral,
    /// one per phase-to-phase pair without.
    pub fn value_count(&self) -> usize {
        match (self.has_neutral(), self.len()) {
            (true, n) => n - 1,
            (false, 2) => 1,
            (false, n) => n,
        }
    }

    pub fn is_subset_of(&self, other: &Phases) -> bool {
        self.0.iter().all(|p| other.contains(*p))
    }
}

impl fmt::Display for Phases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for phase in &self.0 {
            write!(f, "{}", phase.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Phases {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phases::parse(s)
    }
}

impl TryFrom<String> for Phases {
    type Error = GridError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Phases::parse(&value)
    }
}

impl From<Phases> for String {
    fn from(phases: Phases) -> Self {
        phases.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parse_recognized_sets() {
        for spelling in RECOGNIZED_PHASES {
            let phases = Phases::parse(spelling).unwrap();
            assert_eq!(phases.to_string(), *spelling);
        }
        assert!(Phases::parse("abcn").unwrap().has_neutral());
        assert!(!Phases::parse("abc").unwrap().has_neutral());
    }

    #[test]
    fn parse_rejects_unknown_sets() {
        for spelling in ["", "a", "ac", "abcd", "nn", "abca"] {
            let err = Phases::parse(spelling).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadPhase, "{spelling}");
        }
    }

    #[test]
    fn normalize_reorders_permutations() {
        let (phases, order) = Phases::normalize("nba").unwrap();
        assert_eq!(phases.to_string(), "abn");
        assert_eq!(order, vec![2, 1, 0]);

        let (phases, order) = Phases::normalize("ac").unwrap();
        assert_eq!(phases.to_string(), "ca");
        assert_eq!(order, vec![1, 0]);

        let (phases, order) = Phases::normalize("abcn").unwrap();
        assert_eq!(phases.to_string(), "abcn");
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn slots_follow_fixed_layout() {
        assert_eq!(Phases::parse("can").unwrap().slots(), vec![2, 0, 3]);
        assert_eq!(Phases::parse("bn").unwrap().live_count(), 1);
    }

    #[test]
    fn value_count_and_subsets() {
        let count = |s: &str| Phases::parse(s).unwrap().value_count();
        assert_eq!(count("abcn"), 3);
        assert_eq!(count("abc"), 3);
        assert_eq!(count("abn"), 2);
        assert_eq!(count("ca"), 1);
        assert_eq!(count("an"), 1);

        let abcn = Phases::abcn();
        assert!(Phases::parse("bn").unwrap().is_subset_of(&abcn));
        assert!(Phases::abc().is_subset_of(&abcn));
        assert!(!abcn.is_subset_of(&Phases::abc()));
    }

    #[test]
    fn serde_uses_string_form() {
        let phases: Phases = serde_json::from_str("\"bcn\"").unwrap();
        assert_eq!(serde_json::to_string(&phases).unwrap(), "\"bcn\"");
        assert!(serde_json::from_str::<Phases>("\"xyz\"").is_err());
        assert_eq!("n".parse::<Phase>().unwrap(), Phase::N);
    }
}
