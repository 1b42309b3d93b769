//! Shared electrical parameter records.
//!
//! Lines and transformers do not carry their electrical constants directly;
//! they point to an id-keyed parameter object that many branches may share.
//! Two parameter objects are the same when every field matches exactly.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{ElementId, GridError, GridResult};

/// Number of conductor slots (`a`, `b`, `c`, `n`) in a line parameter matrix.
pub const SLOT_COUNT: usize = 4;

/// Square complex matrix stored row-major.
pub type ComplexMatrix = Vec<Vec<Complex64>>;

/// `n x n` matrix of zeros.
pub fn zeros(n: usize) -> ComplexMatrix {
    vec![vec![Complex64::new(0.0, 0.0); n]; n]
}

/// Spread a compact matrix over the fixed 4-slot layout.
///
/// Row/column `i` of `matrix` lands on row/column `slots[i]`; slots absent from
/// `slots` are left as zeros.
pub fn pad_to_slots(matrix: &ComplexMatrix, slots: &[usize]) -> ComplexMatrix {
    let mut padded = zeros(SLOT_COUNT);
    for (i, &si) in slots.iter().enumerate() {
        for (j, &sj) in slots.iter().enumerate() {
            if let Some(value) = matrix.get(i).and_then(|row| row.get(j)) {
                padded[si][sj] = *value;
            }
        }
    }
    padded
}

/// Whether every row of `matrix` has `n` entries and there are `n` rows.
pub fn is_square(matrix: &ComplexMatrix, n: usize) -> bool {
    matrix.len() == n && matrix.iter().all(|row| row.len() == n)
}

/// Construction family of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Overhead,
    Underground,
    Twisted,
}

/// Electrical constants of a line, per unit of length.
#[derive(Debug, Clone, PartialEq)]
pub struct LineParameters {
    pub id: ElementId,
    /// Series impedance, 4x4 over the `a, b, c, n` slots
    pub z_line: ComplexMatrix,
    /// Shunt admittance, 4x4 over the `a, b, c, n` slots
    pub y_shunt: Option<ComplexMatrix>,
    pub line_type: Option<LineType>,
    /// Nominal ampacity per slot (A)
    pub ampacities: Option<[f64; SLOT_COUNT]>,
    pub materials: Option<[String; SLOT_COUNT]>,
    pub insulators: Option<[String; SLOT_COUNT]>,
    /// Conductor cross-section per slot (mm²)
    pub sections: Option<[f64; SLOT_COUNT]>,
}

impl LineParameters {
    pub fn new(id: impl Into<ElementId>, z_line: ComplexMatrix) -> Self {
        Self {
            id: id.into(),
            z_line,
            y_shunt: None,
            line_type: None,
            ampacities: None,
            materials: None,
            insulators: None,
            sections: None,
        }
    }

    pub fn with_y_shunt(mut self, y_shunt: ComplexMatrix) -> Self {
        self.y_shunt = Some(y_shunt);
        self
    }

    pub fn with_ampacities(mut self, ampacities: [f64; SLOT_COUNT]) -> Self {
        self.ampacities = Some(ampacities);
        self
    }

    /// Check the matrices use the 4-slot layout.
    pub fn check_shape(&self) -> GridResult<()> {
        if !is_square(&self.z_line, SLOT_COUNT) {
            return Err(GridError::BadDocument(format!(
                "The z_line matrix of the line parameters {} must be {SLOT_COUNT}x{SLOT_COUNT}.",
                self.id
            )));
        }
        if let Some(y) = &self.y_shunt {
            if !is_square(y, SLOT_COUNT) {
                return Err(GridError::BadDocument(format!(
                    "The y_shunt matrix of the line parameters {} must be {SLOT_COUNT}x{SLOT_COUNT}.",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Electrical constants of a two-winding transformer, from its test reports.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerParameters {
    pub id: ElementId,
    /// Vector group, e.g. `Dyn11`
    pub vg: String,
    /// Rated power (VA)
    pub sn: f64,
    /// Primary rated voltage (V)
    pub up: f64,
    /// Secondary rated voltage (V)
    pub us: f64,
    /// No-load current ratio
    pub i0: f64,
    /// No-load losses (W)
    pub p0: f64,
    /// Short-circuit losses (W)
    pub psc: f64,
    /// Short-circuit voltage ratio
    pub vsc: f64,
}

impl TransformerParameters {
    pub fn vector_group(&self) -> GridResult<VectorGroup> {
        VectorGroup::parse(&self.vg)
    }
}

/// Windings and clock number parsed from a vector group such as `YNd11`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorGroup {
    /// High-voltage winding, uppercase (`D`, `Y`, `YN`, `Z`, `ZN`)
    pub winding1: String,
    /// Low-voltage winding, lowercase (`d`, `y`, `yn`, `z`, `zn`)
    pub winding2: String,
    pub clock: u8,
}

impl VectorGroup {
    pub fn parse(vg: &str) -> GridResult<Self> {
        let bad = || GridError::BadDocument(format!("Invalid transformer vector group {vg:?}."));
        let split_lower = vg.find(|c: char| c.is_ascii_lowercase()).ok_or_else(bad)?;
        let split_digit = vg.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
        if split_lower == 0 || split_digit <= split_lower {
            return Err(bad());
        }
        let winding1 = &vg[..split_lower];
        let winding2 = &vg[split_lower..split_digit];
        let clock: u8 = vg[split_digit..].parse().map_err(|_| bad())?;
        let valid1 = matches!(winding1, "D" | "Y" | "YN" | "Z" | "ZN");
        let valid2 = matches!(winding2, "d" | "y" | "yn" | "z" | "zn");
        if !valid1 || !valid2 || clock > 11 {
            return Err(bad());
        }
        Ok(Self {
            winding1: winding1.to_string(),
            winding2: winding2.to_string(),
            clock,
        })
    }

    /// Star or zigzag on the high-voltage side.
    pub fn hv_has_neutral_point(&self) -> bool {
        has_neutral_point(&self.winding1)
    }

    /// Star or zigzag on the low-voltage side.
    pub fn lv_has_neutral_point(&self) -> bool {
        has_neutral_point(&self.winding2)
    }
}

/// Star (`y`) and zigzag (`z`) windings expose a neutral point; delta does not.
pub fn has_neutral_point(winding: &str) -> bool {
    winding
        .chars()
        .any(|c| matches!(c.to_ascii_lowercase(), 'y' | 'z'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn pad_places_rows_on_slots() {
        let compact = vec![vec![c(1.0, 1.0), c(2.0, 0.0)], vec![c(3.0, 0.0), c(4.0, -1.0)]];
        // phases "bn" -> slots 1 and 3
        let padded = pad_to_slots(&compact, &[1, 3]);
        assert!(is_square(&padded, SLOT_COUNT));
        assert_eq!(padded[1][1], c(1.0, 1.0));
        assert_eq!(padded[1][3], c(2.0, 0.0));
        assert_eq!(padded[3][1], c(3.0, 0.0));
        assert_eq!(padded[3][3], c(4.0, -1.0));
        assert_eq!(padded[0][0], c(0.0, 0.0));
        assert_eq!(padded[2][2], c(0.0, 0.0));
    }

    #[test]
    fn parameters_equality_is_field_by_field() {
        let a = LineParameters::new("lp", zeros(4)).with_ampacities([100.0; 4]);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.z_line[0][0] = c(0.1, 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn check_shape_rejects_compact_matrices() {
        let params = LineParameters::new("lp", zeros(3));
        assert!(params.check_shape().is_err());
        assert!(LineParameters::new("lp", zeros(4)).check_shape().is_ok());
        assert!(LineParameters::new("lp", zeros(4))
            .with_y_shunt(zeros(3))
            .check_shape()
            .is_err());
    }

    #[test]
    fn vector_group_parsing() {
        let vg = VectorGroup::parse("Dyn11").unwrap();
        assert_eq!(vg.winding1, "D");
        assert_eq!(vg.winding2, "yn");
        assert_eq!(vg.clock, 11);
        assert!(!vg.hv_has_neutral_point());
        assert!(vg.lv_has_neutral_point());

        let vg = VectorGroup::parse("YNd1").unwrap();
        assert!(vg.hv_has_neutral_point());
        assert!(!vg.lv_has_neutral_point());

        assert!(VectorGroup::parse("Dzn0").unwrap().lv_has_neutral_point());
        assert!(VectorGroup::parse("dyn11").is_err());
        assert!(VectorGroup::parse("Dyn").is_err());
        assert!(VectorGroup::parse("Dyn13").is_err());
    }
}
