//! Flexible load control parameters.
//!
//! A flexible power load carries one [`FlexibleParameter`] per live phase. The
//! solver uses them to curtail or shift the load as the bus voltage moves; here
//! they are only data carried through the document.

use serde::{Deserialize, Serialize};

fn default_alpha() -> f64 {
    1000.0
}

fn default_epsilon() -> f64 {
    1e-8
}

/// Active or reactive power control curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    Constant,
    PMaxUProduction {
        u_up: f64,
        u_max: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    PMinUConsumption {
        u_min: f64,
        u_down: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    QU {
        u_min: f64,
        u_down: f64,
        u_up: f64,
        u_max: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

impl Control {
    pub fn p_max_u_production(u_up: f64, u_max: f64) -> Self {
        Control::PMaxUProduction {
            u_up,
            u_max,
            alpha: default_alpha(),
            epsilon: default_epsilon(),
        }
    }

    pub fn q_u(u_min: f64, u_down: f64, u_up: f64, u_max: f64) -> Self {
        Control::QU {
            u_min,
            u_down,
            u_up,
            u_max,
            alpha: default_alpha(),
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionType {
    Euclidean,
    KeepP,
    KeepQ,
}

/// How an infeasible (P, Q) point is brought back inside the `s_max` disc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    #[serde(rename = "type")]
    pub kind: ProjectionType,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            kind: ProjectionType::Euclidean,
            alpha: default_alpha(),
            epsilon: default_epsilon(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexibleParameter {
    pub control_p: Control,
    pub control_q: Control,
    #[serde(default)]
    pub projection: Projection,
    /// Apparent power limit (VA)
    pub s_max: f64,
}

impl FlexibleParameter {
    /// Production curtailment above `u_up`, fully cut at `u_max`.
    pub fn p_max_u_production(u_up: f64, u_max: f64, s_max: f64) -> Self {
        Self {
            control_p: Control::p_max_u_production(u_up, u_max),
            control_q: Control::Constant,
            projection: Projection::default(),
            s_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn control_tags_are_snake_case() {
        let value = serde_json::to_value(Control::q_u(210.0, 220.0, 240.0, 250.0)).unwrap();
        assert_eq!(value["type"], "q_u");
        assert_eq!(value["u_max"], 250.0);

        let value = serde_json::to_value(Control::Constant).unwrap();
        assert_eq!(value, json!({"type": "constant"}));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let param: FlexibleParameter = serde_json::from_value(json!({
            "control_p": {"type": "p_max_u_production", "u_up": 240.0, "u_max": 250.0},
            "control_q": {"type": "constant"},
            "s_max": 5000.0
        }))
        .unwrap();
        assert_eq!(param, FlexibleParameter::p_max_u_production(240.0, 250.0, 5000.0));
        assert_eq!(param.projection.kind, ProjectionType::Euclidean);
    }
}
