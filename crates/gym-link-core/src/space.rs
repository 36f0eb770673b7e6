//! Space descriptions and the description-to-space codec
//!
//! A [`SpaceDescription`] is the declarative JSON form a server reports for
//! its observation and action spaces. A [`Space`] is the validated form the
//! rest of the crate works with: it can sample values, report bounds, and
//! decode wire values into the shape the description implies.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GymLinkError, Result};
use crate::value::SpaceValue;

/// Declarative description of an observation or action space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SpaceDescription {
    /// Bounded real-valued array
    Box {
        /// Lower bound per element
        low: Vec<f64>,
        /// Upper bound per element
        high: Vec<f64>,
        /// Array shape
        shape: Vec<usize>,
        /// Element type ("float32" or "float64")
        #[serde(default = "default_dtype")]
        dtype: String,
    },
    /// Bounded integer scalar
    Discrete {
        /// Number of actions
        n: i64,
        /// First valid value
        #[serde(default)]
        start: i64,
    },
    /// Fixed-length 0/1 vector
    MultiBinary {
        /// Vector length
        n: i64,
    },
    /// Fixed-length integer vector with per-slot cardinality
    MultiDiscrete {
        /// Number of options per slot
        nvec: Vec<i64>,
    },
    /// Ordered sequence of sub-spaces
    Tuple {
        /// Element spaces, in order
        spaces: Vec<SpaceDescription>,
    },
    /// Named mapping of sub-spaces
    Dict {
        /// Key to element space
        spaces: HashMap<String, SpaceDescription>,
    },
}

fn default_dtype() -> String {
    "float32".to_string()
}

impl SpaceDescription {
    /// Parse a description from its JSON wire form.
    ///
    /// Unlike a plain serde deserialize, an unrecognized `type` tag is
    /// reported as [`GymLinkError::UnsupportedSpaceKind`] naming the tag.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        match tag {
            "Box" | "Discrete" | "MultiBinary" | "MultiDiscrete" | "Tuple" | "Dict" => {
                serde_json::from_value(value.clone())
                    .map_err(|e| GymLinkError::Serialization(format!("bad {} space: {}", tag, e)))
            }
            other => Err(GymLinkError::UnsupportedSpaceKind(other.to_string())),
        }
    }
}

/// A validated, immutable space
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    desc: SpaceDescription,
}

impl Space {
    /// Validate a description and wrap it as a usable space.
    pub fn new(desc: SpaceDescription) -> Result<Self> {
        validate(&desc)?;
        Ok(Self { desc })
    }

    /// Parse and validate a description from its JSON wire form.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Self::new(SpaceDescription::from_value(value)?)
    }

    /// The underlying description.
    pub fn description(&self) -> &SpaceDescription {
        &self.desc
    }

    /// Total element count for array-shaped spaces, 1 for scalars.
    pub fn flat_len(&self) -> usize {
        match &self.desc {
            SpaceDescription::Box { shape, .. } => shape.iter().product(),
            SpaceDescription::MultiBinary { n } => *n as usize,
            SpaceDescription::MultiDiscrete { nvec } => nvec.len(),
            SpaceDescription::Tuple { spaces } => spaces.len(),
            SpaceDescription::Dict { spaces } => spaces.len(),
            SpaceDescription::Discrete { .. } => 1,
        }
    }

    /// Draw a uniformly random value from the space.
    pub fn sample(&self) -> SpaceValue {
        let mut rng = rand::thread_rng();
        sample_inner(&self.desc, &mut rng)
    }

    /// Whether a value lies inside the space's bounds.
    pub fn contains(&self, value: &SpaceValue) -> bool {
        match (&self.desc, value) {
            (SpaceDescription::Box { low, high, .. }, SpaceValue::Floats(v)) => {
                v.len() == low.len()
                    && v.iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(x, (lo, hi))| *x >= *lo && *x <= *hi)
            }
            (SpaceDescription::Discrete { n, start }, SpaceValue::Int(i)) => {
                *i >= *start && *i < *start + *n
            }
            (SpaceDescription::MultiBinary { n }, SpaceValue::Ints(v)) => {
                v.len() == *n as usize && v.iter().all(|b| *b == 0 || *b == 1)
            }
            (SpaceDescription::MultiDiscrete { nvec }, SpaceValue::Ints(v)) => {
                v.len() == nvec.len() && v.iter().zip(nvec.iter()).all(|(x, n)| *x >= 0 && *x < *n)
            }
            (SpaceDescription::Tuple { spaces }, SpaceValue::Tuple(vals)) => {
                vals.len() == spaces.len()
                    && spaces
                        .iter()
                        .zip(vals.iter())
                        .all(|(s, v)| Space { desc: s.clone() }.contains(v))
            }
            (SpaceDescription::Dict { spaces }, SpaceValue::Dict(vals)) => {
                spaces.iter().all(|(k, s)| {
                    vals.get(k)
                        .is_some_and(|v| Space { desc: s.clone() }.contains(v))
                })
            }
            _ => false,
        }
    }

    /// Decode a wire-safe JSON value into the native shape this space implies.
    ///
    /// Nulls pass through untouched so that callers can distinguish "no
    /// observation" from a decode failure.
    pub fn decode_value(&self, value: &serde_json::Value) -> Result<SpaceValue> {
        if value.is_null() {
            return Ok(SpaceValue::Raw(serde_json::Value::Null));
        }
        decode_inner(&self.desc, value)
    }
}

fn validate(desc: &SpaceDescription) -> Result<()> {
    match desc {
        SpaceDescription::Box {
            low, high, shape, ..
        } => {
            let flat: usize = shape.iter().product();
            if low.len() != flat || high.len() != flat {
                return Err(GymLinkError::SpaceMismatch(format!(
                    "Box bounds (low={}, high={}) inconsistent with shape {:?}",
                    low.len(),
                    high.len(),
                    shape
                )));
            }
            Ok(())
        }
        SpaceDescription::Discrete { n, .. } => {
            if *n < 1 {
                return Err(GymLinkError::SpaceMismatch(format!(
                    "Discrete n must be >= 1, got {}",
                    n
                )));
            }
            Ok(())
        }
        SpaceDescription::MultiBinary { n } => {
            if *n < 1 {
                return Err(GymLinkError::SpaceMismatch(format!(
                    "MultiBinary n must be >= 1, got {}",
                    n
                )));
            }
            Ok(())
        }
        SpaceDescription::MultiDiscrete { nvec } => {
            if nvec.iter().any(|n| *n < 1) {
                return Err(GymLinkError::SpaceMismatch(format!(
                    "MultiDiscrete slots must be >= 1, got {:?}",
                    nvec
                )));
            }
            Ok(())
        }
        SpaceDescription::Tuple { spaces } => spaces.iter().try_for_each(validate),
        SpaceDescription::Dict { spaces } => spaces.values().try_for_each(validate),
    }
}

fn sample_inner(desc: &SpaceDescription, rng: &mut impl Rng) -> SpaceValue {
    match desc {
        SpaceDescription::Box {
            low, high, dtype, ..
        } => {
            let v = low
                .iter()
                .zip(high.iter())
                .map(|(lo, hi)| {
                    let (lo, hi) = (lo.max(-1e6), hi.min(1e6));
                    let x = rng.gen_range(lo..=hi);
                    if dtype == "float32" { x as f32 as f64 } else { x }
                })
                .collect();
            SpaceValue::Floats(v)
        }
        SpaceDescription::Discrete { n, start } => SpaceValue::Int(rng.gen_range(*start..start + n)),
        SpaceDescription::MultiBinary { n } => {
            SpaceValue::Ints((0..*n).map(|_| rng.gen_range(0..=1)).collect())
        }
        SpaceDescription::MultiDiscrete { nvec } => {
            SpaceValue::Ints(nvec.iter().map(|n| rng.gen_range(0..*n)).collect())
        }
        SpaceDescription::Tuple { spaces } => {
            SpaceValue::Tuple(spaces.iter().map(|s| sample_inner(s, rng)).collect())
        }
        SpaceDescription::Dict { spaces } => SpaceValue::Dict(
            spaces
                .iter()
                .map(|(k, s)| (k.clone(), sample_inner(s, rng)))
                .collect(),
        ),
    }
}

fn decode_inner(desc: &SpaceDescription, value: &serde_json::Value) -> Result<SpaceValue> {
    match desc {
        SpaceDescription::Box { dtype, .. } => {
            let mut out = Vec::new();
            flatten_numbers(value, &mut out)?;
            if dtype == "float32" {
                for x in &mut out {
                    *x = *x as f32 as f64;
                }
            }
            Ok(SpaceValue::Floats(out))
        }
        SpaceDescription::Discrete { .. } => value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .map(SpaceValue::Int)
            .ok_or_else(|| {
                GymLinkError::SpaceMismatch(format!("expected integer for Discrete, got {}", value))
            }),
        SpaceDescription::MultiBinary { .. } | SpaceDescription::MultiDiscrete { .. } => {
            let arr = value.as_array().ok_or_else(|| {
                GymLinkError::SpaceMismatch(format!("expected array, got {}", value))
            })?;
            let ints = arr
                .iter()
                .map(|v| {
                    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)).ok_or_else(|| {
                        GymLinkError::SpaceMismatch(format!("expected integer element, got {}", v))
                    })
                })
                .collect::<Result<Vec<i64>>>()?;
            Ok(SpaceValue::Ints(ints))
        }
        SpaceDescription::Tuple { spaces } => {
            let arr = value.as_array().ok_or_else(|| {
                GymLinkError::SpaceMismatch(format!("expected array for Tuple, got {}", value))
            })?;
            if arr.len() != spaces.len() {
                return Err(GymLinkError::SpaceMismatch(format!(
                    "Tuple expected {} elements, got {}",
                    spaces.len(),
                    arr.len()
                )));
            }
            let vals = spaces
                .iter()
                .zip(arr.iter())
                .map(|(s, v)| decode_inner(s, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(SpaceValue::Tuple(vals))
        }
        SpaceDescription::Dict { spaces } => {
            let obj = value.as_object().ok_or_else(|| {
                GymLinkError::SpaceMismatch(format!("expected object for Dict, got {}", value))
            })?;
            let mut out = HashMap::new();
            for (k, v) in obj {
                match spaces.get(k) {
                    Some(s) => {
                        out.insert(k.clone(), decode_inner(s, v)?);
                    }
                    // Keys outside the description pass through unchanged
                    None => {
                        out.insert(k.clone(), SpaceValue::Raw(v.clone()));
                    }
                }
            }
            Ok(SpaceValue::Dict(out))
        }
    }
}

fn flatten_numbers(value: &serde_json::Value, out: &mut Vec<f64>) -> Result<()> {
    match value {
        serde_json::Value::Number(n) => {
            out.push(n.as_f64().unwrap_or(0.0));
            Ok(())
        }
        serde_json::Value::Array(arr) => {
            for v in arr {
                flatten_numbers(v, out)?;
            }
            Ok(())
        }
        other => Err(GymLinkError::SpaceMismatch(format!(
            "expected number or nested list, got {}",
            other
        ))),
    }
}
