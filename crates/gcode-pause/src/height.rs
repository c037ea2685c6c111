//! Layer height value type.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Resolution used when comparing heights (1 nm).
const HEIGHT_RESOLUTION: f64 = 1e-6;

/// A print height in millimetres.
///
/// Heights compare equal when they agree to [`HEIGHT_RESOLUTION`], so a
/// height typed by a user (`4.2`) matches one parsed from a marker (`;4.2`)
/// regardless of float noise. Ordering is total.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerHeight(f64);

impl LayerHeight {
    /// Create a height from millimetres.
    pub fn new(mm: f64) -> Self {
        Self(mm)
    }

    /// Height in millimetres.
    pub fn mm(self) -> f64 {
        self.0
    }

    /// False for NaN and infinities, which match no layer.
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    fn key(self) -> i64 {
        (self.0 / HEIGHT_RESOLUTION).round() as i64
    }
}

impl From<f64> for LayerHeight {
    fn from(mm: f64) -> Self {
        Self(mm)
    }
}

impl From<LayerHeight> for f64 {
    fn from(height: LayerHeight) -> Self {
        height.0
    }
}

impl PartialEq for LayerHeight {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for LayerHeight {}

impl PartialOrd for LayerHeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LayerHeight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for LayerHeight {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for LayerHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Error parsing a [`LayerHeight`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHeightError(String);

impl fmt::Display for ParseHeightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid layer height: {:?}", self.0)
    }
}

impl std::error::Error for ParseHeightError {}

impl FromStr for LayerHeight {
    type Err = ParseHeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<f64>() {
            Ok(mm) if mm.is_finite() => Ok(Self(mm)),
            _ => Err(ParseHeightError(s.to_string())),
        }
    }
}

impl Serialize for LayerHeight {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

// Accepts numbers and numeric strings: TOML and JSON table keys are always
// strings, YAML keys are usually numbers.
impl<'de> Deserialize<'de> for LayerHeight {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeightVisitor;

        impl Visitor<'_> for HeightVisitor {
            type Value = LayerHeight;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a layer height in millimetres")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if !v.is_finite() {
                    return Err(E::invalid_value(de::Unexpected::Float(v), &self));
                }
                Ok(LayerHeight(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(LayerHeight(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(LayerHeight(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(HeightVisitor)
    }
}
