//! Non-fatal warnings produced by editing operations.

use std::fmt;

use serde::Serialize;

use crate::height::LayerHeight;

/// A warning from an edit. The document stays consistent and usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No layer at the requested height; the next layer above was used.
    LayerNotFound {
        /// Height asked for.
        requested: LayerHeight,
        /// Layer the pause went to.
        used: LayerHeight,
    },
    /// The requested height is above every layer; nothing was inserted.
    AboveLastLayer {
        /// Height asked for.
        requested: LayerHeight,
    },
    /// An existing pause at this layer was replaced.
    PauseReplaced {
        /// Layer of the replaced pause.
        height: LayerHeight,
    },
    /// Removal asked for a layer that has no pause.
    NoPauseAtHeight {
        /// Height asked for.
        height: LayerHeight,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LayerNotFound { requested, used } => write!(
                f,
                "{requested} does not exist, using the next higher layer ({used})"
            ),
            Diagnostic::AboveLastLayer { requested } => {
                write!(f, "{requested} is above all layers")
            }
            Diagnostic::PauseReplaced { height } => {
                write!(f, "replaced existing pause at {height}")
            }
            Diagnostic::NoPauseAtHeight { height } => {
                write!(f, "no pause found at height of {height}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::LayerNotFound {
            requested: LayerHeight::new(4.6),
            used: LayerHeight::new(4.8),
        };
        assert_eq!(
            d.to_string(),
            "4.6 does not exist, using the next higher layer (4.8)"
        );
        let d = Diagnostic::AboveLastLayer {
            requested: LayerHeight::new(99.0),
        };
        assert_eq!(d.to_string(), "99 is above all layers");
    }
}
