//! Layer index: which line each layer starts on.
//!
//! Slicers mark each layer with a bare comment holding its height, e.g.
//! `;4.2`, placed immediately before the layer's motion commands.

use std::collections::btree_map::{self, BTreeMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{PauseError, Result};
use crate::height::LayerHeight;
use crate::lines::{content, LineStore, Revision};

static LAYER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A;([0-9]+\.*[0-9]*)\z").expect("valid layer marker regex"));

/// Parse a layer marker line.
///
/// Returns `Ok(None)` for lines that are not markers and an error for lines
/// shaped like a marker whose number does not parse (`;4..2`).
pub fn parse_marker(line: &str, offset: usize) -> Result<Option<LayerHeight>> {
    let text = content(line);
    let Some(caps) = LAYER_MARKER.captures(text) else {
        return Ok(None);
    };
    caps[1]
        .parse::<f64>()
        .map(|mm| Some(LayerHeight::new(mm)))
        .map_err(|_| PauseError::MalformedLayerMarker {
            offset,
            text: text.to_string(),
        })
}

/// Mapping from layer height to the offset of its marker line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    layers: BTreeMap<LayerHeight, usize>,
    revision: Revision,
}

impl LayerIndex {
    /// Scan `lines` for layer markers.
    ///
    /// The first occurrence of a height wins; later duplicates are ignored.
    pub fn build(lines: &LineStore) -> Result<Self> {
        let mut layers = BTreeMap::new();
        for (offset, line) in lines.iter().enumerate() {
            if let Some(height) = parse_marker(line, offset)? {
                match layers.entry(height) {
                    btree_map::Entry::Vacant(slot) => {
                        slot.insert(offset);
                    }
                    btree_map::Entry::Occupied(first) => {
                        debug!(%height, offset, first = *first.get(), "duplicate layer marker ignored");
                    }
                }
            }
        }
        debug!(layers = layers.len(), "built layer index");
        Ok(Self {
            layers,
            revision: lines.revision(),
        })
    }

    /// Revision of the line store this index was built from.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Offset of the marker for exactly `height`.
    pub fn get(&self, height: LayerHeight) -> Option<usize> {
        self.layers.get(&height).copied()
    }

    /// The layer at `height`, or failing that the next layer above it.
    pub fn resolve(&self, height: LayerHeight) -> Option<(LayerHeight, usize)> {
        self.layers
            .range(height..)
            .next()
            .map(|(&h, &offset)| (h, offset))
    }

    /// The layer whose marker is the nearest one at or before `offset`.
    pub fn layer_at_or_before(&self, offset: usize) -> Option<(LayerHeight, usize)> {
        self.layers
            .iter()
            .filter(|(_, marker)| **marker <= offset)
            .max_by_key(|(_, marker)| **marker)
            .map(|(&h, &marker)| (h, marker))
    }

    /// Layers in ascending height order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerHeight, usize)> + '_ {
        self.layers.iter().map(|(&h, &o)| (h, o))
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True if no markers were found.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(text: &str) -> LineStore {
        LineStore::read_from(text.as_bytes()).unwrap()
    }

    fn h(mm: f64) -> LayerHeight {
        LayerHeight::new(mm)
    }

    #[test]
    fn test_parse_marker() {
        assert_eq!(parse_marker(";4.2\n", 0).unwrap(), Some(h(4.2)));
        assert_eq!(parse_marker(";12\r\n", 0).unwrap(), Some(h(12.0)));
        assert_eq!(parse_marker(";3.\n", 0).unwrap(), Some(h(3.0)));
        assert_eq!(parse_marker("; 4.2\n", 0).unwrap(), None);
        assert_eq!(parse_marker(";LAYER:4\n", 0).unwrap(), None);
        assert_eq!(parse_marker("G1 Z4.2\n", 0).unwrap(), None);
        assert_eq!(parse_marker(";.5\n", 0).unwrap(), None);
    }

    #[test]
    fn test_malformed_marker() {
        let err = parse_marker(";4..2\n", 7).unwrap_err();
        assert!(matches!(
            err,
            PauseError::MalformedLayerMarker { offset: 7, ref text } if text == ";4..2"
        ));
    }

    #[test]
    fn test_build_records_marker_offsets() {
        let lines = store("G28\n;0.2\nG1 X1\n;0.4\nG1 X2\n;0.6\nG1 X3\n");
        let index = LayerIndex::build(&lines).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(h(0.2)), Some(1));
        assert_eq!(index.get(h(0.4)), Some(3));
        assert_eq!(index.get(h(0.6)), Some(5));
        assert_eq!(index.get(h(0.5)), None);
        assert_eq!(index.revision(), lines.revision());
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let lines = store(";0.2\nG1\n;0.2\nG1\n");
        let index = LayerIndex::build(&lines).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(h(0.2)), Some(0));
    }

    #[test]
    fn test_no_markers_is_empty() {
        let index = LayerIndex::build(&store("G28\nG1 X1\n")).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.resolve(h(1.0)), None);
    }

    #[test]
    fn test_resolve() {
        let index = LayerIndex::build(&store(";4.2\nG1\n;4.8\nG1\n")).unwrap();
        assert_eq!(index.resolve(h(4.2)), Some((h(4.2), 0)));
        assert_eq!(index.resolve(h(4.6)), Some((h(4.8), 2)));
        assert_eq!(index.resolve(h(1.0)), Some((h(4.2), 0)));
        assert_eq!(index.resolve(h(5.0)), None);
    }

    #[test]
    fn test_layer_at_or_before() {
        let index = LayerIndex::build(&store("G28\n;0.2\nG1\nG1\n;0.4\nG1\n")).unwrap();
        assert_eq!(index.layer_at_or_before(0), None);
        assert_eq!(index.layer_at_or_before(1), Some((h(0.2), 1)));
        assert_eq!(index.layer_at_or_before(3), Some((h(0.2), 1)));
        assert_eq!(index.layer_at_or_before(4), Some((h(0.4), 4)));
        assert_eq!(index.layer_at_or_before(100), Some((h(0.4), 4)));
    }

    #[test]
    fn test_malformed_marker_fails_build() {
        let err = LayerIndex::build(&store(";0.2\n;4..2\n")).unwrap_err();
        assert!(matches!(err, PauseError::MalformedLayerMarker { offset: 1, .. }));
    }
}
