//! Pause index: where each inserted pause block lives.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PauseError, Result};
use crate::height::LayerHeight;
use crate::layers::LayerIndex;
use crate::lines::{content, LineStore, Revision};
use crate::template::{PAUSE_BEGIN, PAUSE_END};

/// Line range occupied by a pause block. Both ends are inclusive: `start` is
/// the begin marker and `end` the end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PauseRecord {
    /// Offset of the begin marker.
    pub start: usize,
    /// Offset of the end marker.
    pub end: usize,
}

impl PauseRecord {
    /// Number of lines in the block, markers included.
    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Mapping from layer height to the pause block inserted at that layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PauseIndex {
    pauses: BTreeMap<LayerHeight, PauseRecord>,
    revision: Revision,
}

impl PauseIndex {
    /// Pair begin/end markers in `lines` and key each block by the layer
    /// marker nearest before it.
    ///
    /// `layers` must have been built from the same revision of `lines`.
    pub fn build(lines: &LineStore, layers: &LayerIndex) -> Result<Self> {
        debug_assert_eq!(lines.revision(), layers.revision());

        let mut pauses = BTreeMap::new();
        let mut open: Option<usize> = None;

        for (offset, line) in lines.iter().enumerate() {
            let text = content(line);
            if text == PAUSE_BEGIN {
                if let Some(start) = open {
                    return Err(PauseError::UnterminatedPause { start });
                }
                open = Some(offset);
            } else if text == PAUSE_END {
                let start = open
                    .take()
                    .ok_or(PauseError::UnmatchedPauseEnd { offset })?;
                let record = PauseRecord { start, end: offset };

                match layers.layer_at_or_before(start) {
                    Some((height, _)) if pauses.contains_key(&height) => {
                        warn!(%height, line = start + 1, "second pause block for layer left unindexed");
                    }
                    Some((height, _)) => {
                        pauses.insert(height, record);
                    }
                    None => {
                        warn!(line = start + 1, "pause block before first layer left unindexed");
                    }
                }
            }
        }

        if let Some(start) = open {
            return Err(PauseError::UnterminatedPause { start });
        }

        debug!(pauses = pauses.len(), "built pause index");
        Ok(Self {
            pauses,
            revision: lines.revision(),
        })
    }

    /// Revision of the line store this index was built from.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The pause block at `height`.
    pub fn get(&self, height: LayerHeight) -> Option<PauseRecord> {
        self.pauses.get(&height).copied()
    }

    /// True if a pause is inserted at `height`.
    pub fn contains(&self, height: LayerHeight) -> bool {
        self.pauses.contains_key(&height)
    }

    /// Pauses in ascending height order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerHeight, PauseRecord)> + '_ {
        self.pauses.iter().map(|(&h, &r)| (h, r))
    }

    /// Pauses in ascending start-offset order.
    pub fn by_offset(&self) -> Vec<(LayerHeight, PauseRecord)> {
        let mut pauses: Vec<_> = self.iter().collect();
        pauses.sort_by_key(|(_, record)| record.start);
        pauses
    }

    /// Number of indexed pauses.
    pub fn len(&self) -> usize {
        self.pauses.len()
    }

    /// True if no pauses are indexed.
    pub fn is_empty(&self) -> bool {
        self.pauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> Result<PauseIndex> {
        let lines = LineStore::read_from(text.as_bytes()).unwrap();
        let layers = LayerIndex::build(&lines).unwrap();
        PauseIndex::build(&lines, &layers)
    }

    fn h(mm: f64) -> LayerHeight {
        LayerHeight::new(mm)
    }

    #[test]
    fn test_pairs_markers_and_keys_by_preceding_layer() {
        let index = build(
            ";0.2\nG1\n;0.4\n;BEGIN_PAUSE\nM0\n;END_PAUSE\nG1\n;0.6\nG1\n",
        )
        .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(h(0.4)), Some(PauseRecord { start: 3, end: 5 }));
        assert_eq!(index.get(h(0.4)).unwrap().line_count(), 3);
        assert!(!index.contains(h(0.2)));
    }

    #[test]
    fn test_crlf_markers() {
        let index = build(";0.2\r\n;BEGIN_PAUSE\r\n;END_PAUSE\r\n").unwrap();
        assert_eq!(index.get(h(0.2)), Some(PauseRecord { start: 1, end: 2 }));
    }

    #[test]
    fn test_unterminated_block() {
        let err = build(";0.2\n;BEGIN_PAUSE\nM0\n").unwrap_err();
        assert!(matches!(err, PauseError::UnterminatedPause { start: 1 }));
    }

    #[test]
    fn test_nested_begin_is_unterminated() {
        let err = build(";0.2\n;BEGIN_PAUSE\n;BEGIN_PAUSE\n;END_PAUSE\n").unwrap_err();
        assert!(matches!(err, PauseError::UnterminatedPause { start: 1 }));
    }

    #[test]
    fn test_stray_end_marker() {
        let err = build(";0.2\nG1\n;END_PAUSE\n").unwrap_err();
        assert!(matches!(err, PauseError::UnmatchedPauseEnd { offset: 2 }));
    }

    #[test]
    fn test_block_before_first_layer_is_skipped() {
        let index = build(";BEGIN_PAUSE\n;END_PAUSE\n;0.2\nG1\n").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_second_block_for_layer_is_skipped() {
        let index = build(
            ";0.2\n;BEGIN_PAUSE\n;END_PAUSE\nG1\n;BEGIN_PAUSE\n;END_PAUSE\n",
        )
        .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(h(0.2)), Some(PauseRecord { start: 1, end: 2 }));
    }

    #[test]
    fn test_by_offset_order() {
        let index = build(
            ";0.2\n;BEGIN_PAUSE\n;END_PAUSE\n;0.4\n;BEGIN_PAUSE\n;END_PAUSE\n",
        )
        .unwrap();
        let starts: Vec<usize> = index.by_offset().iter().map(|(_, r)| r.start).collect();
        assert_eq!(starts, vec![1, 4]);
    }
}
