//! The editable G-code document.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diagnostic::Diagnostic;
use crate::error::{PauseError, Result};
use crate::height::LayerHeight;
use crate::layers::LayerIndex;
use crate::lines::{self, LineEnding, LineStore, Revision};
use crate::pauses::PauseIndex;
use crate::template::{PauseParams, PauseTemplate, TemplateOptions};

/// Default suffix appended to the input file stem on export.
pub const DEFAULT_SUFFIX: &str = "_pause";

/// Export options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Appended to the source file stem when no destination is given.
    pub suffix: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.into(),
        }
    }
}

/// A G-code file loaded for pause editing.
///
/// The layer and pause indices are rebuilt from scratch after every edit,
/// so offsets read from [`layers`](Self::layers) and
/// [`pauses`](Self::pauses) always refer to the current
/// [`revision`](Self::revision). A failed edit leaves the document as it was.
#[derive(Debug, Clone)]
pub struct Document {
    lines: LineStore,
    layers: LayerIndex,
    pauses: PauseIndex,
    line_ending: LineEnding,
    template: PauseTemplate,
    export: ExportOptions,
    source: Option<PathBuf>,
}

impl Document {
    /// Build a document from lines that carry their own terminators.
    pub fn from_lines(lines: Vec<String>) -> Result<Self> {
        Self::from_store(LineStore::new(lines), None)
    }

    /// Read a document from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_store(LineStore::read_from(BufReader::new(reader))?, None)
    }

    /// Open a `.gcode` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_gcode = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gcode"));
        if !is_gcode || !path.is_file() {
            return Err(PauseError::NotGcodeFile(path.to_path_buf()));
        }

        let store = LineStore::read_from(BufReader::new(File::open(path)?))?;
        let doc = Self::from_store(store, Some(path.to_path_buf()))?;
        info!(
            path = %path.display(),
            lines = doc.lines.len(),
            layers = doc.layers.len(),
            pauses = doc.pauses.len(),
            "loaded G-code"
        );
        Ok(doc)
    }

    fn from_store(lines: LineStore, source: Option<PathBuf>) -> Result<Self> {
        let layers = LayerIndex::build(&lines)?;
        let pauses = PauseIndex::build(&lines, &layers)?;
        Ok(Self {
            line_ending: LineEnding::detect::<String>(&lines),
            lines,
            layers,
            pauses,
            template: PauseTemplate::default(),
            export: ExportOptions::default(),
            source,
        })
    }

    /// Use `options` when rendering pause blocks.
    pub fn with_template_options(mut self, options: TemplateOptions) -> Self {
        self.template = PauseTemplate::new(options);
        self
    }

    /// Use `options` when exporting.
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    /// Current lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Layer index for the current revision.
    pub fn layers(&self) -> &LayerIndex {
        &self.layers
    }

    /// Pause index for the current revision.
    pub fn pauses(&self) -> &PauseIndex {
        &self.pauses
    }

    /// Revision of the line store; bumped by every edit.
    pub fn revision(&self) -> Revision {
        self.lines.revision()
    }

    /// Line terminator used for inserted lines.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Path the document was opened from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Insert a pause at the start of the layer at `height`.
    ///
    /// The block goes directly after the layer marker line. If no layer
    /// exists at `height` the next layer above is used; if `height` is above
    /// every layer nothing is inserted. An existing pause at the resolved
    /// layer is replaced. Both cases are reported as diagnostics.
    pub fn insert_pause(
        &mut self,
        height: impl Into<LayerHeight>,
        params: &PauseParams,
    ) -> Result<Vec<Diagnostic>> {
        let requested = checked_height(height.into())?;
        let block = self.template.render(params, self.line_ending)?;

        self.transaction(|doc, diagnostics| doc.insert_block(requested, block, diagnostics))
    }

    /// Insert several pauses, lowest height first.
    ///
    /// Every parameter set is validated before the first insertion. Each
    /// insertion is resolved against the indices left by the previous one.
    pub fn insert_pauses(
        &mut self,
        pauses: &BTreeMap<LayerHeight, PauseParams>,
    ) -> Result<Vec<Diagnostic>> {
        let blocks = pauses
            .iter()
            .map(|(&height, params)| {
                let height = checked_height(height)?;
                let block = self.template.render(params, self.line_ending)?;
                Ok((height, block))
            })
            .collect::<Result<Vec<_>>>()?;

        self.transaction(|doc, diagnostics| {
            for (height, block) in blocks {
                doc.insert_block(height, block, diagnostics)?;
            }
            Ok(())
        })
    }

    /// Remove the pause at `height`, if there is one.
    pub fn remove_pause(&mut self, height: impl Into<LayerHeight>) -> Result<Vec<Diagnostic>> {
        let height = checked_height(height.into())?;
        self.transaction(|doc, diagnostics| {
            if !doc.remove_block(height)? {
                diagnostics.push(Diagnostic::NoPauseAtHeight { height });
            }
            Ok(())
        })
    }

    /// Write the current lines verbatim.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        self.lines.write_to(writer)
    }

    /// Write to `destination`, or next to the source file with the export
    /// suffix appended to its stem. Returns the path written.
    pub fn save(&self, destination: Option<&Path>) -> Result<PathBuf> {
        let path = match destination {
            Some(path) => path.to_path_buf(),
            None => self.default_destination()?,
        };
        self.write_to(BufWriter::new(File::create(&path)?))?;
        info!(path = %path.display(), lines = self.lines.len(), "wrote G-code");
        Ok(path)
    }

    /// Where [`save`](Self::save) writes when no destination is given.
    pub fn default_destination(&self) -> Result<PathBuf> {
        self.source
            .as_deref()
            .map(|source| derive_destination(source, &self.export.suffix))
            .ok_or(PauseError::NoDestination)
    }

    fn insert_block(
        &mut self,
        requested: LayerHeight,
        mut block: Vec<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<()> {
        let Some((height, _)) = self.layers.resolve(requested) else {
            diagnostics.push(Diagnostic::AboveLastLayer { requested });
            return Ok(());
        };
        if height != requested {
            diagnostics.push(Diagnostic::LayerNotFound { requested, used: height });
        }

        if self.remove_block(height)? {
            diagnostics.push(Diagnostic::PauseReplaced { height });
        }

        // Removal rebuilt the index; the marker offset may have moved.
        let Some(marker) = self.layers.get(height) else {
            return Ok(());
        };
        let at = marker + 1;
        if at == self.lines.len() && !self.lines[marker].ends_with('\n') {
            // Unterminated last marker: it takes a terminator and the block's
            // last line gives its own up, so the file still ends without one.
            let terminated = format!("{}{}", self.lines[marker], self.line_ending.as_str());
            self.lines.replace(marker, terminated);
            if let Some(last) = block.last_mut() {
                let len = lines::content(last).len();
                last.truncate(len);
            }
        }
        debug!(%height, line = at + 1, count = block.len(), "inserting pause block");
        self.lines.insert(at, block);
        self.reindex()
    }

    fn remove_block(&mut self, height: LayerHeight) -> Result<bool> {
        let Some(record) = self.pauses.get(height) else {
            return Ok(false);
        };
        debug!(%height, start = record.start, end = record.end, "removing pause block");
        let ends_file =
            record.end + 1 == self.lines.len() && !self.lines[record.end].ends_with('\n');
        self.lines.remove(record.start..=record.end);
        if ends_file && record.start > 0 {
            let prev = record.start - 1;
            let stripped = lines::content(&self.lines[prev]).to_string();
            self.lines.replace(prev, stripped);
        }
        self.reindex()?;
        Ok(true)
    }

    fn reindex(&mut self) -> Result<()> {
        let layers = LayerIndex::build(&self.lines)?;
        let pauses = PauseIndex::build(&self.lines, &layers)?;
        self.layers = layers;
        self.pauses = pauses;
        Ok(())
    }

    /// Run `edit`, restoring the previous lines and indices if it fails.
    ///
    /// Diagnostics are logged only once the edit has committed.
    fn transaction(
        &mut self,
        edit: impl FnOnce(&mut Self, &mut Vec<Diagnostic>) -> Result<()>,
    ) -> Result<Vec<Diagnostic>> {
        let saved = (self.lines.clone(), self.layers.clone(), self.pauses.clone());
        let mut diagnostics = Vec::new();
        match edit(self, &mut diagnostics) {
            Ok(()) => {
                for diagnostic in &diagnostics {
                    warn!("{diagnostic}");
                }
                Ok(diagnostics)
            }
            Err(err) => {
                warn!(%err, "edit failed, document restored");
                (self.lines, self.layers, self.pauses) = saved;
                Err(err)
            }
        }
    }
}

impl FromStr for Document {
    type Err = PauseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }
}

fn checked_height(height: LayerHeight) -> Result<LayerHeight> {
    if height.is_finite() {
        Ok(height)
    } else {
        Err(PauseError::InvalidParameters(format!(
            "layer height must be a finite number, got {height}"
        )))
    }
}

/// `dir/name.gcode` + `_pause` -> `dir/name_pause.gcode`.
pub fn derive_destination(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    source.with_file_name(name)
}
