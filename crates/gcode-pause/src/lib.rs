#![warn(missing_docs)]

//! Insert and remove printer pauses at layer boundaries in G-code.
//!
//! Slicers mark the start of every layer with a comment holding the layer
//! height (`;4.2`). This crate indexes those markers and splices pause
//! blocks in after them, so a multi-color print can stop for a filament
//! swap at exactly the right layer.
//!
//! # Example
//!
//! ```no_run
//! use gcode_pause::{Document, PauseParams};
//!
//! let mut doc = Document::open("benchy.gcode")?;
//! let warnings = doc.insert_pause(4.2, &PauseParams::new(25.0, 125.0, 200.0).with_message("Swap"))?;
//! for warning in &warnings {
//!     eprintln!("warning: {warning}");
//! }
//! let written = doc.save(None)?;
//! println!("wrote {}", written.display()); // benchy_pause.gcode
//! # Ok::<(), gcode_pause::PauseError>(())
//! ```

pub mod diagnostic;
pub mod document;
pub mod error;
pub mod format;
pub mod height;
pub mod layers;
pub mod lines;
pub mod pauses;
pub mod template;

pub use diagnostic::Diagnostic;
pub use document::{derive_destination, Document, ExportOptions, DEFAULT_SUFFIX};
pub use error::{PauseError, Result};
pub use height::{LayerHeight, ParseHeightError};
pub use layers::LayerIndex;
pub use lines::{LineEnding, LineStore, Revision};
pub use pauses::{PauseIndex, PauseRecord};
pub use template::{PauseParams, PauseTemplate, TemplateOptions, PAUSE_BLOCK_LEN};
