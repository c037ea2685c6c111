//! Pause block template.
//!
//! A pause block lifts the hot end, parks it away from the print, shows a
//! message and stops until the user resumes:
//!
//! ```text
//! ;BEGIN_PAUSE
//! G91    ; Put in relative mode
//! G1 Z25    ; Raise hot end by 25mm
//! G90    ; Put back in absolute mode
//! G1 X125 Y200    ; Move the X & Y away from the print
//! M117 Swap filament    ; Display the pause message
//! M0    ; Pause and wait for the user
//! ;END_PAUSE
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{PauseError, Result};
use crate::format::format_significant;
use crate::lines::LineEnding;

/// First line of every pause block.
pub const PAUSE_BEGIN: &str = ";BEGIN_PAUSE";

/// Last line of every pause block.
pub const PAUSE_END: &str = ";END_PAUSE";

/// Number of lines in a rendered pause block.
pub const PAUSE_BLOCK_LEN: usize = 8;

/// Default number of significant digits for coordinates.
pub const DEFAULT_PRECISION: usize = 4;

fn default_lift() -> f64 {
    10.0
}

fn default_park() -> f64 {
    10.0
}

/// Parameters of one pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PauseParams {
    /// How far to raise the hot end (mm, relative).
    #[serde(default = "default_lift")]
    pub z_offset: f64,
    /// X park position (mm, absolute).
    #[serde(default = "default_park")]
    pub x_pause: f64,
    /// Y park position (mm, absolute).
    #[serde(default = "default_park")]
    pub y_pause: f64,
    /// Message shown on the printer display.
    #[serde(default)]
    pub message: String,
}

impl Default for PauseParams {
    fn default() -> Self {
        Self {
            z_offset: default_lift(),
            x_pause: default_park(),
            y_pause: default_park(),
            message: String::new(),
        }
    }
}

impl PauseParams {
    /// Create parameters with an empty message.
    pub fn new(z_offset: f64, x_pause: f64, y_pause: f64) -> Self {
        Self {
            z_offset,
            x_pause,
            y_pause,
            message: String::new(),
        }
    }

    /// Set the display message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Check the parameters can be rendered.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("z_offset", self.z_offset),
            ("x_pause", self.x_pause),
            ("y_pause", self.y_pause),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PauseError::InvalidParameters(format!(
                    "{name} must be greater than zero, got {value}"
                )));
            }
        }
        if self.message.contains(['\n', '\r']) {
            return Err(PauseError::InvalidParameters(
                "message must be a single line".into(),
            ));
        }
        Ok(())
    }
}

/// Template rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Significant digits for the lift and park coordinates.
    pub precision: usize,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Renders [`PauseParams`] into G-code lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PauseTemplate {
    options: TemplateOptions,
}

impl PauseTemplate {
    /// Create a template with the given options.
    pub fn new(options: TemplateOptions) -> Self {
        Self { options }
    }

    /// Render a pause block, each line terminated with `ending`.
    pub fn render(&self, params: &PauseParams, ending: LineEnding) -> Result<Vec<String>> {
        params.validate()?;

        let num = |v: f64| format_significant(v, self.options.precision);
        let z = num(params.z_offset);
        let eol = ending.as_str();

        let lines = vec![
            format!("{PAUSE_BEGIN}{eol}"),
            format!("G91    ; Put in relative mode{eol}"),
            format!("G1 Z{z}    ; Raise hot end by {z}mm{eol}"),
            format!("G90    ; Put back in absolute mode{eol}"),
            format!(
                "G1 X{} Y{}    ; Move the X & Y away from the print{eol}",
                num(params.x_pause),
                num(params.y_pause)
            ),
            format!("M117 {}    ; Display the pause message{eol}", params.message),
            format!("M0    ; Pause and wait for the user{eol}"),
            format!("{PAUSE_END}{eol}"),
        ];
        debug_assert_eq!(lines.len(), PAUSE_BLOCK_LEN);
        Ok(lines)
    }
}
