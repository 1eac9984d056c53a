//! Logo and watermark overlay settings.
//!
//! [`LogoKind`] is a tagged variant: `none` carries nothing, `image` carries
//! the stored logo filename, `text` carries the watermark text and its
//! styling. [`LogoSettingsInput`] is the loosely typed wire form, converted
//! (and clamped) by [`LogoSettingsInput::validate`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::storage::validate_filename;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest accepted logo width, in percent of the base image width.
pub const MIN_LOGO_SIZE: u32 = 5;

/// Largest accepted logo width, in percent of the base image width.
pub const MAX_LOGO_SIZE: u32 = 50;

/// Logo width used when the request does not specify one.
pub const DEFAULT_LOGO_SIZE: u32 = 15;

/// Opacity used when the request does not specify one (fully opaque).
pub const DEFAULT_OPACITY: u8 = 100;

/// Rotation bound in degrees (inclusive, both directions).
pub const MAX_ROTATION_DEGREES: f32 = 360.0;

/// Watermark text fill when `textColor` is absent.
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// Watermark font family when `fontFamily` is absent.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Maximum watermark text length in characters.
pub const MAX_TEXT_CHARS: usize = 100;

/// Maximum font family length in characters.
const MAX_FONT_FAMILY_CHARS: usize = 64;

/// Maximum text color length in characters.
const MAX_TEXT_COLOR_CHARS: usize = 32;

/// Accepted `type` values on the wire.
pub const LOGO_TYPES: &[&str] = &["none", "image", "text"];

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

define_vocabulary! {
    /// Anchor position of the overlay on the base image.
    Position("logo position") {
        Center = "center",
        TopLeft = "top-left",
        TopCenter = "top-center",
        TopRight = "top-right",
        MiddleLeft = "middle-left",
        MiddleRight = "middle-right",
        BottomLeft = "bottom-left",
        BottomCenter = "bottom-center",
        BottomRight = "bottom-right",
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::BottomRight
    }
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

/// What gets overlaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogoKind {
    /// No overlay; compositing is skipped entirely.
    None,
    /// An uploaded logo file, referenced by its stored filename.
    Image { file: String },
    /// A rendered text watermark.
    Text {
        text: String,
        color: String,
        font_family: String,
    },
}

impl LogoKind {
    /// Wire name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Validated overlay settings. Numeric fields are already clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSettings {
    pub kind: LogoKind,
    pub position: Position,
    /// Overlay width in percent of the base image width (5–50).
    pub size: u32,
    /// Uniform alpha multiplier in percent (0–100).
    pub opacity: u8,
    /// Clockwise rotation in degrees.
    pub rotation: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl LogoSettings {
    /// Settings for `kind` with every other field at its default.
    pub fn new(kind: LogoKind) -> Self {
        Self {
            kind,
            position: Position::default(),
            size: DEFAULT_LOGO_SIZE,
            opacity: DEFAULT_OPACITY,
            rotation: 0.0,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Whether a compositing step has to run for these settings.
    pub fn requires_compositing(&self) -> bool {
        !self.kind.is_none()
    }
}

// ---------------------------------------------------------------------------
// Wire DTO
// ---------------------------------------------------------------------------

/// Logo settings as received over HTTP (`type`, `content`, `position`, …).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoSettingsInput {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub content: Option<String>,
    pub position: Option<String>,
    pub size: Option<f64>,
    pub opacity: Option<f64>,
    pub rotation: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub text_color: Option<String>,
    pub font_family: Option<String>,
}

impl LogoSettingsInput {
    /// Validate and normalize into [`LogoSettings`].
    ///
    /// - `type` defaults to `none`; anything outside `none | image | text`
    ///   is an unsupported logo type.
    /// - `content` is required (non-empty) for `image` and `text`.
    /// - `size` is clamped to 5–50 and `opacity` to 0–100.
    /// - `rotation` must lie within −360..=360.
    pub fn validate(&self) -> Result<LogoSettings, CoreError> {
        let kind_name = self
            .kind
            .as_deref()
            .map(|k| k.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "none".to_string());

        let content = self.content.as_deref().map(str::trim).unwrap_or("");

        let kind = match kind_name.as_str() {
            "none" => LogoKind::None,
            "image" => {
                if content.is_empty() {
                    return Err(CoreError::Validation(
                        "Logo content (uploaded filename or URL) is required for image logos"
                            .to_string(),
                    ));
                }
                LogoKind::Image {
                    file: logo_filename_from_content(content)?,
                }
            }
            "text" => {
                if content.is_empty() {
                    return Err(CoreError::Validation(
                        "Logo content (watermark text) is required for text logos".to_string(),
                    ));
                }
                if content.chars().count() > MAX_TEXT_CHARS {
                    return Err(CoreError::Validation(format!(
                        "Watermark text must be at most {MAX_TEXT_CHARS} characters"
                    )));
                }
                LogoKind::Text {
                    text: content.to_string(),
                    color: validate_text_color(self.text_color.as_deref())?,
                    font_family: validate_font_family(self.font_family.as_deref())?,
                }
            }
            other => {
                return Err(CoreError::Validation(format!(
                    "Unsupported logo type '{other}'. Must be one of: {}",
                    LOGO_TYPES.join(", ")
                )));
            }
        };

        let position = match self.position.as_deref() {
            Some(p) if !p.trim().is_empty() => Position::parse(p)?,
            _ => Position::default(),
        };

        let size = self
            .size
            .map(|s| clamp_round(s, MIN_LOGO_SIZE as f64, MAX_LOGO_SIZE as f64) as u32)
            .unwrap_or(DEFAULT_LOGO_SIZE);

        let opacity = self
            .opacity
            .map(|o| clamp_round(o, 0.0, 100.0) as u8)
            .unwrap_or(DEFAULT_OPACITY);

        let rotation = match self.rotation {
            Some(r) if !r.is_finite() || r.abs() > MAX_ROTATION_DEGREES as f64 => {
                return Err(CoreError::Validation(format!(
                    "Logo rotation must be between -{MAX_ROTATION_DEGREES} and {MAX_ROTATION_DEGREES} degrees"
                )));
            }
            Some(r) => r as f32,
            None => 0.0,
        };

        Ok(LogoSettings {
            kind,
            position,
            size,
            opacity,
            rotation,
            offset_x: validate_offset(self.offset_x, "offsetX")?,
            offset_y: validate_offset(self.offset_y, "offsetY")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_round(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.round().clamp(min, max)
}

fn validate_offset(value: Option<f64>, field: &str) -> Result<i32, CoreError> {
    match value {
        None => Ok(0),
        Some(v) if v.is_finite() && v.abs() <= i32::MAX as f64 => Ok(v.round() as i32),
        Some(_) => Err(CoreError::Validation(format!(
            "Logo {field} must be a finite pixel offset"
        ))),
    }
}

/// Reduce an image logo reference to the bare stored filename.
///
/// Accepts a plain filename, a static path such as `/uploads/logos/x.png`,
/// or an absolute URL; query strings and fragments are dropped.
pub fn logo_filename_from_content(content: &str) -> Result<String, CoreError> {
    let without_query = content
        .split(['?', '#'])
        .next()
        .unwrap_or(content)
        .trim_end_matches('/');
    let filename = without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query)
        .trim();

    validate_filename(filename).map_err(|e| CoreError::Validation(e.to_string()))?;
    Ok(filename.to_string())
}

/// Accepts `#rgb`/`#rrggbb`/`#rrggbbaa` hex colors and plain CSS color names.
fn validate_text_color(value: Option<&str>) -> Result<String, CoreError> {
    let color = match value.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_TEXT_COLOR.to_string()),
        Some(c) => c,
    };

    let is_hex = color.len() > 1
        && color.starts_with('#')
        && matches!(color.len() - 1, 3 | 4 | 6 | 8)
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    let is_name = color.len() <= MAX_TEXT_COLOR_CHARS && color.chars().all(|c| c.is_ascii_alphabetic());

    if is_hex || is_name {
        Ok(color.to_string())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid textColor '{color}'. Use a hex color such as #FFFFFF or a color name"
        )))
    }
}

fn validate_font_family(value: Option<&str>) -> Result<String, CoreError> {
    let family = match value.map(str::trim) {
        None | Some("") => return Ok(DEFAULT_FONT_FAMILY.to_string()),
        Some(f) => f,
    };

    let allowed = family
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | ','));
    if allowed && family.chars().count() <= MAX_FONT_FAMILY_CHARS {
        Ok(family.to_string())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid fontFamily '{family}'"
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
