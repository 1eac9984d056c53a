//! Generation request DTO, validation, and defaults.
//!
//! Defaults are applied exactly once, in [`GenerateImageRequest::validate`],
//! before a request enters the queue. Everything downstream consumes the
//! fully resolved [`GenerationRequest`].

use serde::{Deserialize, Serialize};

use crate::catalog::{Angle, Category, Resolution, Style};
use crate::error::CoreError;
use crate::logo::{LogoSettings, LogoSettingsInput};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum description length in characters, after trimming.
pub const MIN_DESCRIPTION_CHARS: usize = 3;

/// Maximum description length in characters, after trimming.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Maximum color hint length in characters.
pub const MAX_COLOR_CHARS: usize = 50;

/// Fewest images a single job may request.
pub const MIN_IMAGES: u32 = 1;

/// Most images a single job may request.
pub const MAX_IMAGES: u32 = 4;

/// Images produced when `numImages` is absent.
pub const DEFAULT_IMAGES: u32 = 1;

// ---------------------------------------------------------------------------
// Wire DTO
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/generate` and `POST /api/v1/jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub description: Option<String>,
    pub category: Option<String>,
    pub style: Option<String>,
    pub angle: Option<String>,
    pub color: Option<String>,
    pub num_images: Option<i64>,
    pub resolution: Option<String>,
    pub logo: Option<LogoSettingsInput>,
}

/// A fully validated request with every default resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub description: String,
    pub category: Category,
    pub style: Style,
    pub angle: Angle,
    pub color: Option<String>,
    pub num_images: u32,
    pub resolution: Resolution,
    pub logo: Option<LogoSettings>,
}

impl GenerationRequest {
    /// A request for `description` with every optional field at its default.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            category: Category::default(),
            style: Style::default(),
            angle: Angle::default(),
            color: None,
            num_images: DEFAULT_IMAGES,
            resolution: Resolution::default(),
            logo: None,
        }
    }

    /// Whether any image of this job must go through the compositor.
    pub fn wants_logo(&self) -> bool {
        self.logo
            .as_ref()
            .is_some_and(LogoSettings::requires_compositing)
    }
}

impl GenerateImageRequest {
    /// Validate the raw request and resolve defaults.
    ///
    /// Fails with [`CoreError::Validation`] carrying a human-readable message
    /// on the first violated rule.
    pub fn validate(&self) -> Result<GenerationRequest, CoreError> {
        let description = validate_description(self.description.as_deref())?;

        let category = parse_or_default(self.category.as_deref(), Category::parse)?;
        let style = parse_or_default(self.style.as_deref(), Style::parse)?;
        let angle = parse_or_default(self.angle.as_deref(), Angle::parse)?;
        let resolution = parse_or_default(self.resolution.as_deref(), Resolution::parse)?;

        let color = match self.color.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(c) if c.chars().count() > MAX_COLOR_CHARS => {
                return Err(CoreError::Validation(format!(
                    "Color must be at most {MAX_COLOR_CHARS} characters"
                )));
            }
            Some(c) => Some(c.to_string()),
        };

        let num_images = match self.num_images {
            None => DEFAULT_IMAGES,
            Some(n) if (MIN_IMAGES as i64..=MAX_IMAGES as i64).contains(&n) => n as u32,
            Some(n) => {
                return Err(CoreError::Validation(format!(
                    "numImages must be between {MIN_IMAGES} and {MAX_IMAGES} (got {n})"
                )));
            }
        };

        let logo = self.logo.as_ref().map(LogoSettingsInput::validate).transpose()?;

        Ok(GenerationRequest {
            description,
            category,
            style,
            angle,
            color,
            num_images,
            resolution,
            logo,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_description(raw: Option<&str>) -> Result<String, CoreError> {
    let description = raw.map(str::trim).unwrap_or("");
    if description.is_empty() {
        return Err(CoreError::Validation(
            "Product description is required".to_string(),
        ));
    }

    let chars = description.chars().count();
    if chars < MIN_DESCRIPTION_CHARS {
        return Err(CoreError::Validation(format!(
            "Product description must be at least {MIN_DESCRIPTION_CHARS} characters"
        )));
    }
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(CoreError::Validation(format!(
            "Product description must be at most {MAX_DESCRIPTION_CHARS} characters (got {chars})"
        )));
    }

    Ok(description.to_string())
}

/// Empty or absent values fall back to the vocabulary default.
fn parse_or_default<T: Default>(
    raw: Option<&str>,
    parse: fn(&str) -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    match raw {
        Some(value) if !value.trim().is_empty() => parse(value),
        _ => Ok(T::default()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logo::LogoKind;
    use assert_matches::assert_matches;

    fn with_description(description: &str) -> GenerateImageRequest {
        GenerateImageRequest {
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_applied_once() {
        let request = with_description("  Ceramic coffee mug  ").validate().unwrap();
        assert_eq!(request, GenerationRequest::new("Ceramic coffee mug"));
        assert_eq!(request.num_images, 1);
        assert_eq!(request.resolution, Resolution::Large);
        assert!(!request.wants_logo());
    }

    #[test]
    fn description_is_required() {
        let err = GenerateImageRequest::default().validate().unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("required"));
    }

    #[test]
    fn description_length_bounds_apply_after_trim() {
        assert!(with_description("  ab  ").validate().is_err());
        assert!(with_description("abc").validate().is_ok());
        assert!(with_description(&"x".repeat(MAX_DESCRIPTION_CHARS)).validate().is_ok());
        assert!(with_description(&"x".repeat(MAX_DESCRIPTION_CHARS + 1)).validate().is_err());
    }

    #[test]
    fn num_images_bounds() {
        for (n, ok) in [(0, false), (1, true), (4, true), (5, false), (-1, false)] {
            let mut raw = with_description("Leather wallet");
            raw.num_images = Some(n);
            assert_eq!(raw.validate().is_ok(), ok, "numImages = {n}");
        }
    }

    #[test]
    fn unknown_enumeration_value_is_rejected() {
        let mut raw = with_description("Leather wallet");
        raw.resolution = Some("640x480".into());
        let err = raw.validate().unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("resolution"));
    }

    #[test]
    fn blank_optional_values_use_defaults() {
        let mut raw = with_description("Leather wallet");
        raw.category = Some("".into());
        raw.color = Some("   ".into());
        let request = raw.validate().unwrap();
        assert_eq!(request.category, Category::Other);
        assert_eq!(request.color, None);
    }

    #[test]
    fn logo_settings_are_validated_with_the_request() {
        let mut raw = with_description("Leather wallet");
        raw.logo = Some(LogoSettingsInput {
            kind: Some("text".into()),
            content: Some("ACME".into()),
            ..Default::default()
        });
        let request = raw.validate().unwrap();
        assert!(request.wants_logo());
        assert_matches!(request.logo.unwrap().kind, LogoKind::Text { .. });
    }

    #[test]
    fn none_logo_does_not_require_compositing() {
        let mut raw = with_description("Leather wallet");
        raw.logo = Some(LogoSettingsInput {
            kind: Some("none".into()),
            ..Default::default()
        });
        assert!(!raw.validate().unwrap().wants_logo());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let raw: GenerateImageRequest = serde_json::from_value(serde_json::json!({
            "description": "Red running shoe, mesh upper",
            "numImages": 2,
            "resolution": "512x512"
        }))
        .unwrap();
        let request = raw.validate().unwrap();
        assert_eq!(request.num_images, 2);
        assert_eq!(request.resolution, Resolution::Small);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["numImages"], 2);
        assert_eq!(json["resolution"], "512x512");
    }
}
