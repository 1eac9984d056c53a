//! Closed vocabularies accepted by the generation endpoint.
//!
//! Each vocabulary also carries the prompt fragment it contributes, so the
//! prompt builder never has to match on raw strings.

define_vocabulary! {
    /// Product category.
    Category("category") {
        Electronics = "electronics",
        Clothing = "clothing",
        Footwear = "footwear",
        Furniture = "furniture",
        Food = "food",
        Beverage = "beverage",
        Cosmetics = "cosmetics",
        Jewelry = "jewelry",
        Accessories = "accessories",
        Toys = "toys",
        Sports = "sports",
        Home = "home",
        Other = "other",
    }
}

define_vocabulary! {
    /// Photographic style.
    Style("style") {
        Studio = "studio",
        Lifestyle = "lifestyle",
        Minimalist = "minimalist",
        Luxury = "luxury",
        Outdoor = "outdoor",
        Vintage = "vintage",
        FlatLay = "flat-lay",
    }
}

define_vocabulary! {
    /// Camera angle.
    Angle("angle") {
        Front = "front",
        Side = "side",
        Back = "back",
        Top = "top",
        ThreeQuarter = "three-quarter",
        CloseUp = "close-up",
    }
}

define_vocabulary! {
    /// Output resolution.
    Resolution("resolution") {
        Small = "512x512",
        Medium = "768x768",
        Large = "1024x1024",
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::Studio
    }
}

impl Default for Angle {
    fn default() -> Self {
        Self::Front
    }
}

/// The largest resolution is the default.
impl Default for Resolution {
    fn default() -> Self {
        Self::Large
    }
}

impl Category {
    /// Subject-matter hint appended to the prompt.
    pub fn prompt_fragment(self) -> &'static str {
        match self {
            Self::Electronics => "sleek consumer electronics, crisp edges, subtle reflections",
            Self::Clothing => "apparel with visible fabric texture and natural drape",
            Self::Footwear => "footwear with detailed stitching and material texture",
            Self::Furniture => "furniture piece with accurate proportions and wood or fabric detail",
            Self::Food => "appetizing food, fresh ingredients, natural colors",
            Self::Beverage => "beverage with condensation droplets and clear liquid detail",
            Self::Cosmetics => "cosmetic product with glossy packaging and clean labels",
            Self::Jewelry => "fine jewelry with sparkling highlights and precise metal detail",
            Self::Accessories => "fashion accessory with fine material detail",
            Self::Toys => "colorful toy with playful presentation",
            Self::Sports => "sports equipment with dynamic presentation",
            Self::Home => "home goods in a tidy setting",
            Self::Other => "product with accurate shape and material detail",
        }
    }
}

impl Style {
    /// Background and lighting description appended to the prompt.
    pub fn prompt_fragment(self) -> &'static str {
        match self {
            Self::Studio => "seamless white studio background, softbox lighting, soft shadows",
            Self::Lifestyle => "natural lifestyle setting, warm ambient light, shallow depth of field",
            Self::Minimalist => "minimalist composition, solid pastel background, negative space",
            Self::Luxury => "luxury presentation, dark marble surface, dramatic rim lighting",
            Self::Outdoor => "outdoor scene, golden hour sunlight, natural environment",
            Self::Vintage => "vintage aesthetic, film grain, muted warm tones",
            Self::FlatLay => "flat lay arrangement on textured surface, even overhead lighting",
        }
    }
}

impl Angle {
    /// Camera placement description appended to the prompt.
    pub fn prompt_fragment(self) -> &'static str {
        match self {
            Self::Front => "front view, straight-on camera",
            Self::Side => "side profile view",
            Self::Back => "rear view",
            Self::Top => "top-down view from directly above",
            Self::ThreeQuarter => "three-quarter view at a 45 degree angle",
            Self::CloseUp => "macro close-up shot highlighting details",
        }
    }
}

impl Resolution {
    /// `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Small => (512, 512),
            Self::Medium => (768, 768),
            Self::Large => (1024, 1024),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use assert_matches::assert_matches;

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Category::parse(" Electronics ").unwrap(), Category::Electronics);
        assert_eq!(Style::parse("FLAT-LAY").unwrap(), Style::FlatLay);
        assert_eq!(Angle::parse("three-quarter").unwrap(), Angle::ThreeQuarter);
    }

    #[test]
    fn parse_rejects_unknown_value_with_listing() {
        let err = Style::parse("watercolor").unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("studio, lifestyle"));
    }

    #[test]
    fn defaults_match_documented_values() {
        assert_eq!(Category::default(), Category::Other);
        assert_eq!(Style::default(), Style::Studio);
        assert_eq!(Angle::default(), Angle::Front);
        assert_eq!(Resolution::default(), Resolution::Large);
    }

    #[test]
    fn resolution_dimensions() {
        assert_eq!(Resolution::parse("512x512").unwrap().dimensions(), (512, 512));
        assert_eq!(Resolution::Medium.dimensions(), (768, 768));
        assert_eq!(Resolution::default().dimensions(), (1024, 1024));
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Style::FlatLay).unwrap();
        assert_eq!(json, "\"flat-lay\"");
        let parsed: Resolution = serde_json::from_str("\"768x768\"").unwrap();
        assert_eq!(parsed, Resolution::Medium);
    }

    #[test]
    fn names_follow_declaration_order() {
        assert_eq!(Angle::names().first(), Some(&"front"));
        assert_eq!(Category::names().last(), Some(&"other"));
        assert_eq!(Resolution::ALL.len(), 3);
    }
}
