//! Handler for `GET /api/v1/options`: the vocabularies a client may send.

use axum::Json;
use prodshot_core::catalog::{Angle, Category, Resolution, Style};
use prodshot_core::logo::{
    Position, DEFAULT_LOGO_SIZE, DEFAULT_OPACITY, LOGO_TYPES, MAX_LOGO_SIZE, MIN_LOGO_SIZE,
};
use prodshot_core::request::{MAX_IMAGES, MIN_IMAGES};
use prodshot_core::upload::{ALLOWED_LOGO_EXTENSIONS, MAX_LOGO_UPLOAD_BYTES};
use serde_json::{json, Value};

/// GET /api/v1/options
pub async fn list_options() -> Json<Value> {
    Json(json!({
        "categories": Category::names(),
        "styles": Style::names(),
        "angles": Angle::names(),
        "resolutions": Resolution::names(),
        "logo": {
            "types": LOGO_TYPES,
            "positions": Position::names(),
            "minSize": MIN_LOGO_SIZE,
            "maxSize": MAX_LOGO_SIZE,
            "defaultSize": DEFAULT_LOGO_SIZE,
            "defaultOpacity": DEFAULT_OPACITY,
            "uploadExtensions": ALLOWED_LOGO_EXTENSIONS,
            "maxUploadBytes": MAX_LOGO_UPLOAD_BYTES,
        },
        "numImages": { "min": MIN_IMAGES, "max": MAX_IMAGES },
    }))
}
