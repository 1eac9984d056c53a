//! Client for the external text-to-image synthesis service.
//!
//! [`ImageSynthesizer`] is the seam the worker depends on; [`SynthesisApi`]
//! is the HTTP implementation. The service may answer "model is warming
//! up" (HTTP 503); the client waits the suggested time and resubmits the
//! identical request a bounded number of times.

pub mod api;
pub mod retry;

use async_trait::async_trait;
use serde::Serialize;

pub use api::{SynthesisApi, SynthesisConfig};
pub use retry::WarmupPolicy;

/// Classifier-free guidance scale sent with every request.
pub const DEFAULT_GUIDANCE_SCALE: f32 = 7.5;

/// Denoising steps sent with every request.
pub const DEFAULT_INFERENCE_STEPS: u32 = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the synthesis layer.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status other than warm-up.
    #[error("Synthesis API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The model was still loading after every allowed attempt.
    #[error("Model is still warming up (estimated {estimated_secs:.0}s)")]
    WarmingUp { estimated_secs: f64 },

    /// A 2xx response carried no image bytes.
    #[error("Synthesis service returned an empty image")]
    EmptyResponse,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One text-to-image call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
}

impl SynthesisRequest {
    /// Request with the default guidance and step count.
    pub fn new(
        prompt: impl Into<String>,
        negative_prompt: impl Into<String>,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
            guidance_scale: DEFAULT_GUIDANCE_SCALE,
            num_inference_steps: DEFAULT_INFERENCE_STEPS,
            width,
            height,
        }
    }

    /// JSON body in the inference-endpoint format.
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "inputs": self.prompt,
            "parameters": {
                "negative_prompt": self.negative_prompt,
                "guidance_scale": self.guidance_scale,
                "num_inference_steps": self.num_inference_steps,
                "width": self.width,
                "height": self.height,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Anything that turns a prompt into encoded image bytes.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    async fn generate(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_body_nests_parameters() {
        let request = SynthesisRequest::new("a red shoe", "blurry", (512, 768));
        let wire = request.to_wire();

        assert_eq!(wire["inputs"], "a red shoe");
        assert_eq!(wire["parameters"]["negative_prompt"], "blurry");
        assert_eq!(wire["parameters"]["guidance_scale"], 7.5);
        assert_eq!(wire["parameters"]["num_inference_steps"], 30);
        assert_eq!(wire["parameters"]["width"], 512);
        assert_eq!(wire["parameters"]["height"], 768);
    }
}
