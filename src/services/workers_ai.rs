use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::image::{ImageHandle, SourceImage};
use crate::services::transform::{ImageTransform, TransformError};

/// Default img2img model on Cloudflare Workers AI.
pub const DEFAULT_MODEL: &str = "@cf/runwayml/stable-diffusion-v1-5-img2img";

/// How far the model may drift from the source photo (0.0 - 1.0).
const STRENGTH: f32 = 0.6;

const NUM_STEPS: u32 = 20;

/// Client for Cloudflare Workers AI image-to-image models.
pub struct WorkersAiClient {
    http: Client,
    account_id: String,
    api_token: String,
    model: String,
}

#[derive(Serialize)]
struct Img2ImgRequest<'a> {
    prompt: &'a str,
    image_b64: String,
    strength: f32,
    num_steps: u32,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

#[derive(Deserialize)]
struct ApiErrorEntry {
    message: String,
}

impl WorkersAiClient {
    pub fn new(
        account_id: &str,
        api_token: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, TransformError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
            model: model.to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/ai/run/{}",
            self.account_id, self.model
        )
    }
}

#[async_trait]
impl ImageTransform for WorkersAiClient {
    /// Send the source photo and directive to the img2img model and return the
    /// generated image bytes.
    async fn transform(
        &self,
        source: &SourceImage,
        directive: &str,
    ) -> Result<ImageHandle, TransformError> {
        let request_body = Img2ImgRequest {
            prompt: directive,
            image_b64: base64::engine::general_purpose::STANDARD.encode(source.bytes()),
            strength: STRENGTH,
            num_steps: NUM_STEPS,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_token)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransformError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(TransformError::EmptyResult);
        }

        ImageHandle::sniffed(bytes.to_vec()).map_err(|_| TransformError::InvalidImage)
    }
}

/// Pull the first API error message out of a Cloudflare error envelope,
/// falling back to the raw body.
fn rejection_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next())
        .map(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}
