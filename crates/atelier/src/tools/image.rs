use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Local;
use reqwest::Client;
use serde_json::{json, Value};

use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::Tool;
use crate::tools::{require_str, ToolHandler};

pub const IMAGE_HOST: &str = "https://api.replicate.com";

/// Where generated images are written, relative to the working directory
pub const IMAGE_DIR: &str = "./image";

/// Client for the image generation and critique model endpoints
#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    host: String,
    token: String,
}

impl ImageClient {
    pub fn new(host: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            client,
            host,
            token,
        })
    }

    pub fn from_env() -> Result<Self> {
        let token = env::var("IMAGE_API_KEY").context("IMAGE_API_KEY is not set")?;
        let host = env::var("IMAGE_HOST").unwrap_or_else(|_| IMAGE_HOST.to_string());
        Self::new(host, token)
    }

    async fn predict(&self, input: Value) -> AgentResult<Value> {
        let url = format!("{}/v1/predictions", self.host.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.token))
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::ExternalService(format!(
                "Image model request failed with status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))
    }

    /// Run the text-to-image model; returns one or more image URLs
    pub async fn generate(&self, prompt: &str) -> AgentResult<Vec<String>> {
        let output = self.predict(json!({ "prompt": prompt })).await?;
        let urls: Vec<String> = output["output"]
            .as_array()
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }

    /// Run the image critique model over base64 image data
    pub async fn review(&self, image_data: &str, prompt: &str) -> AgentResult<String> {
        let critique_prompt = format!(
            "Please provide a description of the image and then rate, on a scale of 1 to 10, \
             how closely the image aligns with the provided description. {}?",
            prompt
        );
        let output = self
            .predict(json!({
                "image": format!("data:image/png;base64,{}", image_data),
                "prompt": critique_prompt,
            }))
            .await?;

        // The critique model streams its answer as a list of string fragments
        let review = output["output"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(review)
    }

    /// Download an image and persist it under `dir` with a timestamped name
    pub async fn download(&self, image_url: &str, dir: &Path, stem: &str) -> AgentResult<PathBuf> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AgentError::ExternalService(format!(
                "Image download failed with status {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AgentError::ExternalService(e.to_string()))?;

        fs::create_dir_all(dir)
            .map_err(|e| AgentError::Internal(format!("Could not create image dir: {}", e)))?;
        let timestamp = Local::now().format("%Y%m%d%H%M%S");
        let path = dir.join(format!("{}_{}.png", stem, timestamp));
        fs::write(&path, &bytes)
            .map_err(|e| AgentError::Internal(format!("Could not write image: {}", e)))?;
        Ok(path)
    }
}

/// Generates an image from a prompt and saves it locally, returning the
/// file path so other agents can critique it.
pub struct GenerateImageTool {
    client: ImageClient,
    dir: PathBuf,
    counter: Arc<AtomicU32>,
}

impl GenerateImageTool {
    pub fn new(client: ImageClient, dir: PathBuf, counter: Arc<AtomicU32>) -> Self {
        Self {
            client,
            dir,
            counter,
        }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "generate_image",
            "Utilize the most recent AI model to create an image using a given prompt \
             and provide the file path to the generated image.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "A detailed textual prompt that provides a description of the image to be generated."
                    }
                },
                "required": ["prompt"]
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for GenerateImageTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let prompt = require_str(&arguments, "prompt")?;
        let urls = self.client.generate(prompt).await?;
        let first = urls.first().ok_or_else(|| {
            AgentError::ExternalService("The image generation process was unsuccessful".to_string())
        })?;

        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let stem = format!("image-{}", count);
        let path = self.client.download(first, &self.dir, &stem).await?;
        tracing::info!(prompt, path = %path.display(), "generated image");
        Ok(vec![Content::text(format!(
            "Image saved as '{}'",
            path.display()
        ))])
    }
}

/// Critiques a previously generated image against its original prompt
pub struct ReviewImageTool {
    client: ImageClient,
}

impl ReviewImageTool {
    pub fn new(client: ImageClient) -> Self {
        Self { client }
    }

    pub fn tool() -> Tool {
        Tool::new(
            "image_review",
            "Examine and assess the image created by AI according to the initial prompt, \
             offering feedback and recommendations for enhancement.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "The original input text that served as the prompt for generating the image."
                    },
                    "image_path": {
                        "type": "string",
                        "description": "The complete file path for the image, including both the directory path and the file extension."
                    }
                },
                "required": ["prompt", "image_path"]
            }),
        )
    }
}

#[async_trait]
impl ToolHandler for ReviewImageTool {
    async fn call(&self, arguments: Value) -> AgentResult<Vec<Content>> {
        let prompt = require_str(&arguments, "prompt")?;
        let image_path = require_str(&arguments, "image_path")?;

        let bytes = fs::read(image_path).map_err(|e| {
            AgentError::InvalidArgument(format!("Could not read image {}: {}", image_path, e))
        })?;
        let review = self.client.review(&BASE64.encode(bytes), prompt).await?;
        Ok(vec![Content::text(review)])
    }
}
