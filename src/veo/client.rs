//! VeoClient - handles communication with the Gemini video generation API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use super::image::ImagePayload;
use super::params::{AspectRatio, GenerationOptions, Resolution};
use super::progress::MessageSource;
use crate::state::{emit, EventSender, GenerationEvent, GenerationPhase, VideoResult};

/// The environment variable name for the API key.
pub const API_KEY_ENV: &str = "VEO_API_KEY";

/// Secondary environment variable checked when `VEO_API_KEY` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model for image-to-video generation.
pub const DEFAULT_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Default delay between status checks (10 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Hint appended to permission-shaped failures.
pub const BILLING_HINT: &str = "Video generation requires an API key from a Google Cloud \
     project with billing enabled. Please select a different API key and try again.";

/// Default timeout for a single HTTP request (2 minutes, long enough for the video download).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const API_VERSION: &str = "v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP status code for forbidden.
const HTTP_STATUS_FORBIDDEN: u16 = 403;

/// Substrings (lowercase) that mark an error message as a billing or
/// permission problem with the selected key.
const PERMISSION_KEYWORDS: &[&str] = &[
    "permission_denied",
    "permission denied",
    "billing",
    "requested entity was not found",
    "api key not valid",
    "api_key_invalid",
];

/// Check if an error message indicates a billing or permission problem.
pub fn is_permission_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    PERMISSION_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Request body for `predictLongRunning`.
#[derive(Debug, Serialize)]
struct GenerateVideosRequest {
    instances: Vec<VideoInstance>,
    parameters: VideoParameters,
}

#[derive(Debug, Serialize)]
struct VideoInstance {
    prompt: String,
    image: InlineImage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineImage {
    bytes_base64_encoded: String,
    mime_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VideoParameters {
    aspect_ratio: AspectRatio,
    resolution: Resolution,
}

/// Handle to a long-running remote generation job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Operation {
    /// Resource name, e.g. `models/{model}/operations/{id}`.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
    #[serde(default)]
    pub rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoAsset {
    #[serde(default)]
    pub uri: Option<String>,
}

impl Operation {
    /// URI of the first generated video, if the operation produced one.
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .iter()
            .find_map(|sample| sample.video.as_ref()?.uri.as_deref())
            .filter(|uri| !uri.is_empty())
    }

    /// Content filter reasons reported by the service, if any.
    pub fn filtered_reasons(&self) -> &[String] {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .map(|r| r.rai_media_filtered_reasons.as_slice())
            .unwrap_or(&[])
    }
}

/// Error envelope returned by the API on non-success responses.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: OperationError,
}

/// Connection settings shared by every client a studio creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub model: String,
    pub poll_interval: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Client for the Veo image-to-video API.
pub struct VeoClient {
    api_key: String,
    base_url: String,
    model: String,
    poll_interval: Duration,
    http_client: reqwest::Client,
}

impl VeoClient {
    /// Create a new VeoClient by reading the API key from the environment.
    ///
    /// Reads `VEO_API_KEY`, then `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::MissingApiKey` if neither variable is set.
    pub fn new() -> Result<Self, VeoError> {
        let api_key = std::env::var(API_KEY_ENV)
            .or_else(|_| std::env::var(FALLBACK_API_KEY_ENV))
            .map_err(|_| VeoError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new VeoClient with an explicit API key and default settings.
    pub fn with_api_key(api_key: String) -> Result<Self, VeoError> {
        Self::with_settings(api_key, &ClientSettings::default())
    }

    /// Create a new VeoClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, VeoError> {
        let settings = ClientSettings {
            base_url,
            ..ClientSettings::default()
        };
        Self::with_settings(api_key, &settings)
    }

    /// Create a new VeoClient from explicit settings.
    pub fn with_settings(api_key: String, settings: &ClientSettings) -> Result<Self, VeoError> {
        if api_key.trim().is_empty() {
            return Err(VeoError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            poll_interval: settings.poll_interval,
            http_client,
        })
    }

    /// Replace the delay between status checks.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Submit an image-to-video generation request.
    ///
    /// Returns the operation handle to poll.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::PermissionDenied` if the API rejects the key for a
    /// billing or permission reason, `VeoError::ApiError` for any other error
    /// response, or `VeoError::HttpError` if the request fails.
    pub async fn submit(
        &self,
        image: &ImagePayload,
        prompt: &str,
        aspect_ratio: AspectRatio,
        resolution: Resolution,
    ) -> Result<Operation, VeoError> {
        let url = format!(
            "{}/{}/models/{}:predictLongRunning",
            self.base_url, API_VERSION, self.model
        );

        let request_body = GenerateVideosRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image: InlineImage {
                    bytes_base64_encoded: image.to_base64(),
                    mime_type: image.mime_type().to_string(),
                },
            }],
            parameters: VideoParameters {
                aspect_ratio,
                resolution,
            },
        };

        log::debug!(
            "Submitting {} image ({} bytes) to {} as {} {}",
            image.mime_type(),
            image.len(),
            self.model,
            aspect_ratio,
            resolution
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "Generation request failed").await);
        }

        let operation: Operation = response.json().await?;
        Ok(operation)
    }

    /// Re-query an operation's status.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::HttpError` if the request fails, or
    /// `VeoError::ApiError` / `VeoError::PermissionDenied` on an error response.
    pub async fn poll(&self, operation: &Operation) -> Result<Operation, VeoError> {
        let url = format!("{}/{}/{}", self.base_url, API_VERSION, operation.name);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "Status check failed").await);
        }

        let updated: Operation = response.json().await?;
        Ok(updated)
    }

    /// Wait a fixed interval and re-check until the operation reports done.
    ///
    /// Emits one progress message per iteration before completion. There is
    /// no overall timeout and no backoff.
    pub async fn wait_for_completion(
        &self,
        mut operation: Operation,
        messages: &mut dyn MessageSource,
        events: &EventSender,
    ) -> Result<Operation, VeoError> {
        let mut iteration = 0u32;

        while !operation.done {
            iteration += 1;
            emit(events, GenerationEvent::Progress(messages.next_message()));
            log::debug!(
                "Operation {} not done (check {}), waiting {:?}",
                operation.name,
                iteration,
                self.poll_interval
            );

            tokio::time::sleep(self.poll_interval).await;
            operation = self.poll(&operation).await?;
        }

        if let Some(error) = &operation.error {
            log::error!("Operation {} failed: {}", operation.name, error.message);
            let message = if error.message.is_empty() {
                format!("operation failed with code {}", error.code)
            } else {
                error.message.clone()
            };
            if is_permission_error(&message)
                || error.status.as_deref().is_some_and(is_permission_error)
            {
                return Err(VeoError::PermissionDenied { message });
            }
            return Err(VeoError::OperationFailed { message });
        }

        log::info!("Operation {} completed after {} checks", operation.name, iteration);
        Ok(operation)
    }

    /// Build the download URL for a result URI by appending the API key.
    pub fn authorized_video_url(&self, uri: &str) -> Result<Url, VeoError> {
        let mut url = Url::parse(uri).map_err(|e| VeoError::InvalidVideoUri(format!("{uri}: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    /// Download a generated video to disk.
    ///
    /// Streams the body to `dest` without holding the whole video in memory.
    /// A partially written file is removed if the download fails.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::Forbidden` on a 403 response, `VeoError::FetchFailed`
    /// on any other non-success status, or `VeoError::IoError` if writing fails.
    /// Transport errors never include the request URL, which carries the key.
    pub async fn fetch_video(&self, uri: &str, dest: &Path) -> Result<PathBuf, VeoError> {
        let url = self.authorized_video_url(uri)?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(redact_url)?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Video download failed with status {}", status);
            if status.as_u16() == HTTP_STATUS_FORBIDDEN {
                return Err(VeoError::Forbidden);
            }
            return Err(VeoError::FetchFailed {
                status: status.to_string(),
            });
        }

        if let Err(e) = write_body(response, dest).await {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                log::debug!("Could not remove partial download {}: {}", dest.display(), remove_err);
            }
            return Err(e);
        }

        Ok(dest.to_path_buf())
    }

    /// Run one generation end to end: submit, wait for completion, fetch.
    ///
    /// Emits `Generating`, `Polling` and `Fetching` phase events plus one
    /// progress message per poll iteration. The video is written to
    /// `output_dir` under a name derived from the operation.
    pub async fn generate(
        &self,
        image: &ImagePayload,
        options: &GenerationOptions,
        output_dir: &Path,
        messages: &mut dyn MessageSource,
        events: &EventSender,
    ) -> Result<VideoResult, VeoError> {
        emit(events, GenerationEvent::Phase(GenerationPhase::Generating));
        let prompt = options.prompt_text();
        let operation = self
            .submit(image, &prompt, options.aspect_ratio, options.resolution)
            .await?;
        log::info!("Generation submitted, operation: {}", operation.name);

        emit(events, GenerationEvent::Phase(GenerationPhase::Polling));
        let operation = self.wait_for_completion(operation, messages, events).await?;

        let uri = operation.video_uri().ok_or_else(|| VeoError::MissingVideoUri {
            reasons: operation.filtered_reasons().to_vec(),
        })?;

        emit(events, GenerationEvent::Phase(GenerationPhase::Fetching));
        let dest = output_dir.join(video_file_name(&operation.name));
        let path = self.fetch_video(uri, &dest).await?;
        log::info!("Video downloaded to: {:?}", path);

        let path = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        let url = file_url(&path);

        Ok(VideoResult {
            path,
            url,
            aspect_ratio: options.aspect_ratio,
            resolution: options.resolution,
        })
    }
}

async fn write_body(response: reqwest::Response, dest: &Path) -> Result<(), VeoError> {
    use futures_util::StreamExt;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(redact_url)?;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(())
}

/// Drop the request URL from a transport error; download URLs carry the API key.
fn redact_url(error: reqwest::Error) -> VeoError {
    VeoError::HttpError(error.without_url())
}

/// Deterministic file name for an operation's video.
/// Uses the first 16 bytes of the SHA-256 of the operation name.
pub fn video_file_name(operation_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(operation_name.as_bytes());
    let result = hasher.finalize();
    format!("{}.mp4", hex::encode(&result[..16]))
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("file://{}", path.display()))
}

/// Turn a non-success API response into an error, classifying permission problems.
async fn error_from_response(response: reqwest::Response, context: &str) -> VeoError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let (message, api_status) = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body, None),
    };

    if is_permission_error(&message) || api_status.as_deref().is_some_and(is_permission_error) {
        log::warn!("{} with a permission problem ({}): {}", context, status, message);
        return VeoError::PermissionDenied { message };
    }

    VeoError::ApiError {
        status: status.as_u16(),
        message: format!("{} with status {}: {}", context, status, message),
    }
}

fn describe_filter_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(" (filtered: {})", reasons.join("; "))
    }
}

/// Errors that can occur during video generation.
#[derive(Debug, thiserror::Error)]
pub enum VeoError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("No API key selected")]
    NoCredentialSelected,

    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {message}")]
    ApiError { status: u16, message: String },

    #[error("Permission denied: {message}. {}", BILLING_HINT)]
    PermissionDenied { message: String },

    #[error("Video generation failed: {message}")]
    OperationFailed { message: String },

    #[error("Video generation completed but no video URI was returned{}", describe_filter_reasons(.reasons))]
    MissingVideoUri { reasons: Vec<String> },

    #[error("Invalid video URI: {0}")]
    InvalidVideoUri(String),

    #[error("Access to the generated video was forbidden (403). Check that your API key can download generated files.")]
    Forbidden,

    #[error("Failed to fetch video: {status}")]
    FetchFailed { status: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl VeoError {
    /// True when the user should select a different API key.
    ///
    /// Classification is by substring on the error text, since the remote
    /// service exposes no stable error codes for this.
    pub fn is_permission_problem(&self) -> bool {
        match self {
            VeoError::PermissionDenied { .. } => true,
            VeoError::NoCredentialSelected | VeoError::Forbidden => false,
            other => is_permission_error(&other.to_string()),
        }
    }
}
