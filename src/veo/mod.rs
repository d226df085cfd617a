//! Veo image-to-video integration.
//!
//! A still image is submitted to the Gemini API's long-running video
//! endpoint, the returned operation is polled at a fixed interval until it
//! reports completion, and the finished video is downloaded to local disk.

mod client;
mod image;
mod params;
mod progress;

pub use client::{
    is_permission_error, video_file_name, ClientSettings, Operation, VeoClient, VeoError,
    API_KEY_ENV, BILLING_HINT, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_POLL_INTERVAL,
    FALLBACK_API_KEY_ENV,
};
pub use image::ImagePayload;
pub use params::{AspectRatio, AudioAmbience, GenerationOptions, ParseParamError, Resolution};
pub use progress::{CyclingMessages, MessageSource, RandomMessages, PROGRESS_MESSAGES};
