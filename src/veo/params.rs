//! Generation parameters: aspect ratio, resolution and audio ambience.
//!
//! Each parameter is a small fixed enumeration. The string forms are the
//! values the Veo API expects on the wire and the values accepted in the
//! config file.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Instruction sent with every image; the ambience phrase is appended to it.
const ANIMATION_INSTRUCTION: &str =
    "Animate this image into a short cinematic clip with subtle, natural motion. \
     Keep the composition, subject and lighting of the original image.";

/// Output aspect ratio of the generated video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Widescreen, 16:9.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// Vertical, 9:16.
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

/// Output resolution of the generated video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
        }
    }
}

/// Audio ambience category. Each maps to a fixed descriptive phrase that is
/// appended to the generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioAmbience {
    #[default]
    Nature,
    City,
    Ocean,
    Silent,
}

impl AudioAmbience {
    pub const ALL: [AudioAmbience; 4] = [
        AudioAmbience::Nature,
        AudioAmbience::City,
        AudioAmbience::Ocean,
        AudioAmbience::Silent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioAmbience::Nature => "nature",
            AudioAmbience::City => "city",
            AudioAmbience::Ocean => "ocean",
            AudioAmbience::Silent => "silent",
        }
    }

    /// The descriptive phrase sent to the model for this ambience.
    pub fn phrase(&self) -> &'static str {
        match self {
            AudioAmbience::Nature => {
                "Audio: a gentle natural soundscape with birdsong, a soft breeze and rustling leaves."
            }
            AudioAmbience::City => {
                "Audio: a lively urban ambience with distant traffic, footsteps and murmuring crowds."
            }
            AudioAmbience::Ocean => {
                "Audio: calm ocean waves rolling onto the shore with the occasional seagull."
            }
            AudioAmbience::Silent => "Audio: no sound at all, complete silence.",
        }
    }
}

/// Error returned when a parameter string is not one of the fixed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseParamError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for AspectRatio {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "landscape" => Ok(AspectRatio::Landscape),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            _ => Err(ParseParamError {
                kind: "aspect ratio",
                value: s.to_string(),
                expected: "16:9, 9:16",
            }),
        }
    }
}

impl FromStr for Resolution {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "720p" | "720" => Ok(Resolution::Hd),
            "1080p" | "1080" => Ok(Resolution::FullHd),
            _ => Err(ParseParamError {
                kind: "resolution",
                value: s.to_string(),
                expected: "720p, 1080p",
            }),
        }
    }
}

impl FromStr for AudioAmbience {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        AudioAmbience::ALL
            .into_iter()
            .find(|a| a.as_str() == lower)
            .ok_or_else(|| ParseParamError {
                kind: "audio ambience",
                value: s.to_string(),
                expected: "nature, city, ocean, silent",
            })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AudioAmbience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters chosen once per generation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOptions {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub ambience: AudioAmbience,
    /// Optional extra direction from the user, placed before the fixed instruction.
    pub prompt: Option<String>,
}

impl GenerationOptions {
    /// Build the prompt text sent alongside the image.
    pub fn prompt_text(&self) -> String {
        match self.prompt.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!(
                "{} {} {}",
                extra,
                ANIMATION_INSTRUCTION,
                self.ambience.phrase()
            ),
            _ => format!("{} {}", ANIMATION_INSTRUCTION, self.ambience.phrase()),
        }
    }
}
