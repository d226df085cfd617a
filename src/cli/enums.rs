//! CLI enum types for aspect ratio, resolution and audio ambience options.

use clap::ValueEnum;

use crate::veo::{AspectRatio, AudioAmbience, Resolution};

/// Video aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AspectArg {
    #[default]
    #[value(name = "16:9", alias = "landscape")]
    Landscape,
    #[value(name = "9:16", alias = "portrait")]
    Portrait,
}

impl From<AspectArg> for AspectRatio {
    fn from(a: AspectArg) -> Self {
        match a {
            AspectArg::Landscape => AspectRatio::Landscape,
            AspectArg::Portrait => AspectRatio::Portrait,
        }
    }
}

/// Video resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionArg {
    #[default]
    #[value(name = "720p")]
    Hd,
    #[value(name = "1080p")]
    FullHd,
}

impl From<ResolutionArg> for Resolution {
    fn from(r: ResolutionArg) -> Self {
        match r {
            ResolutionArg::Hd => Resolution::Hd,
            ResolutionArg::FullHd => Resolution::FullHd,
        }
    }
}

/// Audio ambience of the generated clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AmbienceArg {
    #[default]
    Nature,
    City,
    Ocean,
    Silent,
}

impl From<AmbienceArg> for AudioAmbience {
    fn from(a: AmbienceArg) -> Self {
        match a {
            AmbienceArg::Nature => AudioAmbience::Nature,
            AmbienceArg::City => AudioAmbience::City,
            AmbienceArg::Ocean => AudioAmbience::Ocean,
            AmbienceArg::Silent => AudioAmbience::Silent,
        }
    }
}
