//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{AmbienceArg, AspectArg, ResolutionArg};

/// Turn a still image into a short AI-generated video clip
#[derive(Parser, Debug)]
#[command(name = "veo-studio")]
#[command(version, about = "Animate still images into short videos with Veo", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video from a still image
    #[command(after_help = "EXAMPLES:
    veo-studio generate photo.jpg
    veo-studio generate photo.png --aspect-ratio 9:16 --resolution 1080p --ambience ocean
    veo-studio generate photo.png --prompt \"the camera slowly pushes in\" -o clip.mp4

ENVIRONMENT:
    VEO_API_KEY      API key from a billing-enabled project (GEMINI_API_KEY also works)")]
    Generate(GenerateArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Still image to animate (PNG, JPEG, WebP or GIF)
    pub image: PathBuf,

    /// Aspect ratio of the video
    #[arg(long, short)]
    pub aspect_ratio: Option<AspectArg>,

    /// Resolution of the video
    #[arg(long, short)]
    pub resolution: Option<ResolutionArg>,

    /// Audio ambience
    #[arg(long)]
    pub ambience: Option<AmbienceArg>,

    /// Extra direction for the animation
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Copy the finished video to this path
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Directory generated videos are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// API key (overrides VEO_API_KEY and the config file)
    #[arg(long)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Create default config file
    Init,
}
