//! Subcommand handlers for generate and config actions.

use std::io::IsTerminal;
use std::path::Path;

use super::args::{ConfigAction, GenerateArgs};
use super::render::render_events;
use crate::config::{default_path, Config, ConfigError, DEFAULT_CONFIG_TEMPLATE};
use crate::credentials::{prompt_for_key, Credentials, KeySource};
use crate::state::{event_channel, VideoResult};
use crate::studio::{GenerationRequest, Studio};
use crate::veo::{GenerationOptions, MessageSource, API_KEY_ENV};

/// Load the config file. An explicitly given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_explicit(path),
        None => Config::load(None),
    }
}

/// Merge generation parameters: CLI args > config file > built-in defaults.
pub fn build_options(args: &GenerateArgs, config: &Config) -> GenerationOptions {
    let generation = &config.generation;
    GenerationOptions {
        aspect_ratio: args
            .aspect_ratio
            .map(Into::into)
            .or(generation.aspect_ratio)
            .unwrap_or_default(),
        resolution: args
            .resolution
            .map(Into::into)
            .or(generation.resolution)
            .unwrap_or_default(),
        ambience: args
            .ambience
            .map(Into::into)
            .or(generation.ambience)
            .unwrap_or_default(),
        prompt: args.prompt.clone(),
    }
}

/// Run the generate command.
pub fn run_generate(args: GenerateArgs, config_path: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path).map_err(|e| e.to_string())?;

    let options = build_options(&args, &config);
    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.output_dir());
    let credentials = Credentials::resolve(args.api_key.clone(), config.api.key.clone());

    println!(
        "Generating {} {} video from {} (ambience: {})",
        options.aspect_ratio,
        options.resolution,
        args.image.display(),
        options.ambience
    );

    let mut studio = Studio::new(credentials, config.client_settings(), output_dir);
    let request = GenerationRequest {
        image_path: args.image.clone(),
        options,
    };
    let interactive = std::io::stdin().is_terminal();

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;
    let video = rt.block_on(generate_with_key_selection(&mut studio, &request, interactive))?;

    println!("Video: {}", video.path.display());
    println!("URL:   {}", video.url);

    if let Some(dest) = &args.output {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        std::fs::copy(&video.path, dest)
            .map_err(|e| format!("Failed to copy video to {}: {}", dest.display(), e))?;
        println!("Saved: {}", dest.display());
    }

    Ok(())
}

/// Run generations until one succeeds or fails for a reason other than the key.
///
/// When a key is missing or was cleared by a billing/permission failure, an
/// interactive terminal is asked for a new one; otherwise the command fails.
async fn generate_with_key_selection<M: MessageSource>(
    studio: &mut Studio<M>,
    request: &GenerationRequest,
    interactive: bool,
) -> Result<VideoResult, String> {
    loop {
        if !studio.credentials().is_selected() {
            if !interactive {
                return Err(format!(
                    "No API key selected. Set {} or pass --api-key with a key from a billing-enabled project.",
                    API_KEY_ENV
                ));
            }
            let key = prompt_for_key(std::io::stdin().lock(), std::io::stderr())
                .map_err(|e| format!("Failed to read API key: {}", e))?
                .ok_or_else(|| "No API key selected".to_string())?;
            studio.credentials_mut().select(key, KeySource::Prompt);
        }

        let (tx, rx) = event_channel();
        let renderer = tokio::spawn(render_events(rx, std::io::stderr()));
        let result = studio.generate(request, &tx).await;
        drop(tx);
        if let Err(e) = renderer.await {
            log::warn!("Progress renderer stopped: {}", e);
        }

        match result {
            Ok(video) => return Ok(video),
            Err(e) if e.is_permission_problem() && interactive => {
                eprintln!("Select a different API key to try again.");
            }
            Err(e) if e.is_permission_problem() => {
                return Err(format!(
                    "{}\nSet {} or pass --api-key to select a different key.",
                    e, API_KEY_ENV
                ));
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) -> Result<(), String> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let config = load_config(config_path).map_err(|e| e.to_string())?;
            print!("{}", describe_config(&config));
            println!();
            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'veo-studio config show' to view current settings.",
                    path.display()
                ));
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}

/// Effective settings as printed by `config show`. The API key is redacted.
pub fn describe_config(config: &Config) -> String {
    let credentials = Credentials::resolve(None, config.api.key.clone());
    let settings = config.client_settings();
    let generation = &config.generation;

    let key_line = match (credentials.key(), credentials.source()) {
        (Some(key), Some(source)) => format!("{} (from {})", key.redacted(), source),
        _ => "not set".to_string(),
    };

    format!(
        "Current configuration:\n  \
         API key: {}\n  \
         Base URL: {}\n  \
         Model: {}\n  \
         Aspect ratio: {}\n  \
         Resolution: {}\n  \
         Ambience: {}\n  \
         Poll interval: {}s\n  \
         Output dir: {}\n",
        key_line,
        settings.base_url,
        settings.model,
        generation.aspect_ratio.unwrap_or_default(),
        generation.resolution.unwrap_or_default(),
        generation.ambience.unwrap_or_default(),
        settings.poll_interval.as_secs(),
        config.output_dir().display()
    )
}
