//! veo-studio library crate.
//!
//! Turns a still image into a short video with the Veo image-to-video API.
//! [`studio::Studio`] runs one generation at a time and reports progress as
//! [`state::GenerationEvent`]s; [`veo::VeoClient`] talks to the remote service.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod state;
pub mod studio;
pub mod veo;
