//! Terminal rendering of generation events.

use std::io::Write;

use crate::state::{EventReceiver, GenerationEvent, GenerationState};

/// Drain the event channel, printing each change, until every sender is dropped.
///
/// Returns the final state.
pub async fn render_events<W: Write>(mut events: EventReceiver, mut out: W) -> GenerationState {
    let mut state = GenerationState::new();

    while let Some(event) = events.recv().await {
        state.apply(&event);
        if let Err(e) = writeln!(out, "{}", describe(&event, &state)).and_then(|_| out.flush()) {
            log::debug!("Failed to write progress line: {}", e);
        }
    }

    state
}

fn describe(event: &GenerationEvent, state: &GenerationState) -> String {
    match event {
        GenerationEvent::Phase(phase) => format!(
            "[{}] {}",
            phase,
            state.progress.as_deref().unwrap_or_default()
        ),
        GenerationEvent::Progress(text) => format!("[{}] {}", state.phase, text),
        GenerationEvent::Completed(_) => "[completed] Your video is ready.".to_string(),
        GenerationEvent::Failed(message) => format!("[error] {}", message),
    }
}
