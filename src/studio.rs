//! Studio - runs one image-to-video generation at a time.

use std::path::{Path, PathBuf};

use crate::credentials::Credentials;
use crate::state::{emit, EventSender, GenerationEvent, GenerationPhase, UserMessage, VideoResult};
use crate::veo::{
    ClientSettings, GenerationOptions, ImagePayload, MessageSource, RandomMessages, VeoClient,
    VeoError,
};

/// One generation attempt: which image, with which parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub image_path: PathBuf,
    pub options: GenerationOptions,
}

/// Owns the selected credentials and runs generation attempts.
///
/// [`generate`](Self::generate) takes `&mut self`, so a studio never has more
/// than one attempt in flight.
pub struct Studio<M: MessageSource = RandomMessages> {
    credentials: Credentials,
    settings: ClientSettings,
    messages: M,
    output_dir: PathBuf,
}

impl Studio<RandomMessages> {
    pub fn new(credentials: Credentials, settings: ClientSettings, output_dir: PathBuf) -> Self {
        Self::with_messages(credentials, settings, output_dir, RandomMessages)
    }
}

impl<M: MessageSource> Studio<M> {
    /// Create a studio with a custom progress message source.
    pub fn with_messages(
        credentials: Credentials,
        settings: ClientSettings,
        output_dir: PathBuf,
        messages: M,
    ) -> Self {
        Self {
            credentials,
            settings,
            messages,
            output_dir,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run one generation attempt, reporting progress on `events`.
    ///
    /// The attempt ends with exactly one `Completed` or `Failed` event. A
    /// billing or permission failure clears the selected key, so the next
    /// attempt fails with `NoCredentialSelected` until a new key is selected.
    pub async fn generate(
        &mut self,
        request: &GenerationRequest,
        events: &EventSender,
    ) -> Result<VideoResult, VeoError> {
        let result = self.run(request, events).await;

        match &result {
            Ok(video) => {
                log::info!("Generation completed: {}", video.path.display());
                emit(events, GenerationEvent::Completed(video.clone()));
            }
            Err(error) => {
                let message = UserMessage::from_error(error);
                if message.is_permission_problem() {
                    self.credentials.reset();
                }
                log::error!("Generation failed: {}", error);
                emit(events, GenerationEvent::Failed(message));
            }
        }

        result
    }

    async fn run(
        &mut self,
        request: &GenerationRequest,
        events: &EventSender,
    ) -> Result<VideoResult, VeoError> {
        let api_key = self.credentials.require()?.expose().to_string();

        emit(events, GenerationEvent::Phase(GenerationPhase::Uploading));
        let image = ImagePayload::load(&request.image_path).await?;
        log::info!(
            "Loaded {} ({}, {} bytes)",
            request.image_path.display(),
            image.mime_type(),
            image.len()
        );

        let client = VeoClient::with_settings(api_key, &self.settings)?;
        client
            .generate(
                &image,
                &request.options,
                &self.output_dir,
                &mut self.messages,
                events,
            )
            .await
    }
}
