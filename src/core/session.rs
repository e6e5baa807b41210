//! One chat session: a transcript plus the model settings used to extend it.

use tracing::{debug, info, warn};

use crate::core::chat_stream::{start_reply, CompletionParams, CompletionService, ReplyStream};
use crate::core::error::ChatError;
use crate::core::image::ImageUpload;
use crate::core::message::Message;
use crate::core::transcript::Transcript;

pub struct Session {
    transcript: Transcript,
    params: CompletionParams,
}

impl Session {
    /// Start a session with an empty transcript.
    pub fn create(params: CompletionParams) -> Self {
        info!(model = %params.model, "Chat session created");
        Self {
            transcript: Transcript::new(),
            params,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn params(&self) -> &CompletionParams {
        &self.params
    }

    pub fn append(&mut self, message: Message) {
        self.transcript.append(message);
    }

    pub fn submit_text(&mut self, text: impl Into<String>) {
        self.transcript.append(Message::user_text(text));
    }

    /// Ingest one image as its own user message. A rejected image leaves the
    /// transcript untouched.
    pub fn add_image(&mut self, upload: &ImageUpload) -> Result<(), ChatError> {
        let item = upload.ingest()?;
        debug!(name = %upload.name, bytes = upload.data.len(), "Image added to transcript");
        self.transcript.append(Message::user_image(item));
        Ok(())
    }

    /// Ingest a batch; each image succeeds or fails on its own. Returns the
    /// rejected uploads by name.
    pub fn add_images<'u, I>(&mut self, uploads: I) -> Vec<(String, ChatError)>
    where
        I: IntoIterator<Item = &'u ImageUpload>,
    {
        let mut rejected = Vec::new();
        for upload in uploads {
            if let Err(err) = self.add_image(upload) {
                warn!(name = %upload.name, error = %err, "Image rejected");
                rejected.push((upload.name.clone(), err));
            }
        }
        rejected
    }

    /// Open a streaming reply for the current transcript. The assistant
    /// message is appended when the returned stream finishes.
    pub fn stream_reply<'s, S>(&'s mut self, service: &S) -> Result<ReplyStream<'s>, ChatError>
    where
        S: CompletionService + ?Sized,
    {
        start_reply(&mut self.transcript, service, &self.params)
    }

    /// Append `text` as a user message and open the reply stream.
    pub fn send<'s, S>(
        &'s mut self,
        text: impl Into<String>,
        service: &S,
    ) -> Result<ReplyStream<'s>, ChatError>
    where
        S: CompletionService + ?Sized,
    {
        // Reject bad credentials before the prompt lands in the transcript.
        service.check_credentials()?;
        self.submit_text(text);
        self.stream_reply(service)
    }

    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.transcript.visible_messages()
    }

    pub fn reset(&mut self) {
        debug!(messages = self.transcript.len(), "Resetting transcript");
        self.transcript.reset();
    }

    /// End the session, releasing its history.
    pub fn destroy(self) {
        info!(messages = self.transcript.len(), "Chat session destroyed");
    }
}
