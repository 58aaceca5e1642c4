//! In-memory [`TurnContext`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Attachment, ChannelError, TurnContext};

/// Records everything sent through it.
#[derive(Debug, Default)]
pub struct RecordingContext {
    user_id: String,
    texts: Mutex<Vec<String>>,
    attachments: Mutex<Vec<Attachment>>,
    typing_attempts: AtomicUsize,
    /// 1-based typing attempt that fails; every later attempt fails too.
    fail_typing_from: Option<usize>,
}

impl RecordingContext {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_owned(),
            ..Self::default()
        }
    }

    pub fn failing_typing_from(user_id: &str, attempt: usize) -> Self {
        Self {
            fail_typing_from: Some(attempt),
            ..Self::new(user_id)
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().clone()
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.lock().clone()
    }

    pub fn typing_attempts(&self) -> usize {
        self.typing_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TurnContext for RecordingContext {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_text(&self, text: &str) -> Result<(), ChannelError> {
        self.texts.lock().push(text.to_owned());
        Ok(())
    }

    async fn send_typing(&self) -> Result<(), ChannelError> {
        let attempt = self.typing_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fail_typing_from {
            Some(from) if attempt >= from => Err(ChannelError::Rejected {
                status: 503,
                body: "typing unavailable".to_owned(),
            }),
            _ => Ok(()),
        }
    }

    async fn send_attachment(&self, attachment: Attachment) -> Result<(), ChannelError> {
        self.attachments.lock().push(attachment);
        Ok(())
    }
}
