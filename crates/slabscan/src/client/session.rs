//! Submission session state machine.
//!
//! `Idle -> ImagesSelected -> Streaming -> Completed`, with `Error`
//! reachable from `Streaming` and `reset` from anywhere. The session owns
//! the streaming partial state; every change publishes a fresh snapshot
//! over a watch channel, so concurrent readers only ever observe whole
//! snapshots.

use log::{debug, warn};
use tokio::sync::watch;

use super::encode::SelectedImage;
use crate::error::SessionError;
use crate::schema::CardBatch;
use crate::stream::{PartialBatch, StreamDecoder};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    ImagesSelected,
    Streaming,
    Completed,
    Error,
}

/// Client-visible state at one instant: the latest partial batch, whether a
/// stream is in flight, and the error slot.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Number of images in the submission this snapshot belongs to.
    pub submitted: usize,
    pub batch: PartialBatch,
    pub error: Option<String>,
}

pub struct AnalysisSession {
    phase: SessionPhase,
    images: Vec<SelectedImage>,
    submitted: usize,
    decoder: StreamDecoder,
    error: Option<String>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            phase: SessionPhase::Idle,
            images: Vec::new(),
            submitted: 0,
            decoder: StreamDecoder::new(),
            error: None,
            snapshot_tx,
        }
    }

    /// Replaces the current selection entirely. Prior results stay visible
    /// until the next submission starts. Rejected while a stream is in
    /// flight, matching the disabled file input in the original flow.
    pub fn select_images(&mut self, images: Vec<SelectedImage>) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Streaming {
            return Err(SessionError::SubmissionInFlight);
        }
        self.phase = if images.is_empty() {
            SessionPhase::Idle
        } else {
            SessionPhase::ImagesSelected
        };
        self.images = images;
        self.publish();
        Ok(())
    }

    pub fn selected(&self) -> &[SelectedImage] {
        &self.images
    }

    /// Starts a submission: discards any previous result, moves to
    /// `Streaming`, and returns the ordered data-URL payload to send.
    /// Guarded against empty selections and double submission.
    pub fn begin_submission(&mut self) -> Result<Vec<String>, SessionError> {
        if self.phase == SessionPhase::Streaming {
            return Err(SessionError::SubmissionInFlight);
        }
        if self.images.is_empty() {
            return Err(SessionError::NoImagesSelected);
        }

        self.decoder = StreamDecoder::new();
        self.error = None;
        self.submitted = self.images.len();
        self.phase = SessionPhase::Streaming;
        self.publish();

        Ok(self.images.iter().map(|i| i.data_url.clone()).collect())
    }

    /// Feeds one chunk of relay output, publishing the merged snapshot when
    /// it decodes. Chunks arriving outside `Streaming` (e.g. after a reset)
    /// are dropped.
    pub fn apply_chunk(&mut self, chunk: &str) {
        if self.phase != SessionPhase::Streaming {
            debug!("dropping {} byte chunk outside streaming phase", chunk.len());
            return;
        }
        if self.decoder.push(chunk).is_some() {
            self.publish();
        }
    }

    /// Marks the stream as finished; the snapshot freezes. The record count
    /// is deliberately not enforced against the submitted image count (the
    /// provider contract is soft); a mismatch is only logged.
    pub fn complete(&mut self) {
        if self.phase != SessionPhase::Streaming {
            return;
        }
        let received = self.decoder.latest().cards.len();
        if received != self.submitted {
            warn!(
                "provider returned {} record(s) for {} image(s)",
                received, self.submitted
            );
        }
        self.phase = SessionPhase::Completed;
        self.publish();
    }

    /// Records a stream or transport failure. Partial results already
    /// decoded stay visible, frozen.
    pub fn fail(&mut self, message: &str) {
        if self.phase != SessionPhase::Streaming {
            return;
        }
        self.phase = SessionPhase::Error;
        self.error = Some(message.to_string());
        self.publish();
    }

    /// Returns to the initial empty state, discarding selection and any
    /// partial or completed result. Idempotent. Does not abort an underlying
    /// network call; later chunks from it are dropped by `apply_chunk`.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.images.clear();
        self.submitted = 0;
        self.decoder = StreamDecoder::new();
        self.error = None;
        self.publish();
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribes to snapshot updates; each published value is a complete
    /// replacement, never an in-place mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The final typed batch, available once completed and every record is
    /// fully populated.
    pub fn final_batch(&self) -> Option<CardBatch> {
        if self.phase != SessionPhase::Completed {
            return None;
        }
        self.decoder.latest().to_complete()
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            phase: self.phase,
            submitted: self.submitted,
            batch: self.decoder.latest().clone(),
            error: self.error.clone(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
