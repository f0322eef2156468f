//! Runs a facilitator on its own task and serializes access to it

use scrum_ai::Transcription;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{
    engine::{Facilitator, SubmitOutcome},
    error::{Error, Result},
    events::FacilitatorEvent,
    handle::FacilitatorHandle,
    session::{SessionState, TranscriptEntry},
};

/// What to do with a submission that arrives while another is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Run it after the current one finishes
    #[default]
    Queue,
    /// Drop it and report `SubmitOutcome::Busy`
    Ignore,
}

enum Command {
    Submit {
        text: String,
        reply: oneshot::Sender<Result<SubmitOutcome>>,
    },
    Transcription {
        transcription: Transcription,
        reply: oneshot::Sender<Result<SubmitOutcome>>,
    },
    Notice {
        message: String,
    },
    Snapshot {
        reply: oneshot::Sender<(SessionState, Vec<TranscriptEntry>)>,
    },
}

/// Owns a [`Facilitator`] on a background task.
///
/// Commands are handled one at a time, so two backend calls are never in
/// flight for the same session.
pub struct SessionRunner {
    tx: mpsc::Sender<Command>,
    handle: FacilitatorHandle,
    event_tx: broadcast::Sender<FacilitatorEvent>,
    pending: Arc<AtomicUsize>,
    policy: BusyPolicy,
    task: JoinHandle<()>,
}

impl SessionRunner {
    const QUEUE_CAPACITY: usize = 64;

    /// Move `facilitator` onto a new task
    pub fn spawn(mut facilitator: Facilitator, policy: BusyPolicy) -> Self {
        let (tx, mut rx) = mpsc::channel::<Command>(Self::QUEUE_CAPACITY);
        let handle = facilitator.handle();
        let event_tx = handle.event_tx.clone();
        let pending = Arc::new(AtomicUsize::new(0));

        let cancel = handle.cancel_token();
        let task_pending = Arc::clone(&pending);
        let task = tokio::spawn(async move {
            loop {
                let command = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    command = rx.recv() => match command {
                        Some(command) => command,
                        None => break,
                    },
                };

                match command {
                    Command::Submit { text, reply } => {
                        let outcome = facilitator.submit(&text).await;
                        task_pending.fetch_sub(1, Ordering::AcqRel);
                        let _ = reply.send(outcome);
                    }
                    Command::Transcription { transcription, reply } => {
                        let outcome = facilitator.submit_transcription(&transcription).await;
                        task_pending.fetch_sub(1, Ordering::AcqRel);
                        let _ = reply.send(outcome);
                    }
                    Command::Notice { message } => facilitator.notice(message),
                    Command::Snapshot { reply } => {
                        let _ = reply.send((
                            facilitator.session().clone(),
                            facilitator.transcript().to_vec(),
                        ));
                    }
                }
            }
            tracing::debug!("Session runner stopped");
            facilitator.shutdown();
        });

        Self {
            tx,
            handle,
            event_tx,
            pending,
            policy,
            task,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<FacilitatorEvent> {
        self.event_tx.subscribe()
    }

    pub fn handle(&self) -> FacilitatorHandle {
        self.handle.clone()
    }

    /// Reserve a slot for a submission, honoring the busy policy
    fn admit(&self) -> bool {
        let in_flight = self.pending.fetch_add(1, Ordering::AcqRel);
        if in_flight > 0 && self.policy == BusyPolicy::Ignore {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("Dropping submission while a reply is pending");
            return false;
        }
        true
    }

    async fn dispatch(
        &self,
        command: Command,
        rx: oneshot::Receiver<Result<SubmitOutcome>>,
    ) -> Result<SubmitOutcome> {
        if self.tx.send(command).await.is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(Error::SessionClosed);
        }
        // the task drops the sender without answering only when it stops
        rx.await.unwrap_or(Err(Error::SessionClosed))
    }

    /// Submit one utterance
    pub async fn submit(&self, text: impl Into<String>) -> Result<SubmitOutcome> {
        if self.handle.is_closed() {
            return Err(Error::SessionClosed);
        }
        if !self.admit() {
            return Ok(SubmitOutcome::Busy);
        }
        let (reply, rx) = oneshot::channel();
        self.dispatch(
            Command::Submit {
                text: text.into(),
                reply,
            },
            rx,
        )
        .await
    }

    /// Submit a speech recognition result
    pub async fn submit_transcription(&self, transcription: Transcription) -> Result<SubmitOutcome> {
        if self.handle.is_closed() {
            return Err(Error::SessionClosed);
        }
        if !self.admit() {
            return Ok(SubmitOutcome::Busy);
        }
        let (reply, rx) = oneshot::channel();
        self.dispatch(Command::Transcription { transcription, reply }, rx)
            .await
    }

    /// Add a system notice to the transcript
    pub async fn notice(&self, message: impl Into<String>) -> Result<()> {
        self.tx
            .send(Command::Notice {
                message: message.into(),
            })
            .await
            .map_err(|_| Error::SessionClosed)
    }

    /// Copy of the session state and visible transcript
    pub async fn snapshot(&self) -> Result<(SessionState, Vec<TranscriptEntry>)> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| Error::SessionClosed)?;
        rx.await.map_err(|_| Error::SessionClosed)
    }

    /// Shut the session down and wait for the task to finish
    pub async fn shutdown(self) {
        self.handle.shutdown();
        if let Err(e) = self.task.await {
            tracing::warn!("Session task ended abnormally: {}", e);
        }
    }
}
