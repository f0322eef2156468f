//! The facilitation engine
//!
//! One `Facilitator` owns one session. Each submission runs the whole cycle:
//! capture the speaker, classify, annotate, ask the backend, classify the
//! reply, and possibly append a scripted turn after a fixed delay.

use futures::StreamExt;
use scrum_ai::{Message, Transcription};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    annotator, backlog,
    ceremony::{PlanningStage, ResponseCategory, Stage, StandupStage},
    classifier::{self, ReplyClassification},
    deferred::DeferredTurn,
    descriptor::{CeremonyDescriptor, FailurePolicy},
    error::{Error, Result},
    events::FacilitatorEvent,
    handle::{BusyGuard, FacilitatorHandle},
    names,
    session::{EntryKind, SessionState, TranscriptEntry},
    transport::{Transport, TransportEvent},
};

/// Where the engine is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    AwaitingInput,
    AwaitingBackend,
    SchedulingFollowup,
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input; nothing changed
    Ignored,
    /// The backend answered, optionally followed by a scripted turn
    Replied {
        reply: String,
        scripted: Option<String>,
    },
    /// The backend call failed and the apology was shown
    BackendFailed { error: String },
    /// Speech recognition produced nothing to submit
    RecognitionFailed { reason: String },
    /// Dropped because another submission was in flight
    Busy,
}

enum Exchange {
    Reply(String),
    Failed(String),
}

/// Drives one facilitation session
pub struct Facilitator {
    descriptor: CeremonyDescriptor,
    session: SessionState,
    transcript: Vec<TranscriptEntry>,
    phase: EnginePhase,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<FacilitatorEvent>,
    handle: FacilitatorHandle,
}

impl Facilitator {
    /// Start a session seeded with the ceremony's opening turn
    pub fn new(descriptor: CeremonyDescriptor, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let session = SessionState::new(descriptor.ceremony, descriptor.opening_prompt.clone());
        let transcript = vec![TranscriptEntry::new(
            EntryKind::Opening,
            descriptor.opening_prompt.clone(),
        )];
        tracing::info!("Starting {} session", descriptor.ceremony);

        Self {
            descriptor,
            session,
            transcript,
            phase: EnginePhase::AwaitingInput,
            transport,
            handle: FacilitatorHandle::new(event_tx.clone()),
            event_tx,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<FacilitatorEvent> {
        self.event_tx.subscribe()
    }

    pub fn descriptor(&self) -> &CeremonyDescriptor {
        &self.descriptor
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The human-visible transcript
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Get a cloneable handle for external control
    pub fn handle(&self) -> FacilitatorHandle {
        self.handle.clone()
    }

    /// Tear the session down, abandoning any pending work
    pub fn shutdown(&self) {
        self.handle.shutdown();
    }

    /// Add a system notice to the visible transcript
    pub fn notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.transcript
            .push(TranscriptEntry::new(EntryKind::Notice, message.clone()));
        self.emit(FacilitatorEvent::System { message });
    }

    /// Submit one human utterance and run the full cycle.
    ///
    /// Backend failures are not errors: they show the apology and return
    /// `BackendFailed`. The only error is `SessionClosed`.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome> {
        if self.handle.is_closed() {
            return Err(Error::SessionClosed);
        }
        let utterance = text.trim();
        if utterance.is_empty() {
            tracing::debug!("Ignoring empty input");
            return Ok(SubmitOutcome::Ignored);
        }

        let guard = BusyGuard::new(&self.handle);
        let outcome = self.run_cycle(utterance).await;
        self.phase = EnginePhase::AwaitingInput;
        guard.finish();
        outcome
    }

    /// Submit the result of a speech recognition attempt.
    ///
    /// Recognized text goes through [`submit`](Self::submit); anything else
    /// becomes a visible notice with no state change.
    pub async fn submit_transcription(&mut self, transcription: &Transcription) -> Result<SubmitOutcome> {
        if let Some(utterance) = transcription.utterance() {
            return self.submit(utterance).await;
        }
        if self.handle.is_closed() {
            return Err(Error::SessionClosed);
        }
        let reason = transcription.failure_reason();
        tracing::warn!("Speech recognition failed: {}", reason);
        self.notice(reason.clone());
        Ok(SubmitOutcome::RecognitionFailed { reason })
    }

    async fn run_cycle(&mut self, utterance: &str) -> Result<SubmitOutcome> {
        self.accept_utterance(utterance);

        self.phase = EnginePhase::AwaitingBackend;
        match self.request_reply().await? {
            Exchange::Failed(error) => {
                self.record_failure(&error);
                Ok(SubmitOutcome::BackendFailed { error })
            }
            Exchange::Reply(reply) => {
                let classification = self.accept_reply(&reply);
                let scripted = if classification.triggers_closing {
                    self.run_closing().await?
                } else {
                    None
                };
                Ok(SubmitOutcome::Replied { reply, scripted })
            }
        }
    }

    fn emit(&self, event: FacilitatorEvent) {
        let _ = self.event_tx.send(event);
    }

    fn apply_stage(&mut self, stage: Stage) {
        if let Some(from) = self.session.set_stage(stage) {
            tracing::info!("Stage {} -> {}", from, stage);
            self.emit(FacilitatorEvent::StageChanged { from, to: stage });
        }
    }

    fn set_speaker(&mut self, name: String) {
        tracing::info!("Current speaker: {}", name);
        self.session.set_speaker(&name);
        self.emit(FacilitatorEvent::SpeakerChanged { speaker: Some(name) });
    }

    fn clear_speaker(&mut self) {
        if self.session.clear_speaker() {
            self.emit(FacilitatorEvent::SpeakerChanged { speaker: None });
        }
    }

    /// Human side: speaker capture, classification, planning captures,
    /// annotation, then the outbound turn.
    fn accept_utterance(&mut self, utterance: &str) {
        let captures_speaker = self.descriptor.tracks_speaker
            && self.session.current_speaker().is_none()
            && self.session.stage() == Stage::Standup(StandupStage::Greeting)
            && names::is_introduction(utterance);
        if captures_speaker {
            if let Some(name) = names::extract_from_introduction(utterance) {
                self.set_speaker(name);
            }
        }

        let next = classifier::next_stage(self.session.ceremony(), self.session.stage(), utterance);
        self.apply_stage(next);

        match self.session.stage() {
            Stage::Planning(PlanningStage::GoalSetting) if classifier::is_goal_like(utterance) => {
                tracing::debug!("Sprint goal candidate: {}", utterance);
                self.session.set_sprint_goal(utterance);
            }
            Stage::Planning(PlanningStage::BacklogSelection) => {
                let items = backlog::extract_items(utterance);
                if !items.is_empty() {
                    tracing::debug!("Backlog items: {:?}", items);
                    self.session.extend_backlog(items);
                }
            }
            _ => {}
        }

        let speaker = if self.descriptor.tracks_speaker {
            self.session.current_speaker()
        } else {
            None
        };
        let outbound = annotator::annotate(&self.descriptor.annotation, self.session.stage(), speaker, utterance);

        self.transcript.push(
            TranscriptEntry::new(EntryKind::Utterance, utterance).with_speaker(speaker),
        );
        self.session.push_turn(Message::user(outbound.clone()));
        self.emit(FacilitatorEvent::UserTurn {
            text: utterance.to_string(),
            outbound,
        });
    }

    /// Wait out the typing delay, then ask the backend for one reply.
    ///
    /// Returns `SessionClosed` if the session is torn down meanwhile; nothing
    /// from the abandoned call is applied.
    async fn request_reply(&mut self) -> Result<Exchange> {
        let cancel = self.handle.cancel_token();

        if let Some(typing) = self.descriptor.typing_delay {
            let delay = typing.sample();
            tracing::debug!("Typing for {:?}", delay);
            if !DeferredTurn::new(delay, cancel.clone()).elapsed().await {
                return Err(Error::SessionClosed);
            }
        }

        let send = self.transport.send(
            self.descriptor.system_prompt.as_deref(),
            self.session.turns(),
            cancel.clone(),
        );
        let mut events = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::SessionClosed),
            result = send => match result {
                Ok(events) => events,
                Err(e) => return Ok(Exchange::Failed(e.to_string())),
            },
        };

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::SessionClosed),
                event = events.next() => event,
            };
            match event {
                Some(TransportEvent::Start) => self.emit(FacilitatorEvent::ReplyStart),
                Some(TransportEvent::Delta(delta)) => self.emit(FacilitatorEvent::ReplyDelta { delta }),
                Some(TransportEvent::Done(text)) if text.trim().is_empty() => {
                    return Ok(Exchange::Failed("backend returned an empty reply".to_string()));
                }
                Some(TransportEvent::Done(text)) => return Ok(Exchange::Reply(text)),
                Some(TransportEvent::Failed(error)) => return Ok(Exchange::Failed(error)),
                None => {
                    return Ok(Exchange::Failed(
                        "stream ended before the reply completed".to_string(),
                    ));
                }
            }
        }
    }

    fn record_failure(&mut self, error: &str) {
        tracing::warn!("Backend call failed: {}", error);
        let apology = self.descriptor.apology.clone();
        self.transcript
            .push(TranscriptEntry::new(EntryKind::Apology, apology.clone()));
        if self.descriptor.failure_policy == FailurePolicy::RecordApology {
            self.session.push_turn(Message::assistant(apology.clone()));
        }
        self.emit(FacilitatorEvent::BackendFailed {
            error: error.to_string(),
            apology,
        });
    }

    /// Reply side: append the reply and update stage, category and speaker
    fn accept_reply(&mut self, reply: &str) -> ReplyClassification {
        let classification =
            classifier::next_stage_from_reply(self.session.ceremony(), self.session.stage(), reply);

        self.session.push_turn(Message::assistant(reply));
        self.transcript
            .push(TranscriptEntry::new(EntryKind::Reply, reply));
        self.emit(FacilitatorEvent::Reply {
            text: reply.to_string(),
            stage: classification.stage,
            category: classification.category,
        });

        self.apply_stage(classification.stage);
        if let Some(category) = classification.category {
            self.session.set_last_response_category(category);
        }

        if classification.clears_speaker {
            self.clear_speaker();
        } else if self.descriptor.tracks_speaker
            && self.session.current_speaker().is_none()
            && classification.category != Some(ResponseCategory::NextPerson)
        {
            if let Some(name) = names::extract_from_greeting(reply) {
                self.set_speaker(name);
            }
        }

        classification
    }

    /// Append the ceremony's scripted closing turn after its delay
    async fn run_closing(&mut self) -> Result<Option<String>> {
        let Some(script) = self.descriptor.closing.clone() else {
            return Ok(None);
        };

        self.phase = EnginePhase::SchedulingFollowup;
        let turn = DeferredTurn::new(script.delay, self.handle.cancel_token());
        tracing::info!("Scripted turn in {:?}", turn.delay());
        if !turn.elapsed().await {
            return Err(Error::SessionClosed);
        }

        let text = script.render(&self.session);
        self.session.push_turn(Message::assistant(text.clone()));
        self.transcript
            .push(TranscriptEntry::new(EntryKind::Scripted, text.clone()));
        self.emit(FacilitatorEvent::ScriptedTurn { text: text.clone() });

        if let Some(stage) = script.resets_stage {
            self.apply_stage(stage);
        }
        if script.clears_speaker {
            self.clear_speaker();
        }

        Ok(Some(text))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ceremony::RetroStage;
    use crate::prompts;
    use crate::transport::TransportEventStream;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// A mock transport that replays canned replies or failures.
    pub(crate) struct MockTransport {
        replies: Mutex<Vec<std::result::Result<String, String>>>,
        /// Turns received by each call
        pub(crate) seen: Mutex<Vec<Vec<Message>>>,
        latency: Duration,
    }

    impl MockTransport {
        pub(crate) fn new(replies: Vec<std::result::Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
                latency: Duration::ZERO,
            }
        }

        pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            _system_prompt: Option<&str>,
            turns: &[Message],
            _cancel: CancellationToken,
        ) -> Result<TransportEventStream> {
            self.seen.lock().push(turns.to_vec());
            let reply = {
                let mut replies = self.replies.lock();
                if replies.is_empty() {
                    Ok("Okay.".to_string())
                } else {
                    replies.remove(0)
                }
            };
            let latency = self.latency;

            Ok(Box::pin(async_stream::stream! {
                yield TransportEvent::Start;
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                match reply {
                    Ok(text) => {
                        yield TransportEvent::Delta(text.clone());
                        yield TransportEvent::Done(text);
                    }
                    Err(error) => yield TransportEvent::Failed(error),
                }
            }))
        }
    }

    fn make_facilitator(
        descriptor: CeremonyDescriptor,
        transport: MockTransport,
    ) -> (Facilitator, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let facilitator = Facilitator::new(descriptor.with_typing_delay(None), transport.clone());
        (facilitator, transport)
    }

    fn replies(texts: &[&'static str]) -> MockTransport {
        MockTransport::new(texts.iter().map(|t| Ok(*t)).collect())
    }

    fn assert_alternates(turns: &[Message]) {
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.is_assistant(), i % 2 == 0, "turn {} out of order: {:?}", i, turn);
        }
    }

    #[tokio::test]
    async fn test_standup_end_to_end() {
        let (mut f, transport) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&[
                "Welcome, Sam! Go ahead whenever you're ready.",
                "Great! And what are you planning to do today?",
            ]),
        );

        f.submit("Hi, I'm Sam").await.unwrap();
        assert_eq!(f.session().current_speaker(), Some("Sam"));
        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Greeting));

        let outcome = f.submit("Yesterday I shipped the login page").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied { scripted: None, .. }));

        // the backend saw the annotated turn
        let seen = transport.seen.lock();
        let last_sent = seen[1].last().unwrap();
        assert_eq!(
            last_sent.content,
            "Sam says: Team member talking about yesterday's work: Yesterday I shipped the login page"
        );
        drop(seen);

        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Today));
        assert_eq!(
            f.session().last_response_category(),
            Some(ResponseCategory::AskedToday)
        );
        assert_eq!(f.session().participants(), &["Sam"]);

        let turns = f.session().turns();
        assert_eq!(turns.len(), 5);
        assert_alternates(turns);

        // the visible transcript keeps the raw text
        let utterances: Vec<_> = f
            .transcript()
            .iter()
            .filter(|e| e.kind == EntryKind::Utterance)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(utterances, vec!["Hi, I'm Sam", "Yesterday I shipped the login page"]);
        assert_eq!(f.phase(), EnginePhase::AwaitingInput);
    }

    #[tokio::test]
    async fn test_typographic_apostrophe_introduction() {
        let (mut f, transport) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&["Nice to meet you! What did you work on yesterday?"]),
        );

        f.submit("I\u{2019}m Jordan").await.unwrap();
        assert_eq!(f.session().participants(), &["Jordan"]);
        assert_eq!(
            transport.seen.lock()[0].last().unwrap().content,
            "Jordan says: Team member introducing themselves: I\u{2019}m Jordan"
        );
        assert_eq!(f.transcript()[1].speaker.as_deref(), Some("Jordan"));
        assert_eq!(f.session().current_speaker(), Some("Jordan"));
    }

    #[tokio::test]
    async fn test_backend_failure_shows_apology() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::standup(),
            MockTransport::new(vec![Err("connection refused")]),
        );
        let stage_before = f.session().stage();
        let visible_before = f.transcript().len();

        let outcome = f.submit("Morning all").await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::BackendFailed {
                error: "connection refused".into()
            }
        );
        assert_eq!(f.session().stage(), stage_before);

        let transcript = f.transcript();
        assert_eq!(transcript.len(), visible_before + 2);
        let last = transcript.last().unwrap();
        assert_eq!(last.kind, EntryKind::Apology);
        assert_eq!(last.text, prompts::CONNECTION_APOLOGY);

        let turns = f.session().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2], Message::assistant(prompts::CONNECTION_APOLOGY));
        assert_alternates(turns);
    }

    #[tokio::test]
    async fn test_transcript_only_failure_policy() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::review().with_failure_policy(FailurePolicy::TranscriptOnly),
            MockTransport::new(vec![Err("timeout")]),
        );
        f.submit("We demoed search").await.unwrap();

        let turns = f.session().turns();
        assert_eq!(turns.len(), 2);
        assert!(turns[1].is_user());
        assert_eq!(f.transcript().last().unwrap().text, prompts::SERVICE_APOLOGY);
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let (mut f, transport) = make_facilitator(CeremonyDescriptor::standup(), replies(&[]));
        assert_eq!(f.submit("   \n").await.unwrap(), SubmitOutcome::Ignored);
        assert_eq!(f.session().turns().len(), 1);
        assert_eq!(f.transcript().len(), 1);
        assert!(transport.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_greeting_reply_fills_unknown_speaker() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&["Hi Priya, thanks for kicking us off."]),
        );
        f.submit("Happy to go first").await.unwrap();
        assert_eq!(f.session().current_speaker(), Some("Priya"));
        assert_eq!(f.session().participants(), &["Priya"]);
    }

    #[tokio::test]
    async fn test_handoff_reply_clears_speaker() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&["Go ahead, Sam.", "Thanks for the update, Sam! Who's next?"]),
        );
        f.submit("Hi, I'm Sam").await.unwrap();
        f.submit("Yesterday I fixed CI, that's all").await.unwrap();
        assert_eq!(f.session().current_speaker(), None);
        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Greeting));
        assert_eq!(
            f.session().last_response_category(),
            Some(ResponseCategory::NextPerson)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_standup_scripted_handoff() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&["Go ahead, Sam.", "Nice.", "Sounds good.", "Thanks, Sam."]),
        );
        f.submit("Hi, I'm Sam").await.unwrap();
        f.submit("Yesterday I fixed CI").await.unwrap();
        f.submit("Today I'm going to write docs").await.unwrap();

        let start = tokio::time::Instant::now();
        let outcome = f.submit("That's all").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(
            outcome,
            SubmitOutcome::Replied {
                reply: "Thanks, Sam.".into(),
                scripted: Some(prompts::STANDUP_HANDOFF.into()),
            }
        );
        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Greeting));
        assert_eq!(f.session().current_speaker(), None);
        assert_eq!(f.session().participants(), &["Sam"]);
        assert_eq!(
            f.session().turns().last().unwrap(),
            &Message::assistant(prompts::STANDUP_HANDOFF)
        );
        assert_eq!(f.transcript().last().unwrap().kind, EntryKind::Scripted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_planning_session_closing() {
        let (mut f, transport) = make_facilitator(
            CeremonyDescriptor::planning(),
            replies(&[
                "Great goal! Which backlog items should we select?",
                "How will you approach the wizard?",
                "That's a great plan, let's wrap up.",
            ]),
        );

        f.submit("Ship self-service onboarding this sprint").await.unwrap();
        assert_eq!(
            f.session().sprint_goal(),
            Some("Ship self-service onboarding this sprint")
        );
        assert_eq!(
            f.session().stage(),
            Stage::Planning(PlanningStage::BacklogSelection)
        );

        f.submit("- Onboarding wizard\n- Email verification").await.unwrap();
        assert_eq!(
            f.session().selected_backlog_items(),
            &["Onboarding wizard", "Email verification"]
        );
        assert_eq!(
            transport.seen.lock()[1].last().unwrap().content,
            "Team member discussing backlog items to select: - Onboarding wizard\n- Email verification"
        );
        assert_eq!(f.session().stage(), Stage::Planning(PlanningStage::Planning));

        let start = tokio::time::Instant::now();
        let outcome = f.submit("We'll pair on it and demo Friday").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));

        let SubmitOutcome::Replied {
            scripted: Some(closing),
            ..
        } = &outcome
        else {
            panic!("expected a scripted closing, got {:?}", outcome);
        };
        assert!(closing.contains("\"Ship self-service onboarding this sprint\""));
        assert_eq!(f.session().turns().len(), 8);
        assert_eq!(
            f.session().last_response_category(),
            Some(ResponseCategory::WrapUp)
        );
    }

    #[tokio::test]
    async fn test_sprint_goal_last_write_wins() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::planning(),
            replies(&["Okay.", "Okay.", "Okay.", "Okay."]),
        );

        f.submit("Ship self-service onboarding this sprint").await.unwrap();
        f.submit("Cut checkout latency in half by Friday").await.unwrap();
        assert_eq!(
            f.session().sprint_goal(),
            Some("Cut checkout latency in half by Friday")
        );

        // questions and short remarks are not goals
        f.submit("Should we also cover the mobile app?").await.unwrap();
        f.submit("Sounds right").await.unwrap();
        assert_eq!(
            f.session().sprint_goal(),
            Some("Cut checkout latency in half by Friday")
        );
        assert_eq!(f.session().stage(), Stage::Planning(PlanningStage::GoalSetting));
    }

    #[tokio::test]
    async fn test_backlog_items_accumulate_across_turns() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::planning(),
            replies(&["Great goal! Which backlog items should we select?", "Noted.", "Noted."]),
        );

        f.submit("Ship self-service onboarding this sprint").await.unwrap();
        assert_eq!(
            f.session().stage(),
            Stage::Planning(PlanningStage::BacklogSelection)
        );

        f.submit("- Onboarding wizard\n- Email verification").await.unwrap();
        f.submit("Also \"Onboarding wizard\" and \"Audit logging\"").await.unwrap();
        assert_eq!(
            f.session().selected_backlog_items(),
            &[
                "Onboarding wizard",
                "Email verification",
                "Onboarding wizard",
                "Audit logging",
            ]
        );
        assert_eq!(
            f.session().stage(),
            Stage::Planning(PlanningStage::BacklogSelection)
        );
        // the goal only moves during goal setting
        assert_eq!(
            f.session().sprint_goal(),
            Some("Ship self-service onboarding this sprint")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_reply() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::standup(),
            replies(&["Hi Sam! What did you work on yesterday?"])
                .with_latency(Duration::from_secs(10)),
        );
        let mut events = f.subscribe();
        let handle = f.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.shutdown();
        });

        let result = f.submit("Hi, I'm Sam").await;
        assert!(matches!(result, Err(Error::SessionClosed)));

        // the user turn went out, nothing came back
        assert_eq!(f.session().turns().len(), 2);
        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Greeting));
        assert!(f.transcript().iter().all(|e| e.kind != EntryKind::Reply));
        assert!(!f.handle().is_busy());

        assert!(matches!(f.submit("hello?").await, Err(Error::SessionClosed)));

        let mut saw_closed = false;
        while let Ok(event) = events.try_recv() {
            saw_closed |= event == FacilitatorEvent::Closed;
        }
        assert!(saw_closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_scripted_turn() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::retrospective(),
            replies(&[
                "Great points! Now, what could be improved?",
                "Good. Any action items?",
                "These look solid. Shall we wrap up?",
            ]),
        );
        f.submit("Pairing worked well").await.unwrap();
        f.submit("Too many meetings").await.unwrap();
        assert_eq!(
            f.session().stage(),
            Stage::Retrospective(RetroStage::ActionItems)
        );

        let handle = f.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            handle.shutdown();
        });
        let result = f.submit("Cap meetings at 30 minutes").await;
        assert!(matches!(result, Err(Error::SessionClosed)));

        let turns = f.session().turns();
        assert_eq!(
            turns.last().unwrap(),
            &Message::assistant("These look solid. Shall we wrap up?")
        );
        assert!(f.transcript().iter().all(|e| e.kind != EntryKind::Scripted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_delay_applies_before_backend() {
        let transport = Arc::new(replies(&["Okay."]));
        let descriptor = CeremonyDescriptor::planning();
        let mut f = Facilitator::new(descriptor, transport.clone());

        let start = tokio::time::Instant::now();
        f.submit("Focus on onboarding quality").await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed <= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_review_and_general_annotation() {
        let (mut review, transport) = make_facilitator(CeremonyDescriptor::review(), replies(&[]));
        review.submit("We shipped search").await.unwrap();
        assert_eq!(
            transport.seen.lock()[0].last().unwrap().content,
            "User is in Sprint Review and is saying: We shipped search"
        );

        let (mut general, transport) = make_facilitator(CeremonyDescriptor::general(), replies(&[]));
        general.submit("What is a sprint goal?").await.unwrap();
        assert_eq!(
            transport.seen.lock()[0].last().unwrap().content,
            "What is a sprint goal?"
        );
        assert_eq!(general.session().stage(), Stage::Open);
    }

    #[tokio::test]
    async fn test_events_for_one_exchange() {
        let (mut f, _) = make_facilitator(
            CeremonyDescriptor::retrospective(),
            replies(&["Great points! Now, what could be improved?"]),
        );
        let mut events = f.subscribe();
        f.submit("Pairing worked well").await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(matches!(received[0], FacilitatorEvent::UserTurn { .. }));
        assert_eq!(received[1], FacilitatorEvent::ReplyStart);
        assert!(matches!(received[2], FacilitatorEvent::ReplyDelta { .. }));
        assert!(matches!(received[3], FacilitatorEvent::Reply { .. }));
        assert_eq!(
            received[4],
            FacilitatorEvent::StageChanged {
                from: Stage::Retrospective(RetroStage::WentWell),
                to: Stage::Retrospective(RetroStage::ToImprove),
            }
        );
    }

    #[tokio::test]
    async fn test_transcription_submission() {
        let (mut f, transport) = make_facilitator(CeremonyDescriptor::standup(), replies(&[]));

        let outcome = f
            .submit_transcription(&Transcription::failed("Could not understand audio"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::RecognitionFailed {
                reason: "Could not understand audio".into()
            }
        );
        assert_eq!(f.session().turns().len(), 1);
        assert_eq!(f.transcript().last().unwrap().kind, EntryKind::Notice);
        assert!(transport.seen.lock().is_empty());

        f.submit_transcription(&Transcription::recognized("Yesterday I fixed CI"))
            .await
            .unwrap();
        assert_eq!(f.session().stage(), Stage::Standup(StandupStage::Yesterday));
        assert_eq!(f.session().turns().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_reply_is_a_failure() {
        let (mut f, _) = make_facilitator(CeremonyDescriptor::general(), replies(&["   "]));
        let outcome = f.submit("hello").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::BackendFailed { .. }));
        assert_eq!(f.transcript().last().unwrap().text, prompts::SERVICE_APOLOGY);
    }
}
