//! scrum-facilitator: conversation state engine for Scrum ceremonies
//!
//! This crate tracks which stage a ceremony is in, who is speaking and what
//! has been agreed, annotates human turns before they reach the chat backend,
//! and reads the backend's replies to decide where the conversation goes next.

pub mod annotator;
pub mod backlog;
pub mod ceremony;
pub mod classifier;
pub mod deferred;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod names;
pub mod prompts;
pub mod runner;
pub mod session;
pub mod transport;

pub use annotator::AnnotationStyle;
pub use ceremony::{CeremonyType, PlanningStage, ResponseCategory, RetroStage, Stage, StandupStage};
pub use descriptor::{CeremonyDescriptor, FailurePolicy, ScriptedTurn, TypingDelay};
pub use engine::{EnginePhase, Facilitator, SubmitOutcome};
pub use error::{Error, Result};
pub use events::FacilitatorEvent;
pub use handle::FacilitatorHandle;
pub use runner::{BusyPolicy, SessionRunner};
pub use session::{EntryKind, SessionState, TranscriptEntry};
pub use transport::{ProviderTransport, Transport, TransportEvent};
