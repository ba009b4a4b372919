//! API layer for studyguide-rs
//!
//! The question-answering pipeline and the chat command surface built on it.

pub mod commands;
pub mod orchestrator;

// Re-export main API types
pub use commands::{CommandContext, Reply, StudyGuideBot};
pub use orchestrator::{AskOutcome, FALLBACK_ANSWER, OrchestratorDeps, QaOrchestrator};
