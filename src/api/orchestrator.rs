//! QaOrchestrator - the question-answering pipeline
//!
//! One call to [`QaOrchestrator::ask`] walks a question through:
//! knowledge-base lookup, rate limit, prompt, completion, filtering and
//! bookkeeping. Rejections happen before the completion service is contacted
//! and leave no trace; gateway failures return [`FALLBACK_ANSWER`] and are
//! not counted as answered questions.

use crate::context::UserContextTracker;
use crate::debug::{DebugSnapshot, DebugSnapshots};
use crate::filter::ResponseFilter;
use crate::gateway::CompletionGateway;
use crate::knowledge::KnowledgeStore;
use crate::prompt::PromptBuilder;
use crate::rate_limit::RateLimiter;
use crate::stats::StatsRecorder;
use crate::{ChannelId, UserId};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Returned to the user whenever the completion service fails
pub const FALLBACK_ANSWER: &str =
    "Sorry, I'm having trouble accessing my AI service right now. Please try again later!";

/// How a question ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Filtered answer from the completion service
    Answered(String),

    /// The gateway failed or timed out; carries [`FALLBACK_ANSWER`]
    Fallback(String),

    /// The channel has no knowledge base
    NoKnowledgeBase,

    /// The user asked again inside the cooldown window
    RateLimited,
}

impl AskOutcome {
    /// Text to show the user, if the outcome carries an answer
    pub fn answer(&self) -> Option<&str> {
        match self {
            AskOutcome::Answered(text) | AskOutcome::Fallback(text) => Some(text),
            _ => None,
        }
    }
}

/// The narrow set of components the pipeline needs
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub knowledge: Arc<KnowledgeStore>,
    pub stats: Arc<StatsRecorder>,
    pub rate_limiter: Arc<RateLimiter>,
    pub gateway: Arc<dyn CompletionGateway>,
    pub context: Arc<UserContextTracker>,
    pub debug: Arc<DebugSnapshots>,
}

pub struct QaOrchestrator {
    deps: OrchestratorDeps,
    prompt: PromptBuilder,
    filter: ResponseFilter,
    gateway_timeout: Duration,
}

impl QaOrchestrator {
    pub fn new(
        deps: OrchestratorDeps,
        prompt: PromptBuilder,
        filter: ResponseFilter,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            deps,
            prompt,
            filter,
            gateway_timeout,
        }
    }

    /// Answer `question` for `user_id` in `channel_id`
    pub async fn ask(&self, channel_id: ChannelId, user_id: UserId, question: &str) -> AskOutcome {
        let Some(knowledge_base) = self.deps.knowledge.get(channel_id).await else {
            log::debug!("No knowledge base for channel {}", channel_id);
            return AskOutcome::NoKnowledgeBase;
        };

        if self.deps.rate_limiter.is_limited(user_id).await {
            log::debug!("User {} is rate limited", user_id);
            return AskOutcome::RateLimited;
        }

        let recent = self.deps.context.get(user_id);
        let payload = self.prompt.build(question, &knowledge_base, &recent);

        let raw = match tokio::time::timeout(self.gateway_timeout, self.deps.gateway.complete(&payload)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                log::error!("Error calling completion service: {}", e);
                return AskOutcome::Fallback(FALLBACK_ANSWER.to_string());
            }
            Err(_) => {
                log::error!(
                    "Completion service timed out after {:.1}s for channel {}",
                    self.gateway_timeout.as_secs_f64(),
                    channel_id
                );
                return AskOutcome::Fallback(FALLBACK_ANSWER.to_string());
            }
        };

        let answer = self.filter.filter(&raw);
        self.record(channel_id, user_id, question, &answer).await;

        log::info!("Question answered in channel {} by user {}", channel_id, user_id);
        AskOutcome::Answered(answer)
    }

    /// Bookkeeping for an answered question; failures are logged inside
    /// `StatsRecorder` and never reach the user
    async fn record(&self, channel_id: ChannelId, user_id: UserId, question: &str, answer: &str) {
        let now = Utc::now();

        self.deps
            .stats
            .record_question_at(channel_id, user_id, question, answer, now)
            .await;

        self.deps.debug.update(
            channel_id,
            DebugSnapshot {
                question: question.to_string(),
                answer: answer.to_string(),
                timestamp: now,
                user_id,
            },
        );

        self.deps.context.append(user_id, question);
        self.deps.rate_limiter.mark(user_id, now);
    }

    pub fn deps(&self) -> &OrchestratorDeps {
        &self.deps
    }
}
