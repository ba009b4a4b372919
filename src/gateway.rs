//! Completion gateway
//!
//! The hosted language model is a black box behind [`CompletionGateway`].
//! [`OpenAiGateway`] talks to any OpenAI-compatible chat-completions endpoint
//! (Groq by default) with one system + user message pair per call.

use crate::config::CompletionConfig;
use crate::error::{Result, StudyGuideError};
use crate::prompt::SYSTEM_PROMPT;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
};
use async_openai::{Client, config::OpenAIConfig};
use async_trait::async_trait;

/// Sends a prompt payload to the completion service
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Raw answer text for `payload`, or a [`StudyGuideError::Gateway`]
    async fn complete(&self, payload: &str) -> Result<String>;

    /// Short description for logs
    fn description(&self) -> String;
}

/// OpenAI-compatible gateway with fixed sampling parameters
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    config: CompletionConfig,
}

impl OpenAiGateway {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| StudyGuideError::Config(format!("{} is not set", crate::config::ENV_API_KEY)))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(config.api_base.clone());

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StudyGuideError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        log::info!("🤖 Completion gateway ready: {} via {}", config.model, config.api_base);
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, payload: &str) -> Result<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(SYSTEM_PROMPT.to_string()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(payload.to_string()),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.config.model.as_str())
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .top_p(self.config.top_p)
            .build()?;

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or_else(|| {
                log::error!("No content in chat response: {:?}", response);
                StudyGuideError::Gateway("No content in response".to_string())
            })?;

        Ok(content.trim().to_string())
    }

    fn description(&self) -> String {
        format!("{} via {}", self.config.model, self.config.api_base)
    }
}
