//! Report generation: send the contract text to a language model.
//!
//! This module owns the single network round-trip to the model. Prompt text
//! lives in [`crate::prompts`]. A provider with a configured key is built
//! directly from that key; key-less providers (and providers without a
//! key-taking constructor) go through `edgequake_llm::ProviderFactory`.
//!
//! There is no retry loop: a rate limit, auth failure or timeout surfaces as
//! [`ReviewError::Upstream`] and fails the run.

use crate::config::LlmSettings;
use crate::error::ReviewError;
use crate::model::{AnalysisReport, ExtractedText};
use crate::pipeline::postprocess::clean_report;
use crate::prompts::{contract_message, ANALYSIS_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, LLMProvider,
    OpenAIProvider, OpenRouterProvider, ProviderFactory,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A chat-completion backend: one system turn, one user turn, one answer.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Send the two-turn conversation and return the raw answer text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, ReviewError>;
}

/// [`CompletionService`] backed by an `edgequake_llm` provider.
pub struct LlmCompletionService {
    provider_name: String,
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCompletionService {
    /// Build the provider named in `settings`.
    ///
    /// Fails with [`ReviewError::Configuration`] when the provider needs a
    /// credential and none is configured, or when the factory rejects the
    /// provider/model pair.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, ReviewError> {
        if settings.requires_credential()
            && settings.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ReviewError::Configuration(format!(
                "no credential configured for LLM provider '{}'",
                settings.provider
            )));
        }

        let keyed = settings
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .and_then(|key| provider_with_key(&settings.provider, &settings.model, key));

        let provider = match keyed {
            Some(provider) => provider,
            None => ProviderFactory::create_llm_provider(&settings.provider, &settings.model)
                .map_err(|e| {
                    ReviewError::Configuration(format!(
                        "LLM provider '{}' is not usable: {e}",
                        settings.provider
                    ))
                })?,
        };

        Ok(Self::with_provider(settings, provider))
    }

    /// Wrap a pre-constructed provider.
    pub fn with_provider(settings: &LlmSettings, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider_name: settings.provider.clone(),
            provider,
            options: build_options(settings),
        }
    }
}

#[async_trait]
impl CompletionService for LlmCompletionService {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ReviewError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ReviewError::Upstream {
                provider: self.provider_name.clone(),
                message: e.to_string(),
            })?;

        debug!(
            provider = %self.provider_name,
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            "Completion received"
        );

        Ok(response.content)
    }
}

/// Construct `provider` from an explicit key, for providers that accept one.
fn provider_with_key(provider: &str, model: &str, key: &str) -> Option<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match provider {
        "openai" => Arc::new(OpenAIProvider::new(key).with_model(model)),
        "anthropic" => Arc::new(AnthropicProvider::new(key).with_model(model)),
        "gemini" => Arc::new(GeminiProvider::new(key).with_model(model)),
        "openrouter" => Arc::new(OpenRouterProvider::new(key).with_model(model)),
        _ => return None,
    };
    Some(provider)
}

/// Build `CompletionOptions` from the LLM settings.
fn build_options(settings: &LlmSettings) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(settings.temperature),
        max_tokens: Some(settings.max_tokens),
        ..Default::default()
    }
}

/// Produces an [`AnalysisReport`] from contract text.
#[derive(Clone)]
pub struct ReportGenerator {
    service: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl ReportGenerator {
    pub fn new(service: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Run one analysis.
    ///
    /// The call is abandoned (and its future dropped) when the deadline
    /// passes. The answer is cleaned with [`clean_report`]; an empty result
    /// is [`ReviewError::EmptyResponse`].
    pub async fn generate(&self, text: &ExtractedText) -> Result<AnalysisReport, ReviewError> {
        let start = Instant::now();
        let user = contract_message(&text.as_text());
        let provider = self.service.name().to_string();

        info!(%provider, chars = user.len(), "Requesting analysis");

        let raw = tokio::time::timeout(
            self.timeout,
            self.service.complete(ANALYSIS_SYSTEM_PROMPT, &user),
        )
        .await
        .map_err(|_| ReviewError::Upstream {
            provider: provider.clone(),
            message: format!("timed out after {}s", self.timeout.as_secs()),
        })??;

        let markdown = clean_report(&raw);
        if markdown.is_empty() {
            return Err(ReviewError::EmptyResponse { provider });
        }

        info!(
            %provider,
            chars = markdown.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisReport { markdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        answer: Result<String, String>,
        delay: Duration,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, system: &str, user: &str) -> Result<String, ReviewError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            tokio::time::sleep(self.delay).await;
            self.answer.clone().map_err(|message| ReviewError::Upstream {
                provider: "scripted".into(),
                message,
            })
        }
    }

    fn contract() -> ExtractedText {
        ExtractedText::from_page_runs(vec![vec!["Clause", "1"], vec!["Clause", "2"]])
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&LlmSettings::default());
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn missing_credential_is_configuration_error() {
        let err = LlmCompletionService::from_settings(&LlmSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, ReviewError::Configuration(_)));
    }

    #[test]
    fn configured_key_builds_provider_without_env() {
        let settings = LlmSettings {
            api_key: Some("sk-from-config".into()),
            ..LlmSettings::default()
        };
        let service = LlmCompletionService::from_settings(&settings).unwrap();
        assert_eq!(service.name(), "openai");
        assert_eq!(service.provider.model(), "gpt-4.1-mini");
    }

    #[test]
    fn keyed_providers() {
        for name in ["openai", "anthropic", "gemini", "openrouter"] {
            let provider = provider_with_key(name, "some-model", "key").unwrap();
            assert_eq!(provider.model(), "some-model", "{name}");
        }
        assert!(provider_with_key("ollama", "llama3.2", "key").is_none());
    }

    #[tokio::test]
    async fn prompt_layout_is_system_then_verbatim_text() {
        let service = Scripted::answering("# Report");
        let generator = ReportGenerator::new(service.clone(), Duration::from_secs(5));
        generator.generate(&contract()).await.unwrap();

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ANALYSIS_SYSTEM_PROMPT);
        assert_eq!(seen[0].1, "Contract Text:\nClause 1\nClause 2");
    }

    #[tokio::test]
    async fn answer_is_trimmed() {
        let generator =
            ReportGenerator::new(Scripted::answering("\n\n# Report\n\n  "), Duration::from_secs(5));
        let report = generator.generate(&contract()).await.unwrap();
        assert_eq!(report.markdown, "# Report");
    }

    #[tokio::test]
    async fn blank_answer_is_empty_response() {
        let generator = ReportGenerator::new(Scripted::answering("   \n"), Duration::from_secs(5));
        let err = generator.generate(&contract()).await.unwrap_err();
        assert!(matches!(err, ReviewError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn upstream_failure_passes_through() {
        let service = Arc::new(Scripted {
            answer: Err("429 Too Many Requests".into()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        });
        let generator = ReportGenerator::new(service, Duration::from_secs(5));
        let err = generator.generate(&contract()).await.unwrap_err();
        assert!(err.to_string().contains("429"), "got: {err}");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_breach_is_upstream_error() {
        let service = Arc::new(Scripted {
            answer: Ok("# Late".into()),
            delay: Duration::from_secs(30),
            seen: Mutex::new(Vec::new()),
        });
        let generator = ReportGenerator::new(service, Duration::from_secs(2));
        let err = generator.generate(&contract()).await.unwrap_err();
        match err {
            ReviewError::Upstream { message, .. } => assert!(message.contains("timed out")),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }
}
