//! services/api/src/adapters/plan_llm.rs
//!
//! This module contains the adapter for the weekly-plan-generating LLM,
//! reached through OpenRouter's OpenAI-compatible API. It implements the
//! `PlanGenerationService` port from the `core` crate.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sleep_coach_core::ports::{PlanGenerationService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = "You are a sleep coach generating a weekly sleep plan. \
You receive the user's calendar events, recent sleep logs, and sleep settings (which may \
include a one-day override of the usual schedule), plus today's date. \
Respond with ONLY a JSON object of the form \
{\"week_plan\": [{\"date\": \"YYYY-MM-DD\", \"recommended_bedtime\": \"HH:MM\", \
\"recommended_wakeup\": \"HH:MM\", \"advice\": \"...\"}, ...]} covering the next seven days. \
No prose before or after the JSON.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `PlanGenerationService` against OpenRouter
/// (or any OpenAI-compatible endpoint).
#[derive(Clone)]
pub struct OpenRouterPlanAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenRouterPlanAdapter {
    /// Creates a new `OpenRouterPlanAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    /// Strips a surrounding markdown code fence, if present. Models sometimes
    /// wrap the JSON in ```json ... ``` despite the instructions.
    fn strip_code_fences(raw: &str) -> String {
        let trimmed = raw.trim();
        if !trimmed.starts_with("```") {
            return trimmed.to_string();
        }
        let mut lines: Vec<&str> = trimmed.lines().collect();
        if lines.first().is_some_and(|l| l.starts_with("```")) {
            lines.remove(0);
        }
        if lines.last().is_some_and(|l| l.trim() == "```") {
            lines.pop();
        }
        lines.join("\n").trim().to_string()
    }
}

//=========================================================================================
// `PlanGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PlanGenerationService for OpenRouterPlanAdapter {
    /// Generates a weekly plan from the canonical plan inputs.
    ///
    /// Deterministic sampling (temperature 0) keeps regeneration for the same
    /// inputs as reproducible as the upstream model allows. The call is bounded
    /// by the configured timeout; a timeout surfaces as a generation failure
    /// and is never cached.
    async fn generate_week_plan(
        &self,
        calendar_events: &[Value],
        sleep_logs: &[Value],
        settings: &Map<String, Value>,
        today_date: &str,
    ) -> PortResult<Value> {
        let user_input = format!(
            "TODAY: {}\n\nCALENDAR EVENTS:\n{}\n\nSLEEP LOGS:\n{}\n\nSETTINGS:\n{}",
            today_date,
            Value::Array(calendar_events.to_vec()),
            Value::Array(sleep_logs.to_vec()),
            Value::Object(settings.clone()),
        );

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(2048u32)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "Plan generation timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Plan generation LLM returned no text content in its response.".to_string(),
                )
            })?;

        let cleaned = Self::strip_code_fences(&content);
        serde_json::from_str(&cleaned).map_err(|e| {
            PortError::Unexpected(format!("Plan generation LLM returned invalid JSON: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_json_passes_through() {
        let raw = r#"{"week_plan": []}"#;
        assert_eq!(
            OpenRouterPlanAdapter::strip_code_fences(raw),
            r#"{"week_plan": []}"#
        );
    }

    #[test]
    fn json_fence_is_removed() {
        let raw = "```json\n{\"week_plan\": []}\n```";
        assert_eq!(
            OpenRouterPlanAdapter::strip_code_fences(raw),
            "{\"week_plan\": []}"
        );
    }

    #[test]
    fn plain_fence_is_removed() {
        let raw = "```\n{\"week_plan\": []}\n```\n";
        assert_eq!(
            OpenRouterPlanAdapter::strip_code_fences(raw),
            "{\"week_plan\": []}"
        );
    }
}
