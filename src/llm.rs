//! Language model collaborator injected by the host.
//!
//! The engine never talks to a model provider itself; `prompt`-family
//! executors call whatever [`LanguageModel`] the host hands to the
//! interpreter builder.

use crate::extract::extract_json;
use async_trait::async_trait;
use serde_json::Value;

/// Text and JSON completions from a model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `text` under the given system persona and return the reply text.
    async fn prompt(&self, persona: &str, text: &str) -> anyhow::Result<String>;

    /// Ask for a reply constrained to `schema` and return it parsed.
    ///
    /// The default asks for JSON in plain text and takes the first JSON value
    /// found in the reply. Backends with native structured output should
    /// override this.
    async fn prompt_for_json(&self, persona: &str, text: &str, schema: &Value) -> anyhow::Result<Value> {
        let request = format!("{text}\n\nRespond only with JSON matching this schema:\n{schema}");
        let reply = self.prompt(persona, &request).await?;
        extract_json(&reply)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Model reply contained no JSON"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Canned(&'static str);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn prompt(&self, _persona: &str, _text: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_default_prompt_for_json() {
        let model = Canned("Here it is: {\"score\": 9}");
        let value = model
            .prompt_for_json("judge", "rate it", &json!({"type": "object"}))
            .await
            .unwrap();
        assert_eq!(value, json!({"score": 9}));
    }

    #[tokio::test]
    async fn test_default_prompt_for_json_without_json() {
        let model = Canned("I cannot help with that.");
        let err = model.prompt_for_json("judge", "rate it", &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("no JSON"));
    }
}
