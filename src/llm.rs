use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::cli::{LlmArgs, LlmProviderChoice};
use crate::util::truncate_chars;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_URL_PREFIX: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordSchema {
    IndexEntries,
    TableOfContents,
}

impl RecordSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IndexEntries => "index_entries",
            Self::TableOfContents => "table_of_contents",
        }
    }

    pub fn max_input_chars(self) -> usize {
        match self {
            Self::IndexEntries => 50_000,
            Self::TableOfContents => 8_000,
        }
    }

    pub fn max_output_tokens(self) -> u32 {
        match self {
            Self::IndexEntries => 16_000,
            Self::TableOfContents => 4_000,
        }
    }

    pub fn prompt(self, raw_text: &str) -> String {
        let raw_text = truncate_chars(raw_text, self.max_input_chars());
        match self {
            Self::IndexEntries => format!(
                "The text below was extracted from the index pages of a book. \
Return a JSON array with one object per index line. Each object has \"term\" (string), \
\"subentry\" (string, \"\" when the line is not a sub-entry) and \"pages\" (array of integers). \
For a page range such as 120-125 keep only the first page. Convert roman numerals \
(ix, xi, xii) to integers (9, 11, 12). Leave out \"see\" and \"see also\" lines that carry no \
page numbers. Respond with the JSON array only.\n\nIndex text:\n\n{raw_text}\n"
            ),
            Self::TableOfContents => format!(
                "The text below was extracted from the table of contents of a book. \
Return a JSON array with one object per chapter or section. Each object has \"name\" \
(string), \"start_page\" (integer) and \"end_page\" (integer). When the end page is not \
printed, use the next entry's start page minus one, or the last page of the book for the \
final entry. Convert roman numerals to integers. Respond with the JSON array only.\n\n\
Contents text:\n\n{raw_text}\n"
            ),
        }
    }
}

pub trait TextStructurer {
    fn structure_text(&self, raw_text: &str, schema: RecordSchema) -> Result<String>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Gemini => DEFAULT_GEMINI_MODEL,
        }
    }
}

#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub timeout: Duration,
    api_key: String,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LlmConfig {
    pub fn from_args(args: &LlmArgs) -> Result<Self> {
        Self::resolve(args, |name| env::var(name).ok())
    }

    fn resolve(args: &LlmArgs, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let gemini_key = || lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY"));
        let openai_key = || lookup("OPENAI_API_KEY");

        let (provider, api_key) = match args.llm_provider {
            LlmProviderChoice::Gemini => (
                LlmProvider::Gemini,
                gemini_key().context("GEMINI_API_KEY or GOOGLE_API_KEY is not set")?,
            ),
            LlmProviderChoice::Openai => (
                LlmProvider::OpenAi,
                openai_key().context("OPENAI_API_KEY is not set")?,
            ),
            LlmProviderChoice::Auto => match (gemini_key(), openai_key()) {
                (Some(key), _) => (LlmProvider::Gemini, key),
                (None, Some(key)) => (LlmProvider::OpenAi, key),
                (None, None) => bail!(
                    "set GEMINI_API_KEY, GOOGLE_API_KEY or OPENAI_API_KEY to structure PDF text"
                ),
            },
        };

        let model = args
            .llm_model
            .clone()
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            provider,
            model,
            timeout: Duration::from_secs(args.llm_timeout_secs),
            api_key,
        })
    }
}

pub struct HttpStructurer {
    config: LlmConfig,
    client: Client,
}

impl HttpStructurer {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        info!(
            provider = config.provider.as_str(),
            model = %config.model,
            "configured structuring model"
        );
        Ok(Self { config, client })
    }

    fn post_json(&self, request: reqwest::blocking::RequestBuilder, body: &Value) -> Result<Value> {
        let response = request
            .json(body)
            .send()
            .with_context(|| format!("{} request failed", self.config.provider.as_str()))?;

        let status = response.status();
        let payload = response
            .text()
            .with_context(|| format!("failed to read {} response", self.config.provider.as_str()))?;
        if !status.is_success() {
            bail!(
                "{} returned {}: {}",
                self.config.provider.as_str(),
                status,
                truncate_chars(payload.trim(), 500)
            );
        }

        serde_json::from_str(&payload)
            .with_context(|| format!("{} response is not JSON", self.config.provider.as_str()))
    }

    fn call_openai(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });
        let request = self
            .client
            .post(OPENAI_URL)
            .bearer_auth(&self.config.api_key);
        let reply = self.post_json(request, &body)?;
        Ok(openai_reply_text(&reply))
    }

    fn call_gemini(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": max_tokens },
        });
        let url = format!(
            "{GEMINI_URL_PREFIX}/{}:generateContent",
            self.config.model
        );
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", self.config.api_key.as_str());
        let reply = self.post_json(request, &body)?;
        Ok(gemini_reply_text(&reply))
    }
}

impl TextStructurer for HttpStructurer {
    fn structure_text(&self, raw_text: &str, schema: RecordSchema) -> Result<String> {
        let prompt = schema.prompt(raw_text);
        debug!(
            schema = schema.as_str(),
            prompt_chars = prompt.chars().count(),
            "sending structuring request"
        );

        let reply = match self.config.provider {
            LlmProvider::OpenAi => self.call_openai(&prompt, schema.max_output_tokens()),
            LlmProvider::Gemini => self.call_gemini(&prompt, schema.max_output_tokens()),
        }
        .with_context(|| format!("structuring {} failed", schema.as_str()))?;

        debug!(
            schema = schema.as_str(),
            reply_chars = reply.chars().count(),
            "received structuring reply"
        );
        Ok(reply)
    }
}

fn openai_reply_text(reply: &Value) -> String {
    reply["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn gemini_reply_text(reply: &Value) -> String {
    reply["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn args(choice: LlmProviderChoice, model: Option<&str>) -> LlmArgs {
        LlmArgs {
            llm_provider: choice,
            llm_model: model.map(ToOwned::to_owned),
            llm_timeout_secs: 30,
        }
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn auto_provider_prefers_gemini_keys() {
        let config = LlmConfig::resolve(
            &args(LlmProviderChoice::Auto, None),
            env_of(&[("GOOGLE_API_KEY", "g"), ("OPENAI_API_KEY", "o")]),
        )
        .expect("config resolves");
        assert_eq!(config.provider, LlmProvider::Gemini);
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn auto_provider_uses_openai_and_model_override() {
        let config = LlmConfig::resolve(
            &args(LlmProviderChoice::Auto, Some("gpt-4.1-mini")),
            env_of(&[("OPENAI_API_KEY", "o"), ("GEMINI_API_KEY", "  ")]),
        )
        .expect("config resolves");
        assert_eq!(config.provider, LlmProvider::OpenAi);
        assert_eq!(config.model, "gpt-4.1-mini");
    }

    #[test]
    fn missing_keys_are_an_error() {
        assert!(LlmConfig::resolve(&args(LlmProviderChoice::Auto, None), env_of(&[])).is_err());
        assert!(
            LlmConfig::resolve(
                &args(LlmProviderChoice::Openai, None),
                env_of(&[("GEMINI_API_KEY", "g")])
            )
            .is_err()
        );
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let config = LlmConfig::resolve(
            &args(LlmProviderChoice::Openai, None),
            env_of(&[("OPENAI_API_KEY", "sk-secret")]),
        )
        .expect("config resolves");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn prompt_truncates_raw_text_to_schema_budget() {
        let raw = "x".repeat(10_000);
        let prompt = RecordSchema::TableOfContents.prompt(&raw);
        assert!(prompt.contains(&"x".repeat(8_000)));
        assert!(!prompt.contains(&"x".repeat(8_001)));
    }

    #[test]
    fn reply_text_is_read_from_provider_payloads() {
        let openai = json!({ "choices": [{ "message": { "content": " [1] " } }] });
        assert_eq!(openai_reply_text(&openai), "[1]");

        let gemini = json!({
            "candidates": [{ "content": { "parts": [{ "text": "[1," }, { "text": "2]" }] } }]
        });
        assert_eq!(gemini_reply_text(&gemini), "[1,2]");
        assert_eq!(gemini_reply_text(&json!({})), "");
    }
}
