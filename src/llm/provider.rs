//! Provider detection and endpoint layout.
//!
//! All supported backends speak the OpenAI Chat Completions dialect; they
//! differ in where the endpoint lives and how the key is sent.

/// Supported LLM providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// `OpenAI` (api.openai.com)
    OpenAI,
    /// Azure `OpenAI` Service
    AzureOpenAI {
        deployment_name: String,
        api_version: String,
    },
    /// Local Ollama server (port 11434 or an `ollama` host)
    Ollama,
    /// `OpenRouter` (openrouter.ai)
    OpenRouter,
    /// Groq (groq.com)
    Groq,
    /// Any other OpenAI-compatible server
    Generic,
}

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

impl Provider {
    /// Detect provider from base URL.
    #[must_use]
    pub fn detect_from_url(base_url: &str) -> Self {
        let lower = base_url.to_lowercase();

        if lower.contains("openai.azure.com") || lower.contains("azure.com") {
            Self::AzureOpenAI {
                deployment_name: String::new(),
                api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            }
        } else if lower.contains(":11434") || lower.contains("ollama") {
            Self::Ollama
        } else if lower.contains("openrouter.ai") {
            Self::OpenRouter
        } else if lower.contains("groq.com") {
            Self::Groq
        } else if lower.contains("openai.com") {
            Self::OpenAI
        } else {
            Self::Generic
        }
    }

    /// Chat Completions endpoint for `base_url`.
    ///
    /// A base URL that already ends in `/v1` is not given a second one.
    #[must_use]
    pub fn build_chat_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');

        match self {
            Self::AzureOpenAI {
                deployment_name,
                api_version,
            } => format!(
                "{base}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}"
            ),
            _ if base.ends_with("/v1") => format!("{base}/chat/completions"),
            _ => format!("{base}/v1/chat/completions"),
        }
    }

    /// Azure expects the key in an `api-key` header rather than as a bearer token.
    #[must_use]
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self, Self::AzureOpenAI { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(Provider::detect_from_url("https://api.openai.com"), Provider::OpenAI);
        assert_eq!(Provider::detect_from_url("http://localhost:11434"), Provider::Ollama);
        assert_eq!(Provider::detect_from_url("https://openrouter.ai/api"), Provider::OpenRouter);
        assert_eq!(Provider::detect_from_url("https://api.groq.com/openai"), Provider::Groq);
        assert_eq!(Provider::detect_from_url("http://10.0.0.5:8080"), Provider::Generic);
        assert!(matches!(
            Provider::detect_from_url("https://lab.openai.azure.com"),
            Provider::AzureOpenAI { .. }
        ));
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            Provider::OpenAI.build_chat_url("https://api.openai.com/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            Provider::Ollama.build_chat_url("http://localhost:11434/v1"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_url_azure() {
        let provider = Provider::AzureOpenAI {
            deployment_name: "gpt-4o".to_string(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        };
        assert_eq!(
            provider.build_chat_url("https://lab.openai.azure.com"),
            "https://lab.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
        assert!(provider.uses_api_key_header());
    }
}
