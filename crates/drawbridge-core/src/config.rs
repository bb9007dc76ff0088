//! Construction-time configuration for an orchestrator instance.

use serde::{Deserialize, Serialize};

/// Top-level Drawbridge configuration.
///
/// All fields are optional; accessor methods supply defaults so an empty
/// config is a working one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderer: Option<RendererConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Maximum model-call/tool-execution rounds per `submit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_iterations: Option<u32>,

    /// Replaces the built-in diagram-assistant identity when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// LLM provider credentials and endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Resolve the API key: check `api_key` first, then `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Kroki-compatible render service base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn resolve_secret_field(value: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(v) = value {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }
    env_var
        .as_ref()
        .and_then(|name| std::env::var(name).ok())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn default_model(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.model.clone())
            .unwrap_or_else(|| "claude-sonnet-4-5".to_string())
    }

    pub fn max_tokens(&self) -> u32 {
        self.agent
            .as_ref()
            .and_then(|a| a.max_tokens)
            .unwrap_or(8192)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.agent.as_ref().and_then(|a| a.temperature)
    }

    pub fn max_tool_iterations(&self) -> u32 {
        self.agent
            .as_ref()
            .and_then(|a| a.max_tool_iterations)
            .unwrap_or(10)
    }

    pub fn system_prompt_override(&self) -> Option<&str> {
        self.agent.as_ref().and_then(|a| a.system_prompt.as_deref())
    }

    pub fn renderer_endpoint(&self) -> String {
        self.renderer
            .as_ref()
            .and_then(|r| r.endpoint.clone())
            .unwrap_or_else(|| "https://kroki.io".to_string())
    }

    pub fn renderer_timeout_secs(&self) -> u64 {
        self.renderer
            .as_ref()
            .and_then(|r| r.timeout_secs)
            .unwrap_or(30)
    }
}
