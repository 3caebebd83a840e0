use std::collections::BTreeMap;
use std::time::Duration;

/// One OpenAI-compatible inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Base URL ending in the API version, e.g. `http://localhost:8080/v1`.
    pub url: String,
    pub api_key: Option<String>,
}

/// Where the HTTP execution client sends each provider's calls.
#[derive(Debug, Clone)]
pub struct AgentsConfig {
    /// Used for any provider without its own endpoint.
    pub default_endpoint: Endpoint,
    /// Provider name (from the gateway model catalog) → endpoint override.
    pub providers: BTreeMap<String, Endpoint>,
    pub request_timeout: Duration,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self::from_env(&[])
    }
}

impl AgentsConfig {
    /// Read `DEBATE_API_URL`, `DEBATE_API_KEY`, `DEBATE_REQUEST_TIMEOUT_SECS`
    /// and, per provider, `DEBATE_<PROVIDER>_URL` / `DEBATE_<PROVIDER>_API_KEY`.
    pub fn from_env(providers: &[&str]) -> Self {
        Self::from_lookup(providers, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(providers: &[&str], lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_endpoint = Endpoint {
            url: lookup("DEBATE_API_URL").unwrap_or_else(|| "http://localhost:8080/v1".into()),
            api_key: lookup("DEBATE_API_KEY"),
        };
        let request_timeout = lookup("DEBATE_REQUEST_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        let mut overrides = BTreeMap::new();
        for provider in providers {
            let prefix = env_prefix(provider);
            if let Some(url) = lookup(&format!("{prefix}_URL")) {
                let api_key = lookup(&format!("{prefix}_API_KEY"));
                overrides.insert(provider.to_string(), Endpoint { url, api_key });
            }
        }

        Self {
            default_endpoint,
            providers: overrides,
            request_timeout,
        }
    }

    pub fn endpoint(&self, provider: &str) -> &Endpoint {
        self.providers.get(provider).unwrap_or(&self.default_endpoint)
    }
}

/// `"google-vertex"` → `DEBATE_GOOGLE_VERTEX`.
fn env_prefix(provider: &str) -> String {
    let name: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("DEBATE_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AgentsConfig::from_lookup(&["openai"], lookup(&[]));
        assert_eq!(config.default_endpoint.url, "http://localhost:8080/v1");
        assert!(config.default_endpoint.api_key.is_none());
        assert!(config.providers.is_empty());
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_provider_override() {
        let config = AgentsConfig::from_lookup(
            &["anthropic", "openai"],
            lookup(&[
                ("DEBATE_API_KEY", "shared"),
                ("DEBATE_ANTHROPIC_URL", "https://proxy.internal/v1"),
                ("DEBATE_ANTHROPIC_API_KEY", "sk-ant"),
            ]),
        );
        let anthropic = config.endpoint("anthropic");
        assert_eq!(anthropic.url, "https://proxy.internal/v1");
        assert_eq!(anthropic.api_key.as_deref(), Some("sk-ant"));
        // No URL override: falls back to the shared endpoint.
        assert_eq!(config.endpoint("openai").api_key.as_deref(), Some("shared"));
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let config =
            AgentsConfig::from_lookup(&[], lookup(&[("DEBATE_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix("google-vertex"), "DEBATE_GOOGLE_VERTEX");
        assert_eq!(env_prefix("openai"), "DEBATE_OPENAI");
    }
}
