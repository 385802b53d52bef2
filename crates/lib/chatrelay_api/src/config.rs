//! API server configuration.

use std::env;

/// Frontend origins allowed when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "https://ai-chatbot-frontend.onrender.com",
    "https://*.onrender.com",
];

/// Configuration for the API server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8000").
    pub bind_addr: String,
    /// CORS allow-list; entries may start with `*.` after the scheme.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".into(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.map(String::from).to_vec(),
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `BIND_ADDR`            | `0.0.0.0:8000`                       |
    /// | `CORS_ALLOWED_ORIGINS` | [`DEFAULT_ALLOWED_ORIGINS`], comma-separated |
    pub fn from_env() -> Self {
        Self::from_lookup(|key: &str| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let bind_addr = lookup("BIND_ADDR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.bind_addr);
        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);
        Self {
            bind_addr,
            allowed_origins,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.allowed_origins.len(), 3);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = ApiConfig::from_lookup(|key| match key {
            "CORS_ALLOWED_ORIGINS" => {
                Some(" https://app.example.com/ , ,http://localhost:3000".into())
            }
            "BIND_ADDR" => Some("127.0.0.1:9000".into()),
            _ => None,
        });
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(
            config.allowed_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn blank_origin_list_falls_back_to_defaults() {
        let config = ApiConfig::from_lookup(|key| (key == "CORS_ALLOWED_ORIGINS").then(|| " , ".into()));
        assert_eq!(config.allowed_origins, ApiConfig::default().allowed_origins);
    }
}
