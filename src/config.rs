//! Process settings, read once from the environment at startup.

use anyhow::{Context, Result};

const DEFAULT_API_SERVER: &str = "https://kubernetes.default.svc";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub api_server: String,
    pub insecure_tls: bool,
    /// Empty means wildcard CORS (development default).
    pub allowed_origins: Vec<String>,
    /// Absent means the history feature is off.
    pub prometheus_url: Option<String>,
}

pub fn load_settings() -> Result<Settings> {
    load_settings_with_env(&SystemEnvironment)
}

pub fn load_settings_with_env<E: EnvironmentProvider>(env: &E) -> Result<Settings> {
    let port: u16 = env
        .get_var("PORT")
        .unwrap_or_else(|| "8080".to_string())
        .parse()
        .context("Invalid PORT")?;

    let api_server = env
        .get_var("KUBE_API_SERVER")
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_SERVER.to_string())
        .trim_end_matches('/')
        .to_string();

    let insecure_tls = env.get_var("KUBE_INSECURE_TLS").as_deref() == Some("true");

    let allowed_origins: Vec<String> = env
        .get_var("ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let prometheus_url = env.get_var("PROMETHEUS_URL").filter(|v| !v.is_empty());

    Ok(Settings {
        port,
        api_server,
        insecure_tls,
        allowed_origins,
        prometheus_url,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct MockEnvironment {
        vars: HashMap<String, String>,
    }

    impl MockEnvironment {
        fn with_var(mut self, key: &str, value: &str) -> Self {
            self.vars.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl EnvironmentProvider for MockEnvironment {
        fn get_var(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    #[test]
    fn defaults_apply_with_empty_environment() {
        let settings = load_settings_with_env(&MockEnvironment::default()).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.api_server, DEFAULT_API_SERVER);
        assert!(!settings.insecure_tls);
        assert!(settings.allowed_origins.is_empty());
        assert!(settings.prometheus_url.is_none());
    }

    #[test]
    fn reads_and_normalizes_overrides() {
        let env = MockEnvironment::default()
            .with_var("PORT", "9000")
            .with_var("KUBE_API_SERVER", "https://k8s.internal:6443/")
            .with_var("KUBE_INSECURE_TLS", "true")
            .with_var("ALLOWED_ORIGINS", "https://a.example, https://b.example ,")
            .with_var("PROMETHEUS_URL", "prom.monitoring:9090");

        let settings = load_settings_with_env(&env).unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.api_server, "https://k8s.internal:6443");
        assert!(settings.insecure_tls);
        assert_eq!(
            settings.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(settings.prometheus_url.as_deref(), Some("prom.monitoring:9090"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let env = MockEnvironment::default().with_var("PORT", "not-a-port");
        assert!(load_settings_with_env(&env).is_err());
    }
}
