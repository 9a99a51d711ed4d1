//! Prometheus-backed usage history. The client is optional process state:
//! when `PROMETHEUS_URL` is unset the controllers answer 503 without ever
//! reaching this module.

use anyhow::Result;

use crate::core::client::prometheus::{
    HistoryResult, NamespaceHistoryResult, PrometheusClient, TimeRange,
};

/// Whitelist check for strings interpolated into PromQL label matchers.
/// Anything outside [a-zA-Z0-9._-] could break out of the label syntax.
pub fn valid_label_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}

pub async fn container_history(
    prometheus: &PrometheusClient,
    namespace: &str,
    pod: &str,
    container: &str,
    range: &str,
) -> Result<HistoryResult> {
    prometheus
        .container_history(namespace, pod, container, TimeRange::parse(range))
        .await
}

pub async fn namespace_history(
    prometheus: &PrometheusClient,
    namespace: &str,
    range: &str,
) -> Result<NamespaceHistoryResult> {
    prometheus
        .namespace_history(namespace, TimeRange::parse(range))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_whitelist_rejects_promql_metacharacters() {
        assert!(valid_label_value("kube-system"));
        assert!(valid_label_value("web_1.example"));
        assert!(!valid_label_value(""));
        assert!(!valid_label_value(r#"ns"}"#));
        assert!(!valid_label_value("a{b"));
        assert!(!valid_label_value(r"a\b"));
        assert!(!valid_label_value("a b"));
    }
}
