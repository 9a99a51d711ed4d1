//! Minimal Prometheus range-query client used for the usage-history views.
//! Configured from `PROMETHEUS_URL` at startup; when the variable is absent
//! the whole feature is off and the rest of the backend runs unchanged.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROMETHEUS_TIMEOUT: Duration = Duration::from_secs(30);

/// One (timestamp, value) sample. Value is millicores for CPU series and
/// bytes for memory series; the queries bake the conversion in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub t: i64,
    pub v: f64,
}

/// CPU and memory series for a single container.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResult {
    pub cpu: Vec<DataPoint>,
    pub memory: Vec<DataPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerHistory {
    pub pod: String,
    pub container: String,
    pub cpu: Vec<DataPoint>,
    pub memory: Vec<DataPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceHistoryResult {
    pub containers: Vec<ContainerHistory>,
}

/// Query window with the step and rate() lookback appropriate for its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub duration: chrono::Duration,
    pub step: &'static str,
    pub rate_window: &'static str,
}

impl TimeRange {
    /// Maps a range selector (1h/6h/24h/7d) to a fixed window; anything
    /// unrecognized falls back to 1h.
    pub fn parse(raw: &str) -> TimeRange {
        match raw {
            "6h" => TimeRange {
                duration: chrono::Duration::hours(6),
                step: "120",
                rate_window: "5m",
            },
            "24h" => TimeRange {
                duration: chrono::Duration::hours(24),
                step: "300",
                rate_window: "10m",
            },
            "7d" => TimeRange {
                duration: chrono::Duration::days(7),
                step: "900",
                rate_window: "15m",
            },
            _ => TimeRange {
                duration: chrono::Duration::hours(1),
                step: "60",
                rate_window: "5m",
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: RangeData,
}

#[derive(Debug, Default, Deserialize)]
struct RangeData {
    #[serde(default)]
    result: Vec<Series>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

pub struct PrometheusClient {
    base_url: String,
    http: reqwest::Client,
}

impl PrometheusClient {
    /// Builds a client for the given base URL. A missing scheme (a common
    /// misconfiguration) defaults to http://; trailing slashes are trimmed.
    pub fn new(url: &str) -> Result<Self> {
        let mut base = url.trim().to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            base = format!("http://{}", base);
        }
        let base_url = base.trim_end_matches('/').to_string();

        let http = reqwest::Client::builder()
            .timeout(PROMETHEUS_TIMEOUT)
            .build()
            .context("building prometheus http client")?;

        Ok(Self { base_url, http })
    }

    async fn fetch_range(&self, query: &str, range: TimeRange) -> Result<RangeResponse> {
        let end = Utc::now();
        let start = end - range.duration;
        let start_ts = start.timestamp().to_string();
        let end_ts = end.timestamp().to_string();

        let response = self
            .http
            .get(format!("{}/api/v1/query_range", self.base_url))
            .query(&[
                ("query", query),
                ("start", start_ts.as_str()),
                ("end", end_ts.as_str()),
                ("step", range.step),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("prometheus: {} {}", status, body));
        }
        Ok(response.json().await?)
    }

    /// Single-series range query; returns the first matching series' samples,
    /// or an empty vector when the query matched nothing.
    pub async fn query_range(&self, query: &str, range: TimeRange) -> Result<Vec<DataPoint>> {
        let parsed = self.fetch_range(query, range).await?;
        if parsed.status != "success" {
            return Ok(Vec::new());
        }
        Ok(parsed
            .data
            .result
            .first()
            .map(|series| parse_values(&series.values))
            .unwrap_or_default())
    }

    /// Multi-series range query; returns every matching series with its
    /// label set, for grouping by the caller.
    pub async fn query_range_multi(&self, query: &str, range: TimeRange) -> Result<Vec<Series>> {
        let parsed = self.fetch_range(query, range).await?;
        if parsed.status != "success" {
            return Ok(Vec::new());
        }
        Ok(parsed.data.result)
    }

    /// CPU (millicores) and memory working-set (bytes) history for one
    /// container.
    pub async fn container_history(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        range: TimeRange,
    ) -> Result<HistoryResult> {
        let labels = format!(
            r#"namespace="{}",pod="{}",container="{}""#,
            namespace, pod, container
        );
        let cpu_query = format!(
            "rate(container_cpu_usage_seconds_total{{{}}}[{}]) * 1000",
            labels, range.rate_window
        );
        let memory_query = format!("container_memory_working_set_bytes{{{}}}", labels);

        let (cpu, memory) = tokio::try_join!(
            self.query_range(&cpu_query, range),
            self.query_range(&memory_query, range),
        )?;
        Ok(HistoryResult { cpu, memory })
    }

    /// History for every container in a namespace, grouped by
    /// (pod, container). The two queries run concurrently.
    pub async fn namespace_history(
        &self,
        namespace: &str,
        range: TimeRange,
    ) -> Result<NamespaceHistoryResult> {
        let labels = format!(r#"namespace="{}",container!="""#, namespace);
        let cpu_query = format!(
            "rate(container_cpu_usage_seconds_total{{{}}}[{}]) * 1000",
            labels, range.rate_window
        );
        let memory_query = format!("container_memory_working_set_bytes{{{}}}", labels);

        let (cpu_series, memory_series) = tokio::try_join!(
            self.query_range_multi(&cpu_query, range),
            self.query_range_multi(&memory_query, range),
        )?;

        debug!(
            "prometheus returned {} cpu / {} memory series for namespace '{}'",
            cpu_series.len(),
            memory_series.len(),
            namespace
        );
        Ok(NamespaceHistoryResult {
            containers: merge_series(cpu_series, memory_series),
        })
    }
}

/// Parses raw `[timestamp, "value"]` pairs, skipping malformed entries.
fn parse_values(raw: &[serde_json::Value]) -> Vec<DataPoint> {
    let mut points = Vec::with_capacity(raw.len());
    for entry in raw {
        let Some(pair) = entry.as_array() else { continue };
        if pair.len() != 2 {
            continue;
        }
        let Some(t) = pair[0].as_f64() else { continue };
        let Some(v) = pair[1].as_str().and_then(|s| s.parse::<f64>().ok()) else {
            continue;
        };
        points.push(DataPoint { t: t as i64, v });
    }
    points
}

/// Joins CPU and memory series on their (pod, container) labels. A series
/// present on only one side still gets an entry with the other axis empty.
fn merge_series(cpu_series: Vec<Series>, memory_series: Vec<Series>) -> Vec<ContainerHistory> {
    let mut index: BTreeMap<(String, String), ContainerHistory> = BTreeMap::new();

    let tagged = cpu_series
        .into_iter()
        .map(|s| (s, true))
        .chain(memory_series.into_iter().map(|s| (s, false)));

    for (series, is_cpu) in tagged {
        let pod = series.metric.get("pod").cloned().unwrap_or_default();
        let container = series.metric.get("container").cloned().unwrap_or_default();
        let history = index
            .entry((pod.clone(), container.clone()))
            .or_insert_with(|| ContainerHistory {
                pod,
                container,
                cpu: Vec::new(),
                memory: Vec::new(),
            });
        let points = parse_values(&series.values);
        if is_cpu {
            history.cpu = points;
        } else {
            history.memory = points;
        }
    }

    index.into_values().collect()
}
