//! Configuration system for RagOps.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace `ragops.toml` -> explicit file -> `RAGOPS_` environment ->
//! CLI overrides (applied by the caller).

use crate::error::ConfigError;
use crate::gate::{DEFAULT_TOLERANCE, RegressionGate, parse_floor};
use crate::metrics::{Metric, parse_metric_list};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the workspace-level configuration file.
pub const WORKSPACE_CONFIG_FILE: &str = "ragops.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagOpsConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Regression gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum allowed absolute drop from baseline.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Metrics to check, in printing order.
    #[serde(default = "default_tracked_metrics")]
    pub tracked_metrics: Vec<String>,
    /// Optional per-metric minimum applied regardless of baseline.
    #[serde(default)]
    pub absolute_floor: BTreeMap<String, f64>,
    /// Persisted baseline report.
    #[serde(default = "default_baseline_path")]
    pub baseline_path: PathBuf,
    /// Report produced by the latest evaluation run.
    #[serde(default = "default_report_path")]
    pub current_path: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            tracked_metrics: default_tracked_metrics(),
            absolute_floor: BTreeMap::new(),
            baseline_path: default_baseline_path(),
            current_path: default_report_path(),
        }
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_tracked_metrics() -> Vec<String> {
    Metric::ALL.iter().map(|m| m.as_str().to_string()).collect()
}

fn default_baseline_path() -> PathBuf {
    PathBuf::from("baseline_report.json")
}

fn default_report_path() -> PathBuf {
    PathBuf::from("evaluation_report.json")
}

/// Evaluation run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_report_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_judge_model")]
    pub judge_model: String,
    /// Minimum percentage of metrics that must meet their target.
    #[serde(default = "default_min_pass_rate")]
    pub min_pass_rate: f64,
    /// Absolute per-metric targets.
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, f64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            output_path: default_report_path(),
            judge_model: default_judge_model(),
            min_pass_rate: default_min_pass_rate(),
            targets: default_targets(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/golden_dataset.json")
}

fn default_judge_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_min_pass_rate() -> f64 {
    75.0
}

fn default_targets() -> BTreeMap<String, f64> {
    Metric::ALL
        .iter()
        .map(|m| (m.as_str().to_string(), m.default_target()))
        .collect()
}

fn default_request_timeout() -> u64 {
    60
}

/// OpenAI-compatible judge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_judge_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: f32,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_judge_base_url(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
        }
    }
}

fn default_judge_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Where evaluation answers come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// RAG service endpoint accepting `{"question": ...}`.
    #[serde(default)]
    pub url: Option<String>,
    /// Pre-recorded answers file, used when no URL is set.
    #[serde(default)]
    pub answers_path: Option<PathBuf>,
}

impl RagOpsConfig {
    /// Build the regression gate described by `[gate]`.
    pub fn regression_gate(&self) -> Result<RegressionGate, ConfigError> {
        let tracked = parse_metric_list(&self.gate.tracked_metrics)?;
        let floors = parse_metric_map(&self.gate.absolute_floor)?;
        RegressionGate::new(tracked, self.gate.tolerance)?.with_floors(floors)
    }

    /// Tracked metrics from `[gate]`.
    pub fn tracked_metrics(&self) -> Result<Vec<Metric>, ConfigError> {
        parse_metric_list(&self.gate.tracked_metrics)
    }

    /// Evaluation targets keyed by metric. Metrics without a configured target
    /// fall back to their default.
    pub fn targets(&self) -> Result<BTreeMap<Metric, f64>, ConfigError> {
        let mut targets: BTreeMap<Metric, f64> = Metric::ALL
            .iter()
            .map(|m| (*m, m.default_target()))
            .collect();
        targets.extend(parse_metric_map(&self.evaluation.targets)?);
        Ok(targets)
    }

    /// Apply `metric=value` floor arguments on top of the configured floors.
    pub fn apply_floor_overrides<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<(), ConfigError> {
        for spec in specs {
            let (metric, value) = parse_floor(spec.as_ref())?;
            self.gate
                .absolute_floor
                .insert(metric.as_str().to_string(), value);
        }
        Ok(())
    }
}

fn parse_metric_map(map: &BTreeMap<String, f64>) -> Result<BTreeMap<Metric, f64>, ConfigError> {
    map.iter()
        .map(|(name, value)| Ok((name.parse::<Metric>()?, *value)))
        .collect()
}

/// Load configuration from all layers.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<RagOpsConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(RagOpsConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(WORKSPACE_CONFIG_FILE);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // An explicitly requested file must exist.
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file_exact(path));
    }

    // Environment variables (RAGOPS_GATE__TOLERANCE, RAGOPS_JUDGE__BASE_URL, etc.)
    figment = figment.merge(Env::prefixed("RAGOPS_").split("__"));

    figment
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))
}

/// `~/.config/ragops/config.toml` on Linux, platform equivalent elsewhere.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "ragops", "ragops")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
