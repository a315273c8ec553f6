use anyhow::ensure;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub tasks: TasksConfig,
    pub load: LoadConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TasksConfig {
    pub file: PathBuf,
    pub max_per_category: usize,
    /// Only these categories are replayed; all of them when unset.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoadConfig {
    pub mean_qps: f64,
    pub run_time_secs: f64,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_hiccup_threshold_ms")]
    pub hiccup_threshold_ms: u64,
    #[serde(default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub results_file: PathBuf,
}

fn default_progress_interval_ms() -> u64 {
    2000
}

fn default_hiccup_threshold_ms() -> u64 {
    5
}

fn default_drain_poll_ms() -> u64 {
    100
}

fn default_stats_window() -> usize {
    100
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.load.mean_qps.is_finite() && self.load.mean_qps > 0.0,
            "load.mean_qps must be a positive number, got {}",
            self.load.mean_qps
        );
        ensure!(
            self.load.run_time_secs.is_finite() && self.load.run_time_secs > 0.0,
            "load.run_time_secs must be a positive number, got {}",
            self.load.run_time_secs
        );
        ensure!(
            self.load.stats_window > 0,
            "load.stats_window must be at least 1"
        );
        ensure!(
            self.tasks.max_per_category > 0,
            "tasks.max_per_category must be at least 1"
        );
        if let Some(categories) = &self.tasks.categories {
            ensure!(
                !categories.is_empty(),
                "tasks.categories must name at least one category when set"
            );
        }
        Ok(())
    }
}

impl LoadConfig {
    pub fn run_time(&self) -> Duration {
        Duration::from_secs_f64(self.run_time_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn hiccup_threshold(&self) -> Duration {
        Duration::from_millis(self.hiccup_threshold_ms)
    }

    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms)
    }
}
