use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "districtd.toml";
pub const ENV_WORKSPACE: &str = "DISTRICTD_WORKSPACE";
pub const ENV_SEED_CSV: &str = "DISTRICTD_SEED_CSV";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub seed: SeedConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    pub csv_path: PathBuf,
    pub policy: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("dic_master_seed_data.csv"),
            policy: "best_effort".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub default_district: Option<String>,
}

impl Config {
    /// Reads `districtd.toml` from the workspace; a missing file means
    /// defaults. Environment overrides are applied last.
    pub fn load(workspace: &Path) -> anyhow::Result<Config> {
        let path = workspace.join(CONFIG_FILE);
        let mut cfg = if path.is_file() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
            toml::from_str::<Config>(&text)
                .with_context(|| format!("invalid {}", path.to_string_lossy()))?
        } else {
            Config::default()
        };
        if let Some(p) = std::env::var_os(ENV_SEED_CSV).filter(|v| !v.is_empty()) {
            cfg.seed.csv_path = PathBuf::from(p);
        }
        if cfg.seed.csv_path.is_relative() {
            cfg.seed.csv_path = workspace.join(&cfg.seed.csv_path);
        }
        Ok(cfg)
    }
}

pub fn workspace_from_env() -> Option<PathBuf> {
    std::env::var_os(ENV_WORKSPACE)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
