//! Agent configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Ephemeral workspace (identity.json), wiped by the observer on
    /// death. Distinct from `credits_dir`, which survives.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// Persistent credits directory (`balance.json`). Never cleared.
    #[serde(default = "default_credits_dir")]
    pub credits_dir: String,

    /// Vault of redacted-secret archive (`secrets.jsonl`).
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    pub internal_api_key: String,
    pub model_gateway_key: String,

    /// Base URL of the external model gateway. Ambient addition: the
    /// spec treats the gateway as an external collaborator referenced
    /// only by its contract, so this is the knob that supplies it.
    #[serde(default = "default_model_gateway_base_url")]
    pub model_gateway_base_url: String,

    #[serde(default = "default_observer_base_url")]
    pub observer_base_url: String,

    #[serde(default = "default_monthly_budget_usd")]
    pub monthly_budget_usd: f64,

    #[serde(default = "default_think_interval_min_s")]
    pub think_interval_min_s: u64,
    #[serde(default = "default_think_interval_max_s")]
    pub think_interval_max_s: u64,

    /// Ordered model tiers the gateway client rotates through on 429.
    /// Not an explicit spec knob (the spec only says "configured tier
    /// list"); this is how that list is actually supplied.
    #[serde(default = "default_model_tiers")]
    pub model_tiers: Vec<String>,

    /// Balance floor below which `switch_model` is rejected.
    #[serde(default = "default_switch_model_floor_usd")]
    pub switch_model_floor_usd: f64,

    #[serde(default)]
    pub logging: crate::LoggingConfig,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_workspace_dir() -> String {
    "./data/workspace".to_string()
}

fn default_credits_dir() -> String {
    "./data/credits".to_string()
}

fn default_vault_dir() -> String {
    "./data/vault".to_string()
}

fn default_model_gateway_base_url() -> String {
    "http://127.0.0.1:9090".to_string()
}

fn default_observer_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_monthly_budget_usd() -> f64 {
    5.00
}

fn default_think_interval_min_s() -> u64 {
    60
}

fn default_think_interval_max_s() -> u64 {
    300
}

fn default_model_tiers() -> Vec<String> {
    vec!["primary".to_string(), "fallback".to_string()]
}

fn default_switch_model_floor_usd() -> f64 {
    0.50
}

impl AgentConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::default()
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AgentConfig {
        AgentConfig {
            listen_addr: default_listen_addr(),
            workspace_dir: default_workspace_dir(),
            credits_dir: default_credits_dir(),
            vault_dir: default_vault_dir(),
            internal_api_key: "secret".into(),
            model_gateway_key: "gw".into(),
            model_gateway_base_url: default_model_gateway_base_url(),
            observer_base_url: default_observer_base_url(),
            monthly_budget_usd: default_monthly_budget_usd(),
            think_interval_min_s: default_think_interval_min_s(),
            think_interval_max_s: default_think_interval_max_s(),
            model_tiers: default_model_tiers(),
            switch_model_floor_usd: default_switch_model_floor_usd(),
            logging: crate::LoggingConfig::default(),
        }
    }

    #[test]
    fn defaults_match_spec() {
        let c = sample();
        assert_eq!(c.monthly_budget_usd, 5.00);
        assert_eq!(c.think_interval_min_s, 60);
        assert_eq!(c.think_interval_max_s, 300);
    }

    #[test]
    fn workspace_and_credits_dirs_are_distinct() {
        let c = sample();
        assert_ne!(c.workspace_dir, c.credits_dir);
    }
}
