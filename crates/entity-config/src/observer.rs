//! Observer configuration: all knobs enumerated in spec §6, loaded
//! default -> optional file -> environment, same precedence order as
//! the fleet daemon's `DaemonConfig::load`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base URL of the agent's loopback-only internal API.
    #[serde(default = "default_agent_base_url")]
    pub agent_base_url: String,

    pub internal_api_key: String,
    pub admin_token: String,
    pub ip_salt: String,

    #[serde(default = "default_local_network_cidr")]
    pub local_network_cidr: String,

    /// Direct peers allowed to set `X-Forwarded-For`; anything else is
    /// ignored and the TCP peer address is used instead. Ambient
    /// addition implementing the forwarded-address trust boundary.
    #[serde(default = "default_trusted_proxy_cidr")]
    pub trusted_proxy_cidr: String,

    #[serde(default = "default_respawn_delay_min_s")]
    pub respawn_delay_min_s: u64,
    #[serde(default = "default_respawn_delay_max_s")]
    pub respawn_delay_max_s: u64,

    #[serde(default = "default_sync_interval_s")]
    pub sync_interval_s: u64,

    #[serde(default = "default_voting_window_s")]
    pub voting_window_s: i64,

    /// How often the voting watcher checks for rounds past `closes_at`.
    /// Not an explicit spec knob; ambient addition implementing "ticks
    /// every few seconds".
    #[serde(default = "default_vote_watch_interval_s")]
    pub vote_watch_interval_s: u64,

    #[serde(default = "default_budget_poll_interval_s")]
    pub budget_poll_interval_s: u64,

    #[serde(default)]
    pub logging: crate::LoggingConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_agent_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_local_network_cidr() -> String {
    "192.168.0.0/24".to_string()
}

fn default_trusted_proxy_cidr() -> String {
    "127.0.0.1/32".to_string()
}

fn default_respawn_delay_min_s() -> u64 {
    10
}

fn default_respawn_delay_max_s() -> u64 {
    60
}

fn default_sync_interval_s() -> u64 {
    30
}

fn default_voting_window_s() -> i64 {
    3600
}

fn default_vote_watch_interval_s() -> u64 {
    5
}

fn default_budget_poll_interval_s() -> u64 {
    30
}

impl ObserverConfig {
    /// Load from an optional config file plus environment variables.
    /// Required fields (`internal_api_key`, `admin_token`, `ip_salt`)
    /// have no default and must come from the file or environment.
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

    fn sample() -> ObserverConfig {
        ObserverConfig {
            listen_addr: default_listen_addr(),
            data_dir: default_data_dir(),
            agent_base_url: default_agent_base_url(),
            internal_api_key: "secret".into(),
            admin_token: "admin".into(),
            ip_salt: "salt".into(),
            local_network_cidr: default_local_network_cidr(),
            trusted_proxy_cidr: default_trusted_proxy_cidr(),
            respawn_delay_min_s: default_respawn_delay_min_s(),
            respawn_delay_max_s: default_respawn_delay_max_s(),
            sync_interval_s: default_sync_interval_s(),
            voting_window_s: default_voting_window_s(),
            vote_watch_interval_s: default_vote_watch_interval_s(),
            budget_poll_interval_s: default_budget_poll_interval_s(),
            logging: crate::LoggingConfig::default(),
        }
    }

    #[test]
    fn defaults_match_spec() {
        let c = sample();
        assert_eq!(c.respawn_delay_min_s, 10);
        assert_eq!(c.respawn_delay_max_s, 60);
        assert_eq!(c.sync_interval_s, 30);
        assert_eq!(c.voting_window_s, 3600);
        assert_eq!(c.budget_poll_interval_s, 30);
        assert_eq!(c.local_network_cidr, "192.168.0.0/24");
    }
}
