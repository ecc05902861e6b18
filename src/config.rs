// Application configuration, loaded from environment variables and CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.tibiadata.com/v4";
pub const USER_AGENT: &str = "TibiaOpsConfig/1.0";

/// Rate limit, bad gateway, service unavailable, gateway timeout.
pub const TRANSIENT_STATUS_CODES: [u16; 4] = [429, 502, 503, 504];

const DEFAULT_WORLDS: [&str; 14] = [
    "Quidera",
    "Firmera",
    "Aethera",
    "Monstera",
    "Talera",
    "Lobera",
    "Quintera",
    "Wintera",
    "Eclipta",
    "Epoca",
    "Zunera",
    "Mystera",
    "Xymera",
    "Tempestera",
];

const DEFAULT_ENEMY_GUILDS: [(&str, &str); 2] =
    [("Bastex", "Firmera"), ("Bastex Ruzh", "Tempestera")];

/// How the fetcher retries a single remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    /// Delay before the second attempt; doubles for every attempt after.
    pub initial_backoff: Duration,
    /// Upper bound for one attempt.
    pub request_timeout: Duration,
    /// HTTP statuses worth retrying.
    pub transient_status_codes: Vec<u16>,
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (1-based). The first attempt never waits.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt - 2))
    }

    pub fn is_transient_status(&self, status: u16) -> bool {
        self.transient_status_codes.contains(&status)
    }

    /// Attempts actually made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            transient_status_codes: TRANSIENT_STATUS_CODES.to_vec(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TibiaData base URL, including the version prefix.
    pub base_url: String,
    pub retry: RetryPolicy,
    /// Pause between consecutive canonical-name lookups in the sanity pass.
    pub lookup_delay: Duration,
    /// Worlds monitored for guild rosters and online players.
    pub worlds: Vec<String>,
    /// Enemy guild -> home world, in processing order.
    pub enemy_guilds: Vec<(String, String)>,
    /// Guilds listed right after trolls and alerts on the status page.
    pub special_guilds: Vec<String>,
    /// Directory holding the persisted JSON lists.
    pub configs_dir: PathBuf,
    /// Port for the metrics server.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `TIBIADATA_BASE_URL` - API base (default: `https://api.tibiadata.com/v4`)
    /// - `TIBIA_MAX_RETRIES` - attempts per request (default: 4)
    /// - `TIBIA_INITIAL_BACKOFF_SECS` - first retry delay (default: 2)
    /// - `TIBIA_REQUEST_TIMEOUT_SECS` - per-attempt timeout (default: 30)
    /// - `TIBIA_LOOKUP_DELAY_MS` - pause between sanity lookups (default: 100)
    /// - `TIBIA_CONFIGS_DIR` - list directory (default: `.configs`)
    /// - `TIBIA_WORLDS` - comma-separated world names
    /// - `TIBIA_ENEMY_GUILDS` - `Guild=World` pairs, comma-separated
    /// - `TIBIA_SPECIAL_GUILDS` - comma-separated guild names
    /// - `METRICS_PORT` - metrics server port (default: 8000)
    ///
    /// CLI flags:
    /// - `--configs <DIR>` - override the list directory
    /// - `--port <PORT>` - override the metrics port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from explicit args and an env lookup.
    pub fn from_sources<F>(args: &[String], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RetryPolicy::default();

        let base_url = env("TIBIADATA_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let retry = RetryPolicy {
            max_retries: parse_env(&env, "TIBIA_MAX_RETRIES").unwrap_or(defaults.max_retries),
            initial_backoff: parse_env(&env, "TIBIA_INITIAL_BACKOFF_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.initial_backoff),
            request_timeout: parse_env(&env, "TIBIA_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            transient_status_codes: defaults.transient_status_codes,
        };

        let lookup_delay = parse_env(&env, "TIBIA_LOOKUP_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_millis(100));

        let worlds = env("TIBIA_WORLDS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| DEFAULT_WORLDS.iter().map(|w| w.to_string()).collect());

        let enemy_guilds = env("TIBIA_ENEMY_GUILDS")
            .map(|v| parse_pairs(&v))
            .unwrap_or_else(|| {
                DEFAULT_ENEMY_GUILDS
                    .iter()
                    .map(|(g, w)| (g.to_string(), w.to_string()))
                    .collect()
            });

        let special_guilds = env("TIBIA_SPECIAL_GUILDS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|| enemy_guilds.iter().map(|(g, _)| g.clone()).collect());

        // Directory: CLI flag takes precedence, then env var, then default
        let configs_dir = Self::parse_cli_value(args, "--configs")
            .or_else(|| env("TIBIA_CONFIGS_DIR"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".configs"));

        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| parse_env(&env, "METRICS_PORT"))
            .unwrap_or(8000);

        Config {
            base_url,
            retry,
            lookup_delay,
            worlds,
            enemy_guilds,
            special_guilds,
            configs_dir,
            port,
        }
    }

    /// Reject configurations no job can run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.worlds.is_empty() {
            return Err("no worlds configured".to_string());
        }
        if self.retry.request_timeout.is_zero() {
            return Err("request timeout must be positive".to_string());
        }
        for (guild, world) in &self.enemy_guilds {
            if !self.worlds.iter().any(|w| w == world) {
                return Err(format!(
                    "enemy guild '{guild}' maps to '{world}' which is not a monitored world"
                ));
            }
        }
        Ok(())
    }

    pub fn trolls_file(&self) -> PathBuf {
        self.configs_dir.join("trolls.json")
    }

    pub fn bastex_file(&self) -> PathBuf {
        self.configs_dir.join("bastex.json")
    }

    pub fn alerts_file(&self) -> PathBuf {
        self.configs_dir.join("alerts.json")
    }

    pub fn world_guilds_file(&self) -> PathBuf {
        self.configs_dir.join("world_guilds_data.json")
    }

    pub fn online_status_file(&self) -> PathBuf {
        self.configs_dir.join("online_status.json")
    }

    /// Lists checked by the sanity pass.
    pub fn sanity_files(&self) -> Vec<PathBuf> {
        vec![self.trolls_file(), self.bastex_file()]
    }

    pub fn configs_dir(&self) -> &Path {
        &self.configs_dir
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_sources(&[], |_| None)
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    env(key).and_then(|v| v.trim().parse().ok())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (guild, world) = pair.split_once('=')?;
            let (guild, world) = (guild.trim(), world.trim());
            if guild.is_empty() || world.is_empty() {
                None
            } else {
                Some((guild.to_string(), world.to_string()))
            }
        })
        .collect()
}
