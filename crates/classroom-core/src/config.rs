use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Limits from spec §3/§5 — keep these in one place so every crate agrees.
pub const MAX_STEP_HISTORY: usize = 10_000;
pub const MAX_DOC_INSTANCES: usize = 300;
pub const MAX_NUM_ACTIONS: usize = 50_000;
pub const DEFAULT_CHAT_MAX_MESSAGES: usize = 250;
pub const SAVE_INTERVAL_SECS: u64 = 60;
pub const EVENT_SCHEDULER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_PORT: u16 = 7117;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 256 * 1024;
pub const LONG_POLL_TIMEOUT_SECS: u64 = 300;

/// Top-level config (classroom.toml + CLASSROOM_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassroomConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            docs: DocsConfig::default(),
            chat: ChatConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_payload")]
    pub max_payload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Document Instance Registry tunables (C4/C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    #[serde(default = "default_max_step_history")]
    pub max_step_history: usize,
    #[serde(default = "default_max_doc_instances")]
    pub max_instances: usize,
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            max_step_history: MAX_STEP_HISTORY,
            max_instances: MAX_DOC_INSTANCES,
            save_interval_secs: SAVE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_max_messages")]
    pub max_messages: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_CHAT_MAX_MESSAGES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_interval")]
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: EVENT_SCHEDULER_INTERVAL_SECS,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_max_payload() -> usize {
    MAX_PAYLOAD_BYTES
}
fn default_max_step_history() -> usize {
    MAX_STEP_HISTORY
}
fn default_max_doc_instances() -> usize {
    MAX_DOC_INSTANCES
}
fn default_save_interval() -> u64 {
    SAVE_INTERVAL_SECS
}
fn default_chat_max_messages() -> usize {
    DEFAULT_CHAT_MAX_MESSAGES
}
fn default_scheduler_interval() -> u64 {
    EVENT_SCHEDULER_INTERVAL_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.classroom/classroom.db", home)
}

impl ClassroomConfig {
    /// Load config from a TOML file with CLASSROOM_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. CLASSROOM_CONFIG env var
    ///   3. ~/.classroom/classroom.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("CLASSROOM_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: ClassroomConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CLASSROOM_").split("_"))
            .extract()
            .map_err(|e| crate::error::ClassroomError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.classroom/classroom.toml", home)
}
