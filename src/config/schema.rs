use anyhow::{Context, Result};
use directories::UserDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "SUPPORTBOT_CONFIG_DIR";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level supportbot configuration, loaded from `config.toml`.
///
/// Resolution order: `SUPPORTBOT_CONFIG_DIR` env → `~/.supportbot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Model API key. When absent or blank the bot runs in mock mode.
    /// Overridden by `OPENAI_API_KEY` or `SUPPORTBOT_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL override for the provider API (any OpenAI-compatible endpoint).
    #[serde(default)]
    pub api_url: Option<String>,

    /// Responder settings (`[agent]`).
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP gateway settings (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Responder configuration (`[agent]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentConfig {
    /// Provider ID used in live mode. Default: `"openai"`.
    #[serde(default = "default_agent_provider")]
    pub provider: String,
    /// Model name sent to the provider. Default: `"gpt-4"`.
    #[serde(default = "default_agent_model")]
    pub model: String,
    /// Sampling temperature (0.0–2.0). Default: `0.3`.
    #[serde(default = "default_agent_temperature")]
    pub temperature: f64,
    /// System prompt prepended to every live conversation.
    #[serde(default = "default_agent_system_prompt")]
    pub system_prompt: String,
    /// Maximum conversation turns replayed to the model. Default: `50`.
    #[serde(default = "default_agent_max_history_messages")]
    pub max_history_messages: usize,
}

fn default_agent_provider() -> String {
    "openai".into()
}

fn default_agent_model() -> String {
    "gpt-4".into()
}

fn default_agent_temperature() -> f64 {
    0.3
}

fn default_agent_system_prompt() -> String {
    "You are a friendly customer support assistant. Help with passwords, orders, \
     refunds, billing, and account updates. Keep answers short and actionable."
        .into()
}

fn default_agent_max_history_messages() -> usize {
    50
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_agent_provider(),
            model: default_agent_model(),
            temperature: default_agent_temperature(),
            system_prompt: default_agent_system_prompt(),
            max_history_messages: default_agent_max_history_messages(),
        }
    }
}

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Gateway port (default: 8000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Per-request timeout in seconds, covering the live model call.
    #[serde(default = "default_gateway_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_gateway_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_request_timeout_secs() -> u64 {
    120
}

fn default_gateway_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            request_timeout_secs: default_gateway_request_timeout_secs(),
            max_body_bytes: default_gateway_max_body_bytes(),
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".supportbot").join(CONFIG_FILE_NAME),
            api_key: None,
            api_url: None,
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".supportbot"))
}

fn resolve_config_dir() -> Result<PathBuf> {
    if let Ok(custom) = std::env::var(CONFIG_DIR_ENV) {
        let custom = custom.trim();
        if !custom.is_empty() {
            return Ok(PathBuf::from(custom));
        }
    }
    default_config_dir()
}

fn first_nonblank<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

impl Config {
    /// Load `config.toml` from the resolved config directory, creating it with
    /// defaults on first run. Environment overrides are applied afterwards.
    pub async fn load_or_init() -> Result<Self> {
        let dir = resolve_config_dir()?;
        let mut config = Self::load_or_init_in(&dir).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load or create `config.toml` inside `dir` without touching the environment.
    pub async fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        if config_path.exists() {
            // Warn if config file is world-readable (may contain API keys)
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(meta) = fs::metadata(&config_path).await {
                    if meta.permissions().mode() & 0o004 != 0 {
                        tracing::warn!(
                            "Config file {:?} is world-readable (mode {:o}). \
                             Consider restricting with: chmod 600 {:?}",
                            config_path,
                            meta.permissions().mode() & 0o777,
                            config_path,
                        );
                    }
                }
            }

            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path;
            tracing::info!(
                path = %config.config_path.display(),
                initialized = false,
                "Config loaded"
            );
            Ok(config)
        } else {
            let config = Config {
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save().await?;

            tracing::info!(
                path = %config.config_path.display(),
                initialized = true,
                "Config loaded"
            );
            Ok(config)
        }
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }
        if self.gateway.request_timeout_secs == 0 {
            anyhow::bail!("gateway.request_timeout_secs must be greater than 0");
        }
        if self.gateway.max_body_bytes == 0 {
            anyhow::bail!("gateway.max_body_bytes must be greater than 0");
        }
        if self.agent.provider.trim().is_empty() {
            anyhow::bail!("agent.provider must not be empty");
        }
        if self.agent.model.trim().is_empty() {
            anyhow::bail!("agent.model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            anyhow::bail!(
                "agent.temperature must be between 0.0 and 2.0 (got {})",
                self.agent.temperature
            );
        }
        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API key: OPENAI_API_KEY wins, then SUPPORTBOT_API_KEY
        if let Some(key) = first_nonblank(&lookup, &["OPENAI_API_KEY", "SUPPORTBOT_API_KEY"]) {
            self.api_key = Some(key);
        }

        if let Some(url) = first_nonblank(&lookup, &["SUPPORTBOT_API_URL", "OPENAI_BASE_URL"]) {
            self.api_url = Some(url);
        }

        if let Some(model) = first_nonblank(&lookup, &["SUPPORTBOT_MODEL"]) {
            self.agent.model = model;
        }

        if let Some(temp_str) = first_nonblank(&lookup, &["SUPPORTBOT_TEMPERATURE"]) {
            match temp_str.parse::<f64>() {
                Ok(temp) if (0.0..=2.0).contains(&temp) => self.agent.temperature = temp,
                _ => tracing::warn!(
                    value = %temp_str,
                    "Ignoring invalid SUPPORTBOT_TEMPERATURE (expected 0.0-2.0)"
                ),
            }
        }

        if let Some(host) = first_nonblank(&lookup, &["SUPPORTBOT_GATEWAY_HOST", "HOST"]) {
            self.gateway.host = host;
        }

        if let Some(port_str) = first_nonblank(&lookup, &["SUPPORTBOT_GATEWAY_PORT", "PORT"]) {
            match port_str.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => tracing::warn!(value = %port_str, "Ignoring invalid gateway port"),
            }
        }
    }

    /// Whether a usable credential is configured.
    pub fn has_credential(&self) -> bool {
        crate::providers::normalize_credential(self.api_key.as_deref()).is_some()
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut options = OpenOptions::new();
        options.create_new(true).write(true);
        // Owner-only from the first byte; the file may hold an API key.
        #[cfg(unix)]
        options.mode(0o600);
        let mut temp_file = options
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir).await
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}
