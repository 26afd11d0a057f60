//! Configuration management for Brainstorm
//!
//! Settings come from a YAML file (every field optional), then environment
//! overrides, then validation. The loaded config also knows how to build the
//! generator, store and repository it describes.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::clock::Clock;
use crate::generation::{gemini, GeminiClient, GeminiConfig, GenerationError};
use crate::repository::{IdeaRepository, DEFAULT_COLLECTION, DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
use crate::store::firestore::FirestoreConfig;
use crate::store::{DocumentStore, FirestoreStore, MemoryStore, StoreError};

/// Errors raised while loading or applying configuration
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid value for {field}: {message}")]
  Invalid { field: &'static str, message: String },

  #[error(transparent)]
  Generation(#[from] GenerationError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ConfigError {
  fn invalid(field: &'static str, message: impl Into<String>) -> Self {
    ConfigError::Invalid { field, message: message.into() }
  }
}

// Types
// =====

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub store: StoreSettings,
  #[serde(default)]
  pub schedule: ScheduleSettings,
  #[serde(default)]
  pub server: ServerSettings,
}

/// Text generation service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
  /// API key; usually supplied through GEMINI_API_KEY
  #[serde(default)]
  pub api_key: Option<String>,
  #[serde(default = "default_model")]
  pub model: String,
  #[serde(default = "default_generation_url")]
  pub base_url: String,
  #[serde(default = "default_generation_timeout")]
  pub timeout_secs: u64,
}

/// Which document store backs the repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  #[default]
  Memory,
  Firestore,
}

impl std::str::FromStr for StoreBackend {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "memory" => Ok(StoreBackend::Memory),
      "firestore" => Ok(StoreBackend::Firestore),
      other => Err(ConfigError::invalid("store.backend", format!("unknown backend '{other}'"))),
    }
  }
}

/// Document store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
  #[serde(default)]
  pub backend: StoreBackend,
  #[serde(default = "default_collection")]
  pub collection: String,
  #[serde(default)]
  pub project_id: Option<String>,
  #[serde(default = "default_database")]
  pub database: String,
  #[serde(default)]
  pub access_token: Option<String>,
  /// "host:port" of a local emulator; replaces base_url and skips auth
  #[serde(default)]
  pub emulator_host: Option<String>,
  #[serde(default = "default_firestore_url")]
  pub base_url: String,
  #[serde(default = "default_store_timeout")]
  pub timeout_secs: u64,
}

/// Daily batch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
  /// Local wall-clock time, "HH:MM"
  #[serde(default = "default_schedule_time")]
  pub time: String,
  /// IANA timezone name
  #[serde(default = "default_timezone")]
  pub timezone: String,
  #[serde(default = "default_retention_days")]
  pub retention_days: u32,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
  #[serde(default = "default_bind")]
  pub bind: String,
  /// Header the auth proxy uses to pass the verified caller id
  #[serde(default = "default_caller_header")]
  pub caller_header: String,
}

// Default value functions
fn default_model() -> String {
  gemini::DEFAULT_MODEL.to_string()
}
fn default_generation_url() -> String {
  gemini::DEFAULT_BASE_URL.to_string()
}
fn default_generation_timeout() -> u64 {
  60
}
fn default_collection() -> String {
  DEFAULT_COLLECTION.to_string()
}
fn default_database() -> String {
  "(default)".to_string()
}
fn default_firestore_url() -> String {
  "https://firestore.googleapis.com".to_string()
}
fn default_store_timeout() -> u64 {
  30
}
fn default_schedule_time() -> String {
  "02:00".to_string()
}
fn default_timezone() -> String {
  "America/New_York".to_string()
}
fn default_retention_days() -> u32 {
  DEFAULT_RETENTION_DAYS
}
fn default_bind() -> String {
  "127.0.0.1:3000".to_string()
}
fn default_caller_header() -> String {
  "x-caller-id".to_string()
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      api_key: None,
      model: default_model(),
      base_url: default_generation_url(),
      timeout_secs: default_generation_timeout(),
    }
  }
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self {
      backend: StoreBackend::default(),
      collection: default_collection(),
      project_id: None,
      database: default_database(),
      access_token: None,
      emulator_host: None,
      base_url: default_firestore_url(),
      timeout_secs: default_store_timeout(),
    }
  }
}

impl Default for ScheduleSettings {
  fn default() -> Self {
    Self {
      time: default_schedule_time(),
      timezone: default_timezone(),
      retention_days: default_retention_days(),
    }
  }
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self { bind: default_bind(), caller_header: default_caller_header() }
  }
}

// Loading
// =======

impl Config {
  /// Default config location, `~/.brainstorm/config.yaml`
  pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".brainstorm").join("config.yaml"))
  }

  /// Parse a YAML config file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

    if content.trim().is_empty() {
      return Ok(Config::default());
    }

    serde_yaml::from_str(&content)
      .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
  }

  /// Load from an explicit path (which must exist) or the default path (if
  /// present), apply process environment overrides, then validate.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    Self::load_with_env(path, |key| std::env::var(key).ok())
  }

  /// Like [`Config::load`] with an injectable environment lookup
  pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = match path {
      Some(path) => Self::load_from_file(path)?,
      None => match Self::default_path() {
        Some(default) if default.exists() => Self::load_from_file(default)?,
        _ => Config::default(),
      },
    };

    config.apply_env(lookup)?;
    config.validate()?;
    Ok(config)
  }

  /// Apply environment overrides; unset or blank variables are ignored
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get("GEMINI_API_KEY") {
      self.generation.api_key = Some(v);
    }
    if let Some(v) = get("GEMINI_MODEL") {
      self.generation.model = v;
    }
    if let Some(v) = get("GEMINI_BASE_URL") {
      self.generation.base_url = v;
    }
    if let Some(v) = get("BRAINSTORM_STORE") {
      self.store.backend = v.parse()?;
    }
    if let Some(v) = get("FIREBASE_PROJECT_ID") {
      self.store.project_id = Some(v);
    }
    if let Some(v) = get("FIRESTORE_ACCESS_TOKEN") {
      self.store.access_token = Some(v);
    }
    if let Some(v) = get("FIRESTORE_EMULATOR_HOST") {
      self.store.emulator_host = Some(v);
    }
    if let Some(v) = get("BRAINSTORM_COLLECTION") {
      self.store.collection = v;
    }
    if let Some(v) = get("BRAINSTORM_SCHEDULE_TIME") {
      self.schedule.time = v;
    }
    if let Some(v) = get("BRAINSTORM_TIMEZONE") {
      self.schedule.timezone = v;
    }
    if let Some(v) = get("BRAINSTORM_RETENTION_DAYS") {
      self.schedule.retention_days = v.parse().map_err(|_| {
        ConfigError::invalid("schedule.retention_days", format!("'{v}' is not a whole number"))
      })?;
    }
    if let Some(v) = get("BRAINSTORM_CALLER_HEADER") {
      self.server.caller_header = v.to_lowercase();
    }

    Ok(())
  }

  /// Check values that serde cannot
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.schedule_time()?;
    self.timezone()?;

    if !(1..=MAX_RETENTION_DAYS).contains(&self.schedule.retention_days) {
      return Err(ConfigError::invalid(
        "schedule.retention_days",
        format!("must be between 1 and {MAX_RETENTION_DAYS} days"),
      ));
    }
    if self.store.collection.trim().is_empty() {
      return Err(ConfigError::invalid("store.collection", "must not be empty"));
    }
    if self.store.backend == StoreBackend::Firestore
      && self.store.project_id.as_deref().map_or(true, |p| p.trim().is_empty())
    {
      return Err(ConfigError::invalid("store.project_id", "required for the firestore backend"));
    }
    if axum::http::HeaderName::from_bytes(self.server.caller_header.as_bytes()).is_err() {
      return Err(ConfigError::invalid(
        "server.caller_header",
        format!("'{}' is not a valid header name", self.server.caller_header),
      ));
    }

    Ok(())
  }

  /// Parsed daily fire time
  pub fn schedule_time(&self) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(self.schedule.time.trim(), "%H:%M").map_err(|_| {
      ConfigError::invalid("schedule.time", format!("'{}' is not HH:MM", self.schedule.time))
    })
  }

  /// Parsed IANA timezone
  pub fn timezone(&self) -> Result<Tz, ConfigError> {
    self.schedule.timezone.trim().parse::<Tz>().map_err(|_| {
      ConfigError::invalid(
        "schedule.timezone",
        format!("'{}' is not an IANA timezone", self.schedule.timezone),
      )
    })
  }
}

// Building
// ========

impl Config {
  /// Gemini settings; fails without an API key
  pub fn gemini_config(&self) -> Result<GeminiConfig, ConfigError> {
    let api_key = self
      .generation
      .api_key
      .clone()
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| ConfigError::invalid("generation.api_key", "GEMINI_API_KEY is not set"))?;

    Ok(GeminiConfig {
      api_key,
      model: self.generation.model.clone(),
      base_url: self.generation.base_url.clone(),
      timeout: Duration::from_secs(self.generation.timeout_secs),
    })
  }

  /// Firestore connection settings, honouring the emulator host
  pub fn firestore_config(&self) -> Result<FirestoreConfig, ConfigError> {
    let project_id = self
      .store
      .project_id
      .clone()
      .ok_or_else(|| ConfigError::invalid("store.project_id", "required for the firestore backend"))?;

    let (base_url, access_token) = match &self.store.emulator_host {
      Some(host) if host.starts_with("http://") || host.starts_with("https://") => (host.clone(), None),
      Some(host) => (format!("http://{host}"), None),
      None => (self.store.base_url.clone(), self.store.access_token.clone()),
    };

    Ok(FirestoreConfig {
      base_url,
      project_id,
      database: self.store.database.clone(),
      access_token,
      timeout: Duration::from_secs(self.store.timeout_secs),
    })
  }

  /// Build the configured document store
  pub fn build_store(&self, clock: Arc<dyn Clock>) -> Result<Arc<dyn DocumentStore>, ConfigError> {
    match self.store.backend {
      StoreBackend::Memory => Ok(Arc::new(MemoryStore::new(clock))),
      StoreBackend::Firestore => Ok(Arc::new(FirestoreStore::new(&self.firestore_config()?)?)),
    }
  }

  /// Build a repository over the configured store and generator
  pub fn build_repository(&self, clock: Arc<dyn Clock>) -> Result<IdeaRepository, ConfigError> {
    let generator = Arc::new(GeminiClient::new(&self.gemini_config()?)?);
    let store = self.build_store(clock.clone())?;
    Ok(IdeaRepository::new(store, generator, clock).with_collection(self.store.collection.clone()))
  }
}
