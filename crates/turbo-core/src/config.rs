//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`APP_SHARD__ID` maps to `shard.id`), and expands `~` and `${VAR}` in
//! path values.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract the typed settings tree. Missing keys fall back to defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ingest: IngestSettings,
    pub embedding: EmbeddingSettings,
    pub shard: ShardSettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub input_path: String,
    pub data_dir: String,
    pub num_shards: usize,
    pub vnodes_per_shard: usize,
    pub num_workers: usize,
    pub queue_capacity: usize,
    pub batch_size: usize,
    pub max_docs_per_shard: u32,
    pub embed_retries: u32,
    pub embed_retry_backoff_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            input_path: "wiki_120k.json".to_string(),
            data_dir: "data".to_string(),
            num_shards: 4,
            vnodes_per_shard: 128,
            num_workers: 4,
            queue_capacity: 1000,
            batch_size: 100,
            max_docs_per_shard: 70_000,
            embed_retries: 2,
            embed_retry_backoff_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    /// Use the deterministic token-hashing embedder instead of the HTTP service.
    pub fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            url: "http://ollama:11434/api/embeddings".to_string(),
            model: "all-minilm".to_string(),
            dimension: 384,
            timeout_secs: 60,
            fake: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardSettings {
    pub id: u32,
    pub port: u16,
    pub data_dir: String,
    pub rerank_window: usize,
    pub default_top_k: usize,
    /// Upper bound on a request's `top_k`.
    pub max_top_k: usize,
    pub lexical_weight: f64,
}

impl Default for ShardSettings {
    fn default() -> Self {
        Self {
            id: 0,
            port: 8080,
            data_dir: "/data".to_string(),
            rerank_window: 100,
            default_top_k: 10,
            max_top_k: 1000,
            lexical_weight: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub port: u16,
    pub shards: Vec<String>,
    pub timeout_ms: u64,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            port: 8080,
            shards: (0..4).map(|i| format!("http://shard{i}:8080")).collect(),
            timeout_ms: 2000,
            default_top_k: 10,
            max_top_k: 1000,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        let ingest = &self.ingest;
        let checks = [
            (ingest.num_shards == 0, "ingest.num_shards must be > 0"),
            (ingest.vnodes_per_shard == 0, "ingest.vnodes_per_shard must be > 0"),
            (ingest.num_workers == 0, "ingest.num_workers must be > 0"),
            (ingest.queue_capacity == 0, "ingest.queue_capacity must be > 0"),
            (ingest.batch_size == 0, "ingest.batch_size must be > 0"),
            (ingest.max_docs_per_shard == 0, "ingest.max_docs_per_shard must be > 0"),
            (self.embedding.dimension == 0, "embedding.dimension must be > 0"),
            (self.shard.rerank_window == 0, "shard.rerank_window must be > 0"),
            (self.shard.default_top_k == 0, "shard.default_top_k must be > 0"),
            (self.shard.max_top_k < self.shard.default_top_k, "shard.max_top_k must be >= shard.default_top_k"),
            (self.gateway.default_top_k == 0, "gateway.default_top_k must be > 0"),
            (self.gateway.max_top_k < self.gateway.default_top_k, "gateway.max_top_k must be >= gateway.default_top_k"),
            (
                !(0.0..=1.0).contains(&self.shard.lexical_weight),
                "shard.lexical_weight must be within [0, 1]",
            ),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(Error::InvalidConfig((*msg).to_string())),
            None => Ok(()),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
