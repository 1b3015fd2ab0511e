//! Layered configuration (SPEC_FULL §A "Configuration").
//!
//! Defaults -> TOML file -> `CERBERUS_`-prefixed environment variables,
//! mirroring the teacher's `figment` layering. Environment variables use a
//! double underscore to cross into nested tables:
//! `CERBERUS_INDEXING__PARALLEL_THREADS=8` sets `indexing.parallel_threads`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

static GLOBAL_DEBUG: AtomicBool = AtomicBool::new(false);

pub fn set_global_debug(enabled: bool) {
    GLOBAL_DEBUG.store(enabled, Ordering::Relaxed);
}

pub fn is_global_debug_enabled() -> bool {
    GLOBAL_DEBUG.load(Ordering::Relaxed)
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub languages: HashMap<String, LanguageConfig>,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub mutation: MutationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Bounded worker pool size for per-file parsing (§5: default cores-1, min 1).
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,

    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// §4.A per-file size cap, bytes. Default 1 MiB.
    #[serde(default = "default_size_cap_bytes")]
    pub size_cap_bytes: u64,

    /// Batch size for store writes (§4.D `write_symbols_batch(chunk_size=1000)`).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bounded channel depth between parser workers and the commit stage (§5).
    #[serde(default = "default_parse_queue_depth")]
    pub parse_queue_depth: usize,

    /// Optional root used to scope gitignore-style rule resolution.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LanguageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub extensions: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Weighted-fusion weight for the keyword list (§4.G); `w_sem = 1 - w_keyword`.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// `k` in reciprocal rank fusion `1/(k + rank)` (§4.G).
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// BM25 parameters (§4.G).
    #[serde(default = "default_bm25_k1")]
    pub bm25_k1: f32,
    #[serde(default = "default_bm25_b")]
    pub bm25_b: f32,

    /// Padding lines for span reads (§4.G "Span reads").
    #[serde(default = "default_span_padding")]
    pub span_padding: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MutationConfig {
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default = "default_true")]
    pub run_syntax_check: bool,
    #[serde(default = "default_true")]
    pub preserve_indentation: bool,
    /// Tombstone fraction that triggers a vector-store rebuild (§4.E, §9).
    #[serde(default = "default_tombstone_threshold")]
    pub vector_tombstone_threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub default: String,
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".cerberus")
}
fn default_parallel_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}
fn default_ignore_patterns() -> Vec<String> {
    vec![
        "target/**".into(),
        "node_modules/**".into(),
        ".git/**".into(),
        "dist/**".into(),
        "__pycache__/**".into(),
    ]
}
fn default_size_cap_bytes() -> u64 {
    1024 * 1024
}
fn default_chunk_size() -> usize {
    1000
}
fn default_parse_queue_depth() -> usize {
    256
}
fn default_true() -> bool {
    true
}
fn default_keyword_weight() -> f32 {
    0.5
}
fn default_rrf_k() -> f32 {
    60.0
}
fn default_top_k() -> usize {
    10
}
fn default_bm25_k1() -> f32 {
    1.5
}
fn default_bm25_b() -> f32 {
    0.75
}
fn default_span_padding() -> u32 {
    0
}
fn default_tombstone_threshold() -> f32 {
    0.2
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            indexing: IndexingConfig::default(),
            languages: default_languages(),
            retrieval: RetrievalConfig::default(),
            mutation: MutationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            ignore_patterns: default_ignore_patterns(),
            size_cap_bytes: default_size_cap_bytes(),
            chunk_size: default_chunk_size(),
            parse_queue_depth: default_parse_queue_depth(),
            project_root: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            rrf_k: default_rrf_k(),
            default_top_k: default_top_k(),
            bm25_k1: default_bm25_k1(),
            bm25_b: default_bm25_b(),
            span_padding: default_span_padding(),
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            backup: true,
            run_syntax_check: true,
            preserve_indentation: true,
            vector_tombstone_threshold: default_tombstone_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    let mut langs = HashMap::new();
    for (key, exts) in [
        ("python", vec!["py", "pyi"]),
        ("typescript", vec!["ts", "tsx", "mts", "cts"]),
        ("javascript", vec!["js", "jsx", "mjs", "cjs"]),
        ("go", vec!["go"]),
    ] {
        langs.insert(
            key.to_string(),
            LanguageConfig {
                enabled: true,
                extensions: exts.into_iter().map(String::from).collect(),
            },
        );
    }
    langs
}

impl Settings {
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from_dir(&std::env::current_dir().unwrap_or_default())
    }

    pub fn load_from_dir(root: &std::path::Path) -> Result<Self, figment::Error> {
        let config_path = root.join(".cerberus").join("settings.toml");
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("CERBERUS_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CERBERUS_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn is_language_enabled(&self, language: crate::types::Language) -> bool {
        self.languages
            .get(language.tag())
            .map(|cfg| cfg.enabled)
            .unwrap_or(true)
    }
}
