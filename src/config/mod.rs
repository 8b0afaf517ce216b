//! Configuration management.
//!
//! Settings come from built-in defaults, an optional TOML file and
//! `PMC_FETCH_*` environment variables, in increasing order of precedence.
//! Nested keys use `__` as separator in the environment
//! (`PMC_FETCH_HTTP__TIMEOUT_SECS=15`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [http]
//! timeout_secs = 8
//! connect_timeout_secs = 5
//! user_agent = "Mozilla/5.0 ..."
//!
//! [downloads]
//! output_dir = "./articles"
//! max_file_size_mb = 100
//!
//! [resolution]
//! mode = "collect-all"
//! strategies = ["oa_service", "pmc_search", "doi_landing"]
//! batch_jobs = 1
//!
//! [endpoints]
//! oa_service = "https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi"
//! pmc_search = "https://www.ncbi.nlm.nih.gov/pmc/"
//! doi_resolver = "https://www.doi.org"
//! eutils = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils"
//!
//! [logging]
//! level = "warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::ResolutionMode;

pub use config::ConfigError;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "PMC_FETCH";

/// Config file name looked up in the working and user config directories
pub const CONFIG_FILE_NAME: &str = "pmc-fetch.toml";

/// Some publisher hosts reject non-browser clients outright.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub downloads: DownloadConfig,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    8
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum file size for downloads (in MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_file_size_mb: default_max_file_size(),
        }
    }
}

impl DownloadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb as u64 * 1024 * 1024
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_file_size() -> usize {
    100
}

/// Strategy chain settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub mode: ResolutionMode,

    /// Strategy ids in priority order
    #[serde(default = "default_strategies")]
    pub strategies: Vec<String>,

    /// Identifiers resolved concurrently in a batch
    #[serde(default = "default_batch_jobs")]
    pub batch_jobs: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::default(),
            strategies: default_strategies(),
            batch_jobs: default_batch_jobs(),
        }
    }
}

fn default_strategies() -> Vec<String> {
    ["oa_service", "pmc_search", "doi_landing"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_batch_jobs() -> usize {
    1
}

/// Upstream service base URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// PMC open-access lookup service
    #[serde(default = "default_oa_service")]
    pub oa_service: String,

    /// PMC search UI
    #[serde(default = "default_pmc_search")]
    pub pmc_search: String,

    #[serde(default = "default_doi_resolver")]
    pub doi_resolver: String,

    /// NCBI E-utilities base (esearch/efetch)
    #[serde(default = "default_eutils")]
    pub eutils: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            oa_service: default_oa_service(),
            pmc_search: default_pmc_search(),
            doi_resolver: default_doi_resolver(),
            eutils: default_eutils(),
        }
    }
}

impl EndpointsConfig {
    /// Point every endpoint at one host, keeping the default paths
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            oa_service: format!("{}/pmc/utils/oa/oa.fcgi", base),
            pmc_search: format!("{}/pmc/", base),
            doi_resolver: base.to_string(),
            eutils: format!("{}/entrez/eutils", base),
        }
    }
}

fn default_oa_service() -> String {
    "https://www.ncbi.nlm.nih.gov/pmc/utils/oa/oa.fcgi".to_string()
}

fn default_pmc_search() -> String {
    "https://www.ncbi.nlm.nih.gov/pmc/".to_string()
}

fn default_doi_resolver() -> String {
    "https://www.doi.org".to_string()
}

fn default_eutils() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from an optional file layered under the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("resolution.strategies"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Find a config file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("pmc-fetch").join("config.toml"))
        .filter(|path| path.is_file())
}
