//! Configuration for the review pipeline and its HTTP server.
//!
//! Everything the pipeline needs from the outside world (credentials, bucket
//! identity, deadlines, page template inputs) lives in one [`ReviewConfig`],
//! built either through [`ReviewConfig::builder`] or read once from the
//! process environment by [`ReviewConfig::from_env`]. Components receive the
//! section they need at construction time and never read the environment
//! themselves, so a missing credential fails at startup rather than halfway
//! through a request.

use crate::error::ReviewError;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Storage prefix under which every rendered report is written.
pub const ARTIFACT_PREFIX: &str = "annotated_contracts/";

/// Complete configuration for a pipeline instance.
///
/// # Example
/// ```rust
/// use contract_review::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .llm_api_key("sk-test")
///     .bucket("reports")
///     .storage_credentials("AKIA...", "secret")
///     .build()
///     .unwrap();
/// assert_eq!(config.storage.url_ttl_secs, 3600);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReviewConfig {
    pub llm: LlmSettings,
    pub fetch: FetchSettings,
    pub render: RenderSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,

    /// Explicit path to libpdfium. When `None` the system library is bound.
    pub pdfium_library_path: Option<PathBuf>,
}

/// Language-model settings.
#[derive(Clone)]
pub struct LlmSettings {
    /// Provider name understood by `edgequake_llm::ProviderFactory`.
    pub provider: String,
    pub model: String,
    /// Credential for the provider. Required for every provider but `ollama`.
    pub api_key: Option<String>,
    /// Sampling temperature. Default: 0.2.
    ///
    /// The report should be stable across runs on the same contract; a low
    /// temperature keeps quotations verbatim.
    pub temperature: f32,
    pub max_tokens: usize,
    /// Deadline for the whole completion call. Default: 120.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    /// Name of the environment variable holding the provider's credential,
    /// or `None` for providers that run without one.
    pub fn credential_var(provider: &str) -> Option<&'static str> {
        match provider {
            "openai" => Some("OPENAI_API_KEY"),
            "anthropic" => Some("ANTHROPIC_API_KEY"),
            "gemini" => Some("GEMINI_API_KEY"),
            "mistral" => Some("MISTRAL_API_KEY"),
            "openrouter" => Some("OPENROUTER_API_KEY"),
            "ollama" | "lmstudio" => None,
            _ => Some("LLM_API_KEY"),
        }
    }

    /// Whether this provider needs a credential at all.
    pub fn requires_credential(&self) -> bool {
        Self::credential_var(&self.provider).is_some()
    }
}

/// Source-download settings.
#[derive(Clone, Debug)]
pub struct FetchSettings {
    /// Whole-request deadline. Default: 60.
    pub timeout_secs: u64,
    /// Largest accepted body. Default: 10 MiB, the upload ceiling.
    pub max_bytes: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Report-template and headless-browser settings.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    /// Chromium executable. When `None` the browser is auto-detected.
    pub chrome_path: Option<PathBuf>,
    /// Absolute URL of the logo shown in the report header.
    pub logo_url: Option<String>,
    /// Title shown in the header when no logo is configured.
    pub title: String,
    /// Per-tab deadline for load and print. Default: 60.
    pub timeout_secs: u64,
    /// Browsers allowed to run at once. Default: 2.
    pub max_concurrent: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            logo_url: None,
            title: "Contract Protect".to_string(),
            timeout_secs: 60,
            max_concurrent: 2,
        }
    }
}

/// Object-store settings.
#[derive(Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// Endpoint for S3-compatible stores (MinIO, R2). `None` means AWS.
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Lifetime of each signed URL. Default: 3600.
    pub url_ttl_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: String::new(),
            secret_key: String::new(),
            url_ttl_secs: 3600,
        }
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("url_ttl_secs", &self.url_ttl_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<missing>"
    } else {
        "<redacted>"
    }
}

impl StorageSettings {
    /// Check bucket identity and credentials.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.bucket.trim().is_empty() {
            return Err(ReviewError::Configuration(
                "storage bucket is not set (S3_BUCKET)".into(),
            ));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ReviewError::Configuration(
                "storage credentials are not set (S3_ACCESS_KEY / S3_SECRET_KEY)".into(),
            ));
        }
        if self.url_ttl_secs == 0 {
            return Err(ReviewError::Configuration(
                "signed URL lifetime must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ReviewConfig {
    /// Create a new builder seeded with defaults.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read the configuration from the process environment and validate it.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `LLM_PROVIDER`, `LLM_MODEL` | provider / model |
    /// | `OPENAI_API_KEY` (or the provider's key variable) | credential |
    /// | `LLM_TIMEOUT_SECS` | completion deadline |
    /// | `FETCH_TIMEOUT_SECS`, `FETCH_MAX_BYTES` | download limits |
    /// | `CHROME_PATH`, `REPORT_LOGO_URL`, `REPORT_TITLE` | renderer |
    /// | `RENDER_TIMEOUT_SECS`, `RENDER_MAX_CONCURRENT` | renderer limits |
    /// | `S3_BUCKET`, `S3_REGION`, `S3_ENDPOINT` | store identity |
    /// | `S3_ACCESS_KEY`, `S3_SECRET_KEY` | store credentials |
    /// | `SIGNED_URL_TTL_SECS` | URL lifetime |
    /// | `SERVER_HOST`, `SERVER_PORT` | listener |
    /// | `PDFIUM_LIB_PATH` | libpdfium location |
    pub fn from_env() -> Result<Self, ReviewError> {
        let mut b = Self::builder();

        if let Ok(provider) = env::var("LLM_PROVIDER") {
            b = b.llm_provider(provider);
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            b = b.llm_model(model);
        }
        if let Some(var) = LlmSettings::credential_var(&b.config.llm.provider) {
            if let Some(key) = non_empty_var(var) {
                b = b.llm_api_key(key);
            }
        }
        if let Some(secs) = parsed_var("LLM_TIMEOUT_SECS")? {
            b = b.llm_timeout_secs(secs);
        }
        if let Some(secs) = parsed_var("FETCH_TIMEOUT_SECS")? {
            b = b.fetch_timeout_secs(secs);
        }
        if let Some(bytes) = parsed_var("FETCH_MAX_BYTES")? {
            b = b.fetch_max_bytes(bytes);
        }
        if let Some(path) = non_empty_var("CHROME_PATH") {
            b = b.chrome_path(path);
        }
        if let Some(url) = non_empty_var("REPORT_LOGO_URL") {
            b = b.logo_url(url);
        }
        if let Some(title) = non_empty_var("REPORT_TITLE") {
            b = b.report_title(title);
        }
        if let Some(secs) = parsed_var("RENDER_TIMEOUT_SECS")? {
            b = b.render_timeout_secs(secs);
        }
        if let Some(n) = parsed_var("RENDER_MAX_CONCURRENT")? {
            b = b.max_concurrent_renders(n);
        }
        if let Some(bucket) = non_empty_var("S3_BUCKET") {
            b = b.bucket(bucket);
        }
        if let Some(region) = non_empty_var("S3_REGION") {
            b = b.region(region);
        }
        if let Some(endpoint) = non_empty_var("S3_ENDPOINT") {
            b = b.storage_endpoint(endpoint);
        }
        b = b.storage_credentials(
            non_empty_var("S3_ACCESS_KEY").unwrap_or_default(),
            non_empty_var("S3_SECRET_KEY").unwrap_or_default(),
        );
        if let Some(ttl) = parsed_var("SIGNED_URL_TTL_SECS")? {
            b = b.url_ttl_secs(ttl);
        }
        if let Some(host) = non_empty_var("SERVER_HOST") {
            b = b.host(host);
        }
        if let Some(port) = parsed_var("SERVER_PORT")? {
            b = b.port(port);
        }
        if let Some(path) = non_empty_var("PDFIUM_LIB_PATH") {
            b = b.pdfium_library_path(path);
        }

        b.build()
    }

    /// Check every constraint the pipeline relies on.
    pub fn validate(&self) -> Result<(), ReviewError> {
        if self.llm.provider.trim().is_empty() {
            return Err(ReviewError::Configuration("LLM provider is empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ReviewError::Configuration("LLM model is empty".into()));
        }
        if self.llm.requires_credential()
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            let var = LlmSettings::credential_var(&self.llm.provider).unwrap_or("LLM_API_KEY");
            return Err(ReviewError::Configuration(format!(
                "no credential for LLM provider '{}' (set {var})",
                self.llm.provider
            )));
        }
        if self.llm.timeout_secs == 0 || self.fetch.timeout_secs == 0 {
            return Err(ReviewError::Configuration(
                "fetch and LLM deadlines must be > 0".into(),
            ));
        }
        if self.render.max_concurrent == 0 {
            return Err(ReviewError::Configuration(
                "max concurrent renders must be ≥ 1".into(),
            ));
        }
        self.storage.validate()
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn llm_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.llm.provider = provider.into();
        self
    }

    pub fn llm_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.llm.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.llm.max_tokens = n;
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm.timeout_secs = secs;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch.timeout_secs = secs;
        self
    }

    pub fn fetch_max_bytes(mut self, bytes: u64) -> Self {
        self.config.fetch.max_bytes = bytes;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.render.chrome_path = Some(path.into());
        self
    }

    pub fn logo_url(mut self, url: impl Into<String>) -> Self {
        self.config.render.logo_url = Some(url.into());
        self
    }

    pub fn report_title(mut self, title: impl Into<String>) -> Self {
        self.config.render.title = title.into();
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render.timeout_secs = secs;
        self
    }

    pub fn max_concurrent_renders(mut self, n: usize) -> Self {
        self.config.render.max_concurrent = n;
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.storage.bucket = bucket.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.storage.region = region.into();
        self
    }

    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = Some(endpoint.into());
        self
    }

    pub fn storage_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.config.storage.access_key = access_key.into();
        self.config.storage.secret_key = secret_key.into();
        self
    }

    pub fn url_ttl_secs(mut self, secs: u64) -> Self {
        self.config.storage.url_ttl_secs = secs;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ReviewError> {
    match non_empty_var(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ReviewError::Configuration(format!("{name} has an invalid value: '{raw}'"))
        }),
    }
}
