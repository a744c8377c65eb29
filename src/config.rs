use crate::error::{Result, TranscriptError};
use crate::llm::LLMConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the transcript pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP client settings shared by the network sources
    pub http: HttpConfig,

    /// Caption source settings
    pub sources: SourceConfig,

    /// Live-page DOM extraction settings
    pub dom: DomConfig,

    /// Parser tuning
    pub parsing: ParsingConfig,

    /// Summarization service settings
    pub llm: LLMConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Browser-like user agent sent with every request
    pub user_agent: String,

    /// Accept-Language header
    pub accept_language: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

/// One (language, format) pair tried against the caption endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionAttempt {
    pub lang: String,
    pub fmt: String,
}

impl CaptionAttempt {
    pub fn new(lang: &str, fmt: &str) -> Self {
        Self {
            lang: lang.to_string(),
            fmt: fmt.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Direct caption delivery endpoint
    pub timedtext_endpoint: String,

    /// Language/format combinations, tried in order
    pub caption_attempts: Vec<CaptionAttempt>,

    /// Delay between consecutive attempts within one source (milliseconds)
    pub attempt_delay_ms: u64,

    /// Phrase in a caption response meaning the video has no captions
    pub unavailable_marker: String,

    /// Watch page URL prefix; the video id is appended
    pub watch_url: String,

    /// Markers on the watch page meaning the video can't be played
    pub watch_page_unavailable_markers: Vec<String>,

    /// Format override appended to a caption track URL on the second attempt
    pub track_format_override: String,

    /// Internal transcript endpoint
    pub innertube_endpoint: String,

    /// Client name sent in the internal API context
    pub innertube_client_name: String,

    /// Client version sent in the internal API context
    pub innertube_client_version: String,
}

/// UI selectors for the live-page strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSelectors {
    /// One rendered transcript segment
    pub segment: String,
    /// Caption text inside a segment
    pub segment_text: String,
    /// Timestamp inside a segment
    pub segment_timestamp: String,
    /// Open transcript panel
    pub panel: String,
    /// Control that opens the transcript panel
    pub show_transcript_button: String,
    /// Language dropdown trigger inside the panel
    pub language_dropdown: String,
    /// Entries of the open language dropdown
    pub language_menu_item: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomConfig {
    /// Interval between polls for transcript elements (milliseconds)
    pub poll_interval_ms: u64,

    /// Maximum number of polls before giving up
    pub max_poll_attempts: u32,

    /// Time to wait for a UI transition such as a dropdown opening (milliseconds)
    pub ui_wait_timeout_ms: u64,

    /// Duration assigned to every DOM-derived segment (seconds)
    pub nominal_segment_duration: f64,

    /// Language entries to pick, in order of preference
    pub preferred_languages: Vec<String>,

    pub selectors: DomSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Slot length for cues recovered from malformed XML (seconds)
    pub fallback_slot_seconds: f64,

    /// Embedded page transcripts need strictly more segments than this
    pub embedded_min_segments: usize,

    /// Phrases that mark non-caption text in embedded page transcripts
    pub boilerplate_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive
    pub level: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timedtext_endpoint: "https://www.youtube.com/api/timedtext".to_string(),
            // Kept short to stay under upstream rate limits
            caption_attempts: vec![
                CaptionAttempt::new("en", "srv3"),
                CaptionAttempt::new("en", "vtt"),
                CaptionAttempt::new("en-US", "srv3"),
            ],
            attempt_delay_ms: 500,
            unavailable_marker: "Video unavailable".to_string(),
            watch_url: "https://www.youtube.com/watch?v=".to_string(),
            watch_page_unavailable_markers: vec![
                "Video unavailable".to_string(),
                "This video has been removed".to_string(),
                "This video is private".to_string(),
            ],
            track_format_override: "json3".to_string(),
            innertube_endpoint: "https://www.youtube.com/youtubei/v1/get_transcript".to_string(),
            innertube_client_name: "WEB".to_string(),
            innertube_client_version: "2.20240101.00.00".to_string(),
        }
    }
}

impl Default for DomSelectors {
    fn default() -> Self {
        Self {
            segment: "ytd-transcript-segment-renderer".to_string(),
            segment_text: ".segment-text".to_string(),
            segment_timestamp: ".segment-timestamp".to_string(),
            panel: "ytd-transcript-renderer".to_string(),
            show_transcript_button: "ytd-video-description-transcript-section-renderer button".to_string(),
            language_dropdown: "ytd-transcript-footer-renderer yt-sort-filter-sub-menu-renderer tp-yt-paper-button".to_string(),
            language_menu_item: "ytd-transcript-footer-renderer tp-yt-paper-listbox a".to_string(),
        }
    }
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_poll_attempts: 20,
            ui_wait_timeout_ms: 2000,
            nominal_segment_duration: 3.0,
            preferred_languages: vec!["English (auto-generated)".to_string(), "English".to_string()],
            selectors: DomSelectors::default(),
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            fallback_slot_seconds: 5.0,
            embedded_min_segments: 5,
            boilerplate_phrases: vec![
                "subscribe to".to_string(),
                "click the link".to_string(),
                "link in the description".to_string(),
                "sponsored by".to_string(),
                "sign in to".to_string(),
                "privacy policy".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A resolved configuration and where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the configuration was read from; `None` means defaults plus environment
    pub origin: Option<PathBuf>,
    /// Config files that existed but failed to parse
    pub rejected: Vec<String>,
}

impl LoadedConfig {
    /// Report the outcome through `tracing`
    pub fn log(&self) {
        for reason in &self.rejected {
            tracing::warn!("Failed to parse config file {}", reason);
        }
        match &self.origin {
            Some(path) => tracing::info!("📄 Loaded configuration from: {}", path.display()),
            None => tracing::debug!("No config file found, using defaults and environment"),
        }
    }
}

impl Config {
    /// Config file locations, in search order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut config_paths = vec![
            PathBuf::from("yt-digest.toml"),
            PathBuf::from("config/yt-digest.toml"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            config_paths.push(PathBuf::from(home).join(".config/yt-digest/config.toml"));
        }
        config_paths
    }

    /// Load configuration from the first config file found, else the environment
    pub fn load() -> Result<Self> {
        let loaded = Self::load_from(&Self::search_paths());
        loaded.log();
        Ok(loaded.config)
    }

    /// Resolve configuration from `paths` without logging, so callers can
    /// report the outcome once their subscriber is installed
    pub fn load_from(paths: &[PathBuf]) -> LoadedConfig {
        let mut rejected = Vec::new();

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config: config.with_env_overrides(),
                        origin: Some(path.clone()),
                        rejected,
                    };
                }
                Err(e) => rejected.push(format!("{}: {}", path.display(), e)),
            }
        }

        LoadedConfig {
            config: Self::from_env(),
            origin: None,
            rejected,
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            TranscriptError::Configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(api_key) = std::env::var("GROQ_API_KEY") {
            if !api_key.trim().is_empty() {
                self.llm.api_key = Some(api_key);
            }
        }

        if let Ok(api_key) = std::env::var("YT_DIGEST_API_KEY") {
            self.llm.api_key = Some(api_key);
        }

        if let Ok(model) = std::env::var("YT_DIGEST_MODEL") {
            self.llm.model = model;
        }

        if let Ok(timeout) = std::env::var("YT_DIGEST_TIMEOUT") {
            self.http.timeout_seconds = timeout.parse().unwrap_or(self.http.timeout_seconds);
        }

        if let Ok(delay) = std::env::var("YT_DIGEST_ATTEMPT_DELAY_MS") {
            self.sources.attempt_delay_ms = delay.parse().unwrap_or(self.sources.attempt_delay_ms);
        }

        if let Ok(log_level) = std::env::var("YT_DIGEST_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)
            .map_err(|e| TranscriptError::Configuration(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sources.caption_attempts.is_empty() {
            return Err(TranscriptError::Configuration(
                "caption_attempts must not be empty".to_string(),
            ));
        }

        if self.dom.max_poll_attempts == 0 {
            return Err(TranscriptError::Configuration(
                "max_poll_attempts must be greater than 0".to_string(),
            ));
        }

        if self.dom.nominal_segment_duration < 0.0 || self.parsing.fallback_slot_seconds < 0.0 {
            return Err(TranscriptError::Configuration(
                "synthetic segment durations must not be negative".to_string(),
            ));
        }

        if self.http.timeout_seconds == 0 {
            return Err(TranscriptError::Configuration(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        let attempts = self
            .sources
            .caption_attempts
            .iter()
            .map(|a| format!("{}/{}", a.lang, a.fmt))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "yt-digest Configuration:\n\
            - Caption attempts: {}\n\
            - Attempt delay: {}ms\n\
            - HTTP timeout: {}s\n\
            - DOM polling: {} x {}ms\n\
            - Summarizer model: {}\n\
            - Summarizer key set: {}",
            attempts,
            self.sources.attempt_delay_ms,
            self.http.timeout_seconds,
            self.dom.max_poll_attempts,
            self.dom.poll_interval_ms,
            self.llm.model,
            self.llm.api_key.is_some()
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_attempt_delay_ms(mut self, delay: u64) -> Self {
        self.config.sources.attempt_delay_ms = delay;
        self
    }

    pub fn with_caption_attempts(mut self, attempts: Vec<CaptionAttempt>) -> Self {
        self.config.sources.caption_attempts = attempts;
        self
    }

    pub fn with_dom_polling(mut self, interval_ms: u64, max_attempts: u32) -> Self {
        self.config.dom.poll_interval_ms = interval_ms;
        self.config.dom.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_ui_wait_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.dom.ui_wait_timeout_ms = timeout;
        self
    }

    pub fn with_timeout_seconds(mut self, timeout: u64) -> Self {
        self.config.http.timeout_seconds = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_reports_origin_and_rejected_files() {
        let temp_dir = TempDir::new().unwrap();
        let broken = temp_dir.path().join("broken.toml");
        let good = temp_dir.path().join("good.toml");
        let missing = temp_dir.path().join("missing.toml");
        std::fs::write(&broken, "[sources\n").unwrap();
        std::fs::write(&good, "[dom]\nmax_poll_attempts = 7\n").unwrap();

        let loaded = Config::load_from(&[missing.clone(), broken.clone(), good.clone()]);
        assert_eq!(loaded.origin, Some(good));
        assert_eq!(loaded.config.dom.max_poll_attempts, 7);
        assert_eq!(loaded.rejected.len(), 1);
        assert!(loaded.rejected[0].contains("broken.toml"));

        let loaded = Config::load_from(&[missing]);
        assert_eq!(loaded.origin, None);
        assert!(loaded.rejected.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.caption_attempts.len(), 3);
        assert_eq!(config.sources.caption_attempts[0], CaptionAttempt::new("en", "srv3"));
        assert_eq!(config.sources.attempt_delay_ms, 500);
        assert_eq!(config.dom.max_poll_attempts, 20);
        assert_eq!(config.dom.nominal_segment_duration, 3.0);
        assert_eq!(config.parsing.fallback_slot_seconds, 5.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_attempt_delay_ms(0)
            .with_dom_polling(10, 3)
            .with_api_key("key".to_string())
            .build();

        assert_eq!(config.sources.attempt_delay_ms, 0);
        assert_eq!(config.dom.poll_interval_ms, 10);
        assert_eq!(config.dom.max_poll_attempts, 3);
        assert_eq!(config.llm.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_config_validation_rejects_empty_attempts() {
        let config = ConfigBuilder::new().with_caption_attempts(Vec::new()).build();
        assert!(matches!(config.validate(), Err(TranscriptError::Configuration(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("yt-digest.toml");
        std::fs::write(
            &path,
            "[sources]\nattempt_delay_ms = 0\n\n[dom]\nnominal_segment_duration = 4.0\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.sources.attempt_delay_ms, 0);
        assert_eq!(config.sources.caption_attempts.len(), 3);
        assert_eq!(config.dom.nominal_segment_duration, 4.0);
        assert_eq!(config.dom.max_poll_attempts, 20);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("saved.toml");

        let config = ConfigBuilder::new().with_timeout_seconds(7).build();
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded.http.timeout_seconds, 7);
        assert_eq!(reloaded.dom.selectors.segment, "ytd-transcript-segment-renderer");
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[sources\n").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(TranscriptError::Configuration(_))
        ));
    }
}
