//! Configuration for a translation session.
//!
//! Everything the session needs to talk to one backend lives in
//! [`ClientConfig`], built via its [`ClientConfigBuilder`]: where the
//! backend is, how patiently to poll, how long requests may take, and which
//! target languages may be requested. Keeping every knob in one struct makes
//! it trivial to share configs across tasks and to log two runs and diff
//! their behaviour.
//!
//! # Design choice: builder over constructor
//! Setters clamp values that have a sane floor (a zero-second poll interval
//! is never what anyone meant); [`ClientConfigBuilder::build`] validates the
//! rest and returns [`TranslateError::InvalidConfig`] with a readable reason.

use std::fmt;
use std::time::Duration;

use crate::error::TranslateError;
use crate::progress::ProgressCallback;

/// Configuration for a translation session.
///
/// Built via [`ClientConfig::builder()`] or using
/// [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use pdftrans::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://translator.lab:1234")
///     .poll_interval_secs(2)
///     .max_poll_attempts(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://translator.lab:1234");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend base URL, stored without a trailing slash.
    /// Default: `http://127.0.0.1:1234` — the port the backend binds when
    /// started bare.
    pub base_url: String,

    /// Delay between status queries. Default: 5 s, the cadence the backend
    /// was designed around; polling faster just burns requests while the
    /// job grinds through its LLM calls.
    pub poll_interval: Duration,

    /// Maximum status queries before giving up with
    /// [`TranslateError::PollExhausted`]. Default: 120, i.e. ten minutes at
    /// the default interval. A budget keeps a wedged backend from hanging
    /// callers forever.
    pub max_poll_attempts: u32,

    /// Timeout for control-plane requests (upload, validate, submit,
    /// status). Default: 30 s.
    pub request_timeout_secs: u64,

    /// Timeout for artifact and archive downloads, which can run to
    /// megabytes. Default: 120 s.
    pub download_timeout_secs: u64,

    /// Target-language codes the session accepts for submission.
    /// Default: the set the backend's own UI offers —
    /// `zh`, `en`, `fr`, `de`, `ja`, `es`.
    pub offered_languages: Vec<String>,

    /// Optional observer for lifecycle events. Default: `None`.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1234".to_string(),
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 120,
            request_timeout_secs: 30,
            download_timeout_secs: 120,
            offered_languages: ["zh", "en", "fr", "de", "ja", "es"]
                .into_iter()
                .map(String::from)
                .collect(),
            progress_callback: None,
        }
    }
}

// Manual Debug: the callback is not Debug, and dumping it would be noise
// anyway.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("offered_languages", &self.offered_languages)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn TranslationProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Start building a config from the defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: ClientConfig::default(),
        }
    }

    /// Whether `language` is in the offered set (exact match on the code).
    pub fn offers_language(&self, language: &str) -> bool {
        self.offered_languages.iter().any(|l| l == language)
    }

    /// The offered codes joined for display in error messages.
    pub fn offered_languages_display(&self) -> String {
        self.offered_languages.join(", ")
    }
}

/// Fluent builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Backend base URL. A trailing slash is stripped at `build` time.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Seconds between status queries. Floored at 1.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval = Duration::from_secs(secs.max(1));
        self
    }

    /// Maximum number of status queries. Floored at 1 — the first query
    /// always happens.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = attempts.max(1);
        self
    }

    /// Control-plane request timeout in seconds. Floored at 1.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    /// Artifact/archive download timeout in seconds. Floored at 1.
    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    /// Replace the offered target-language set.
    pub fn offered_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.offered_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a progress observer.
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Validate and produce the final config.
    pub fn build(mut self) -> Result<ClientConfig, TranslateError> {
        let url = self.config.base_url.trim();
        if url.is_empty() {
            return Err(TranslateError::InvalidConfig(
                "base_url must not be empty".to_string(),
            ));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TranslateError::InvalidConfig(format!(
                "base_url must start with http:// or https:// (got '{url}')"
            )));
        }
        self.config.base_url = url.trim_end_matches('/').to_string();

        if self.config.offered_languages.is_empty() {
            return Err(TranslateError::InvalidConfig(
                "offered_languages must contain at least one language code".to_string(),
            ));
        }
        if let Some(bad) = self
            .config
            .offered_languages
            .iter()
            .find(|l| l.trim().is_empty())
        {
            return Err(TranslateError::InvalidConfig(format!(
                "offered_languages contains a blank code ({bad:?})"
            )));
        }

        Ok(self.config)
    }
}
