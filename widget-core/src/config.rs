use std::time::Duration;

/// Tunables of the widget client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Origin of the ToledoIA API, without trailing slash.
    pub api_base: String,
    pub language: String,
    pub referrer_url: Option<String>,
    /// Delay before re-reading the message list after a send or upload.
    pub resync_delay: Duration,
    /// Message polling period while a session is active.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8080".to_string(),
            language: "pt-BR".to_string(),
            referrer_url: None,
            resync_delay: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language;
        }
        self
    }

    pub fn with_referrer(mut self, referrer_url: Option<String>) -> Self {
        self.referrer_url = referrer_url.filter(|r| !r.is_empty());
        self
    }
}
