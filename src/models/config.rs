use crate::lifecycle::InactivityConfig;
use crate::middleware::RateLimitConfig;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth_provider: AuthProviderConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub inactivity: InactivitySettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Which auth backend the OTP routes forward to
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthProviderConfig {
    /// Hosted BaaS auth service
    Hosted(HostedProviderConfig),
    /// In-process provider for local development
    Memory(MemoryProviderConfig),
}

impl Default for AuthProviderConfig {
    fn default() -> Self {
        AuthProviderConfig::Memory(MemoryProviderConfig::default())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedProviderConfig {
    /// Project URL, e.g. https://xyz.example.co
    pub url: String,
    /// Public anon key sent as `apikey`
    pub anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryProviderConfig {
    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: i64,
}

impl Default for MemoryProviderConfig {
    fn default() -> Self {
        Self {
            otp_ttl_secs: default_otp_ttl_secs(),
        }
    }
}

fn default_otp_ttl_secs() -> i64 {
    300
}

/// Client inactivity lock settings, served at /api/config/inactivity
#[derive(Debug, Clone, Deserialize)]
pub struct InactivitySettings {
    #[serde(default = "default_lock_after_secs")]
    pub lock_after_secs: u64,
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for InactivitySettings {
    fn default() -> Self {
        Self {
            lock_after_secs: default_lock_after_secs(),
            login_route: default_login_route(),
        }
    }
}

fn default_lock_after_secs() -> u64 {
    15 * 60
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl From<&InactivitySettings> for InactivityConfig {
    fn from(settings: &InactivitySettings) -> Self {
        Self {
            lock_after: Duration::from_secs(settings.lock_after_secs),
            login_route: settings.login_route.clone(),
            ..InactivityConfig::default()
        }
    }
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be greater than zero".to_string());
        }

        match &self.auth_provider {
            AuthProviderConfig::Hosted(hosted) => {
                if !(hosted.url.starts_with("http://") || hosted.url.starts_with("https://")) {
                    return Err(format!(
                        "auth_provider.url must be an http(s) URL, got '{}'",
                        hosted.url
                    ));
                }
                if hosted.anon_key.trim().is_empty() {
                    return Err("auth_provider.anon_key must not be empty".to_string());
                }
                if hosted.timeout_secs == 0 {
                    return Err("auth_provider.timeout_secs must be greater than zero".to_string());
                }
            }
            AuthProviderConfig::Memory(memory) => {
                if memory.otp_ttl_secs <= 0 {
                    return Err("auth_provider.otp_ttl_secs must be positive".to_string());
                }
            }
        }

        self.rate_limit.validate()?;

        if self.inactivity.lock_after_secs == 0 {
            return Err("inactivity.lock_after_secs must be greater than zero".to_string());
        }
        if !self.inactivity.login_route.starts_with('/') {
            return Err("inactivity.login_route must start with '/'".to_string());
        }

        Ok(())
    }

    /// Apply overrides from `JOINQ_*` variables, looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("JOINQ_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("JOINQ_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| format!("Invalid JOINQ_PORT '{}': {}", port, e))?;
        }

        match (lookup("JOINQ_BAAS_URL"), lookup("JOINQ_BAAS_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                let timeout_secs = match &self.auth_provider {
                    AuthProviderConfig::Hosted(hosted) => hosted.timeout_secs,
                    AuthProviderConfig::Memory(_) => default_timeout_secs(),
                };
                self.auth_provider = AuthProviderConfig::Hosted(HostedProviderConfig {
                    url,
                    anon_key,
                    timeout_secs,
                });
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(
                    "JOINQ_BAAS_URL and JOINQ_BAAS_ANON_KEY must be set together".to_string(),
                );
            }
            (None, None) => {}
        }

        Ok(())
    }
}
