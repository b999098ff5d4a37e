//! Configuration types for wds-postgrades

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// API credentials for the integration system user
///
/// The same credentials are sent twice: as HTTP Basic auth and inside the
/// WS-Security `UsernameToken` header.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Integration username, without tenant suffix
    pub username: String,

    /// Integration password (sent as PasswordText, a limitation of the remote API)
    pub password: String,

    /// Suffix appended to the username to qualify it with the tenant (default: "@lsu14")
    #[serde(default = "default_username_suffix")]
    pub username_suffix: String,
}

impl CredentialsConfig {
    /// Fully qualified username as the remote system expects it
    pub fn qualified_username(&self) -> String {
        format!("{}{}", self.username, self.username_suffix)
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("username_suffix", &self.username_suffix)
            .finish()
    }
}

/// Where the SOAP service lives
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Scheme and host of the web-services gateway
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Tenant path segment (default: "lsu")
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Web service name (default: "Student_Records")
    #[serde(default = "default_service")]
    pub service: String,

    /// API version without the leading "v" (e.g., "44.0")
    pub api_version: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tenant: default_tenant(),
            service: default_service(),
            api_version: String::new(),
        }
    }
}

impl EndpointConfig {
    /// Version string as used in URLs and the `wd:version` attribute
    pub fn version_tag(&self) -> String {
        format!("v{}", self.api_version.trim_start_matches('v'))
    }

    /// Full service URL: `<base>/ccx/service/<tenant>/<service>/v<version>`
    pub fn service_url(&self) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| Error::config("base_url", format!("invalid base URL: {}", e)))?;
        let path = format!(
            "ccx/service/{}/{}/{}",
            self.tenant,
            self.service,
            self.version_tag()
        );
        base.join(&path)
            .map_err(|e| Error::config("base_url", format!("invalid service path: {}", e)))
    }
}

/// HTTP transport settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout (default: 30 seconds). Expiry is a transport error.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for [`GradeClient`](crate::client::GradeClient)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Integration credentials
    pub credentials: CredentialsConfig,

    /// Service location and API version
    pub endpoint: EndpointConfig,

    /// Transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Parse configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Check that every required setting is present and usable
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::config("username", "username must not be empty"));
        }
        if self.credentials.password.is_empty() {
            return Err(Error::config("password", "password must not be empty"));
        }
        if self.endpoint.api_version.trim_start_matches('v').trim().is_empty() {
            return Err(Error::config("api_version", "API version must not be empty"));
        }
        if self.http.timeout.is_zero() {
            return Err(Error::config("timeout", "timeout must be greater than zero"));
        }
        let url = self.endpoint.service_url()?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(Error::config(
                "base_url",
                format!("unsupported URL scheme '{}'", url.scheme()),
            ));
        }
        Ok(())
    }
}

fn default_username_suffix() -> String {
    "@lsu14".to_string()
}

fn default_base_url() -> String {
    "https://wd2-impl-services1.workday.com".to_string()
}

fn default_tenant() -> String {
    "lsu".to_string()
}

fn default_service() -> String {
    "Student_Records".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("wds-postgrades/", env!("CARGO_PKG_VERSION")).to_string()
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
