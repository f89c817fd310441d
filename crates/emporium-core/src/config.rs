//! Console configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use emporium_catalog::CatalogEndpoints;
use emporium_session::SessionEndpoints;

use crate::error::CoreError;
use crate::Result;

pub const ENV_API_URL: &str = "EMPORIUM_API_URL";
pub const ENV_LOGIN_PAGE: &str = "EMPORIUM_LOGIN_PAGE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EMPORIUM_REQUEST_TIMEOUT_SECS";

/// Same-origin API during local development
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Root every endpoint path is resolved against
    pub api_base_url: Url,
    /// Where the user is sent when the session cannot be recovered
    pub login_page: String,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub endpoints: EndpointPaths,
}

/// Endpoint paths relative to `api_base_url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointPaths {
    pub validate: String,
    pub refresh: String,
    pub logout: String,
    pub login: String,
    /// Product list, product by id (`/{id}`) and product creation
    pub products: String,
    /// Variant update and delete (`/{id}`), image upload (`/{id}/images`)
    pub variants: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            validate: "/api/auth/validate".to_string(),
            refresh: "/api/auth/refresh".to_string(),
            logout: "/api/auth/logout".to_string(),
            login: "/api/auth/login".to_string(),
            products: "/api/products".to_string(),
            variants: "/api/variants".to_string(),
        }
    }
}

impl Config {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            login_page: "/login".to_string(),
            request_timeout_secs: 30,
            endpoints: EndpointPaths::default(),
        }
    }

    /// Defaults overridden by `EMPORIUM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = Url::parse(api_base_url.trim())
            .map_err(|e| CoreError::Config(format!("{ENV_API_URL}: {e}")))?;
        let mut config = Self::new(api_base_url);

        if let Some(raw) = lookup(ENV_LOGIN_PAGE) {
            let page = raw.trim();
            if page.is_empty() {
                return Err(CoreError::Config(format!("{ENV_LOGIN_PAGE} is empty")));
            }
            config.login_page = page.to_string();
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(CoreError::Config(format!(
                        "{ENV_REQUEST_TIMEOUT_SECS}: expected a positive number of seconds, got {raw:?}"
                    )))
                }
            };
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_endpoints(&self) -> Result<SessionEndpoints> {
        let base = &self.api_base_url;
        Ok(SessionEndpoints {
            validate: join(base, &self.endpoints.validate)?,
            refresh: join(base, &self.endpoints.refresh)?,
            logout: join(base, &self.endpoints.logout)?,
            login: join(base, &self.endpoints.login)?,
            login_page: self.login_page.clone(),
        })
    }

    pub fn catalog_endpoints(&self) -> Result<CatalogEndpoints> {
        CatalogEndpoints::new(
            &self.api_base_url,
            &self.endpoints.products,
            &self.endpoints.variants,
        )
        .map_err(|e| CoreError::Config(format!("catalog endpoints: {e}")))
    }
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| CoreError::Config(format!("endpoint {path:?}: {e}")))
}
