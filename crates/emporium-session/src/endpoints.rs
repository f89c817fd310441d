use url::Url;

/// Where the session endpoints live, plus the login page used for redirects.
#[derive(Debug, Clone)]
pub struct SessionEndpoints {
    pub validate: Url,
    pub refresh: Url,
    pub logout: Url,
    pub login: Url,
    pub login_page: String,
}

impl SessionEndpoints {
    /// Default paths under `base`.
    pub fn from_base(base: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            validate: base.join("/api/auth/validate")?,
            refresh: base.join("/api/auth/refresh")?,
            logout: base.join("/api/auth/logout")?,
            login: base.join("/api/auth/login")?,
            login_page: "/login".to_string(),
        })
    }
}
