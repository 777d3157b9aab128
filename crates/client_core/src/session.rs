//! Where the session token lives between requests.
//!
//! A deployment picks exactly one [`SessionStore`]: an in-memory slot that
//! dies with the process, a persistent key-value entry, or a cookie jar.

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use storage::KvStore;
use tokio::sync::RwLock;
use url::Url;

use crate::{
    error::ClientError,
    transport::{parse_base_url, SESSION_COOKIE_NAME},
};

pub const SESSION_TOKEN_KEY: &str = "jwt_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;
    async fn store(&self, token: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Which store a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStorageKind {
    Memory,
    #[default]
    Persistent,
    Cookie,
}

impl FromStr for SessionStorageKind {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "ephemeral" => Ok(SessionStorageKind::Memory),
            "persistent" | "local" | "sqlite" => Ok(SessionStorageKind::Persistent),
            "cookie" => Ok(SessionStorageKind::Cookie),
            other => Err(ClientError::Validation(format!(
                "unknown session storage '{other}'"
            ))),
        }
    }
}

impl fmt::Display for SessionStorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStorageKind::Memory => f.write_str("memory"),
            SessionStorageKind::Persistent => f.write_str("persistent"),
            SessionStorageKind::Cookie => f.write_str("cookie"),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.read().await.clone())
    }

    async fn store(&self, token: &str) -> Result<()> {
        *self.token.write().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.token.write().await.take();
        Ok(())
    }
}

pub struct PersistentSessionStore {
    kv: KvStore,
}

impl PersistentSessionStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Opens the database and checks it answers before any token is read.
    pub async fn open(database_url: &str) -> Result<Self> {
        let kv = KvStore::open(database_url).await?;
        kv.health_check().await?;
        Ok(Self::new(kv))
    }
}

#[async_trait]
impl SessionStore for PersistentSessionStore {
    async fn load(&self) -> Result<Option<String>> {
        self.kv.get(SESSION_TOKEN_KEY).await
    }

    async fn store(&self, token: &str) -> Result<()> {
        self.kv.set(SESSION_TOKEN_KEY, token).await
    }

    async fn clear(&self) -> Result<()> {
        self.kv.remove(SESSION_TOKEN_KEY).await?;
        Ok(())
    }
}

/// Keeps the token as a `token` cookie scoped to the API origin.
pub struct CookieSessionStore {
    jar: Arc<Jar>,
    url: Url,
}

impl CookieSessionStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_jar(Arc::new(Jar::default()), base_url)
    }

    pub fn with_jar(jar: Arc<Jar>, base_url: &str) -> Result<Self> {
        let url = parse_base_url(base_url).map_err(|err| anyhow!(err))?;
        Ok(Self { jar, url })
    }

    pub fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn load(&self) -> Result<Option<String>> {
        let Some(header) = self.jar.cookies(&self.url) else {
            return Ok(None);
        };
        let header = header
            .to_str()
            .map_err(|err| anyhow!("cookie header is not valid text: {err}"))?;
        Ok(find_cookie(header, SESSION_COOKIE_NAME).map(str::to_string))
    }

    async fn store(&self, token: &str) -> Result<()> {
        if token.contains([';', ',']) || token.chars().any(char::is_whitespace) {
            return Err(anyhow!("session token cannot be stored in a cookie"));
        }
        self.jar.add_cookie_str(
            &format!("{SESSION_COOKIE_NAME}={token}; Path=/; SameSite=Strict"),
            &self.url,
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.jar.add_cookie_str(
            &format!(
                "{SESSION_COOKIE_NAME}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
            ),
            &self.url,
        );
        Ok(())
    }
}

fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
