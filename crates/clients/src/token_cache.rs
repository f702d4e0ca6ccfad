//! TTL'd cache for messaging access tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::MessagingCredentials;
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::messaging::{AccessToken, MessagingClient};

/// Service-account tokens live for an hour on the server side; refreshing
/// after 50 minutes keeps a cached token from expiring mid-operation.
const DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// Thread-safe get-or-login cache for messaging access tokens, keyed by
/// login username.
///
/// Refresh-on-expiry is not mutually exclusive: two tasks hitting an
/// expired entry at once both log in, and the later write wins. Logins are
/// idempotent and cheap, so the duplicate is accepted.
#[derive(Debug, Clone)]
pub struct TokenCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, (AccessToken, Instant)>>>,
}

impl TokenCache {
    /// Creates a cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a cache with the default 50-minute TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// Returns a cached token for the credentials, logging in if the cache
    /// has none or the cached one has expired.
    pub async fn token<M: MessagingClient + ?Sized>(
        &self,
        client: &M,
        credentials: &MessagingCredentials,
    ) -> Result<AccessToken, ClientError> {
        let username = credentials.username();

        {
            let entries = self.entries.read().await;
            if let Some((token, deadline)) = entries.get(username)
                && Instant::now() < *deadline
            {
                return Ok(token.clone());
            }
        }

        tracing::debug!(username, "token cache miss, logging in");
        let token = client.login(username, credentials.password()).await?;
        let deadline = Instant::now() + self.ttl;
        self.entries
            .write()
            .await
            .insert(username.to_string(), (token.clone(), deadline));

        Ok(token)
    }

    /// Drops the cached token for a username, forcing a fresh login next
    /// time.
    pub async fn invalidate(&self, username: &str) {
        self.entries.write().await.remove(username);
    }

    /// Returns the number of cached entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryMessagingClient;

    #[tokio::test]
    async fn second_lookup_hits_cache() {
        let client = InMemoryMessagingClient::new();
        client.create_account("agency-1", "pw", "Agency").await.unwrap();

        let cache = TokenCache::with_default_ttl();
        let creds = MessagingCredentials::new("agency-1", "pw");

        let first = cache.token(&client, &creds).await.unwrap();
        let second = cache.token(&client, &creds).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.login_count(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_fresh_login() {
        let client = InMemoryMessagingClient::new();
        client.create_account("agency-1", "pw", "Agency").await.unwrap();

        let cache = TokenCache::new(Duration::ZERO);
        let creds = MessagingCredentials::new("agency-1", "pw");

        cache.token(&client, &creds).await.unwrap();
        cache.token(&client, &creds).await.unwrap();

        assert_eq!(client.login_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_relogin() {
        let client = InMemoryMessagingClient::new();
        client.create_account("agency-1", "pw", "Agency").await.unwrap();

        let cache = TokenCache::with_default_ttl();
        let creds = MessagingCredentials::new("agency-1", "pw");

        cache.token(&client, &creds).await.unwrap();
        cache.invalidate("agency-1").await;
        assert!(cache.is_empty().await);

        cache.token(&client, &creds).await.unwrap();
        assert_eq!(client.login_count(), 2);
    }

    #[tokio::test]
    async fn login_failure_propagates_and_is_not_cached() {
        let client = InMemoryMessagingClient::new();
        let cache = TokenCache::with_default_ttl();
        let creds = MessagingCredentials::new("nobody", "pw");

        let result = cache.token(&client, &creds).await;
        assert!(matches!(result, Err(ClientError::Unauthorized(_))));
        assert!(cache.is_empty().await);
    }
}
