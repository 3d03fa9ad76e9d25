//! Store-backed credential registry with random and pinned selection
//!
//! Enumeration is a two-phase read: list the `token:` keys, then fetch each
//! record's `tenant_url`. The phases are not atomic, so a concurrent delete
//! can remove a key between them. Such keys are skipped rather than failing
//! the whole call; listings and picks are best-effort snapshots. If stronger
//! consistency is ever needed, the enumerate+fetch sequence belongs in a
//! store-side script, not in an in-process lock.

use std::sync::Arc;

use common::fingerprint;
use kv_store::KvStore;
use rand::RngExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Key namespace for credential records: `token:<token>`.
pub const CREDENTIAL_KEY_PREFIX: &str = "token:";

/// Hash field holding a credential's tenant endpoint.
pub const TENANT_URL_FIELD: &str = "tenant_url";

/// Plain key holding the pinned credential's token. Never expires.
pub const ACTIVE_CREDENTIAL_KEY: &str = "current_token";

/// An upstream token and the tenant endpoint it authenticates against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub token: String,
    pub tenant_url: String,
}

/// Registry of upstream credentials backed by the key-value store.
pub struct CredentialPool {
    store: Arc<dyn KvStore>,
}

impl CredentialPool {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        info!(store = store.id(), "credential pool initialized");
        Self { store }
    }

    /// Add a credential, or replace the tenant URL of an existing one.
    pub async fn register(&self, token: &str, tenant_url: &str) -> Result<()> {
        if token.is_empty() {
            return Err(Error::MissingToken);
        }
        self.store
            .hset(&credential_key(token), TENANT_URL_FIELD, tenant_url, None)
            .await?;
        info!(credential = %fingerprint(token), tenant_url, "credential registered");
        Ok(())
    }

    /// All registered credentials, sorted by token.
    ///
    /// Fails only if the key enumeration itself fails. Records whose
    /// `tenant_url` cannot be read are skipped; an empty pool is an empty list.
    pub async fn list(&self) -> Result<Vec<Credential>> {
        let keys = self.store.keys_with_prefix(CREDENTIAL_KEY_PREFIX).await?;

        let mut credentials = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(credential) = self.fetch(key).await {
                credentials.push(credential);
            }
        }
        credentials.sort_by(|a, b| a.token.cmp(&b.token));

        debug!(
            keys = keys.len(),
            listed = credentials.len(),
            "listed credentials"
        );
        Ok(credentials)
    }

    /// A uniformly random registered credential.
    ///
    /// Returns `None` when the pool is empty, when enumeration fails, or when
    /// the chosen record cannot be read. A failed read is not retried against
    /// another key; callers may simply ask again.
    pub async fn pick_random(&self) -> Option<Credential> {
        let keys = match self.store.keys_with_prefix(CREDENTIAL_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "credential enumeration failed");
                return None;
            }
        };
        if keys.is_empty() {
            debug!("credential pool is empty");
            return None;
        }

        // Load spreading only; predictability of the choice does not matter
        let index = rand::rng().random_range(0..keys.len());
        self.fetch(&keys[index]).await
    }

    /// Remove a credential. Absent credentials report `NotFound`.
    ///
    /// Does not touch the pinned pointer; `select()` falls back to a random
    /// pick if the pinned credential is gone.
    pub async fn delete(&self, token: &str) -> Result<()> {
        let key = self.existing_key(token).await?;
        self.store.delete(&key).await?;
        info!(credential = %fingerprint(token), "credential deleted");
        Ok(())
    }

    /// Make `token` the default credential. Absent credentials report `NotFound`.
    ///
    /// Concurrent pins race; the last write wins.
    pub async fn pin(&self, token: &str) -> Result<()> {
        self.existing_key(token).await?;
        self.store.set(ACTIVE_CREDENTIAL_KEY, token, None).await?;
        info!(credential = %fingerprint(token), "credential pinned");
        Ok(())
    }

    /// Token of the pinned credential, if any.
    pub async fn active(&self) -> Result<Option<String>> {
        Ok(self.store.get(ACTIVE_CREDENTIAL_KEY).await?)
    }

    /// Credential a proxying caller should use for its next upstream call.
    ///
    /// The pinned credential when one is set and still registered, otherwise
    /// a random pick.
    pub async fn select(&self) -> Option<Credential> {
        match self.active().await {
            Ok(Some(token)) => {
                if let Some(credential) = self.fetch(&credential_key(&token)).await {
                    return Some(credential);
                }
                warn!(
                    credential = %fingerprint(&token),
                    "pinned credential is no longer registered, picking at random"
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to read pinned credential, picking at random");
            }
        }
        self.pick_random().await
    }

    /// Number of registered credentials.
    pub async fn len(&self) -> Result<usize> {
        Ok(self
            .store
            .keys_with_prefix(CREDENTIAL_KEY_PREFIX)
            .await?
            .len())
    }

    /// Whether no credentials are registered.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Validate `token` and confirm its record exists, returning the record key.
    async fn existing_key(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Err(Error::MissingToken);
        }
        let key = credential_key(token);
        if !self.store.exists(&key).await? {
            return Err(Error::NotFound(fingerprint(token)));
        }
        Ok(key)
    }

    /// Read one record. `None` if it vanished or cannot be read.
    async fn fetch(&self, key: &str) -> Option<Credential> {
        let token = key.strip_prefix(CREDENTIAL_KEY_PREFIX)?;
        match self.store.hget(key, TENANT_URL_FIELD).await {
            Ok(Some(tenant_url)) => Some(Credential {
                token: token.to_string(),
                tenant_url,
            }),
            Ok(None) => {
                debug!(credential = %fingerprint(token), "credential vanished during read");
                None
            }
            Err(e) => {
                warn!(credential = %fingerprint(token), error = %e, "skipping unreadable credential");
                None
            }
        }
    }
}

fn credential_key(token: &str) -> String {
    format!("{CREDENTIAL_KEY_PREFIX}{token}")
}
