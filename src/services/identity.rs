use std::sync::Arc;

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{Store, StoreTx};
use crate::errors::{AppError, AppResult};
use crate::models::{Identity, NewIdentity, Role};

pub const UNSPECIFIED_GENDER: &str = "unspecified";

/// Maps the contact details on a booking to a customer identity, creating
/// one the first time they are seen.
///
/// Provisioned identities get the hash of a random passphrase that is never
/// shown to anyone, and are flagged for password setup. Login stays closed
/// until the customer claims the account.
#[derive(Clone)]
pub struct IdentityResolver {
    hasher: Argon2<'static>,
}

impl IdentityResolver {
    pub fn new(params: Params) -> Self {
        Self {
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let params = Params::new(config.argon2_memory_kib, config.argon2_iterations, 1, None)
            .map_err(|e| AppError::Config(format!("invalid argon2 parameters: {e}")))?;
        Ok(Self::new(params))
    }

    /// Hashes a credential for a contact that has no identity yet.
    ///
    /// Runs outside any transaction so the hash never holds the store lock.
    /// Returns `None` when the contact is already known.
    pub fn prepare(&self, store: &Arc<dyn Store>, email: &str, phone: &str) -> AppResult<Option<String>> {
        if store
            .atomically(|tx| tx.find_identity_by_contact(email, phone))?
            .is_some()
        {
            return Ok(None);
        }
        self.unclaimed_credential().map(Some)
    }

    /// Finds or provisions the identity for a contact. `credential` comes from
    /// [`IdentityResolver::prepare`].
    pub fn resolve(
        &self,
        tx: &mut dyn StoreTx,
        email: &str,
        phone: &str,
        display_name: &str,
        credential: Option<&str>,
    ) -> AppResult<Identity> {
        if let Some(existing) = tx.find_identity_by_contact(email, phone)? {
            tracing::debug!(identity_id = existing.id, "resolved existing identity");
            return Ok(existing);
        }

        // identities are never deleted, so a contact seen by `prepare` is still here
        let password_hash = credential
            .ok_or_else(|| AppError::Internal(anyhow!("no prepared credential for new contact")))?
            .to_string();

        let identity = tx.insert_identity(&NewIdentity {
            name: display_name.to_string(),
            email: email.to_string(),
            mobile: phone.to_string(),
            password_hash,
            gender: UNSPECIFIED_GENDER.to_string(),
            role: Role::User,
            password_setup_required: true,
        })?;

        tracing::info!(identity_id = identity.id, "provisioned identity from booking");
        Ok(identity)
    }

    fn unclaimed_credential(&self) -> AppResult<String> {
        let passphrase = Uuid::new_v4().to_string();
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher
            .hash_password(passphrase.as_bytes(), &salt)
            .map_err(|e| AppError::Credential(e.to_string()))?;
        Ok(hash.to_string())
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(Params::DEFAULT)
    }
}
