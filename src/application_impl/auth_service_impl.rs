use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Issues, verifies, rotates and revokes paired access/refresh tokens.
///
/// A token is honored only while its session record exists in the store;
/// the record's TTL is the token's remaining lifetime at issuance. Access and
/// refresh tokens are signed with separate key pairs and their records point
/// at each other through `linked_id`.
pub struct SessionOrchestrator {
    directory: Arc<dyn DirectoryClient>,
    session_store: Arc<dyn SessionStore>,
    access_codec: Arc<dyn TokenCodec>,
    refresh_codec: Arc<dyn TokenCodec>,
    config: SessionConfig,
}

impl SessionOrchestrator {
    pub fn new(
        directory: Arc<dyn DirectoryClient>,
        session_store: Arc<dyn SessionStore>,
        access_codec: Arc<dyn TokenCodec>,
        refresh_codec: Arc<dyn TokenCodec>,
        config: SessionConfig,
    ) -> Self {
        Self {
            directory,
            session_store,
            access_codec,
            refresh_codec,
            config,
        }
    }

    /// Checks `password` against the directory entry of `username`.
    pub async fn authorize_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        // Most directories accept an empty password as an anonymous bind.
        if password.is_empty() {
            return Err(AuthError::unauthorized("password is required"));
        }

        let identity = self.resolve_subject(username).await?;

        self.directory
            .bind(&identity.dn, password)
            .await
            .map_err(|e| {
                debug!(user_id = %username, error = %e, "directory bind failed");
                AuthError::unauthorized(format!("authentication failed for {}", username))
            })?;

        Ok(identity)
    }

    /// Mints a token pair for an authenticated identity and records both halves.
    ///
    /// The two writes are independent; if the second fails the first record
    /// stays behind until its TTL runs out.
    pub async fn create_auth(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        if identity.dn.is_empty() {
            return Err(AuthError::unauthorized("authentication is not completed"));
        }

        let access = self.access_codec.create(self.config.access_ttl)?;
        let refresh = self.refresh_codec.create(self.config.refresh_ttl)?;

        let now = Utc::now();
        self.store_record(
            &access,
            &SessionRecord {
                kind: SessionKind::Access,
                subject_id: identity.id.clone(),
                linked_id: refresh.id,
                subject_dn: identity.dn.clone(),
            },
            now,
        )
        .await?;
        self.store_record(
            &refresh,
            &SessionRecord {
                kind: SessionKind::Refresh,
                subject_id: identity.id.clone(),
                linked_id: access.id,
                subject_dn: identity.dn.clone(),
            },
            now,
        )
        .await?;

        debug!(
            user_id = %identity.id,
            access_id = %access.id,
            refresh_id = %refresh.id,
            "issued token pair"
        );
        Ok(TokenPair { access, refresh })
    }

    pub async fn verify_auth(&self, access_token: &str) -> Result<Verification, AuthError> {
        let (token, record) = self
            .load_session(self.access_codec.as_ref(), access_token, SessionKind::Access)
            .await?;
        let identity = self.resolve_subject(&record.subject_id).await?;

        // Derived from the signed claim, not from the record's remaining TTL.
        Ok(Verification {
            identity,
            expire_in: seconds_until(token.expires_at, Utc::now()),
        })
    }

    /// Exchanges a refresh token for a new pair. The presented token is
    /// consumed; a second exchange with it fails.
    ///
    /// The lookup and the delete are separate store calls, so the delete count
    /// is the only guard against two concurrent exchanges of the same token.
    pub async fn refresh_auth(&self, refresh_token: &str) -> Result<Refreshed, AuthError> {
        let (token, record) = self
            .load_session(self.refresh_codec.as_ref(), refresh_token, SessionKind::Refresh)
            .await?;

        let deleted = self.session_store.delete(&token.id.to_string()).await?;
        if deleted == 0 {
            warn!(token_id = %token.id, "refresh token already consumed");
            return Err(AuthError::unauthorized("refresh token is no longer valid"));
        }

        let identity = self.resolve_subject(&record.subject_id).await.map_err(|e| {
            debug!(
                user_id = %record.subject_id,
                error = %e,
                "subject resolution failed on refresh"
            );
            AuthError::unauthorized(format!("authentication failed for {}", record.subject_id))
        })?;
        if identity.dn != record.subject_dn {
            warn!(
                user_id = %record.subject_id,
                issued_dn = %record.subject_dn,
                current_dn = %identity.dn,
                "directory entry changed since issuance"
            );
            return Err(AuthError::unauthorized(format!(
                "authentication failed for {}",
                record.subject_id
            )));
        }

        let tokens = self.create_auth(&identity).await?;
        self.discard_linked(record.linked_id).await;

        let expire_in = tokens.refresh.expire_in(Utc::now());
        Ok(Refreshed { tokens, expire_in })
    }

    /// Revokes an access token and, best-effort, its paired refresh token.
    pub async fn delete_auth(&self, access_token: &str) -> Result<(), AuthError> {
        let (token, record) = self
            .load_session(self.access_codec.as_ref(), access_token, SessionKind::Access)
            .await?;
        self.resolve_subject(&record.subject_id).await?;

        let deleted = self.session_store.delete(&token.id.to_string()).await?;
        if deleted == 0 {
            debug!(token_id = %token.id, "access record vanished before revocation");
            return Ok(());
        }
        self.discard_linked(record.linked_id).await;
        Ok(())
    }

    async fn load_session(
        &self,
        codec: &dyn TokenCodec,
        value: &str,
        expected: SessionKind,
    ) -> Result<(VerifiedToken, SessionRecord), AuthError> {
        let token = codec.verify(value)?;

        let raw = self
            .session_store
            .get(&token.id.to_string())
            .await?
            .ok_or_else(|| {
                debug!(token_id = %token.id, "session record not found");
                AuthError::unauthorized("token is invalid")
            })?;
        let record = SessionRecord::decode(&raw).map_err(|e| {
            debug!(token_id = %token.id, error = %e, "stored session record is corrupt");
            AuthError::UnprocessableEntity("token is invalid".to_string())
        })?;

        if record.kind != expected {
            debug!(
                token_id = %token.id,
                stored = ?record.kind,
                expected = ?expected,
                "session kind mismatch"
            );
            return Err(AuthError::unauthorized("token is invalid"));
        }

        Ok((token, record))
    }

    async fn resolve_subject(&self, user_id: &str) -> Result<Identity, AuthError> {
        self.directory
            .resolve_user(user_id)
            .await
            .map_err(|e| match e {
                DirectoryError::NotFound(_) => AuthError::unauthorized(e.to_string()),
                DirectoryError::Ambiguous { .. } => {
                    warn!(user_id = %user_id, error = %e, "ambiguous directory entry");
                    AuthError::InternalError(e.to_string())
                }
                DirectoryError::Bind { .. } | DirectoryError::Unavailable(_) => {
                    AuthError::Directory(e.to_string())
                }
            })
    }

    async fn store_record(
        &self,
        token: &Token,
        record: &SessionRecord,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let value = record
            .encode()
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        self.session_store
            .put(&token.id.to_string(), &value, remaining_lifetime(token.expires_at, now))
            .await?;
        Ok(())
    }

    // A record left behind here expires on its own.
    async fn discard_linked(&self, linked_id: TokenId) {
        match self.session_store.delete(&linked_id.to_string()).await {
            Ok(0) => debug!(token_id = %linked_id, "linked record already gone"),
            Ok(_) => {}
            Err(e) => debug!(token_id = %linked_id, error = %e, "failed to delete linked record"),
        }
    }
}

fn remaining_lifetime(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now)
        .to_std()
        .ok()
        .filter(|d| !d.is_zero())
        .unwrap_or(Duration::from_millis(1))
}

#[async_trait::async_trait]
impl AuthService for SessionOrchestrator {
    async fn authorize(&self, username: &str, password: &str) -> Result<Authorization, AuthError> {
        let identity = self.authorize_user(username, password).await?;
        let tokens = self.create_auth(&identity).await?;
        let expire_in = tokens.expire_in(Utc::now());
        Ok(Authorization {
            identity,
            tokens,
            expire_in,
        })
    }

    async fn verify(&self, access_token: &str) -> Result<Verification, AuthError> {
        self.verify_auth(access_token).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Refreshed, AuthError> {
        self.refresh_auth(refresh_token).await
    }

    async fn deauthorize(&self, access_token: &str) -> Result<bool, AuthError> {
        self.delete_auth(access_token).await?;
        Ok(true)
    }
}
