//! Email confirmation-code authentication.
//!
//! A code is the user's identity payload signed with the server key. Nothing
//! is stored: a code stays valid for as long as the payload it encodes still
//! matches the user it is presented for.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use super::email::EmailProvider;
use super::error::ServiceError;
use super::jwt::{JwtService, TokenPair};
use super::store::UserStore;
use crate::config::JwtConfig;
use crate::models::{ConfirmationPayload, User};

#[derive(Debug, Serialize, Deserialize)]
struct CodeClaims {
    #[serde(flatten)]
    payload: ConfirmationPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Signs and verifies confirmation codes.
#[derive(Clone)]
pub struct CodeSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: Option<i64>,
}

impl CodeSigner {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.signing_key.as_bytes();
        Self {
            algorithm: config.algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_seconds: config.confirmation_code_ttl_seconds,
        }
    }

    pub fn encode(&self, payload: &ConfirmationPayload) -> Result<String, ServiceError> {
        let claims = CodeClaims {
            payload: payload.clone(),
            exp: self
                .ttl_seconds
                .map(|ttl| (Utc::now() + Duration::seconds(ttl)).timestamp()),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to sign code: {}", e)))
    }

    pub fn decode(&self, code: &str) -> Result<ConfirmationPayload, ServiceError> {
        decode::<CodeClaims>(code, &self.decoding_key, &self.validation())
            .map(|data| data.claims.payload)
            .map_err(|e| {
                tracing::debug!(error = %e, "Confirmation code failed to decode");
                ServiceError::InvalidConfirmationCode
            })
    }

    /// Succeeds only when `code` decodes to exactly `expected`.
    pub fn verify(&self, code: &str, expected: &ConfirmationPayload) -> Result<(), ServiceError> {
        let decoded = self.decode(code)?;
        if &decoded != expected {
            tracing::debug!("Confirmation code payload does not match user");
            return Err(ServiceError::InvalidConfirmationCode);
        }
        Ok(())
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = self.ttl_seconds.is_some();
        if self.ttl_seconds.is_some() {
            validation.set_required_spec_claims(&["exp"]);
        }
        validation
    }
}

/// How `ConfirmationService::run` resolves the addressed user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLookup {
    /// Create the account on first contact.
    GetOrCreate,
    /// Unknown emails fail as an invalid code.
    Existing,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct ConfirmationService {
    users: Arc<dyn UserStore>,
    email: Arc<dyn EmailProvider>,
    codes: CodeSigner,
    jwt: JwtService,
}

impl ConfirmationService {
    pub fn new(
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailProvider>,
        codes: CodeSigner,
        jwt: JwtService,
    ) -> Self {
        Self {
            users,
            email,
            codes,
            jwt,
        }
    }

    /// Resolves the user for `email` and its current payload, then hands both
    /// to `step`.
    pub async fn run<F, Fut, T>(
        &self,
        email: &str,
        lookup: UserLookup,
        step: F,
    ) -> Result<T, ServiceError>
    where
        F: FnOnce(User, ConfirmationPayload) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let email = normalize_email(email);
        let user = match lookup {
            UserLookup::GetOrCreate => self.users.get_or_create_by_email(&email).await?,
            UserLookup::Existing => self
                .users
                .find_by_email(&email)
                .await?
                .ok_or(ServiceError::InvalidConfirmationCode)?,
        };
        let payload = user.confirmation_payload();
        step(user, payload).await
    }

    /// Issues a code for `email` and mails it. Delivery failures are logged
    /// and do not fail the request.
    #[tracing::instrument(skip(self))]
    pub async fn request_code(&self, email: &str) -> Result<User, ServiceError> {
        self.run(email, UserLookup::GetOrCreate, |user, payload| async move {
            let code = self.codes.encode(&payload)?;

            if let Err(e) = self.email.send_confirmation_code(&user.email, &code).await {
                tracing::warn!(error = %e, user_id = user.id, "Failed to deliver confirmation code");
            } else {
                tracing::info!(user_id = user.id, "Confirmation code sent");
            }

            Ok(user)
        })
        .await
    }

    /// Trades a valid code for a fresh session credential pair.
    #[tracing::instrument(skip(self, code))]
    pub async fn exchange_code(&self, email: &str, code: &str) -> Result<TokenPair, ServiceError> {
        self.run(email, UserLookup::Existing, |user, payload| async move {
            self.codes.verify(code, &payload)?;

            let pair = self.jwt.generate_token_pair(&user)?;
            tracing::info!(user_id = user.id, "Confirmation code accepted");
            Ok(pair)
        })
        .await
    }
}
