use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{PrincipalsRepo, RepoError, UpsertCredentialsParams};
use crate::domain::error::DomainError;
use crate::domain::principals::{PrincipalLookup, PrincipalRecord};

const TOKEN_PREFIX: &str = "mk";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("no principal with {0}")]
    UnknownPrincipal(PrincipalLookup),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("admin claim required")]
    Forbidden,
}

#[derive(Debug, Clone)]
pub struct TokenIssued {
    pub record: PrincipalRecord,
    pub token: String,
}

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub admin: bool,
}

impl Principal {
    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    repo: Arc<dyn PrincipalsRepo>,
}

impl AdminService {
    pub fn new(repo: Arc<dyn PrincipalsRepo>) -> Self {
        Self { repo }
    }

    /// Mint a bearer token for `email`, creating the principal on first use.
    /// Any previous token of that principal stops working.
    pub async fn issue_token(&self, email: &str) -> Result<TokenIssued, AdminError> {
        let email = normalize_email(email)?;
        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        let record = self
            .repo
            .upsert_credentials(UpsertCredentialsParams {
                email,
                token_prefix: prefix,
                hashed_secret: Self::hash_secret(&secret),
                issued_at: OffsetDateTime::now_utc(),
            })
            .await?;

        info!(
            target = "marquee::admins",
            principal = %record.id,
            "Issued bearer token"
        );
        Ok(TokenIssued { record, token })
    }

    /// Set the admin claim on an existing principal.
    pub async fn grant_admin(&self, lookup: PrincipalLookup) -> Result<PrincipalRecord, AdminError> {
        let found = match &lookup {
            PrincipalLookup::Email(email) => {
                self.repo.find_by_email(&normalize_email(email)?).await?
            }
            PrincipalLookup::Id(id) => self.repo.find_by_id(*id).await?,
        };
        let record = found.ok_or(AdminError::UnknownPrincipal(lookup))?;

        let updated = self.repo.set_admin(record.id, true).await?;
        info!(
            target = "marquee::admins",
            principal = %updated.id,
            "Granted admin claim"
        );
        Ok(updated)
    }

    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let parsed = Self::parse_token(token).ok_or(AuthError::Invalid)?;
        let record = self
            .repo
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|_| AuthError::Invalid)?
            .ok_or(AuthError::Invalid)?;

        let stored = record.hashed_secret.as_deref().ok_or(AuthError::Invalid)?;
        let hashed_input = Self::hash_secret(&parsed.secret);
        if stored.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        Ok(Principal {
            id: record.id,
            email: record.email,
            admin: record.admin,
        })
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        if parts.next()? != TOKEN_PREFIX {
            return None;
        }
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::validation(format!(
            "`{email}` is not an email address"
        )));
    }
    Ok(email)
}
