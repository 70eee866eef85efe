use std::sync::Arc;

use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::activity::NewActivityEvent;
use crate::domain::admin_user::AccountStatus;
use crate::store::Store;

const TOKEN_ISSUER: &str = "hive";

/// Claims attached to an admitted request.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    token_key: [u8; 32],
    token_ttl_hours: u64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, token_key: [u8; 32], token_ttl_hours: u64) -> Self {
        Self {
            store,
            token_key,
            token_ttl_hours,
        }
    }

    /// Resolves the username against admin accounts first, then bidder
    /// accounts. Every failure path collapses to `None`; callers return one
    /// uniform message so the response never reveals which check failed.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<LoginGrant>> {
        if let Some(admin) = self.store.get_admin_user_by_username(username).await? {
            if admin.status != AccountStatus::Active {
                return Ok(None);
            }
            if !verify_password(password, &admin.password_hash)? {
                return Ok(None);
            }
            let token = self.issue_token(admin.id, &admin.username, admin.role.as_str())?;
            self.store
                .record_admin_login(admin.id, OffsetDateTime::now_utc())
                .await?;
            self.store
                .record_activity(NewActivityEvent {
                    activity_type: "admin_login".to_string(),
                    user: admin.username.clone(),
                    details: None,
                })
                .await?;
            return Ok(Some(LoginGrant {
                token,
                user: LoginUser {
                    id: admin.id,
                    username: admin.username,
                    name: admin.name,
                    email: Some(admin.email),
                    role: admin.role.as_str().to_string(),
                },
            }));
        }

        if let Some(bidder) = self.store.get_bidder_user_by_username(username).await? {
            if !verify_password(password, &bidder.password_hash)? {
                return Ok(None);
            }
            let token = self.issue_token(bidder.id, &bidder.username, "bidder")?;
            self.store
                .record_activity(NewActivityEvent {
                    activity_type: "bidder_login".to_string(),
                    user: bidder.username.clone(),
                    details: None,
                })
                .await?;
            return Ok(Some(LoginGrant {
                token,
                user: LoginUser {
                    id: bidder.id,
                    username: bidder.username,
                    name: bidder.name,
                    email: None,
                    role: "bidder".to_string(),
                },
            }));
        }

        Ok(None)
    }

    /// Verifies a bearer credential. Bad signature, wrong issuer, and expiry
    /// all come back as `None`.
    pub fn verify(&self, token: &str) -> Result<Option<AuthIdentity>> {
        let key = SymmetricKey::<V4>::from(&self.token_key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let claims = match trusted.payload_claims() {
            Some(claims) => claims.clone(),
            None => return Ok(None),
        };

        let user_id = claim_str(&claims, "sub")?
            .parse::<i64>()
            .map_err(|_| anyhow!("malformed sub claim"))?;
        Ok(Some(AuthIdentity {
            user_id,
            username: claim_str(&claims, "username")?,
            role: claim_str(&claims, "role")?,
        }))
    }

    fn issue_token(&self, user_id: i64, username: &str, role: &str) -> Result<String> {
        let ttl = std::time::Duration::from_secs(self.token_ttl_hours * 60 * 60);
        let mut claims = Claims::new_expires_in(&ttl)?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("username", username)?;
        claims.add_additional("role", role)?;

        let key = SymmetricKey::<V4>::from(&self.token_key)?;
        Ok(local::encrypt(&key, &claims, None, None)?)
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn claim_str(claims: &Claims, name: &str) -> Result<String> {
    claims
        .get_claim(name)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing {} claim", name))
}
