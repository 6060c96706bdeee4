//! Demo collaborators
//!
//! Local stand-ins for the identity service and the town catalog, so the core
//! can be exercised end to end without a backend:
//! - a fixed catalog of Portuguese towns
//! - an in-memory identity service with two seeded accounts

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    AuthError, AuthSession, LoginCredentials, RegisterData, Town, TownId, User, UserRole,
};
use crate::ports::{Clock, IdentityProvider, SystemClock, TownCatalog};

/// Seeded customer account
pub const DEMO_CUSTOMER_EMAIL: &str = "demo@renizo.app";
pub const DEMO_CUSTOMER_PASSWORD: &str = "renizo-demo";

/// Seeded provider account
pub const DEMO_PROVIDER_EMAIL: &str = "pro@renizo.app";
pub const DEMO_PROVIDER_PASSWORD: &str = "renizo-pro";

/// Default lifetime of an issued session
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 24 * 60;

const DEMO_TOWNS: &[(&str, &str)] = &[
    ("lisbon", "Lisbon"),
    ("porto", "Porto"),
    ("braga", "Braga"),
    ("coimbra", "Coimbra"),
    ("faro", "Faro"),
    ("aveiro", "Aveiro"),
];

/// Fixed town catalog
#[derive(Debug, Clone)]
pub struct DemoTownCatalog {
    towns: Vec<Town>,
}

impl DemoTownCatalog {
    pub fn new() -> Self {
        let towns = DEMO_TOWNS
            .iter()
            .filter_map(|(id, name)| TownId::new(*id).ok().map(|id| Town::new(id, *name)))
            .collect();
        Self { towns }
    }
}

impl Default for DemoTownCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TownCatalog for DemoTownCatalog {
    fn find_town(&self, id: &TownId) -> Option<Town> {
        self.towns.iter().find(|t| &t.id == id).cloned()
    }

    fn list_towns(&self) -> Vec<Town> {
        self.towns.clone()
    }
}

// Argon2id parameters: deliberately light, this only guards demo accounts
const HASH_MEMORY_COST: u32 = 19 * 1024;
const HASH_TIME_COST: u32 = 2;
const HASH_PARALLELISM: u32 = 1;
const HASH_LEN: usize = 32;

/// HMAC secret for demo tokens; tokens stay verifiable across restarts
const DEFAULT_SIGNING_SECRET: &str = "renizo-demo-signing-secret";

/// Claims carried by a demo session token (HS256 JWT)
#[derive(Debug, Serialize, Deserialize)]
struct DemoClaims {
    /// User id
    sub: String,
    iat: i64,
    exp: i64,
    /// Makes every issued token distinct, even within one second
    nonce: String,
}

struct DemoAccount {
    user: User,
    /// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$...`
    password_hash: String,
}

/// In-memory identity service
///
/// Tokens are HS256 JWTs whose claims bind the user id and expiry. A
/// refreshed session therefore verifies even in a new process, as long as
/// the account still exists.
pub struct DemoIdentityProvider {
    accounts: Mutex<HashMap<String, DemoAccount>>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    signing_secret: String,
    offline: AtomicBool,
}

impl DemoIdentityProvider {
    /// Provider seeded with the demo customer and provider accounts
    pub fn new(session_ttl: Duration) -> Self {
        Self::with_clock(session_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(session_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let provider = Self {
            accounts: Mutex::new(HashMap::new()),
            clock,
            session_ttl,
            signing_secret: DEFAULT_SIGNING_SECRET.to_string(),
            offline: AtomicBool::new(false),
        };

        let seeded_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
        let seeded_at = seeded_at.unwrap_or_else(Utc::now);
        let seeds = [
            (
                "00000000-0000-4000-8000-000000000001",
                DEMO_CUSTOMER_EMAIL,
                DEMO_CUSTOMER_PASSWORD,
                "Demo Customer",
                UserRole::Customer,
                "+351 910 000 001",
            ),
            (
                "00000000-0000-4000-8000-000000000002",
                DEMO_PROVIDER_EMAIL,
                DEMO_PROVIDER_PASSWORD,
                "Demo Provider",
                UserRole::Provider,
                "+351 910 000 002",
            ),
        ];
        for (id, email, password, name, role, phone) in seeds {
            let user = User::new(id, email, name, role, phone, seeded_at);
            if let Ok(account) = Self::new_account(user, password) {
                provider.accounts().insert(normalize_email(email), account);
            }
        }

        provider
    }

    /// Simulate a lost connection: every call fails with `NETWORK_ERROR`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, DemoAccount>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_online(&self) -> Result<(), AuthError> {
        if self.is_offline() {
            return Err(AuthError::network("Identity service is unreachable"));
        }
        Ok(())
    }

    fn new_account(user: User, password: &str) -> Result<DemoAccount, AuthError> {
        let salt_bytes: [u8; 16] = rand::thread_rng().gen();
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AuthError::unknown(format!("Failed to encode salt: {}", e)))?;
        let password_hash = hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::unknown(format!("Failed to hash password: {}", e)))?
            .to_string();
        Ok(DemoAccount {
            user,
            password_hash,
        })
    }

    fn issue_session(&self, user: User) -> Result<AuthSession, AuthError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| AuthError::unknown("Session lifetime is out of range"))?;

        let nonce_bytes: [u8; 18] = rand::thread_rng().gen();
        let claims = DemoClaims {
            sub: user.id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            nonce: URL_SAFE_NO_PAD.encode(nonce_bytes),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.signing_secret.as_bytes()),
        )
        .map_err(|e| AuthError::unknown(format!("Failed to sign session token: {}", e)))?;

        Ok(AuthSession::new(user, token, expires_at))
    }

    /// Signature check plus claims matching the session they arrived with.
    ///
    /// Expiry is judged against the injected clock by the caller, not the
    /// system time, so `exp` is only compared here.
    fn verify_token(&self, session: &AuthSession) -> bool {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let decoding_key = DecodingKey::from_secret(self.signing_secret.as_bytes());
        match decode::<DemoClaims>(&session.token, &decoding_key, &validation) {
            Ok(data) => {
                data.claims.sub == session.user.id
                    && data.claims.exp == session.expires_at.timestamp()
            }
            Err(e) => {
                debug!("Rejected session token: {}", e);
                false
            }
        }
    }
}

impl IdentityProvider for DemoIdentityProvider {
    fn name(&self) -> &str {
        "demo"
    }

    fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        self.ensure_online()?;

        let user = {
            let accounts = self.accounts();
            let account = accounts
                .get(&normalize_email(&credentials.email))
                .ok_or_else(|| AuthError::invalid_credentials("Email or password is incorrect"))?;
            let stored = PasswordHash::new(&account.password_hash)
                .map_err(|e| AuthError::unknown(format!("Stored password hash is invalid: {}", e)))?;
            if hasher()?
                .verify_password(credentials.password.as_bytes(), &stored)
                .is_err()
            {
                return Err(AuthError::invalid_credentials("Email or password is incorrect"));
            }
            account.user.clone()
        };

        self.issue_session(user)
    }

    fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError> {
        self.ensure_online()?;

        let email = normalize_email(&data.email);
        if email.is_empty() {
            return Err(AuthError::unknown("Email is required"));
        }
        if self.accounts().contains_key(&email) {
            return Err(AuthError::user_exists(
                "An account with this email already exists",
            ));
        }

        let user = User::new(
            Uuid::new_v4().to_string(),
            email.clone(),
            data.name.trim(),
            data.role,
            data.phone.trim(),
            self.clock.now(),
        );
        let account = Self::new_account(user.clone(), &data.password)?;

        {
            let mut accounts = self.accounts();
            // Re-check under the same guard that inserts
            if accounts.contains_key(&email) {
                return Err(AuthError::user_exists(
                    "An account with this email already exists",
                ));
            }
            accounts.insert(email, account);
        }

        self.issue_session(user)
    }

    fn refresh(&self, session: &AuthSession) -> Result<AuthSession, AuthError> {
        self.ensure_online()?;

        if session.is_expired_at(self.clock.now()) || !self.verify_token(session) {
            return Err(AuthError::invalid_credentials("Session is no longer valid"));
        }

        let user = self
            .accounts()
            .get(&normalize_email(&session.user.email))
            .filter(|account| account.user.id == session.user.id)
            .map(|account| account.user.clone())
            .ok_or_else(|| AuthError::invalid_credentials("Account no longer exists"))?;

        self.issue_session(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hasher() -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(
        HASH_MEMORY_COST,
        HASH_TIME_COST,
        HASH_PARALLELISM,
        Some(HASH_LEN),
    )
    .map_err(|e| AuthError::unknown(format!("Failed to create argon2 params: {:?}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::domain::AuthErrorCode;
    use chrono::DateTime;

    fn provider_at(start: DateTime<Utc>) -> (DemoIdentityProvider, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let provider = DemoIdentityProvider::with_clock(Duration::minutes(30), clock.clone());
        (provider, clock)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = DemoTownCatalog::new();
        assert_eq!(catalog.list_towns().len(), DEMO_TOWNS.len());

        let porto = catalog.find_town(&TownId::new("porto").unwrap()).unwrap();
        assert_eq!(porto.name, "Porto");
        assert!(catalog.find_town(&TownId::new("town-42").unwrap()).is_none());
    }

    #[test]
    fn test_login_seeded_accounts() {
        let (provider, _) = provider_at(start());

        let session = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();
        assert_eq!(session.user.role(), UserRole::Customer);
        assert_eq!(session.expires_at, start() + Duration::minutes(30));

        let session = provider
            .login(&LoginCredentials::new(" PRO@renizo.app ", DEMO_PROVIDER_PASSWORD))
            .unwrap();
        assert_eq!(session.user.role(), UserRole::Provider);
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let (provider, _) = provider_at(start());

        let err = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, "wrong"))
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);

        let err = provider
            .login(&LoginCredentials::new("nobody@example.com", "whatever"))
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);
    }

    #[test]
    fn test_register_then_duplicate() {
        let (provider, _) = provider_at(start());
        let data = RegisterData {
            email: "new@example.com".to_string(),
            password: "correct horse".to_string(),
            name: "New User".to_string(),
            phone: "+351 900".to_string(),
            role: UserRole::Provider,
        };

        let session = provider.register(&data).unwrap();
        assert_eq!(session.user.email, "new@example.com");
        assert!(session.user.is_provider());

        let err = provider.register(&data).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::UserExists);

        provider.login(&data.credentials()).unwrap();
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let (provider, clock) = provider_at(start());
        let session = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();

        clock.advance(Duration::minutes(10));
        let refreshed = provider.refresh(&session).unwrap();
        assert_eq!(refreshed.expires_at, start() + Duration::minutes(40));
        assert_ne!(refreshed.token, session.token);
        assert_eq!(refreshed.user, session.user);
    }

    #[test]
    fn test_refresh_rejects_expired_or_forged() {
        let (provider, clock) = provider_at(start());
        let session = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();

        let mut forged = session.clone();
        forged.expires_at = forged.expires_at + Duration::days(30);
        let err = provider.refresh(&forged).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);

        clock.advance(Duration::minutes(31));
        let err = provider.refresh(&session).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);
    }

    #[test]
    fn test_refresh_rejects_tampered_token() {
        let (provider, _) = provider_at(start());
        let session = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();

        // Token issued for another user does not carry this user's session
        let other = provider
            .login(&LoginCredentials::new(DEMO_PROVIDER_EMAIL, DEMO_PROVIDER_PASSWORD))
            .unwrap();
        let mut swapped = session.clone();
        swapped.token = other.token.clone();
        assert_eq!(
            provider.refresh(&swapped).unwrap_err().code,
            AuthErrorCode::InvalidCredentials
        );

        let mut appended = session.clone();
        appended.token.push_str("AA");
        assert_eq!(
            provider.refresh(&appended).unwrap_err().code,
            AuthErrorCode::InvalidCredentials
        );

        let mut garbage = session;
        garbage.token = "not-a-token".to_string();
        assert_eq!(
            provider.refresh(&garbage).unwrap_err().code,
            AuthErrorCode::InvalidCredentials
        );
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let (provider, clock) = provider_at(start());
        let mut foreign = DemoIdentityProvider::with_clock(Duration::minutes(30), clock);
        foreign.signing_secret = "someone-else".to_string();

        let session = foreign
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();
        assert!(foreign.refresh(&session).is_ok());
        assert_eq!(
            provider.refresh(&session).unwrap_err().code,
            AuthErrorCode::InvalidCredentials
        );
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let clock = Arc::new(ManualClock::new(start()));
        let provider = DemoIdentityProvider::with_clock(Duration::MAX, clock);

        let err = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::Unknown);
    }

    #[test]
    fn test_tokens_verify_across_instances() {
        let (first, _) = provider_at(start());
        let (second, _) = provider_at(start());
        let session = first
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap();
        assert!(second.refresh(&session).is_ok());
    }

    #[test]
    fn test_offline_is_network_error() {
        let (provider, _) = provider_at(start());
        provider.set_offline(true);

        let err = provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
        assert!(err.is_retryable());

        provider.set_offline(false);
        assert!(provider
            .login(&LoginCredentials::new(DEMO_CUSTOMER_EMAIL, DEMO_CUSTOMER_PASSWORD))
            .is_ok());
    }
}
