use log::info;
use std::sync::{Arc, LazyLock};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::{TokenIssuer, TokenKind};
use crate::shared::error::AppError;
use crate::store::{Store, StoreError};
use crate::users::types::{
    AccessToken, NewUser, RegisterRequest, RegisterResponse, TokenPair, TokenRequest,
};

pub const USERNAME_MIN_CHARS: usize = 4;
pub const PASSWORD_MIN_CHARS: usize = 8;
const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

static USERNAME_REGEX: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"^[\w.@+-]+$").ok());

static EMAIL_REGEX: LazyLock<Option<regex::Regex>> =
    LazyLock::new(|| regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

fn matches(regex: &LazyLock<Option<regex::Regex>>, value: &str) -> bool {
    regex.as_ref().is_some_and(|re| re.is_match(value))
}

pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.username.chars().count() < USERNAME_MIN_CHARS {
        return Err(AppError::validation(format!(
            "Ensure username has at least {USERNAME_MIN_CHARS} characters."
        )));
    }
    if !matches(&USERNAME_REGEX, &req.username) {
        return Err(AppError::validation(
            "Username may contain only letters, digits and @/./+/-/_ characters.",
        ));
    }
    if !matches(&EMAIL_REGEX, req.email.trim()) {
        return Err(AppError::validation("Enter a valid email address."));
    }
    if req.password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AppError::validation(format!(
            "Ensure password has at least {PASSWORD_MIN_CHARS} characters."
        )));
    }
    if req.password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("This password is entirely numeric."));
    }
    if req.password.eq_ignore_ascii_case(&req.username) {
        return Err(AppError::validation("The password is too similar to the username."));
    }
    Ok(())
}

/// Registration and token exchange.
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    fn pair(&self, user_id: uuid::Uuid) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access: self.tokens.issue(user_id, TokenKind::Access)?,
            refresh: self.tokens.issue(user_id, TokenKind::Refresh)?,
        })
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, AppError> {
        validate_registration(&req)?;
        let email = req.email.trim().to_string();

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::validation("This email is already in use."));
        }
        let existing = self.store.find_user_by_username(&req.username).await?;
        if existing.is_some() {
            return Err(AppError::validation("This username is already taken."));
        }

        let password_hash = hash_password_blocking(req.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                username: req.username,
                email,
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // lost a race with a concurrent registration
                StoreError::Conflict(_) => {
                    AppError::validation("This username or email is already taken.")
                }
                other => other.into(),
            })?;
        info!("Registered user {} ({})", user.username, user.id);

        let TokenPair { access, refresh } = self.pair(user.id)?;
        Ok(RegisterResponse {
            user: user.into(),
            access,
            refresh,
        })
    }

    pub async fn obtain_tokens(&self, req: TokenRequest) -> Result<TokenPair, AppError> {
        let user = self
            .store
            .find_user_by_username(&req.username)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        // fixture and imported accounts may carry an unusable hash
        let valid = verify_password_blocking(req.password, user.password_hash)
            .await
            .unwrap_or(false);
        if !valid {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        self.pair(user.id)
    }

    pub async fn refresh(&self, refresh: &str) -> Result<AccessToken, AppError> {
        let claims = self.tokens.verify(refresh, TokenKind::Refresh)?;
        if self.store.get_user(claims.sub).await?.is_none() {
            return Err(AppError::Unauthorized("User not found".to_string()));
        }
        Ok(AccessToken {
            access: self.tokens.issue(claims.sub, TokenKind::Access)?,
        })
    }
}
