//! Sign-in and the persisted session.
//!
//! The account info and access token survive restarts in the local
//! key-value store under `userInfo` and `accessToken`. Only nurse
//! accounts may use this client; relatives are turned away at login.

use std::fmt;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::api::{ApiError, NursingBackend};
use crate::db::{self, DatabaseError};
use crate::models::{AccountInfo, NurseProfile};

pub const USER_INFO_KEY: &str = "userInfo";
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please check the login form")]
    Validation(Vec<FieldError>),

    #[error("This app is for nurses only")]
    RoleNotAllowed(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Backend(#[from] ApiError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Login form
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    pub phone_number: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("phone_number", &self.phone_number)
            .field("password", &"***")
            .finish()
    }
}

impl LoginForm {
    pub fn new(phone_number: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            password: password.into(),
        }
    }

    /// Both fields are required. The phone number is trimmed before the
    /// check; the password is taken as typed.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.phone_number.trim().is_empty() {
            errors.push(FieldError {
                field: "phone",
                message: "Phone number is required",
            });
        }
        if self.password.is_empty() {
            errors.push(FieldError {
                field: "password",
                message: "Password is required",
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════

/// Bearer token, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountInfo,
    pub token: AccessToken,
    pub profile: Option<NurseProfile>,
}

impl Session {
    /// Appointments are assigned to the nurse's account id.
    pub fn nurse_id(&self) -> &str {
        &self.account.id
    }
}

// ═══════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════

pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: db::open_database(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: db::open_memory_database()?,
        })
    }

    pub fn save(&self, account: &AccountInfo, token: &AccessToken) -> Result<(), DatabaseError> {
        let info = serde_json::to_string(account).map_err(|e| DatabaseError::CorruptValue {
            key: USER_INFO_KEY.into(),
            reason: e.to_string(),
        })?;
        db::kv_put(&self.conn, USER_INFO_KEY, &info)?;
        db::kv_put(&self.conn, ACCESS_TOKEN_KEY, token.expose())?;
        Ok(())
    }

    /// Both keys must be present; half a session counts as none.
    pub fn load(&self) -> Result<Option<(AccountInfo, AccessToken)>, DatabaseError> {
        let info = db::kv_get(&self.conn, USER_INFO_KEY)?;
        let token = db::kv_get(&self.conn, ACCESS_TOKEN_KEY)?;
        let (Some(info), Some(token)) = (info, token) else {
            return Ok(None);
        };
        let account: AccountInfo =
            serde_json::from_str(&info).map_err(|e| DatabaseError::CorruptValue {
                key: USER_INFO_KEY.into(),
                reason: e.to_string(),
            })?;
        Ok(Some((account, AccessToken::new(token))))
    }

    pub fn clear(&self) -> Result<(), DatabaseError> {
        db::kv_delete(&self.conn, USER_INFO_KEY)?;
        db::kv_delete(&self.conn, ACCESS_TOKEN_KEY)?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Flows
// ═══════════════════════════════════════════════════════════

/// Validate the form, sign in, refuse relatives, persist, and authorise
/// the backend for later calls.
pub fn login(
    backend: &dyn NursingBackend,
    store: &SessionStore,
    form: &LoginForm,
) -> Result<Session, SessionError> {
    form.validate().map_err(SessionError::Validation)?;

    let grant = backend.login(form.phone_number.trim(), &form.password)?;
    if grant.account.is_relative() {
        tracing::warn!(account = %grant.account.id, "Relatives account refused");
        return Err(SessionError::RoleNotAllowed(grant.account.role.clone()));
    }

    let token = AccessToken::new(grant.access_token);
    store.save(&grant.account, &token)?;
    backend.authorize(Some(token.expose()));
    tracing::info!(account = %grant.account.id, role = %grant.account.role, "Signed in");

    Ok(Session {
        account: grant.account,
        token,
        profile: None,
    })
}

/// Resume a persisted session, if any.
pub fn restore(
    backend: &dyn NursingBackend,
    store: &SessionStore,
) -> Result<Option<Session>, SessionError> {
    let Some((account, token)) = store.load()? else {
        return Ok(None);
    };
    if account.is_relative() {
        store.clear()?;
        return Ok(None);
    }
    backend.authorize(Some(token.expose()));
    tracing::debug!(account = %account.id, "Session restored");
    Ok(Some(Session {
        account,
        token,
        profile: None,
    }))
}

pub fn logout(backend: &dyn NursingBackend, store: &SessionStore) -> Result<(), SessionError> {
    store.clear()?;
    backend.authorize(None);
    tracing::info!("Signed out");
    Ok(())
}
