//! Sign-in and registration session.
//!
//! [`AuthSession`] drives the funnel a visitor goes through:
//!
//! 1. `phone`: a Bangladeshi mobile number is submitted
//! 2. `otp`: a verification code of the configured length is entered
//! 3. `role`: a new visitor picks an account role, which creates the user
//! 4. `complete`: the role profile is saved (or a returning user signed in)
//!
//! The session is an explicit context object. Views receive it by reference
//! instead of reaching for a global; [`AuthSession::hydrate`] restores it from
//! the persisted current user and [`AuthSession::sign_out`] tears it down.
//!
//! No verification code is generated or checked against a provider. Any
//! code of the right length is accepted.
//!
//! @author Shastho
//! @copyright 2025

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{self, keys, StorageError, Store};
use crate::models::{Phase, Profile, RegistrationForm, Role, Route, User};
use crate::phone::normalize_bangladeshi_phone;

/// Length of the verification code unless configured otherwise.
pub const DEFAULT_CODE_LENGTH: usize = 6;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("Verification code must be {expected} characters, got {actual}")]
    InvalidCode { expected: usize, actual: usize },
    #[error("Cannot {operation} during the {phase} step")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },
    #[error("No phone number is awaiting verification")]
    NoPendingPhone,
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Phone number already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Registration form is for a {form} account but the user is a {account}")]
    RoleMismatch { form: Role, account: Role },
    #[error("Please fill all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Returned by [`AuthSession::submit_phone`] once a code has been "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeIssued {
    pub phone: String,
    pub code_length: usize,
}

/// Result of a successful code check.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The phone belongs to an existing account, now signed in.
    ReturningUser(User),
    /// No account yet; the caller should show role selection.
    NewUser,
}

/// Result of [`AuthSession::complete_registration`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub profile: Profile,
    pub route: Route,
}

pub struct AuthSession {
    store: Arc<dyn Store>,
    code_length: usize,
    phase: Phase,
    phone_number: String,
    authenticated: bool,
    user: Option<User>,
}

impl AuthSession {
    /// Creates a signed-out session at the `phone` step.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            code_length: DEFAULT_CODE_LENGTH,
            phase: Phase::Phone,
            phone_number: String::new(),
            authenticated: false,
            user: None,
        }
    }

    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length;
        self
    }

    /// Restores a session from the persisted current user, if any.
    pub async fn hydrate(store: Arc<dyn Store>) -> Result<Self, SessionError> {
        let mut session = Self::new(store);
        let current: Option<User> =
            db::load_record(session.store.as_ref(), keys::CURRENT_USER).await?;

        if let Some(user) = current {
            info!("Restored session for user {} ({})", user.id, user.role);
            session.phone_number = user.phone.clone();
            session.authenticated = true;
            session.phase = Phase::Complete;
            session.user = Some(user);
        } else {
            debug!("No persisted user, starting signed out");
        }

        Ok(session)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phone number awaiting or past verification; empty when signed out.
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }


    fn require_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                operation,
                phase: self.phase,
            })
        }
    }

    fn require_user(&self) -> Result<&User, SessionError> {
        match (&self.user, self.authenticated) {
            (Some(user), true) => Ok(user),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>, SessionError> {
        let users: Vec<User> = db::load_list(self.store.as_ref(), keys::ALL_USERS).await?;
        Ok(users.into_iter().find(|u| {
            u.phone == phone
                || normalize_bangladeshi_phone(&u.phone).ok().as_deref() == Some(phone)
        }))
    }

    /// Submits a phone number and moves to the `otp` step.
    ///
    /// Allowed from `phone`, and from `otp` so a mistyped number can be
    /// corrected. On a format error the step does not change. The number is
    /// kept in E.164 form.
    pub async fn submit_phone(&mut self, phone: &str) -> Result<CodeIssued, SessionError> {
        self.require_phase("submit a phone number", &[Phase::Phone, Phase::Otp])?;

        let canonical = normalize_bangladeshi_phone(phone).map_err(|e| {
            warn!("Rejected phone number {:?}: {}", phone, e);
            SessionError::InvalidPhoneNumber(phone.to_string())
        })?;

        self.phone_number = canonical;
        self.phase = Phase::Otp;

        info!("Verification code sent to {}", self.phone_number);
        Ok(CodeIssued {
            phone: self.phone_number.clone(),
            code_length: self.code_length,
        })
    }

    /// Checks a verification code for the pending phone number.
    ///
    /// A returning user is signed in and the session completes. A new phone
    /// moves to role selection without creating anything. Re-verifying from
    /// the `role` step repeats the lookup and never creates a user; once a
    /// role has been picked the account exists and re-verifying is rejected.
    pub async fn verify_otp(&mut self, code: &str) -> Result<Verification, SessionError> {
        self.require_phase("verify a code", &[Phase::Otp, Phase::Role])?;
        if self.authenticated {
            return Err(SessionError::InvalidTransition {
                operation: "verify a code",
                phase: self.phase,
            });
        }

        if self.phone_number.is_empty() {
            return Err(SessionError::NoPendingPhone);
        }

        let actual = code.chars().count();
        if actual != self.code_length {
            warn!("Rejected verification code of length {}", actual);
            return Err(SessionError::InvalidCode {
                expected: self.code_length,
                actual,
            });
        }

        let Some(mut user) = self.find_user_by_phone(&self.phone_number).await? else {
            info!("No account for {}, continuing to role selection", self.phone_number);
            self.phase = Phase::Role;
            return Ok(Verification::NewUser);
        };

        user.last_login_at = Utc::now();
        self.replace_user(&user).await?;
        db::save_record(self.store.as_ref(), keys::CURRENT_USER, &user).await?;

        info!("Signed in returning user {} ({})", user.id, user.role);
        self.authenticated = true;
        self.phase = Phase::Complete;
        self.user = Some(user.clone());
        Ok(Verification::ReturningUser(user))
    }

    /// Creates the account for the verified phone with `role`.
    ///
    /// The step stays at `role`; the returned route names the registration
    /// form the caller should show next.
    pub async fn select_role(&mut self, role: Role) -> Result<Route, SessionError> {
        self.require_phase("select a role", &[Phase::Role])?;

        if self.phone_number.is_empty() {
            return Err(SessionError::NoPendingPhone);
        }
        if self.find_user_by_phone(&self.phone_number).await?.is_some() {
            return Err(SessionError::AlreadyRegistered(self.phone_number.clone()));
        }

        let user = User::new(self.phone_number.clone(), role);
        db::push_to_list(self.store.as_ref(), keys::ALL_USERS, user.clone()).await?;
        db::save_record(self.store.as_ref(), keys::CURRENT_USER, &user).await?;

        info!("Created {} account {} for {}", role, user.id, user.phone);
        self.authenticated = true;
        self.user = Some(user);
        Ok(role.registration_route())
    }

    /// Saves the role profile for the signed-in user.
    ///
    /// The profile is validated before anything is written. When the form
    /// carries a name, the user record is renamed in both the current-user
    /// slot and the user list.
    pub async fn complete_registration(
        &mut self,
        form: RegistrationForm,
    ) -> Result<Registered, SessionError> {
        let user = self.require_user()?.clone();

        if form.role() != user.role {
            return Err(SessionError::RoleMismatch {
                form: form.role(),
                account: user.role,
            });
        }

        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Err(SessionError::MissingFields(missing));
        }

        let name = form.name().map(str::to_string);
        let profile = form.into_profile(&user.id);
        db::push_profile(self.store.as_ref(), profile.clone()).await?;
        debug!("Stored {} profile {}", profile.role(), profile.id());

        let mut updated = user;
        if let Some(name) = name {
            updated.name = Some(name);
            db::save_record(self.store.as_ref(), keys::CURRENT_USER, &updated).await?;
            self.replace_user(&updated).await?;
        }

        info!("Registration completed for user {}", updated.id);
        self.user = Some(updated);
        self.phase = Phase::Complete;
        Ok(Registered {
            profile,
            route: Route::Dashboard,
        })
    }

    /// Profile of the signed-in user, if one has been saved.
    pub async fn profile(&self) -> Result<Option<Profile>, SessionError> {
        let user = self.require_user()?;
        Ok(db::find_profile(self.store.as_ref(), user.role, &user.id).await?)
    }

    /// Registration form to resume when the signed-in user has no profile.
    ///
    /// This covers an account created at role selection whose profile was
    /// never saved.
    pub async fn pending_registration(&self) -> Result<Option<Route>, SessionError> {
        let Ok(user) = self.require_user() else {
            return Ok(None);
        };
        let profile = db::find_profile(self.store.as_ref(), user.role, &user.id).await?;
        Ok(profile.is_none().then(|| user.role.registration_route()))
    }

    /// Goes back to phone entry before an account is signed in.
    pub fn back_to_phone(&mut self) -> Result<(), SessionError> {
        if self.authenticated {
            return Err(SessionError::InvalidTransition {
                operation: "go back to phone entry",
                phase: self.phase,
            });
        }
        self.phase = Phase::Phone;
        self.phone_number.clear();
        Ok(())
    }

    /// Clears the persisted current user and resets to the `phone` step.
    pub async fn sign_out(&mut self) -> Result<(), SessionError> {
        self.store.remove(keys::CURRENT_USER).await?;

        if let Some(user) = self.user.take() {
            info!("Signed out user {}", user.id);
        }
        self.authenticated = false;
        self.phase = Phase::Phone;
        self.phone_number.clear();
        Ok(())
    }

    /// Rewrites the entry with `user.id` in the user list.
    async fn replace_user(&self, user: &User) -> Result<(), SessionError> {
        let store = self.store.as_ref();
        let mut users: Vec<User> = db::load_list(store, keys::ALL_USERS).await?;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user.clone(),
            None => {
                warn!("User {} missing from user list, appending", user.id);
                users.push(user.clone());
            }
        }
        db::save_list(store, keys::ALL_USERS, &users).await?;
        Ok(())
    }
}
