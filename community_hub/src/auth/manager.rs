//! Authentication manager implementation.

use std::sync::Arc;

use super::{
    errors::{AuthError, AuthResult},
    models::{GoogleIdentity, LoginRequest, NewUser, RegisterRequest, Session, User, UserId},
    password::{PepperedHasher, generate_password},
    token::TokenCodec,
};
use crate::{
    db::UserRepository,
    mail::{Mailer, OutgoingMail},
};

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    hasher: PepperedHasher,
    tokens: TokenCodec,
    mailer: Arc<dyn Mailer>,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - User store
    /// * `hasher` - Password hasher holding the server-side pepper
    /// * `tokens` - Session token codec holding the signing secret
    /// * `mailer` - Outbound mail for the welcome message
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PepperedHasher,
        tokens: TokenCodec,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
            mailer,
        }
    }

    /// Session token codec
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Register a new user
    ///
    /// Sends a welcome mail once the account exists. A mail failure is logged
    /// and does not undo the registration.
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingField` - Name, email or password is empty
    /// * `AuthError::EmailTaken` - Email already exists
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<Session> {
        let name = request.name.trim();
        let email = request.email.trim();
        if name.is_empty() || email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingField("All fields are required".to_string()));
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let user = self
            .users
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                avatar: String::new(),
            })
            .await?;

        let token = self.tokens.issue(user.id)?;
        log::info!("Registered user {}", user.id);

        if let Err(e) = self.mailer.send(OutgoingMail::welcome(&user.email)).await {
            log::warn!("Welcome mail to user {} failed: {}", user.id, e);
        }

        Ok(Session { user, token })
    }

    /// Log in with email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingField` - Email or password is empty
    /// * `AuthError::UnknownEmail` - No account with that email
    /// * `AuthError::InvalidPassword` - Password does not match
    pub async fn login(&self, request: LoginRequest) -> AuthResult<Session> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingField(
                "Email and password are required".to_string(),
            ));
        }

        let credentials = self
            .users
            .find_credentials(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        self.hasher
            .verify(&request.password, &credentials.password_hash)
            .await?;

        let token = self.tokens.issue(credentials.user.id)?;
        Ok(Session {
            user: credentials.user,
            token,
        })
    }

    /// Log in with an identity asserted by the Google sign-in flow
    ///
    /// Finds the account by email, creating one with a random password on
    /// first sight. Two concurrent first logins for one email resolve to the
    /// same account.
    pub async fn google_login(&self, identity: GoogleIdentity) -> AuthResult<Session> {
        let email = identity.email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingField("Email is required".to_string()));
        }

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => self.create_google_user(email, &identity).await?,
        };

        let token = self.tokens.issue(user.id)?;
        Ok(Session { user, token })
    }

    async fn create_google_user(&self, email: &str, identity: &GoogleIdentity) -> AuthResult<User> {
        let name = match identity.name.trim() {
            "" => email.split('@').next().unwrap_or(email).to_string(),
            name => name.to_string(),
        };
        let password_hash = self.hasher.hash(&generate_password()).await?;

        let created = self
            .users
            .create_user(NewUser {
                name,
                email: email.to_string(),
                password_hash,
                avatar: identity.photo.clone(),
            })
            .await;

        match created {
            Ok(user) => {
                log::info!("Created user {} from Google sign-in", user.id);
                Ok(user)
            }
            // Lost a race with another first login for the same email
            Err(AuthError::EmailTaken) => self
                .users
                .find_by_email(email)
                .await?
                .ok_or(AuthError::UserNotFound),
            Err(e) => Err(e),
        }
    }

    /// Resolve the session token carried by a request to its subject
    ///
    /// # Errors
    ///
    /// * `AuthError::NoCredential` - No token, or an empty one
    /// * `AuthError::InvalidCredential` - Bad signature, malformed or expired
    pub fn authenticate(&self, token: Option<&str>) -> AuthResult<UserId> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoCredential)?;
        Ok(self.tokens.verify(token)?)
    }

    /// The authenticated user's own record
    pub async fn current_user(&self, subject: UserId) -> AuthResult<User> {
        self.users
            .find_by_id(subject)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
