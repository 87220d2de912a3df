//! User directory and profile editing.
//!
//! Every write takes the authenticated subject; a user can only ever change
//! their own profile.

pub mod models;

pub use models::{ProfileChanges, ProfileUpdate};

use std::sync::Arc;

use crate::{
    auth::{AuthError, AuthResult, MAX_BIO_LENGTH, User, UserId, UserSummary},
    db::UserRepository,
};

/// Profile manager
#[derive(Clone)]
pub struct ProfileManager {
    users: Arc<dyn UserRepository>,
}

impl ProfileManager {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Every user, without password material
    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        self.users.list_users().await
    }

    /// Public cards for every user
    pub async fn list_summaries(&self) -> AuthResult<Vec<UserSummary>> {
        Ok(self
            .users
            .list_users()
            .await?
            .iter()
            .map(User::summary)
            .collect())
    }

    /// Change username, bio or gender on the subject's own profile
    pub async fn update_profile(&self, subject: UserId, update: ProfileUpdate) -> AuthResult<User> {
        self.apply(subject, update.into()).await
    }

    /// Fill in the onboarding form for the subject's own profile
    pub async fn onboard(&self, subject: UserId, changes: ProfileChanges) -> AuthResult<User> {
        self.apply(subject, changes).await
    }

    async fn apply(&self, subject: UserId, mut changes: ProfileChanges) -> AuthResult<User> {
        normalize(&mut changes)?;

        if changes.is_empty() {
            return self
                .users
                .find_by_id(subject)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        let user = self
            .users
            .update_profile(subject, &changes)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        log::debug!("Updated profile of user {}", subject);
        Ok(user)
    }
}

/// Trim free text and reject values the profile cannot hold.
fn normalize(changes: &mut ProfileChanges) -> AuthResult<()> {
    if let Some(username) = changes.username.as_mut() {
        let trimmed = username.trim();
        if trimmed.is_empty() {
            return Err(AuthError::InvalidField {
                field: "username",
                reason: "must not be empty".to_string(),
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidField {
                field: "username",
                reason: "must not contain spaces".to_string(),
            });
        }
        *username = trimmed.to_string();
    }

    if let Some(bio) = changes.bio.as_mut() {
        *bio = bio.trim().to_string();
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Err(AuthError::InvalidField {
                field: "bio",
                reason: format!("must be at most {MAX_BIO_LENGTH} characters"),
            });
        }
    }

    if let Some(interests) = changes.interests.as_mut() {
        interests.retain(|i| !i.trim().is_empty());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{Gender, NewUser},
        db::MemoryStore,
    };

    async fn setup() -> (ProfileManager, Arc<MemoryStore>, User, User) {
        let store = Arc::new(MemoryStore::new());
        let mut users = Vec::new();
        for email in ["a@x.io", "b@x.io"] {
            let user = store
                .create_user(NewUser {
                    name: "User".to_string(),
                    email: email.to_string(),
                    password_hash: "digest".to_string(),
                    avatar: String::new(),
                })
                .await
                .unwrap();
            users.push(user);
        }
        let b = users.pop().unwrap();
        let a = users.pop().unwrap();
        (ProfileManager::new(store.clone()), store, a, b)
    }

    #[tokio::test]
    async fn test_update_own_profile() {
        let (profiles, _, a, _) = setup().await;
        let user = profiles
            .update_profile(
                a.id,
                ProfileUpdate {
                    username: Some("  ann  ".to_string()),
                    bio: Some("hi".to_string()),
                    gender: Some(Gender::Female),
                },
            )
            .await
            .unwrap();

        assert_eq!(user.username.as_deref(), Some("ann"));
        assert_eq!(user.gender, Gender::Female);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let (profiles, _, a, b) = setup().await;
        let update = || ProfileUpdate {
            username: Some("ann".to_string()),
            ..Default::default()
        };
        profiles.update_profile(a.id, update()).await.unwrap();

        let err = profiles.update_profile(b.id, update()).await.unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(err.kind(), crate::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_bio_too_long() {
        let (profiles, store, a, _) = setup().await;
        let err = profiles
            .onboard(
                a.id,
                ProfileChanges {
                    bio: Some("x".repeat(MAX_BIO_LENGTH + 1)),
                    location: Some("Pune".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidField { field: "bio", .. }));
        // Nothing from the rejected form is stored
        let stored = store.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.location, "");
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let (profiles, _, _, _) = setup().await;
        let err = profiles
            .onboard(uuid::Uuid::new_v4(), ProfileChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }
}
