//! Profile update payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::{Gender, SocialLinks};

/// Quick edit from the profile page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<Gender>,
}

/// Everything the onboarding form can set
///
/// `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub dob: Option<NaiveDate>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub interests: Option<Vec<String>>,
    pub profession: Option<String>,
    pub cover_image: Option<String>,
    pub social_links: Option<SocialLinks>,
}

impl From<ProfileUpdate> for ProfileChanges {
    fn from(update: ProfileUpdate) -> Self {
        Self {
            username: update.username,
            bio: update.bio,
            gender: update.gender,
            ..Self::default()
        }
    }
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
