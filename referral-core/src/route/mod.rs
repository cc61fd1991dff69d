//! Deep-link targets derived from referral parameters and launch URIs

pub mod listener;
pub mod resolver;

use serde::{Deserialize, Serialize};

use crate::session::ReferringParams;

pub use listener::{RouteListener, RoutedLaunch};
pub use resolver::LinkResolver;

/// Referral parameter naming a shared photo
pub const PHOTO_ID_PARAM: &str = "photoId";
/// Referral parameter naming a friendship to confirm
pub const FRIENDSHIP_UUID_PARAM: &str = "friendshipUuid";

/// Where a launch should take the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeepLinkTarget {
    /// Open a shared photo
    Photo { photo_id: String },
    /// Confirm a friendship request
    Friend { friendship_uuid: String },
    /// Apply a name to an existing friendship
    FriendshipName {
        friendship_uuid: String,
        friend_name: String,
        timestamp: Option<i64>,
    },
}

impl DeepLinkTarget {
    pub(crate) fn photo(id: &str) -> Option<Self> {
        non_empty(id).map(|photo_id| Self::Photo { photo_id })
    }

    pub(crate) fn friend(uuid: &str) -> Option<Self> {
        non_empty(uuid).map(|friendship_uuid| Self::Friend { friendship_uuid })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Target named by backend referral parameters
///
/// When both are present the app opens the photo and then the friendship
/// confirmation on top of it, so `friendshipUuid` is the target.
pub fn resolve_params(params: &ReferringParams) -> Option<DeepLinkTarget> {
    params
        .get(FRIENDSHIP_UUID_PARAM)
        .and_then(DeepLinkTarget::friend)
        .or_else(|| params.get(PHOTO_ID_PARAM).and_then(DeepLinkTarget::photo))
}
