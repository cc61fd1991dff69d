//! LinkResolver maps launch URIs onto deep-link targets
//!
//! Recognized shapes, for both custom-scheme and universal links:
//!
//! - `photos/<id>`, `shared/<id>` → photo
//! - `friends/<uuid>`, `confirm-friendship/<uuid>` → friend
//! - `friendship?data=<b64>` or `friendships/name?data=<b64>` → friendship name
//! - `?type=friendship&data=<b64>` on a custom scheme → friendship name
//! - otherwise `?photoId=` / `?friendshipUuid=` query parameters
//!
//! Custom schemes put the first segment in the host position
//! (`wisaw://photos/abc`), so the host is treated as a path segment there.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{DeepLinkTarget, FRIENDSHIP_UUID_PARAM, PHOTO_ID_PARAM};
use crate::config::RoutingConfig;
use crate::error::RouteError;

const FRIENDSHIP_NAME_ACTION: &str = "friendshipName";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FriendshipPayload {
    action: Option<String>,
    friendship_uuid: Option<String>,
    friend_name: Option<String>,
    timestamp: Option<i64>,
}

/// Resolver configured with the prefixes the app answers to
#[derive(Debug, Clone)]
pub struct LinkResolver {
    prefixes: Vec<String>,
}

impl LinkResolver {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            prefixes: config
                .prefixes
                .iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether the URI belongs to this app
    pub fn accepts(&self, uri: &Url) -> bool {
        let uri = uri.as_str().to_ascii_lowercase();
        self.prefixes.iter().any(|prefix| uri.starts_with(prefix))
    }

    /// Resolve a launch URI
    ///
    /// Returns `Ok(None)` for foreign URIs and unrecognized paths, and an error
    /// only when an embedded friendship payload cannot be decoded.
    pub fn resolve(&self, uri: &Url) -> Result<Option<DeepLinkTarget>, RouteError> {
        if !self.accepts(uri) {
            debug!(uri = %uri, "Launch URI does not match a routing prefix");
            return Ok(None);
        }

        let custom_scheme = !matches!(uri.scheme(), "http" | "https");
        let mut segments: Vec<String> = Vec::new();
        if custom_scheme && let Some(host) = uri.host_str() {
            segments.push(host.trim().to_ascii_lowercase());
        }
        if let Some(path) = uri.path_segments() {
            segments.extend(
                path.map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
        let query: HashMap<String, String> = uri.query_pairs().into_owned().collect();

        if custom_scheme
            && query.get("type").map(String::as_str) == Some("friendship")
            && let Some(data) = query.get("data")
        {
            return decode_friendship(data);
        }

        resolve_target(&segments, &query)
    }
}

fn resolve_target(
    segments: &[String],
    query: &HashMap<String, String>,
) -> Result<Option<DeepLinkTarget>, RouteError> {
    if let Some(primary) = segments.first() {
        let primary = primary.to_ascii_lowercase();
        let secondary = segments.get(1).map(String::as_str);

        match (primary.as_str(), secondary) {
            ("photos" | "shared", Some(id)) => {
                if let Some(target) = DeepLinkTarget::photo(id) {
                    return Ok(Some(target));
                }
            }
            ("friends" | "confirm-friendship", Some(uuid)) => {
                if let Some(target) = DeepLinkTarget::friend(uuid) {
                    return Ok(Some(target));
                }
            }
            ("friendship", _) | ("friendships", Some("name")) => {
                if let Some(data) = query.get("data") {
                    return decode_friendship(data);
                }
            }
            _ => {}
        }
    }

    Ok(query
        .get(PHOTO_ID_PARAM)
        .and_then(|id| DeepLinkTarget::photo(id))
        .or_else(|| {
            query
                .get(FRIENDSHIP_UUID_PARAM)
                .and_then(|uuid| DeepLinkTarget::friend(uuid))
        }))
}

/// Decode a base64 JSON friendship-name payload
///
/// A payload that decodes but lacks the expected fields resolves to `None`.
fn decode_friendship(data: &str) -> Result<Option<DeepLinkTarget>, RouteError> {
    let data = data.trim();
    let bytes = STANDARD.decode(data).or_else(|_| URL_SAFE.decode(data))?;
    let payload: FriendshipPayload = serde_json::from_slice(&bytes)?;

    match payload {
        FriendshipPayload {
            action: Some(action),
            friendship_uuid: Some(friendship_uuid),
            friend_name: Some(friend_name),
            timestamp,
        } if action == FRIENDSHIP_NAME_ACTION
            && !friendship_uuid.is_empty()
            && !friend_name.is_empty() =>
        {
            Ok(Some(DeepLinkTarget::FriendshipName {
                friendship_uuid,
                friend_name,
                timestamp,
            }))
        }
        other => {
            debug!(
                has_action = other.action.is_some(),
                has_uuid = other.friendship_uuid.is_some(),
                has_name = other.friend_name.is_some(),
                "Friendship payload has unexpected shape"
            );
            Ok(None)
        }
    }
}
