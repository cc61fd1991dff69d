//! Resolve a launch URI to a deep-link target

use anyhow::{Context, Result};
use clap::Args;
use referral_core::{DeepLinkTarget, LinkResolver, ReferralConfig, ReferralError};
use url::Url;

/// Route command arguments
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Launch URI, e.g. wisaw://photos/42
    pub uri: String,

    /// Print the target as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run route command
pub fn run(args: RouteArgs, config: &ReferralConfig) -> Result<()> {
    let uri = Url::parse(&args.uri).with_context(|| format!("Invalid URI: {}", args.uri))?;
    let target = resolve_uri(config, &uri)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&target)?);
        return Ok(());
    }

    match target {
        Some(target) => println!("{}", describe_target(&target)),
        None => println!("no route"),
    }
    Ok(())
}

pub(crate) fn resolve_uri(
    config: &ReferralConfig,
    uri: &Url,
) -> Result<Option<DeepLinkTarget>, ReferralError> {
    config.validate()?;
    Ok(LinkResolver::new(&config.routing).resolve(uri)?)
}

/// One-line human description of a target
pub(crate) fn describe_target(target: &DeepLinkTarget) -> String {
    match target {
        DeepLinkTarget::Photo { photo_id } => format!("photo {}", photo_id),
        DeepLinkTarget::Friend { friendship_uuid } => format!("friend {}", friendship_uuid),
        DeepLinkTarget::FriendshipName {
            friendship_uuid,
            friend_name,
            ..
        } => format!("friendship {} named \"{}\"", friendship_uuid, friend_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn resolves_photo_link_with_default_prefixes() {
        let target = resolve_uri(&ReferralConfig::default(), &url("wisaw://photos/42")).unwrap();
        assert_eq!(describe_target(&target.unwrap()), "photo 42");
    }

    #[test]
    fn foreign_link_has_no_route() {
        let target =
            resolve_uri(&ReferralConfig::default(), &url("https://example.com/photos/42")).unwrap();
        assert!(target.is_none());
    }

    #[test]
    fn bad_payload_surfaces_route_error() {
        let err = resolve_uri(
            &ReferralConfig::default(),
            &url("wisaw://friendship?data=%%%not-base64"),
        )
        .unwrap_err();
        assert!(matches!(err, ReferralError::Route(_)));
    }

    #[test]
    fn invalid_config_surfaces_config_error() {
        let mut config = ReferralConfig::default();
        config.routing.prefixes = vec![String::new()];

        let err = resolve_uri(&config, &url("wisaw://photos/1")).unwrap_err();

        assert!(matches!(err, ReferralError::Config(_)));
    }

    #[test]
    fn describes_friendship_name() {
        let target = DeepLinkTarget::FriendshipName {
            friendship_uuid: "u-1".to_string(),
            friend_name: "Kim".to_string(),
            timestamp: None,
        };
        assert_eq!(describe_target(&target), "friendship u-1 named \"Kim\"");
    }
}
