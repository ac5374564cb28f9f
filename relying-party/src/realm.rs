//! Relying-party realm.
//!
//! The realm is the URL pattern the provider shows the user as the site
//! asking for authentication. Every return-to URL must fall under it.

use crate::error::{RelyingPartyError, Result};
use std::fmt;
use url::Url;

const WILDCARD_MARKER: &str = "://*.";

/// Parsed realm, optionally with a `*.` wildcard host.
///
/// # Examples
///
/// ```
/// # use openid_relying_party::Realm;
/// # use url::Url;
/// let realm = Realm::parse("https://*.example.com/").unwrap();
/// assert!(realm.contains(&Url::parse("https://www.example.com/login/return").unwrap()));
/// assert!(!realm.contains(&Url::parse("https://example.org/").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Realm {
    original: String,
    base: Url,
    wildcard: bool,
}

impl Realm {
    /// Parse a realm.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::InvalidRealm`] if the realm is not an
    /// absolute http(s) URL with a host, or carries a fragment.
    pub fn parse(input: &str) -> Result<Self> {
        let wildcard = input.contains(WILDCARD_MARKER);
        let normalized = if wildcard {
            input.replacen(WILDCARD_MARKER, "://", 1)
        } else {
            input.to_string()
        };

        let base = Url::parse(&normalized).map_err(|e| RelyingPartyError::InvalidRealm {
            reason: format!("'{input}': {e}"),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(RelyingPartyError::InvalidRealm {
                reason: format!("'{input}': scheme must be http or https"),
            });
        }
        if base.host_str().is_none_or(str::is_empty) {
            return Err(RelyingPartyError::InvalidRealm {
                reason: format!("'{input}': missing host"),
            });
        }
        if base.fragment().is_some() {
            return Err(RelyingPartyError::InvalidRealm {
                reason: format!("'{input}': realm must not contain a fragment"),
            });
        }

        Ok(Self {
            original: input.to_string(),
            base,
            wildcard,
        })
    }

    /// Whether the realm uses a `*.` wildcard host.
    #[must_use]
    pub const fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether `url` falls under this realm.
    #[must_use]
    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != self.base.scheme()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return false;
        }

        let (Some(host), Some(realm_host)) = (url.host_str(), self.base.host_str()) else {
            return false;
        };
        let host_matches = host == realm_host
            || (self.wildcard
                && host
                    .strip_suffix(realm_host)
                    .is_some_and(|prefix| prefix.ends_with('.')));
        if !host_matches {
            return false;
        }

        let realm_path = self.base.path();
        let path = url.path();
        path == realm_path
            || (path.starts_with(realm_path)
                && (realm_path.ends_with('/') || path[realm_path.len()..].starts_with('/')))
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_exact_host_realm() {
        let realm = Realm::parse("https://rp.example/").unwrap();
        assert!(realm.contains(&url("https://rp.example/openid/return")));
        assert!(!realm.contains(&url("https://sub.rp.example/return")));
        assert!(!realm.contains(&url("http://rp.example/return")));
        assert!(!realm.contains(&url("https://rp.example:8443/return")));
    }

    #[test]
    fn test_wildcard_realm() {
        let realm = Realm::parse("https://*.rp.example/").unwrap();
        assert!(realm.has_wildcard());
        assert!(realm.contains(&url("https://rp.example/return")));
        assert!(realm.contains(&url("https://a.b.rp.example/return")));
        assert!(!realm.contains(&url("https://evilrp.example/return")));
        assert_eq!(realm.to_string(), "https://*.rp.example/");
    }

    #[test]
    fn test_path_must_be_subdirectory() {
        let realm = Realm::parse("https://rp.example/app").unwrap();
        assert!(realm.contains(&url("https://rp.example/app")));
        assert!(realm.contains(&url("https://rp.example/app/return")));
        assert!(!realm.contains(&url("https://rp.example/application")));
        assert!(!realm.contains(&url("https://rp.example/other")));
    }

    #[test]
    fn test_invalid_realms() {
        assert!(Realm::parse("not a url").is_err());
        assert!(Realm::parse("ftp://rp.example/").is_err());
        assert!(Realm::parse("https://rp.example/#frag").is_err());
    }
}
