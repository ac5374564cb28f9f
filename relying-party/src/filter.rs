//! Endpoint filtering and ordering.
//!
//! Pure function over discovered endpoints: drop the ones below the minimum
//! protocol version or rejected by the predicate, then stable-sort the rest.

use crate::endpoint::{ProtocolVersion, ProviderEndpoint};
use std::cmp::Ordering;

/// Result of [`filter_and_sort`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredEndpoints {
    /// Retained endpoints, most preferred first.
    pub endpoints: Vec<ProviderEndpoint>,

    /// Number of endpoints dropped by the version check or the predicate.
    pub dropped: usize,
}

/// Filter endpoints by minimum version and `predicate`, then order them with
/// `compare`.
///
/// The sort is stable: endpoints that compare equal keep their input order.
///
/// # Examples
///
/// ```
/// use openid_relying_party::filter::filter_and_sort;
/// use openid_relying_party::{ProtocolVersion, ProviderEndpoint};
/// use std::cmp::Ordering;
/// use url::Url;
///
/// let old = Url::parse("https://old.example/").unwrap();
/// let new = Url::parse("https://new.example/").unwrap();
/// let endpoints = vec![
///     ProviderEndpoint::new(old, ProtocolVersion::V1_1),
///     ProviderEndpoint::new(new, ProtocolVersion::V2_0),
/// ];
///
/// let unordered = |_: &ProviderEndpoint, _: &ProviderEndpoint| Ordering::Equal;
/// let result = filter_and_sort(endpoints, ProtocolVersion::V2_0, |_| true, unordered);
/// assert_eq!(result.endpoints.len(), 1);
/// assert_eq!(result.dropped, 1);
/// ```
pub fn filter_and_sort<P, C>(
    endpoints: Vec<ProviderEndpoint>,
    minimum_version: ProtocolVersion,
    predicate: P,
    compare: C,
) -> FilteredEndpoints
where
    P: Fn(&ProviderEndpoint) -> bool,
    C: Fn(&ProviderEndpoint, &ProviderEndpoint) -> Ordering,
{
    let total = endpoints.len();
    let mut retained = endpoints;
    retained.retain(|endpoint| endpoint.protocol_version >= minimum_version);
    retained.retain(predicate);
    let dropped = total - retained.len();

    if dropped > 0 {
        tracing::debug!(
            dropped,
            retained = retained.len(),
            minimum_version = %minimum_version,
            "Filtered out provider endpoints"
        );
    }

    retained.sort_by(|a, b| compare(a, b));

    FilteredEndpoints {
        endpoints: retained,
        dropped,
    }
}

/// Whether an endpoint uses HTTPS for its provider URI and, unless the
/// provider picks the identity, for its claimed identifier.
///
/// Claimed identifiers that are not URLs (XRIs) are accepted.
#[must_use]
pub fn is_secure_endpoint(endpoint: &ProviderEndpoint) -> bool {
    if endpoint.provider_uri.scheme() != "https" {
        return false;
    }
    if endpoint.is_directed_identity() {
        return true;
    }
    endpoint
        .claimed_identifier
        .as_deref()
        .and_then(|claimed| url::Url::parse(claimed).ok())
        .is_none_or(|claimed| claimed.scheme() == "https")
}
