//! Relying-party entry point.

use crate::config::RelyingPartyConfig;
use crate::endpoint::{Identifier, ProviderEndpoint};
use crate::environment::RelyingPartyEnvironment;
use crate::error::{RelyingPartyError, Result};
use crate::filter::{filter_and_sort, is_secure_endpoint};
use crate::manager::AssociationManager;
use crate::negotiator::RequestNegotiator;
use crate::realm::Realm;
use crate::request::RequestContext;
use std::sync::Arc;
use url::Url;

/// OpenID relying party.
///
/// Cheap to clone; clones share the association store.
#[derive(Debug, Clone)]
pub struct RelyingParty {
    config: RelyingPartyConfig,
    environment: RelyingPartyEnvironment,
    manager: AssociationManager,
}

impl RelyingParty {
    /// Create a relying party.
    ///
    /// # Errors
    ///
    /// Returns [`RelyingPartyError::Configuration`] if the security settings
    /// require associations but the environment has no association store.
    pub fn new(config: RelyingPartyConfig, environment: RelyingPartyEnvironment) -> Result<Self> {
        if config.security.require_association && environment.associations.is_none() {
            return Err(RelyingPartyError::Configuration(
                "require_association needs an association store".to_string(),
            ));
        }

        let manager = AssociationManager::new(
            environment.associations.clone(),
            Arc::clone(&environment.negotiator),
            Arc::clone(&environment.clock),
            config.security.minimum_association_lifetime,
        );

        Ok(Self {
            config,
            environment,
            manager,
        })
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    /// Association manager shared by every request.
    #[must_use]
    pub const fn association_manager(&self) -> &AssociationManager {
        &self.manager
    }

    /// Remove expired associations from the store. Returns how many were
    /// removed.
    pub fn clear_expired_associations(&self) -> usize {
        self.manager.clear_expired()
    }

    /// Start authenticating `user_identifier`.
    ///
    /// Discovers the identifier's provider endpoints, filters and orders
    /// them, and returns a lazy sequence of authentication requests, most
    /// preferred first. Discovery failure yields an empty sequence.
    ///
    /// # Errors
    ///
    /// Precondition failures only:
    /// - [`RelyingPartyError::InvalidIdentifier`] for a blank identifier
    /// - [`RelyingPartyError::InvalidRealm`] for a malformed realm
    /// - [`RelyingPartyError::InvalidUrl`] for a malformed return-to URL
    /// - [`RelyingPartyError::ReturnToOutsideRealm`] if the return-to URL is
    ///   not covered by the realm
    pub fn create(
        &self,
        user_identifier: &str,
        realm: &str,
        return_to: &str,
        create_new_associations: bool,
    ) -> Result<RequestNegotiator> {
        let identifier = Identifier::parse(user_identifier)?;
        let realm = Realm::parse(realm)?;
        let return_to = Url::parse(return_to).map_err(|e| RelyingPartyError::InvalidUrl {
            field: "return_to",
            reason: e.to_string(),
        })?;
        if !realm.contains(&return_to) {
            return Err(RelyingPartyError::ReturnToOutsideRealm {
                return_to: return_to.to_string(),
                realm: realm.to_string(),
            });
        }

        let endpoints = self.discover(&identifier);
        let security = &self.config.security;
        let filtered = filter_and_sort(
            endpoints,
            security.minimum_protocol_version,
            |endpoint| self.accepts(endpoint),
            |a, b| (self.config.endpoint_order)(a, b),
        );

        tracing::debug!(
            identifier = %identifier,
            endpoints = filtered.endpoints.len(),
            dropped = filtered.dropped,
            "Prepared provider endpoints"
        );

        let context = Arc::new(RequestContext {
            realm,
            return_to,
            manager: self.manager.clone(),
            require_association: security.require_association,
        });
        Ok(RequestNegotiator::new(filtered.endpoints, context, create_new_associations))
    }

    fn discover(&self, identifier: &Identifier) -> Vec<ProviderEndpoint> {
        match self.environment.discovery.discover(identifier) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Discovery failed, continuing with no endpoints"
                );
                Vec::new()
            }
        }
    }

    fn accepts(&self, endpoint: &ProviderEndpoint) -> bool {
        if self.config.security.require_ssl && !is_secure_endpoint(endpoint) {
            return false;
        }
        self.config
            .endpoint_filter
            .as_ref()
            .is_none_or(|filter| filter(endpoint))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::SecuritySettings;
    use crate::endpoint::ProtocolVersion;
    use crate::mocks::{MockAssociationNegotiator, MockDiscovery, test_clock};
    use crate::stores::InMemoryAssociationRepository;

    const REALM: &str = "https://rp.example/";
    const RETURN_TO: &str = "https://rp.example/return";

    fn environment(discovery: MockDiscovery) -> RelyingPartyEnvironment {
        let clock = Arc::new(test_clock());
        RelyingPartyEnvironment::new(
            Arc::new(discovery),
            Arc::new(MockAssociationNegotiator::new(clock.clone())),
            Arc::new(InMemoryAssociationRepository::with_clock(clock.clone())),
        )
        .with_clock(clock)
    }

    fn relying_party(config: RelyingPartyConfig, discovery: MockDiscovery) -> RelyingParty {
        RelyingParty::new(config, environment(discovery)).unwrap()
    }

    fn endpoint(uri: &str, version: ProtocolVersion) -> ProviderEndpoint {
        ProviderEndpoint::new(Url::parse(uri).unwrap(), version)
            .with_claimed_identifier("https://alice.example/")
    }

    #[test]
    fn test_require_association_without_store_is_rejected() {
        let clock = Arc::new(test_clock());
        let env = RelyingPartyEnvironment::stateless(
            Arc::new(MockDiscovery::new()),
            Arc::new(MockAssociationNegotiator::new(clock)),
        );
        let security = SecuritySettings::new().with_require_association(true);
        let config = RelyingPartyConfig::new(security);

        let err = RelyingParty::new(config, env).unwrap_err();
        assert!(matches!(err, RelyingPartyError::Configuration(_)));
    }

    #[test]
    fn test_preconditions() {
        let rp = relying_party(RelyingPartyConfig::default(), MockDiscovery::new());

        assert!(matches!(
            rp.create("  ", REALM, RETURN_TO, true),
            Err(RelyingPartyError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            rp.create("alice.example", REALM, "/relative", true),
            Err(RelyingPartyError::InvalidUrl { .. })
        ));
        assert!(matches!(
            rp.create("alice.example", REALM, "https://other.example/", true),
            Err(RelyingPartyError::ReturnToOutsideRealm { .. })
        ));
    }

    #[test]
    fn test_discovery_failure_yields_empty_sequence() {
        let rp = relying_party(RelyingPartyConfig::default(), MockDiscovery::new());

        let requests = rp.create("unknown.example", REALM, RETURN_TO, true);
        assert_eq!(requests.unwrap().count(), 0);
    }

    #[test]
    fn test_require_ssl_and_custom_filter() {
        let discovery = MockDiscovery::new().with(
            "alice.example",
            vec![
                endpoint("http://plain.example/server", ProtocolVersion::V2_0),
                endpoint("https://blocked.example/server", ProtocolVersion::V2_0),
                endpoint("https://good.example/server", ProtocolVersion::V2_0),
            ],
        );
        let blocked = |e: &ProviderEndpoint| e.provider_uri.host_str() != Some("blocked.example");
        let config = RelyingPartyConfig::new(SecuritySettings::new().with_require_ssl(true))
            .with_endpoint_filter(blocked);
        let rp = relying_party(config, discovery);

        let requests: Vec<_> = rp
            .create("alice.example", REALM, RETURN_TO, true)
            .unwrap()
            .collect();

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider().host_str(), Some("good.example"));
    }

    #[test]
    fn test_default_order_puts_newer_versions_first() {
        let discovery = MockDiscovery::new().with(
            "alice.example",
            vec![
                endpoint("https://v1.example/server", ProtocolVersion::V1_1),
                endpoint("https://v2.example/server", ProtocolVersion::V2_0),
            ],
        );
        let rp = relying_party(RelyingPartyConfig::default(), discovery);

        let requests: Vec<_> = rp
            .create("alice.example", REALM, RETURN_TO, false)
            .unwrap()
            .collect();

        assert_eq!(requests[0].provider().host_str(), Some("v2.example"));
        assert_eq!(requests[1].provider().host_str(), Some("v1.example"));
    }
}
