//! Authentication request negotiation.
//!
//! [`RequestNegotiator`] walks the filtered, ordered endpoints and yields one
//! [`AuthenticationRequest`] per usable endpoint. It is a plain pull-based
//! iterator: an endpoint is only looked at (and its association only
//! negotiated) when the consumer asks for the next request.
//!
//! Endpoints whose association cannot be created are held back and yielded
//! after every other endpoint, pinned to
//! [`AssociationPreference::IfAlreadyEstablished`] so the failed negotiation
//! is not retried. When security settings require an association they are
//! dropped instead.

use crate::endpoint::ProviderEndpoint;
use crate::request::{AssociationPreference, AuthenticationRequest, RequestContext};
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Lazy sequence of authentication requests.
#[derive(Debug)]
pub struct RequestNegotiator {
    endpoints: std::vec::IntoIter<ProviderEndpoint>,
    deferred: VecDeque<ProviderEndpoint>,
    fallback_started: bool,
    create_new_associations: bool,
    context: Arc<RequestContext>,
}

impl RequestNegotiator {
    pub(crate) fn new(
        endpoints: Vec<ProviderEndpoint>,
        context: Arc<RequestContext>,
        create_new_associations: bool,
    ) -> Self {
        Self {
            endpoints: endpoints.into_iter(),
            deferred: VecDeque::new(),
            fallback_started: false,
            create_new_associations,
            context,
        }
    }

    fn request(&self, endpoint: ProviderEndpoint) -> AuthenticationRequest {
        AuthenticationRequest::new(endpoint, Arc::clone(&self.context))
    }

    fn existing_only(&self, endpoint: ProviderEndpoint) -> AuthenticationRequest {
        self.request(endpoint)
            .with_association_preference(AssociationPreference::IfAlreadyEstablished)
    }

    fn negotiate(&mut self, endpoint: ProviderEndpoint) -> Option<AuthenticationRequest> {
        let manager = &self.context.manager;
        let provider = &endpoint.provider_description;

        if !manager.has_association_store() {
            tracing::debug!(provider = %provider.uri, "No association store, using dumb mode");
            return Some(self.request(endpoint));
        }

        if self.create_new_associations {
            if manager.get_or_create_association(provider).is_none() {
                tracing::debug!(provider = %provider.uri, "No association, deferring endpoint");
                self.deferred.push_back(endpoint);
                return None;
            }
            return Some(self.request(endpoint));
        }

        let existing = manager.get_existing_association(provider);
        tracing::debug!(
            provider = %provider.uri,
            has_association = existing.is_some(),
            "Using existing associations only"
        );
        Some(self.existing_only(endpoint))
    }

    fn start_fallback(&mut self) {
        self.fallback_started = true;
        if self.deferred.is_empty() {
            return;
        }

        if self.context.require_association {
            tracing::warn!(
                skipped = self.deferred.len(),
                "Associations are required but could not be formed, skipping providers"
            );
            self.deferred.clear();
        } else {
            tracing::debug!(
                deferred = self.deferred.len(),
                "Yielding endpoints whose association failed"
            );
        }
    }
}

impl Iterator for RequestNegotiator {
    type Item = AuthenticationRequest;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(endpoint) = self.endpoints.next() {
            if let Some(request) = self.negotiate(endpoint) {
                return Some(request);
            }
        }

        if !self.fallback_started {
            self.start_fallback();
        }

        let endpoint = self.deferred.pop_front()?;
        Some(self.existing_only(endpoint))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let upper = self.endpoints.len() + self.deferred.len();
        if self.fallback_started {
            (upper, Some(upper))
        } else {
            (0, Some(upper))
        }
    }
}

impl FusedIterator for RequestNegotiator {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::endpoint::ProtocolVersion;
    use crate::manager::AssociationManager;
    use crate::mocks::{MockAssociationNegotiator, test_clock};
    use crate::providers::AssociationRepository;
    use crate::realm::Realm;
    use crate::stores::InMemoryAssociationRepository;
    use chrono::Duration;
    use url::Url;

    fn endpoint(host: &str) -> ProviderEndpoint {
        ProviderEndpoint::new(
            Url::parse(&format!("https://{host}/server")).unwrap(),
            ProtocolVersion::V2_0,
        )
        .with_claimed_identifier(format!("https://alice.{host}/"))
    }

    fn negotiator(
        endpoints: Vec<ProviderEndpoint>,
        mock: &MockAssociationNegotiator,
        repository: Option<Arc<dyn AssociationRepository>>,
        create: bool,
        require_association: bool,
    ) -> RequestNegotiator {
        let clock = test_clock();
        let context = Arc::new(RequestContext {
            realm: Realm::parse("https://rp.example/").unwrap(),
            return_to: Url::parse("https://rp.example/return").unwrap(),
            manager: AssociationManager::new(
                repository,
                Arc::new(mock.clone()),
                Arc::new(clock),
                Duration::zero(),
            ),
            require_association,
        });
        RequestNegotiator::new(endpoints, context, create)
    }

    fn store() -> Option<Arc<dyn AssociationRepository>> {
        let clock = Arc::new(test_clock());
        Some(Arc::new(InMemoryAssociationRepository::with_clock(clock)))
    }

    fn hosts(requests: &[AuthenticationRequest]) -> Vec<&str> {
        requests
            .iter()
            .map(|r| r.provider().host_str().unwrap())
            .collect()
    }

    #[test]
    fn test_failed_endpoints_yield_last() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let e2 = endpoint("e2.example");
        mock.fail_for(&e2.provider_uri);

        let endpoints = vec![endpoint("e1.example"), e2, endpoint("e3.example")];

        let negotiated = negotiator(endpoints, &mock, store(), true, false);
        let requests: Vec<_> = negotiated.collect();

        assert_eq!(hosts(&requests), ["e1.example", "e3.example", "e2.example"]);
        assert_eq!(
            requests[2].association_preference(),
            AssociationPreference::IfAlreadyEstablished
        );
        assert_eq!(
            requests[0].association_preference(),
            AssociationPreference::IfPossible
        );
    }

    #[test]
    fn test_required_association_drops_failed_endpoints() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let e2 = endpoint("e2.example");
        mock.fail_for(&e2.provider_uri);

        let endpoints = vec![endpoint("e1.example"), e2, endpoint("e3.example")];

        let requests: Vec<_> = negotiator(endpoints, &mock, store(), true, true).collect();

        assert_eq!(hosts(&requests), ["e1.example", "e3.example"]);
    }

    #[test]
    fn test_no_look_ahead() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let endpoints = vec![
            endpoint("e1.example"),
            endpoint("e2.example"),
            endpoint("e3.example"),
        ];

        let mut requests = negotiator(endpoints, &mock, store(), true, false);
        let first = requests.next().unwrap();

        assert_eq!(first.provider().host_str(), Some("e1.example"));
        assert_eq!(mock.total_calls(), 1);
    }

    #[test]
    fn test_without_store_yields_everything_in_dumb_mode() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let endpoints = vec![endpoint("e1.example"), endpoint("e2.example")];

        let mut requests: Vec<_> = negotiator(endpoints, &mock, None, true, false).collect();

        assert_eq!(hosts(&requests), ["e1.example", "e2.example"]);
        assert!(requests[0].build().unwrap().is_dumb_mode());
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_existing_only_never_negotiates() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let endpoints = vec![endpoint("e1.example"), endpoint("e2.example")];

        let negotiated = negotiator(endpoints, &mock, store(), false, false);
        let mut requests: Vec<_> = negotiated.collect();

        assert_eq!(requests.len(), 2);
        assert!(requests[0].build().unwrap().is_dumb_mode());
        assert_eq!(mock.total_calls(), 0);
    }

    #[test]
    fn test_empty_and_fused() {
        let mock = MockAssociationNegotiator::new(Arc::new(test_clock()));
        let mut requests = negotiator(Vec::new(), &mock, store(), true, false);

        assert!(requests.next().is_none());
        assert!(requests.next().is_none());
        assert_eq!(requests.size_hint(), (0, Some(0)));
    }
}
