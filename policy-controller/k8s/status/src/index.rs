//! Watch-driven index of attachments, targets, secrets, and authorization
//! records. Every event re-evaluates the affected target's attachments
//! through the conflict engine and queues status patches for the
//! controller.

use crate::{conditions, resource_id::NamespaceGroupKindName};
use ahash::AHashMap as HashMap;
use gateway_policy_controller_core::{conflict, AttachmentId, PolicyKind, TargetKind};
use gateway_policy_controller_k8s_api::{
    self as k8s, gateway, multicluster::ServiceImport, policy, Condition, ResourceExt,
};
use gateway_policy_controller_k8s_index::{
    decompose, resolve_secret, resolve_target, snapshot, AttachmentIndex, AttachmentKey,
    AttachmentSnapshot, AuthorizationCache, PolicyResource, ResolveError, ResourceId,
    SecretSnapshot, TargetKey, TargetSnapshot,
};
use kubert::lease::Claim;
use parking_lot::RwLock;
use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch::Receiver},
    time::Duration,
};

pub type SharedIndex = Arc<RwLock<Index>>;

/// A status patch addressed to one attachment resource.
#[derive(Debug, PartialEq)]
pub struct Update {
    pub id: NamespaceGroupKindName,
    pub patch: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct IndexMetrics {
    patches_enqueued: Counter,
    patches_dropped: Counter,
}

impl IndexMetrics {
    pub fn register(registry: &mut Registry) -> Self {
        let patches_enqueued = Counter::default();
        registry.register(
            "patches_enqueued",
            "Status patches queued for the status controller",
            patches_enqueued.clone(),
        );

        let patches_dropped = Counter::default();
        registry.register(
            "patches_dropped",
            "Status patches dropped because the update channel was full",
            patches_dropped.clone(),
        );

        Self {
            patches_enqueued,
            patches_dropped,
        }
    }
}

pub struct Index {
    name: String,
    claims: Receiver<Arc<Claim>>,
    updates: mpsc::Sender<Update>,
    metrics: IndexMetrics,

    attachments: AttachmentIndex,
    targets: HashMap<TargetKey, TargetSnapshot>,
    secrets: HashMap<ResourceId, SecretSnapshot>,
    grants: AuthorizationCache,
}

impl Index {
    pub fn shared(
        name: impl ToString,
        claims: Receiver<Arc<Claim>>,
        updates: mpsc::Sender<Update>,
        metrics: IndexMetrics,
    ) -> SharedIndex {
        Arc::new(RwLock::new(Self {
            name: name.to_string(),
            claims,
            updates,
            metrics,
            attachments: AttachmentIndex::default(),
            targets: HashMap::new(),
            secrets: HashMap::new(),
            grants: AuthorizationCache::default(),
        }))
    }

    /// Periodically re-evaluates every indexed attachment so that statuses
    /// clobbered out-of-band converge back to the computed decisions.
    pub async fn run(index: SharedIndex, reconciliation_period: Duration) {
        let mut interval = tokio::time::interval(reconciliation_period);
        loop {
            interval.tick().await;
            {
                let mut index = index.write();
                if index.is_leader() {
                    index.reconcile_all();
                }
            }
        }
    }

    fn is_leader(&self) -> bool {
        self.claims.borrow().is_current_for(&self.name)
    }

    fn apply_attachment<P: PolicyResource>(&mut self, resource: P) {
        let snap = snapshot(&resource);
        let kind = snap.kind;
        let key = AttachmentKey {
            kind,
            id: snap.id.clone(),
        };

        let outcome = self.attachments.upsert(snap);
        if let Some(old) = &outcome.old_target {
            self.reindex(kind, old);
        }
        match &outcome.new_target {
            Some(new) => self.reindex(kind, new),
            None => self.review_unbucketed(&key),
        }
    }

    fn delete_attachment(&mut self, kind: PolicyKind, namespace: String, name: String) {
        let key = AttachmentKey {
            kind,
            id: ResourceId::new(namespace, name),
        };
        if let Some(target) = self.attachments.delete(&key) {
            self.reindex(kind, &target);
        }
    }

    fn apply_target(&mut self, key: TargetKey, snapshot: TargetSnapshot) {
        if self.targets.get(&key) == Some(&snapshot) {
            return;
        }
        self.targets.insert(key.clone(), snapshot);
        self.reindex_target(&key);
    }

    fn delete_target(&mut self, key: &TargetKey) {
        self.targets.remove(key);
        self.reindex_target(key);
    }

    fn reindex_target(&mut self, key: &TargetKey) {
        for kind in self.attachments.kinds_for_target(key) {
            self.reindex(kind, key);
        }
    }

    fn reconcile_all(&mut self) {
        let buckets: Vec<(PolicyKind, TargetKey)> = self
            .attachments
            .buckets()
            .map(|(kind, target)| (kind, target.clone()))
            .collect();
        for (kind, target) in buckets {
            self.reindex(kind, &target);
        }

        let unbucketed: Vec<AttachmentKey> = self
            .attachments
            .unbucketed()
            .map(|snap| AttachmentKey {
                kind: snap.kind,
                id: snap.id.clone(),
            })
            .collect();
        for key in unbucketed {
            self.review_unbucketed(&key);
        }
    }

    /// Re-runs conflict resolution for every attachment of `kind` bound to
    /// `target` and queues patches for decisions that differ from the
    /// status observed on the resource.
    fn reindex(&mut self, kind: PolicyKind, target: &TargetKey) {
        let attachments = self.attachments.list_by_target(kind, target);
        if attachments.is_empty() {
            return;
        }

        let spec = kind.spec();
        let candidates = attachments
            .iter()
            .map(|snap| conflict::Candidate {
                id: AttachmentId::new(&snap.id.namespace, &snap.id.name),
                created_at: snap.created_at,
                generation: snap.generation,
                outcome: self.candidate_outcome(spec, snap),
            })
            .collect();

        for decision in conflict::resolve(kind, candidates) {
            let id = ResourceId::new(decision.id.namespace.clone(), decision.id.name.clone());
            let observed = attachments
                .iter()
                .find(|snap| snap.id == id)
                .and_then(|snap| snap.accepted_condition.as_ref());
            self.send_if_changed(kind, &id, conditions::from_decision(&decision), observed);
        }
    }

    fn candidate_outcome(
        &self,
        spec: &'static gateway_policy_controller_core::KindSpec,
        snap: &AttachmentSnapshot,
    ) -> Result<conflict::Claims, conflict::Rejection> {
        let (key, target) = match resolve_target(snap, spec, &self.targets, &self.grants) {
            Ok(resolved) => resolved,
            Err(ResolveError::InvalidKind(message)) => {
                return Err(conflict::Rejection::Invalid(message))
            }
            Err(ResolveError::NoAccess(message)) => {
                return Err(conflict::Rejection::NoAccess(message))
            }
            Err(ResolveError::NotFound(message)) => {
                return Err(conflict::Rejection::TargetNotFound(message))
            }
        };

        // Admission checked the referenced secrets, but they may have been
        // deleted or emptied since.
        for cert in &snap.certificate_refs {
            let secret = match resolve_secret(
                &cert.secret,
                &snap.id.namespace,
                snap.kind.resource_kind(),
                &self.secrets,
                &self.grants,
            ) {
                Ok(secret) => secret,
                Err(error) => return Err(conflict::Rejection::Invalid(error.to_string())),
            };
            let mut required = vec!["tls.crt", "tls.key"];
            if cert.requires_client_ca {
                required.push("ca.crt");
            }
            for required_key in required {
                if !secret.has_key(required_key) {
                    return Err(conflict::Rejection::Invalid(format!(
                        "secret {} does not contain key {required_key}",
                        cert.secret.name,
                    )));
                }
            }
        }

        let decomposition = decompose(spec, key.kind, target, snap);
        for warning in &decomposition.dropped {
            tracing::debug!(policy = %snap.id, %warning, "Dropped selector");
        }
        Ok(conflict::Claims {
            scopes: decomposition.claims,
        })
    }

    fn review_unbucketed(&mut self, key: &AttachmentKey) {
        let Some(snap) = self.attachments.get(key) else {
            return;
        };
        let condition = conditions::invalid(
            &format!(
                "unsupported target kind {}",
                snap.target_ref.canonical_kind(),
            ),
            snap.generation,
        );
        self.send_if_changed(key.kind, &key.id, condition, snap.accepted_condition.as_ref());
    }

    fn send_if_changed(
        &self,
        kind: PolicyKind,
        id: &ResourceId,
        mut desired: Condition,
        observed: Option<&Condition>,
    ) {
        conditions::preserve_transition_time(&mut desired, observed);
        if observed
            .map(|observed| conditions::conditions_equal(observed, &desired))
            .unwrap_or(false)
        {
            return;
        }

        let id = NamespaceGroupKindName::from_attachment(kind, id);
        let patch = make_patch(&id, desired);
        match self.updates.try_send(Update { id, patch }) {
            Ok(()) => {
                self.metrics.patches_enqueued.inc();
            }
            Err(error) => {
                self.metrics.patches_dropped.inc();
                tracing::error!(%error, "Failed to queue status patch");
            }
        };
    }
}

pub(crate) fn make_patch(id: &NamespaceGroupKindName, condition: Condition) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": k8s::POLICY_API_VERSION,
        "kind": id.gkn.kind,
        "name": id.gkn.name,
        "status": {
            "conditions": [condition],
        },
    })
}

macro_rules! index_attachment {
    ($resource:ty, $kind:expr) => {
        impl kubert::index::IndexNamespacedResource<$resource> for Index {
            fn apply(&mut self, resource: $resource) {
                self.apply_attachment(resource);
            }

            fn delete(&mut self, namespace: String, name: String) {
                self.delete_attachment($kind, namespace, name);
            }
        }
    };
}

index_attachment!(policy::AccessControlPolicy, PolicyKind::AccessControl);
index_attachment!(policy::RateLimitPolicy, PolicyKind::RateLimit);
index_attachment!(policy::FaultInjectionPolicy, PolicyKind::FaultInjection);
index_attachment!(policy::HealthCheckPolicy, PolicyKind::HealthCheck);
index_attachment!(policy::LoadBalancerPolicy, PolicyKind::LoadBalancer);
index_attachment!(policy::CircuitBreakingPolicy, PolicyKind::CircuitBreaking);
index_attachment!(policy::SessionStickyPolicy, PolicyKind::SessionSticky);
index_attachment!(policy::RetryPolicy, PolicyKind::Retry);
index_attachment!(policy::UpstreamTLSPolicy, PolicyKind::UpstreamTls);
index_attachment!(policy::GatewayTLSPolicy, PolicyKind::GatewayTls);

impl kubert::index::IndexNamespacedResource<gateway::Gateway> for Index {
    fn apply(&mut self, resource: gateway::Gateway) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let key = TargetKey::new(TargetKind::Gateway, namespace, resource.name_unchecked());
        self.apply_target(key, TargetSnapshot::from_gateway(&resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_target(&TargetKey::new(TargetKind::Gateway, namespace, name));
    }
}

impl kubert::index::IndexNamespacedResource<gateway::HTTPRoute> for Index {
    fn apply(&mut self, resource: gateway::HTTPRoute) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let key = TargetKey::new(TargetKind::HttpRoute, namespace, resource.name_unchecked());
        self.apply_target(key, TargetSnapshot::from_http_route(&resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_target(&TargetKey::new(TargetKind::HttpRoute, namespace, name));
    }
}

impl kubert::index::IndexNamespacedResource<gateway::GRPCRoute> for Index {
    fn apply(&mut self, resource: gateway::GRPCRoute) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let key = TargetKey::new(TargetKind::GrpcRoute, namespace, resource.name_unchecked());
        self.apply_target(key, TargetSnapshot::from_grpc_route(&resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_target(&TargetKey::new(TargetKind::GrpcRoute, namespace, name));
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Service> for Index {
    fn apply(&mut self, resource: k8s::Service) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        // Don't index kube-system Service objects.
        if namespace == "kube-system" {
            return;
        }
        let key = TargetKey::new(TargetKind::Service, namespace, resource.name_unchecked());
        self.apply_target(key, TargetSnapshot::from_service(&resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_target(&TargetKey::new(TargetKind::Service, namespace, name));
    }
}

impl kubert::index::IndexNamespacedResource<ServiceImport> for Index {
    fn apply(&mut self, resource: ServiceImport) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let key = TargetKey::new(
            TargetKind::ServiceImport,
            namespace,
            resource.name_unchecked(),
        );
        self.apply_target(key, TargetSnapshot::from_service_import(&resource));
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_target(&TargetKey::new(TargetKind::ServiceImport, namespace, name));
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Secret> for Index {
    fn apply(&mut self, resource: k8s::Secret) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let id = ResourceId::new(namespace, resource.name_unchecked());
        let snap = SecretSnapshot::from(&resource);
        if self.secrets.get(&id) == Some(&snap) {
            return;
        }
        self.secrets.insert(id, snap);
        self.reconcile_all();
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.secrets.remove(&ResourceId::new(namespace, name));
        self.reconcile_all();
    }
}

impl kubert::index::IndexNamespacedResource<gateway::ReferenceGrant> for Index {
    fn apply(&mut self, resource: gateway::ReferenceGrant) {
        let Some(namespace) = resource.namespace() else {
            return;
        };
        let id = ResourceId::new(namespace, resource.name_unchecked());
        self.grants.apply(id, &resource);
        self.reconcile_all();
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.grants.delete(&ResourceId::new(namespace, name));
        self.reconcile_all();
    }
}
