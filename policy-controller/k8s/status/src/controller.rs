//! Writes queued status patches back to the cluster. Only the current lease
//! holder patches; optimistic-concurrency conflicts are retried with a
//! bounded exponential backoff, and everything else is left to the periodic
//! reconciliation to repair.

use crate::{index::Update, STATUS_CONTROLLER_NAME};
use gateway_policy_controller_k8s_api::{self as k8s, POLICY_API_GROUP};
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind};
use kubert::lease::Claim;
use prometheus_client::{metrics::counter::Counter, registry::Registry};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch::Receiver},
    time::Duration,
};
use tracing::{debug, error, instrument, warn};

const MAX_PATCH_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct ControllerMetrics {
    patch_succeeded: Counter,
    patch_failed: Counter,
    patch_timeout: Counter,
    patch_conflict: Counter,
}

impl ControllerMetrics {
    pub fn register(registry: &mut Registry) -> Self {
        let patch_succeeded = Counter::default();
        registry.register(
            "patch_succeeded",
            "Status patches written successfully",
            patch_succeeded.clone(),
        );

        let patch_failed = Counter::default();
        registry.register(
            "patch_failed",
            "Status patches rejected by the API server",
            patch_failed.clone(),
        );

        let patch_timeout = Counter::default();
        registry.register(
            "patch_timeout",
            "Status patches abandoned after the write deadline",
            patch_timeout.clone(),
        );

        let patch_conflict = Counter::default();
        registry.register(
            "patch_conflict",
            "Optimistic-concurrency conflicts encountered while patching",
            patch_conflict.clone(),
        );

        Self {
            patch_succeeded,
            patch_failed,
            patch_timeout,
            patch_conflict,
        }
    }
}

pub struct Controller {
    claims: Receiver<Arc<Claim>>,
    client: k8s::Client,
    name: String,
    updates: mpsc::Receiver<Update>,
    patch_timeout: Duration,
    metrics: ControllerMetrics,
}

impl Controller {
    pub fn new(
        claims: Receiver<Arc<Claim>>,
        client: k8s::Client,
        name: String,
        updates: mpsc::Receiver<Update>,
        patch_timeout: Duration,
        metrics: ControllerMetrics,
    ) -> Self {
        Self {
            claims,
            client,
            name,
            updates,
            patch_timeout,
            metrics,
        }
    }

    pub async fn run(mut self) {
        while let Some(update) = self.updates.recv().await {
            // Patches computed by non-leaders are dropped; the leader's
            // index queues its own copy of every decision.
            if !self.claims.borrow().is_current_for(&self.name) {
                debug!(?update.id, "Not the leader, skipping patch");
                continue;
            }
            self.patch(update).await;
        }
    }

    #[instrument(level = "debug", skip_all, fields(
        namespace = %update.id.namespace,
        kind = %update.id.gkn.kind,
        name = %update.id.gkn.name,
    ))]
    async fn patch(&self, update: Update) {
        let Update { id, patch } = update;
        let gvk = GroupVersionKind::gvk(POLICY_API_GROUP, "v1alpha1", &id.gkn.kind);
        let resource = ApiResource::from_gvk(&gvk);
        let api =
            Api::<DynamicObject>::namespaced_with(self.client.clone(), &id.namespace, &resource);
        let params = k8s::PatchParams::apply(STATUS_CONTROLLER_NAME);

        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=MAX_PATCH_ATTEMPTS {
            let merge = k8s::Patch::Merge(&patch);
            let write = api.patch_status(&id.gkn.name, &params, &merge);
            match tokio::time::timeout(self.patch_timeout, write).await {
                Ok(Ok(_)) => {
                    self.metrics.patch_succeeded.inc();
                    return;
                }
                Ok(Err(k8s::Error::Api(response))) if response.code == 409 => {
                    self.metrics.patch_conflict.inc();
                    if attempt == MAX_PATCH_ATTEMPTS {
                        warn!(%response, "Giving up patching after repeated conflicts");
                        return;
                    }
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Ok(Err(k8s::Error::Api(response))) if response.code == 404 => {
                    debug!("Resource was deleted before its status could be patched");
                    return;
                }
                Ok(Err(err)) => {
                    self.metrics.patch_failed.inc();
                    error!(%err, "Failed to patch status");
                    return;
                }
                Err(_) => {
                    self.metrics.patch_timeout.inc();
                    warn!(timeout = ?self.patch_timeout, "Timed out patching status");
                    return;
                }
            }
        }
    }
}
