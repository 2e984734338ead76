use crate::{defaults, validation};
use anyhow::{anyhow, bail, Result};
use futures::future;
use gateway_policy_controller_core::{registry, TargetKind};
use gateway_policy_controller_k8s_api::{
    self as k8s,
    policy::{
        AccessControlPolicy, AccessControlPolicySpec, CircuitBreakingPolicy,
        CircuitBreakingPolicySpec, FaultInjectionPolicy, FaultInjectionPolicySpec,
        GatewayTLSPolicy, GatewayTLSPolicySpec, HealthCheckPolicy, HealthCheckPolicySpec,
        LoadBalancerPolicy, LoadBalancerPolicySpec, NamespacedTargetRef, RateLimitPolicy,
        RateLimitPolicySpec, RetryPolicy, RetryPolicySpec, SecretObjectReference,
        SessionStickyPolicy, SessionStickyPolicySpec, UpstreamTLSPolicy, UpstreamTLSPolicySpec,
    },
};
use gateway_policy_controller_k8s_index::SecretSnapshot;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::{core::DynamicObject, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Admission lookups must not outlive the API server's webhook patience.
const LOOKUP_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(5);

#[derive(Clone)]
pub struct Admission {
    client: kube::Client,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;
type AdmissionReview = kube::core::admission::AdmissionReview<DynamicObject>;
type Operation = kube::core::admission::Operation;

#[derive(Copy, Clone, Debug)]
enum Verb {
    Mutate,
    Validate,
}

/// Per-kind semantic validation, run on create and update.
#[async_trait::async_trait]
trait Validate<T> {
    async fn validate(self, ns: &str, name: &str, spec: T) -> Result<()>;
}

/// Per-kind defaulting, run by the mutating webhook.
trait Mutate<T> {
    fn mutate(&self, spec: &mut T);
}

/// Exposes the target reference every policy spec carries; used for the
/// update-time immutability check.
trait HasTargetRef {
    fn target_ref(&self) -> &NamespacedTargetRef;
}

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        let verb = match (req.method(), req.uri().path()) {
            (&http::Method::POST, path) if path.starts_with("/mutate-") => Verb::Mutate,
            (&http::Method::POST, path) if path.starts_with("/validate-") => Verb::Validate,
            _ => {
                return Box::pin(future::ok(
                    Response::builder()
                        .status(http::StatusCode::NOT_FOUND)
                        .body(Body::default())
                        .expect("not found response must be valid"),
                ));
            }
        };

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };
            trace!(?review);

            let rsp = match review.try_into() {
                Ok(req) => {
                    debug!(?verb, ?req);
                    match verb {
                        Verb::Mutate => admission.default_resource(req),
                        Verb::Validate => admission.admit(req).await,
                    }
                }
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(?rsp);
            json_response(rsp.into_review())
        })
    }
}

impl Admission {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn default_resource(self, req: AdmissionRequest) -> AdmissionResponse {
        if is_kind::<AccessControlPolicy>(&req) {
            return self.default_spec::<AccessControlPolicySpec>(req);
        }
        if is_kind::<RateLimitPolicy>(&req) {
            return self.default_spec::<RateLimitPolicySpec>(req);
        }
        if is_kind::<FaultInjectionPolicy>(&req) {
            return self.default_spec::<FaultInjectionPolicySpec>(req);
        }
        if is_kind::<HealthCheckPolicy>(&req) {
            return self.default_spec::<HealthCheckPolicySpec>(req);
        }
        if is_kind::<LoadBalancerPolicy>(&req) {
            return self.default_spec::<LoadBalancerPolicySpec>(req);
        }
        if is_kind::<CircuitBreakingPolicy>(&req) {
            return self.default_spec::<CircuitBreakingPolicySpec>(req);
        }
        if is_kind::<SessionStickyPolicy>(&req) {
            return self.default_spec::<SessionStickyPolicySpec>(req);
        }
        if is_kind::<RetryPolicy>(&req) {
            return self.default_spec::<RetryPolicySpec>(req);
        }
        if is_kind::<UpstreamTLSPolicy>(&req) {
            return self.default_spec::<UpstreamTLSPolicySpec>(req);
        }
        if is_kind::<GatewayTLSPolicy>(&req) {
            return self.default_spec::<GatewayTLSPolicySpec>(req);
        }

        AdmissionResponse::invalid(format_args!(
            "unsupported resource type: {}.{}.{}",
            req.kind.group, req.kind.version, req.kind.kind
        ))
    }

    async fn admit(self, req: AdmissionRequest) -> AdmissionResponse {
        if is_kind::<AccessControlPolicy>(&req) {
            return self.admit_spec::<AccessControlPolicySpec>(req).await;
        }
        if is_kind::<RateLimitPolicy>(&req) {
            return self.admit_spec::<RateLimitPolicySpec>(req).await;
        }
        if is_kind::<FaultInjectionPolicy>(&req) {
            return self.admit_spec::<FaultInjectionPolicySpec>(req).await;
        }
        if is_kind::<HealthCheckPolicy>(&req) {
            return self.admit_spec::<HealthCheckPolicySpec>(req).await;
        }
        if is_kind::<LoadBalancerPolicy>(&req) {
            return self.admit_spec::<LoadBalancerPolicySpec>(req).await;
        }
        if is_kind::<CircuitBreakingPolicy>(&req) {
            return self.admit_spec::<CircuitBreakingPolicySpec>(req).await;
        }
        if is_kind::<SessionStickyPolicy>(&req) {
            return self.admit_spec::<SessionStickyPolicySpec>(req).await;
        }
        if is_kind::<RetryPolicy>(&req) {
            return self.admit_spec::<RetryPolicySpec>(req).await;
        }
        if is_kind::<UpstreamTLSPolicy>(&req) {
            return self.admit_spec::<UpstreamTLSPolicySpec>(req).await;
        }
        if is_kind::<GatewayTLSPolicy>(&req) {
            return self.admit_spec::<GatewayTLSPolicySpec>(req).await;
        }

        AdmissionResponse::invalid(format_args!(
            "unsupported resource type: {}.{}.{}",
            req.kind.group, req.kind.version, req.kind.kind
        ))
    }

    fn default_spec<T>(self, req: AdmissionRequest) -> AdmissionResponse
    where
        T: DeserializeOwned + serde::Serialize,
        Self: Mutate<T>,
    {
        let rsp = AdmissionResponse::from(&req);

        let kind = req.kind.kind.clone();
        let (obj, mut spec) = match parse_spec::<T>(req) {
            Ok(spec) => spec,
            Err(error) => {
                info!(%error, "Failed to parse {} spec", kind);
                return rsp.deny(error);
            }
        };

        let original = match serde_json::to_value(&obj) {
            Ok(value) => value,
            Err(error) => return rsp.deny(error),
        };

        self.mutate(&mut spec);

        let mut mutated = original.clone();
        match serde_json::to_value(&spec) {
            Ok(value) => mutated["spec"] = value,
            Err(error) => return rsp.deny(error),
        }

        let patch = json_patch::diff(&original, &mutated);
        if patch.0.is_empty() {
            return rsp;
        }
        match rsp.with_patch(patch) {
            Ok(rsp) => rsp,
            Err(error) => AdmissionResponse::invalid(error),
        }
    }

    async fn admit_spec<T>(self, req: AdmissionRequest) -> AdmissionResponse
    where
        T: DeserializeOwned + HasTargetRef,
        Self: Validate<T>,
    {
        let rsp = AdmissionResponse::from(&req);

        let kind = req.kind.kind.clone();
        let is_update = matches!(req.operation, Operation::Update);
        let old_spec: Option<T> = req
            .old_object
            .as_ref()
            .and_then(|obj| obj.data.get("spec").cloned())
            .and_then(|data| serde_json::from_value(data).ok());

        let (obj, spec) = match parse_spec::<T>(req) {
            Ok(spec) => spec,
            Err(error) => {
                info!(%error, "Failed to parse {} spec", kind);
                return rsp.deny(error);
            }
        };

        let ns = obj.namespace().unwrap_or_default();
        let name = obj.name_any();

        if is_update {
            if let Some(old) = old_spec {
                if old.target_ref() != spec.target_ref() {
                    info!(%ns, %name, %kind, "Denied: targetRef mutated");
                    return rsp.deny("spec.targetRef is immutable");
                }
            }
        }

        if let Err(error) = self.validate(&ns, &name, spec).await {
            info!(%error, %ns, %name, %kind, "Denied");
            return rsp.deny(error);
        }

        rsp
    }

    /// Fetches a Secret referenced by a TLS policy config. The lookup is
    /// bounded so a slow API server fails the admission rather than hanging
    /// it.
    async fn lookup_secret(
        &self,
        policy_ns: &str,
        secret_ref: &SecretObjectReference,
    ) -> Result<Option<SecretSnapshot>> {
        let ns = secret_ref.namespace.as_deref().unwrap_or(policy_ns);
        let api = kube::Api::<k8s::Secret>::namespaced(self.client.clone(), ns);
        let secret = tokio::time::timeout(LOOKUP_TIMEOUT, api.get_opt(&secret_ref.name))
            .await
            .map_err(|_| anyhow!("timed out fetching secret {ns}/{}", secret_ref.name))??;
        Ok(secret.as_ref().map(SecretSnapshot::from))
    }
}

fn is_kind<T>(req: &AdmissionRequest) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    req.kind.group.eq_ignore_ascii_case(&T::group(&dt))
        && req.kind.kind.eq_ignore_ascii_case(&T::kind(&dt))
}

fn json_response(rsp: AdmissionReview) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

fn parse_spec<T: DeserializeOwned>(req: AdmissionRequest) -> Result<(DynamicObject, T)> {
    let obj = req
        .object
        .ok_or_else(|| anyhow!("admission request missing 'object'"))?;

    let spec = {
        let data = obj
            .data
            .get("spec")
            .cloned()
            .ok_or_else(|| anyhow!("admission request missing 'spec'"))?;
        serde_json::from_value(data)?
    };

    Ok((obj, spec))
}

/// Checks the target reference against the registry entry for `kind`.
fn validate_target_ref(kind_name: &str, target_ref: &NamespacedTargetRef) -> Result<()> {
    let spec = registry::lookup(kind_name).expect("policy kind must be registered");
    let group = target_ref.group.as_deref().unwrap_or_default();
    let target = TargetKind::from_group_kind(group, &target_ref.kind);
    match target {
        Some(target) if spec.allowed_targets.contains(&target) => Ok(()),
        _ => {
            let supported = spec
                .allowed_targets
                .iter()
                .map(|t| t.kind())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "invalid targetRef kind {}, only {supported} are supported",
                target_ref.canonical_kind(),
            );
        }
    }
}

fn targets_gateway(target_ref: &NamespacedTargetRef) -> bool {
    let group = target_ref.group.as_deref().unwrap_or_default();
    TargetKind::from_group_kind(group, &target_ref.kind) == Some(TargetKind::Gateway)
}

// === per-kind mutation ===

impl Mutate<AccessControlPolicySpec> for Admission {
    fn mutate(&self, spec: &mut AccessControlPolicySpec) {
        defaults::access_control(spec);
    }
}

impl Mutate<RateLimitPolicySpec> for Admission {
    fn mutate(&self, spec: &mut RateLimitPolicySpec) {
        defaults::rate_limit(spec);
    }
}

impl Mutate<FaultInjectionPolicySpec> for Admission {
    fn mutate(&self, spec: &mut FaultInjectionPolicySpec) {
        defaults::fault_injection(spec);
    }
}

impl Mutate<HealthCheckPolicySpec> for Admission {
    fn mutate(&self, _spec: &mut HealthCheckPolicySpec) {}
}

impl Mutate<LoadBalancerPolicySpec> for Admission {
    fn mutate(&self, spec: &mut LoadBalancerPolicySpec) {
        defaults::load_balancer(spec);
    }
}

impl Mutate<CircuitBreakingPolicySpec> for Admission {
    fn mutate(&self, _spec: &mut CircuitBreakingPolicySpec) {}
}

impl Mutate<SessionStickyPolicySpec> for Admission {
    fn mutate(&self, spec: &mut SessionStickyPolicySpec) {
        defaults::session_sticky(spec);
    }
}

impl Mutate<RetryPolicySpec> for Admission {
    fn mutate(&self, _spec: &mut RetryPolicySpec) {}
}

impl Mutate<UpstreamTLSPolicySpec> for Admission {
    fn mutate(&self, spec: &mut UpstreamTLSPolicySpec) {
        defaults::upstream_tls(spec);
    }
}

impl Mutate<GatewayTLSPolicySpec> for Admission {
    fn mutate(&self, spec: &mut GatewayTLSPolicySpec) {
        defaults::gateway_tls(spec);
    }
}

// === per-kind target refs ===

macro_rules! has_target_ref {
    ($($spec:ty),* $(,)?) => {
        $(
            impl HasTargetRef for $spec {
                fn target_ref(&self) -> &NamespacedTargetRef {
                    &self.target_ref
                }
            }
        )*
    };
}

has_target_ref!(
    AccessControlPolicySpec,
    RateLimitPolicySpec,
    FaultInjectionPolicySpec,
    HealthCheckPolicySpec,
    LoadBalancerPolicySpec,
    CircuitBreakingPolicySpec,
    SessionStickyPolicySpec,
    RetryPolicySpec,
    UpstreamTLSPolicySpec,
    GatewayTLSPolicySpec,
);

// === per-kind validation ===

#[async_trait::async_trait]
impl Validate<AccessControlPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: AccessControlPolicySpec) -> Result<()> {
        validate_target_ref("AccessControl", &spec.target_ref)?;

        let ports = spec.ports.as_deref().unwrap_or_default();
        if targets_gateway(&spec.target_ref) {
            validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        } else {
            let selectors = spec.hostnames.as_deref().map(|h| h.len()).unwrap_or(0)
                + spec.http_access_controls.as_deref().map(|h| h.len()).unwrap_or(0)
                + spec.grpc_access_controls.as_deref().map(|g| g.len()).unwrap_or(0);
            if selectors == 0 && spec.default_config.is_none() {
                bail!("at least one of hostnames, http, grpc, config must be set");
            }
        }

        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            ports.iter().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            validation::validate_acl_config("spec.config", config)?;
        }
        for (i, entry) in ports.iter().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_acl_config(&format!("spec.ports[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.hostnames.iter().flatten().enumerate() {
            validation::validate_hostname(&format!("spec.hostnames[{i}].hostname"), &entry.hostname)?;
            if let Some(config) = &entry.config {
                validation::validate_acl_config(&format!("spec.hostnames[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.http_access_controls.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_acl_config(&format!("spec.http[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.grpc_access_controls.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_acl_config(&format!("spec.grpc[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<RateLimitPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: RateLimitPolicySpec) -> Result<()> {
        validate_target_ref("RateLimit", &spec.target_ref)?;

        if targets_gateway(&spec.target_ref) {
            // L4: every listener entry needs a byte rate, its own or the
            // policy default.
            validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
            for (i, entry) in spec.ports.iter().flatten().enumerate() {
                if entry.bps.is_none() && spec.default_bps.is_none() {
                    bail!("spec.ports[{i}].bps must be set, as there is no default bps");
                }
            }
        } else {
            let selectors = spec.hostnames.as_deref().map(|h| h.len()).unwrap_or(0)
                + spec.http_rate_limits.as_deref().map(|h| h.len()).unwrap_or(0)
                + spec.grpc_rate_limits.as_deref().map(|g| g.len()).unwrap_or(0);
            if selectors == 0 && spec.default_config.is_none() {
                bail!("at least one of hostnames, http, grpc, config must be set");
            }
        }

        if let Some(config) = &spec.default_config {
            validation::validate_l7_rate_limit("spec.config", config)?;
        }
        for (i, entry) in spec.hostnames.iter().flatten().enumerate() {
            validation::validate_hostname(&format!("spec.hostnames[{i}].hostname"), &entry.hostname)?;
            if let Some(config) = &entry.config {
                validation::validate_l7_rate_limit(&format!("spec.hostnames[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.http_rate_limits.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_l7_rate_limit(&format!("spec.http[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.grpc_rate_limits.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_l7_rate_limit(&format!("spec.grpc[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<FaultInjectionPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: FaultInjectionPolicySpec) -> Result<()> {
        validate_target_ref("FaultInjection", &spec.target_ref)?;

        let selectors = spec.hostnames.as_deref().map(|h| h.len()).unwrap_or(0)
            + spec.http_fault_injections.as_deref().map(|h| h.len()).unwrap_or(0)
            + spec.grpc_fault_injections.as_deref().map(|g| g.len()).unwrap_or(0);
        if selectors == 0 && spec.default_config.is_none() {
            bail!("at least one of hostnames, http, grpc, config must be set");
        }

        if let Some(config) = &spec.default_config {
            validation::validate_fault_injection("spec.config", config)?;
        }
        for (i, entry) in spec.hostnames.iter().flatten().enumerate() {
            validation::validate_hostname(&format!("spec.hostnames[{i}].hostname"), &entry.hostname)?;
            if let Some(config) = &entry.config {
                validation::validate_fault_injection(&format!("spec.hostnames[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.http_fault_injections.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_fault_injection(&format!("spec.http[{i}].config"), config)?;
            }
        }
        for (i, entry) in spec.grpc_fault_injections.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_fault_injection(&format!("spec.grpc[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<HealthCheckPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: HealthCheckPolicySpec) -> Result<()> {
        validate_target_ref("HealthCheck", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            spec.ports.iter().flatten().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            validation::validate_health_check("spec.config", config)?;
        }
        for (i, entry) in spec.ports.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_health_check(&format!("spec.ports[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<LoadBalancerPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: LoadBalancerPolicySpec) -> Result<()> {
        validate_target_ref("LoadBalancer", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<CircuitBreakingPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: CircuitBreakingPolicySpec) -> Result<()> {
        validate_target_ref("CircuitBreaking", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            spec.ports.iter().flatten().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            validation::validate_circuit_breaking("spec.config", config)?;
        }
        for (i, entry) in spec.ports.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_circuit_breaking(&format!("spec.ports[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<SessionStickyPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: SessionStickyPolicySpec) -> Result<()> {
        validate_target_ref("SessionSticky", &spec.target_ref)?;
        if let Some(config) = &spec.default_config {
            if let Some(cookie_name) = &config.cookie_name {
                if cookie_name.is_empty() {
                    bail!("spec.config.cookieName cannot be empty");
                }
            }
            if let Some(expires) = config.expires {
                if expires <= 0 {
                    bail!("spec.config.expires must be greater than 0");
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<RetryPolicySpec> for Admission {
    async fn validate(self, _ns: &str, _name: &str, spec: RetryPolicySpec) -> Result<()> {
        validate_target_ref("Retry", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            spec.ports.iter().flatten().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            validation::validate_retry("spec.config", config)?;
        }
        for (i, entry) in spec.ports.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                validation::validate_retry(&format!("spec.ports[{i}].config"), config)?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<UpstreamTLSPolicySpec> for Admission {
    async fn validate(self, ns: &str, _name: &str, spec: UpstreamTLSPolicySpec) -> Result<()> {
        validate_target_ref("UpstreamTls", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            spec.ports.iter().flatten().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            let secret = self.lookup_secret(ns, &config.certificate_ref).await?;
            validation::validate_certificate_secret(
                "spec.defaultConfig.certificateRef",
                &config.certificate_ref.name,
                secret.as_ref(),
                config.m_tls == Some(true),
            )?;
        }
        for (i, entry) in spec.ports.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                let secret = self.lookup_secret(ns, &config.certificate_ref).await?;
                validation::validate_certificate_secret(
                    &format!("spec.ports[{i}].config.certificateRef"),
                    &config.certificate_ref.name,
                    secret.as_ref(),
                    config.m_tls == Some(true),
                )?;
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Validate<GatewayTLSPolicySpec> for Admission {
    async fn validate(self, ns: &str, _name: &str, spec: GatewayTLSPolicySpec) -> Result<()> {
        validate_target_ref("GatewayTls", &spec.target_ref)?;
        validation::validate_port_entries("spec.ports", spec.ports.as_ref())?;
        validation::validate_completeness(
            "spec.ports",
            spec.default_config.is_some(),
            spec.ports.iter().flatten().map(|p| p.config.is_some()),
        )?;

        if let Some(config) = &spec.default_config {
            let secret = self.lookup_secret(ns, &config.certificate_ref).await?;
            validation::validate_certificate_secret(
                "spec.defaultConfig.certificateRef",
                &config.certificate_ref.name,
                secret.as_ref(),
                config.m_tls == Some(true),
            )?;
        }
        for (i, entry) in spec.ports.iter().flatten().enumerate() {
            if let Some(config) = &entry.config {
                let secret = self.lookup_secret(ns, &config.certificate_ref).await?;
                validation::validate_certificate_secret(
                    &format!("spec.ports[{i}].config.certificateRef"),
                    &config.certificate_ref.name,
                    secret.as_ref(),
                    config.m_tls == Some(true),
                )?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ref_registry_checks() {
        let gateway = NamespacedTargetRef {
            group: Some("gateway.networking.k8s.io".to_string()),
            kind: "Gateway".to_string(),
            name: "gw".to_string(),
            namespace: None,
        };
        assert!(validate_target_ref("AccessControl", &gateway).is_ok());
        assert!(validate_target_ref("GatewayTls", &gateway).is_ok());
        assert!(validate_target_ref("HealthCheck", &gateway).is_err());

        let service = NamespacedTargetRef {
            group: None,
            kind: "Service".to_string(),
            name: "svc".to_string(),
            namespace: None,
        };
        assert!(validate_target_ref("HealthCheck", &service).is_ok());
        assert!(validate_target_ref("AccessControl", &service).is_err());

        let deployment = NamespacedTargetRef {
            group: Some("apps".to_string()),
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            namespace: None,
        };
        let err = validate_target_ref("HealthCheck", &deployment).unwrap_err();
        assert!(err.to_string().contains("Service"), "{err}");
    }
}
