//! Static metadata describing each policy attachment kind: the target kinds
//! it may bind to and the scope axes its configuration may key on.

/// The group served by the Gateway API resources we attach to.
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// The group of the multicluster ServiceImport resource.
pub const MULTICLUSTER_GROUP: &str = "multicluster.gatewaymesh.io";

/// The Kubernetes core group is represented by the empty string.
pub const CORE_GROUP: &str = "";

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum PolicyKind {
    AccessControl,
    RateLimit,
    FaultInjection,
    HealthCheck,
    LoadBalancer,
    CircuitBreaking,
    SessionSticky,
    Retry,
    UpstreamTls,
    GatewayTls,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum TargetKind {
    Gateway,
    HttpRoute,
    GrpcRoute,
    Service,
    ServiceImport,
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum ScopeAxis {
    WholeTarget,
    Port,
    Hostname,
    HttpRouteMatch,
    GrpcRouteMatch,
    ServicePort,
}

/// Registry entry for a policy kind.
#[derive(Clone, Debug)]
pub struct KindSpec {
    pub kind: PolicyKind,
    pub allowed_targets: &'static [TargetKind],
    pub scope_axes: &'static [ScopeAxis],
    /// When true the kind must carry at least one concrete selector on
    /// targets where its axes apply; an attachment with neither selectors
    /// nor a default config is rejected at admission.
    pub requires_selectors: bool,
}

use self::{PolicyKind::*, ScopeAxis::*, TargetKind::*};

static REGISTRY: &[KindSpec] = &[
    KindSpec {
        kind: AccessControl,
        allowed_targets: &[Gateway, HttpRoute, GrpcRoute],
        scope_axes: &[WholeTarget, Port, Hostname, HttpRouteMatch, GrpcRouteMatch],
        requires_selectors: true,
    },
    KindSpec {
        kind: RateLimit,
        allowed_targets: &[Gateway, HttpRoute, GrpcRoute],
        scope_axes: &[WholeTarget, Port, Hostname, HttpRouteMatch, GrpcRouteMatch],
        requires_selectors: true,
    },
    KindSpec {
        kind: FaultInjection,
        allowed_targets: &[HttpRoute, GrpcRoute],
        scope_axes: &[WholeTarget, Hostname, HttpRouteMatch, GrpcRouteMatch],
        requires_selectors: true,
    },
    KindSpec {
        kind: HealthCheck,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget, ServicePort],
        requires_selectors: true,
    },
    KindSpec {
        kind: LoadBalancer,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget, ServicePort],
        requires_selectors: true,
    },
    KindSpec {
        kind: CircuitBreaking,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget, ServicePort],
        requires_selectors: true,
    },
    KindSpec {
        kind: SessionSticky,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget],
        requires_selectors: false,
    },
    KindSpec {
        kind: Retry,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget, ServicePort],
        requires_selectors: true,
    },
    KindSpec {
        kind: UpstreamTls,
        allowed_targets: &[Service, ServiceImport],
        scope_axes: &[WholeTarget, ServicePort],
        requires_selectors: true,
    },
    KindSpec {
        kind: GatewayTls,
        allowed_targets: &[Gateway],
        scope_axes: &[WholeTarget, Port],
        requires_selectors: true,
    },
];

/// Looks up the registry entry for a kind by its stable name.
pub fn lookup(name: &str) -> Option<&'static KindSpec> {
    REGISTRY.iter().find(|spec| spec.kind.name() == name)
}

pub fn spec_of(kind: PolicyKind) -> &'static KindSpec {
    REGISTRY
        .iter()
        .find(|spec| spec.kind == kind)
        .expect("every policy kind has a registry entry")
}

// === impl PolicyKind ===

impl PolicyKind {
    pub fn all() -> impl Iterator<Item = PolicyKind> {
        REGISTRY.iter().map(|spec| spec.kind)
    }

    /// Stable identifier used by the registry.
    pub fn name(&self) -> &'static str {
        match self {
            AccessControl => "AccessControl",
            RateLimit => "RateLimit",
            FaultInjection => "FaultInjection",
            HealthCheck => "HealthCheck",
            LoadBalancer => "LoadBalancer",
            CircuitBreaking => "CircuitBreaking",
            SessionSticky => "SessionSticky",
            Retry => "Retry",
            UpstreamTls => "UpstreamTls",
            GatewayTls => "GatewayTls",
        }
    }

    /// The Kubernetes resource kind carrying attachments of this kind.
    pub fn resource_kind(&self) -> &'static str {
        match self {
            AccessControl => "AccessControlPolicy",
            RateLimit => "RateLimitPolicy",
            FaultInjection => "FaultInjectionPolicy",
            HealthCheck => "HealthCheckPolicy",
            LoadBalancer => "LoadBalancerPolicy",
            CircuitBreaking => "CircuitBreakingPolicy",
            SessionSticky => "SessionStickyPolicy",
            Retry => "RetryPolicy",
            UpstreamTls => "UpstreamTLSPolicy",
            GatewayTls => "GatewayTLSPolicy",
        }
    }

    pub fn spec(&self) -> &'static KindSpec {
        spec_of(*self)
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resource_kind())
    }
}

// === impl TargetKind ===

impl TargetKind {
    pub fn group(&self) -> &'static str {
        match self {
            Gateway | HttpRoute | GrpcRoute => GATEWAY_API_GROUP,
            Service => CORE_GROUP,
            ServiceImport => MULTICLUSTER_GROUP,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Gateway => "Gateway",
            HttpRoute => "HTTPRoute",
            GrpcRoute => "GRPCRoute",
            Service => "Service",
            ServiceImport => "ServiceImport",
        }
    }

    /// Resolves a `(group, kind)` pair from a target reference. Group and
    /// kind comparisons are case-insensitive; the Kubernetes core group may
    /// be spelled `""` or `"core"`.
    pub fn from_group_kind(group: &str, kind: &str) -> Option<Self> {
        let target = [Gateway, HttpRoute, GrpcRoute, Service, ServiceImport]
            .into_iter()
            .find(|t| t.kind().eq_ignore_ascii_case(kind))?;
        let group_matches = match target {
            Service => group.is_empty() || group.eq_ignore_ascii_case("core"),
            _ => group.eq_ignore_ascii_case(target.group()),
        };
        group_matches.then_some(target)
    }
}

// === impl ScopeAxis ===

impl ScopeAxis {
    /// Whether the axis can produce concrete scope values on the given
    /// target kind: hostnames and route matches exist only on routes, ports
    /// only on Gateway listeners, service ports only on Service-shaped
    /// targets.
    pub fn applies_to(&self, target: TargetKind) -> bool {
        match self {
            WholeTarget => true,
            Port => matches!(target, Gateway),
            Hostname => matches!(target, HttpRoute | GrpcRoute),
            HttpRouteMatch => matches!(target, HttpRoute),
            GrpcRouteMatch => matches!(target, GrpcRoute),
            ServicePort => matches!(target, Service | ServiceImport),
        }
    }
}
