mod service_policies;

use crate::{Index, IndexMetrics, SharedIndex, Update};
use chrono::{DateTime, Utc};
pub(crate) use gateway_policy_controller_k8s_api::{
    self as k8s, gateway, policy, ObjectMeta, Time,
};
use kubert::lease::Claim;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{self, Receiver},
    watch,
};

pub(crate) fn make_index_updates_rx() -> (SharedIndex, Receiver<Update>) {
    let claim = Claim {
        holder: "test".to_string(),
        expiry: DateTime::<Utc>::MAX_UTC,
    };
    let (_claims_tx, claims_rx) = watch::channel(Arc::new(claim));
    let (updates_tx, updates_rx) = mpsc::channel(10000);
    let index = Index::shared(
        "test",
        claims_rx,
        updates_tx,
        IndexMetrics::register(&mut Default::default()),
    );
    (index, updates_rx)
}

pub(crate) fn drain(updates_rx: &mut Receiver<Update>) -> Vec<Update> {
    let mut updates = Vec::new();
    while let Ok(update) = updates_rx.try_recv() {
        updates.push(update);
    }
    updates
}

pub(crate) fn ts(secs: i64) -> Time {
    Time(DateTime::<Utc>::from_timestamp(secs, 0).expect("timestamp must be valid"))
}

pub(crate) fn meta(namespace: &str, name: &str, created_secs: i64) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(namespace.to_string()),
        name: Some(name.to_string()),
        creation_timestamp: Some(ts(created_secs)),
        generation: Some(1),
        ..Default::default()
    }
}

pub(crate) fn make_gateway(namespace: &str, name: &str, ports: Vec<u16>) -> gateway::Gateway {
    gateway::Gateway {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: gateway::GatewaySpec {
            gateway_class_name: "gateway-mesh".to_string(),
            listeners: ports
                .into_iter()
                .map(|port| gateway::GatewayListeners {
                    name: format!("listener-{port}"),
                    port: port.into(),
                    protocol: "HTTP".to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        },
        status: None,
    }
}

pub(crate) fn make_service(namespace: &str, name: &str, ports: Vec<u16>) -> k8s::Service {
    k8s::Service {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(k8s::ServiceSpec {
            ports: Some(
                ports
                    .into_iter()
                    .map(|port| k8s::ServicePort {
                        port: port.into(),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

pub(crate) fn exact_path_match(path: &str) -> gateway::HTTPRouteRulesMatches {
    gateway::HTTPRouteRulesMatches {
        path: Some(gateway::HTTPRouteRulesMatchesPath {
            r#type: Some(gateway::HTTPRouteRulesMatchesPathType::Exact),
            value: Some(path.to_string()),
        }),
        ..Default::default()
    }
}

pub(crate) fn make_http_route(
    namespace: &str,
    name: &str,
    hostnames: Vec<&str>,
    paths: Vec<&str>,
) -> gateway::HTTPRoute {
    gateway::HTTPRoute {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: gateway::HTTPRouteSpec {
            hostnames: Some(hostnames.into_iter().map(Into::into).collect()),
            rules: Some(vec![gateway::HTTPRouteRules {
                matches: Some(paths.into_iter().map(exact_path_match).collect()),
                ..Default::default()
            }]),
            ..Default::default()
        },
        status: None,
    }
}

pub(crate) fn gateway_target(name: &str) -> policy::NamespacedTargetRef {
    policy::NamespacedTargetRef {
        group: Some("gateway.networking.k8s.io".to_string()),
        kind: "Gateway".to_string(),
        name: name.to_string(),
        namespace: None,
    }
}

pub(crate) fn route_target(name: &str) -> policy::NamespacedTargetRef {
    policy::NamespacedTargetRef {
        group: Some("gateway.networking.k8s.io".to_string()),
        kind: "HTTPRoute".to_string(),
        name: name.to_string(),
        namespace: None,
    }
}

pub(crate) fn service_target(name: &str, namespace: Option<&str>) -> policy::NamespacedTargetRef {
    policy::NamespacedTargetRef {
        group: None,
        kind: "Service".to_string(),
        name: name.to_string(),
        namespace: namespace.map(Into::into),
    }
}

pub(crate) fn make_access_control_for_port(
    namespace: &str,
    name: &str,
    gateway_name: &str,
    port: u16,
    created_secs: i64,
) -> policy::AccessControlPolicy {
    policy::AccessControlPolicy {
        metadata: meta(namespace, name, created_secs),
        spec: policy::AccessControlPolicySpec {
            target_ref: gateway_target(gateway_name),
            ports: Some(vec![policy::PortAccessControl {
                port,
                config: Some(policy::AccessControlConfig {
                    blacklist: Some(vec!["10.0.0.0/8".to_string()]),
                    ..Default::default()
                }),
            }]),
            hostnames: None,
            http_access_controls: None,
            grpc_access_controls: None,
            default_config: None,
        },
        status: None,
    }
}

pub(crate) fn make_health_check(
    namespace: &str,
    name: &str,
    target: policy::NamespacedTargetRef,
    port: u16,
    created_secs: i64,
) -> policy::HealthCheckPolicy {
    policy::HealthCheckPolicy {
        metadata: meta(namespace, name, created_secs),
        spec: policy::HealthCheckPolicySpec {
            target_ref: target,
            ports: Some(vec![policy::PortHealthCheck {
                port,
                config: Some(policy::HealthCheckConfig {
                    interval: 10,
                    max_fails: 3,
                    ..Default::default()
                }),
            }]),
            default_config: None,
        },
        status: None,
    }
}
