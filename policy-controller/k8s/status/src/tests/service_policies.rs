use super::*;
use crate::{conditions, index::make_patch, resource_id::NamespaceGroupKindName};
use gateway_policy_controller_core::PolicyKind;
use gateway_policy_controller_k8s_api::policy;
use gateway_policy_controller_k8s_index::ResourceId;
use kubert::index::IndexNamespacedResource;
use pretty_assertions::assert_eq;

fn attachment_id(kind: PolicyKind, namespace: &str, name: &str) -> NamespaceGroupKindName {
    NamespaceGroupKindName::from_attachment(
        kind,
        &ResourceId::new(namespace.to_string(), name.to_string()),
    )
}

#[test]
fn missing_target_reported_until_it_appears() {
    let (index, mut updates_rx) = make_index_updates_rx();

    index.write().apply(make_health_check(
        "example",
        "hc",
        service_target("does-not-exist", None),
        8080,
        1,
    ));

    let id = attachment_id(PolicyKind::HealthCheck, "example", "hc");
    let updates = drain(&mut updates_rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].patch,
        make_patch(
            &id,
            conditions::target_not_found("cannot find target Service example/does-not-exist", 1),
        ),
    );

    // Creating the service re-evaluates the attachment.
    index
        .write()
        .apply(make_service("example", "does-not-exist", vec![8080]));

    let updates = drain(&mut updates_rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].patch,
        make_patch(&id, conditions::accepted("HealthCheckPolicy is accepted", 1)),
    );
}

#[test]
fn matching_observed_status_suppresses_patch() {
    let (index, mut updates_rx) = make_index_updates_rx();

    index.write().apply(make_service("ns", "svc", vec![8080]));

    let mut hc = make_health_check("ns", "hc", service_target("svc", None), 8080, 1);
    hc.status = Some(policy::PolicyStatus {
        conditions: vec![conditions::accepted("HealthCheckPolicy is accepted", 1)],
    });
    index.write().apply(hc);

    assert!(drain(&mut updates_rx).is_empty());
}

#[test]
fn unsupported_target_kind_is_invalid() {
    let (index, mut updates_rx) = make_index_updates_rx();

    index.write().apply(make_health_check(
        "ns",
        "hc",
        policy::NamespacedTargetRef {
            group: Some("apps".to_string()),
            kind: "Deployment".to_string(),
            name: "web".to_string(),
            namespace: None,
        },
        8080,
        1,
    ));

    let id = attachment_id(PolicyKind::HealthCheck, "ns", "hc");
    let updates = drain(&mut updates_rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].patch,
        make_patch(
            &id,
            conditions::invalid("unsupported target kind Deployment.apps", 1),
        ),
    );
}

#[test]
fn selector_missing_from_target_without_default_is_invalid() {
    let (index, mut updates_rx) = make_index_updates_rx();

    index.write().apply(make_service("ns", "svc", vec![9090]));
    index
        .write()
        .apply(make_health_check("ns", "hc", service_target("svc", None), 8080, 1));

    let id = attachment_id(PolicyKind::HealthCheck, "ns", "hc");
    let updates = drain(&mut updates_rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].patch,
        make_patch(
            &id,
            conditions::invalid(
                "no selector matches the target and no default config is set",
                1,
            ),
        ),
    );
}

#[test]
fn tls_policy_requires_complete_secret() {
    let (index, mut updates_rx) = make_index_updates_rx();

    index.write().apply(make_service("example", "svc", vec![443]));
    index.write().apply(make_secret(
        "example",
        "tls-a",
        vec![("tls.crt", "cert")],
    ));

    let policy = policy::UpstreamTLSPolicy {
        metadata: meta("example", "tls", 1),
        spec: policy::UpstreamTLSPolicySpec {
            target_ref: service_target("svc", None),
            ports: Some(vec![policy::PortUpstreamTls {
                port: 443,
                config: None,
            }]),
            default_config: Some(policy::UpstreamTlsConfig {
                certificate_ref: policy::SecretObjectReference {
                    name: "tls-a".to_string(),
                    namespace: None,
                },
                m_tls: None,
            }),
        },
        status: None,
    };
    index.write().apply(policy);

    let id = attachment_id(PolicyKind::UpstreamTls, "example", "tls");
    let updates = drain(&mut updates_rx);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].patch,
        make_patch(
            &id,
            conditions::invalid("secret tls-a does not contain key tls.key", 1),
        ),
    );

    // Completing the secret repairs the policy on the next pass.
    index.write().apply(make_secret(
        "example",
        "tls-a",
        vec![("tls.crt", "cert"), ("tls.key", "key")],
    ));

    let updates = drain(&mut updates_rx);
    let update = updates
        .iter()
        .find(|u| u.id == id)
        .expect("policy must be re-evaluated after the secret changes");
    assert_eq!(
        update.patch,
        make_patch(&id, conditions::accepted("UpstreamTLSPolicy is accepted", 1)),
    );
}

fn make_secret(namespace: &str, name: &str, entries: Vec<(&str, &str)>) -> k8s::Secret {
    k8s::Secret {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        data: Some(
            entries
                .into_iter()
                .map(|(key, value)| {
                    (
                        key.to_string(),
                        k8s_openapi::ByteString(value.as_bytes().to_vec()),
                    )
                })
                .collect(),
        ),
        ..Default::default()
    }
}
