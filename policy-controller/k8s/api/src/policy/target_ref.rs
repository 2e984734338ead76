use crate::targets_kind;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// References a target resource in the attachment's own namespace.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct LocalTargetRef {
    pub group: Option<String>,
    pub kind: String,
    pub name: String,
}

/// References a target resource, possibly in another namespace. A
/// cross-namespace reference requires a matching ReferenceGrant in the
/// target's namespace.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct NamespacedTargetRef {
    pub group: Option<String>,
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

/// References a Secret carrying TLS material.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SecretObjectReference {
    pub name: String,
    pub namespace: Option<String>,
}

impl LocalTargetRef {
    /// Returns the target ref kind, qualified by its group, if necessary.
    pub fn canonical_kind(&self) -> String {
        canonical_kind(self.group.as_deref(), &self.kind)
    }

    /// Checks whether the target references the given resource type.
    pub fn targets_kind<T>(&self) -> bool
    where
        T: kube::Resource,
        T::DynamicType: Default,
    {
        targets_kind::<T>(self.group.as_deref(), &self.kind)
    }
}

impl NamespacedTargetRef {
    pub fn from_resource<T>(resource: &T) -> Self
    where
        T: kube::Resource,
        T::DynamicType: Default,
    {
        let dt = Default::default();
        let group = match T::group(&dt) {
            g if (*g).is_empty() => None,
            g => Some(g.to_string()),
        };
        Self {
            group,
            kind: T::kind(&dt).to_string(),
            name: resource
                .meta()
                .name
                .clone()
                .expect("resource must have a name"),
            namespace: resource.meta().namespace.clone(),
        }
    }

    /// Returns the target ref kind, qualified by its group, if necessary.
    pub fn canonical_kind(&self) -> String {
        canonical_kind(self.group.as_deref(), &self.kind)
    }

    /// Checks whether the target references the given resource type.
    pub fn targets_kind<T>(&self) -> bool
    where
        T: kube::Resource,
        T::DynamicType: Default,
    {
        targets_kind::<T>(self.group.as_deref(), &self.kind)
    }

    /// The namespace the reference points into, given the namespace of the
    /// referring attachment.
    pub fn namespace_or<'t>(&'t self, local_ns: &'t str) -> &'t str {
        self.namespace.as_deref().unwrap_or(local_ns)
    }
}

fn canonical_kind(group: Option<&str>, kind: &str) -> String {
    if let Some(group) = group {
        if !group.is_empty() {
            return format!("{kind}.{group}");
        }
    }
    kind.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gateway, multicluster::ServiceImport, Service};

    #[test]
    fn targets_service_with_and_without_group() {
        for tgt in &[
            NamespacedTargetRef {
                group: None,
                kind: "Service".to_string(),
                name: "web".to_string(),
                namespace: None,
            },
            NamespacedTargetRef {
                group: Some("core".to_string()),
                kind: "SERVICE".to_string(),
                name: "web".to_string(),
                namespace: Some("apps".to_string()),
            },
        ] {
            assert!(tgt.targets_kind::<Service>(), "{tgt:?}");
            assert!(!tgt.targets_kind::<gateway::Gateway>(), "{tgt:?}");
        }
    }

    #[test]
    fn targets_gateway_api_kinds() {
        let tgt = NamespacedTargetRef {
            group: Some("gateway.networking.k8s.io".to_string()),
            kind: "Gateway".to_string(),
            name: "ingress".to_string(),
            namespace: None,
        };
        assert!(tgt.targets_kind::<gateway::Gateway>());
        assert!(!tgt.targets_kind::<gateway::HTTPRoute>());
        assert!(!tgt.targets_kind::<Service>());
    }

    #[test]
    fn targets_service_import() {
        let tgt = NamespacedTargetRef {
            group: Some("multicluster.gatewaymesh.io".to_string()),
            kind: "ServiceImport".to_string(),
            name: "web".to_string(),
            namespace: None,
        };
        assert!(tgt.targets_kind::<ServiceImport>());
        assert!(!tgt.targets_kind::<Service>());
    }

    #[test]
    fn canonical_kind_qualifies_groups() {
        let tgt = NamespacedTargetRef {
            group: Some("gateway.networking.k8s.io".to_string()),
            kind: "Gateway".to_string(),
            name: "ingress".to_string(),
            namespace: None,
        };
        assert_eq!(tgt.canonical_kind(), "Gateway.gateway.networking.k8s.io");

        let tgt = NamespacedTargetRef {
            group: None,
            kind: "Service".to_string(),
            name: "web".to_string(),
            namespace: None,
        };
        assert_eq!(tgt.canonical_kind(), "Service");
    }
}
