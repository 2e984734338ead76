use gateway_policy_controller_core::PolicyKind;
use gateway_policy_controller_k8s_index::{AttachmentKey, ResourceId};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct GroupKindName {
    pub group: String,
    pub kind: String,
    pub name: String,
}

/// Identifies the resource a status patch is addressed to.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NamespaceGroupKindName {
    pub namespace: String,
    pub gkn: GroupKindName,
}

impl NamespaceGroupKindName {
    pub fn from_attachment(kind: PolicyKind, id: &ResourceId) -> Self {
        Self {
            namespace: id.namespace.clone(),
            gkn: GroupKindName {
                group: gateway_policy_controller_k8s_api::POLICY_API_GROUP.to_string(),
                kind: kind.resource_kind().to_string(),
                name: id.name.clone(),
            },
        }
    }
}

impl From<&AttachmentKey> for NamespaceGroupKindName {
    fn from(key: &AttachmentKey) -> Self {
        Self::from_attachment(key.kind, &key.id)
    }
}
