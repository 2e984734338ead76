#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gateway;
pub mod multicluster;
pub mod policy;

pub use k8s_openapi::{
    api::{
        self,
        core::v1::{Namespace, Secret, Service, ServicePort, ServiceSpec},
    },
    apimachinery::pkg::apis::meta::v1::{Condition, Time},
};
pub use kube::{
    api::{Api, ObjectMeta, Patch, PatchParams},
    Client, Error, Resource, ResourceExt,
};

/// The group under which all policy attachment resources are served.
pub const POLICY_API_GROUP: &str = "policy.gatewaymesh.io";

/// The apiVersion of all policy attachment resources.
pub const POLICY_API_VERSION: &str = "policy.gatewaymesh.io/v1alpha1";

/// Checks whether a `(group, kind)` pair names the given resource type.
/// Group and kind are compared case-insensitively; an absent group denotes
/// the Kubernetes core group.
pub fn targets_kind<T>(group: Option<&str>, kind: &str) -> bool
where
    T: kube::Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();

    let mut t_group = &*T::group(&dt);
    if t_group.is_empty() {
        t_group = "core";
    }

    group.unwrap_or("core").eq_ignore_ascii_case(t_group)
        && kind.eq_ignore_ascii_case(&T::kind(&dt))
}
