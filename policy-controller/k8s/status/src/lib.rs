#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod conditions;
mod controller;
mod index;
mod resource_id;

#[cfg(test)]
mod tests;

pub use self::{
    controller::{Controller, ControllerMetrics},
    index::{Index, IndexMetrics, SharedIndex, Update},
    resource_id::{GroupKindName, NamespaceGroupKindName},
};

/// Identifies this controller in patches and conditions.
pub const STATUS_CONTROLLER_NAME: &str = "gateway-policy-controller";
