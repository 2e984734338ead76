#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod authz;
pub mod decompose;
pub mod index;
pub mod resolver;
pub mod resource_id;
pub mod snapshot;

pub use self::{
    authz::AuthorizationCache,
    decompose::{decompose, Decomposition},
    index::{AttachmentIndex, AttachmentKey, Upserted},
    resolver::{resolve_secret, resolve_target, ResolveError},
    resource_id::{ResourceId, TargetKey},
    snapshot::{
        canonical_match_key, snapshot, AttachmentSnapshot, CertificateRef, PolicyResource,
        SecretSnapshot, Selector, TargetSnapshot,
    },
};
