//! The attachment index: which attachments reference which target, bucketed
//! by policy kind so one target's peers can be re-evaluated together.

use crate::{
    resource_id::{ResourceId, TargetKey},
    snapshot::AttachmentSnapshot,
};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gateway_policy_controller_core::{PolicyKind, TargetKind};
use std::sync::Arc;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AttachmentKey {
    pub kind: PolicyKind,
    pub id: ResourceId,
}

#[derive(Debug)]
struct Entry {
    snapshot: Arc<AttachmentSnapshot>,
    /// None when the target reference names a kind outside the registry;
    /// such attachments are tracked (they still need status) but belong to
    /// no bucket.
    target: Option<TargetKey>,
}

/// Target buckets affected by an upsert: the bucket the attachment left (if
/// it moved) and the bucket it now belongs to.
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Upserted {
    pub old_target: Option<TargetKey>,
    pub new_target: Option<TargetKey>,
}

#[derive(Debug, Default)]
pub struct AttachmentIndex {
    attachments: HashMap<AttachmentKey, Entry>,
    buckets: HashMap<(PolicyKind, TargetKey), HashSet<AttachmentKey>>,
}

impl AttachmentIndex {
    /// Inserts or replaces an attachment, moving it between target buckets
    /// when its target reference changed. Returns the affected buckets so
    /// both old and new targets can be re-evaluated.
    pub fn upsert(&mut self, snapshot: AttachmentSnapshot) -> Upserted {
        let key = AttachmentKey {
            kind: snapshot.kind,
            id: snapshot.id.clone(),
        };
        let new_target = target_key_of(&snapshot);

        let old_target = self.unlink(&key);
        if let Some(target) = &new_target {
            self.buckets
                .entry((key.kind, target.clone()))
                .or_default()
                .insert(key.clone());
        }
        self.attachments.insert(
            key,
            Entry {
                snapshot: Arc::new(snapshot),
                target: new_target.clone(),
            },
        );

        Upserted {
            old_target: old_target.filter(|t| Some(t) != new_target.as_ref()),
            new_target,
        }
    }

    /// Removes an attachment; returns the bucket it occupied so the target's
    /// remaining attachments can be re-evaluated.
    pub fn delete(&mut self, key: &AttachmentKey) -> Option<TargetKey> {
        let target = self.unlink(key);
        self.attachments.remove(key);
        target
    }

    fn unlink(&mut self, key: &AttachmentKey) -> Option<TargetKey> {
        let target = self.attachments.get(key)?.target.clone()?;
        if let Some(bucket) = self.buckets.get_mut(&(key.kind, target.clone())) {
            bucket.remove(key);
            if bucket.is_empty() {
                self.buckets.remove(&(key.kind, target.clone()));
            }
        }
        Some(target)
    }

    /// All attachments of `kind` referencing `target`, in canonical order:
    /// earliest creation first, ties broken by namespace/name.
    pub fn list_by_target(
        &self,
        kind: PolicyKind,
        target: &TargetKey,
    ) -> Vec<Arc<AttachmentSnapshot>> {
        let mut attachments: Vec<_> = self
            .buckets
            .get(&(kind, target.clone()))
            .into_iter()
            .flatten()
            .filter_map(|key| self.attachments.get(key))
            .map(|entry| entry.snapshot.clone())
            .collect();
        attachments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        attachments
    }

    pub fn get(&self, key: &AttachmentKey) -> Option<Arc<AttachmentSnapshot>> {
        self.attachments.get(key).map(|entry| entry.snapshot.clone())
    }

    /// The bucket an attachment currently belongs to.
    pub fn target_of(&self, key: &AttachmentKey) -> Option<TargetKey> {
        self.attachments.get(key).and_then(|entry| entry.target.clone())
    }

    /// Policy kinds with at least one attachment referencing `target`.
    pub fn kinds_for_target(&self, target: &TargetKey) -> Vec<PolicyKind> {
        PolicyKind::all()
            .filter(|kind| self.buckets.contains_key(&(*kind, target.clone())))
            .collect()
    }

    /// Every `(kind, target)` bucket currently indexed.
    pub fn buckets(&self) -> impl Iterator<Item = (PolicyKind, &TargetKey)> + '_ {
        self.buckets.keys().map(|(kind, target)| (*kind, target))
    }

    /// Attachments whose target reference could not be resolved to a known
    /// target kind.
    pub fn unbucketed(&self) -> impl Iterator<Item = Arc<AttachmentSnapshot>> + '_ {
        self.attachments
            .values()
            .filter(|entry| entry.target.is_none())
            .map(|entry| entry.snapshot.clone())
    }
}

/// Computes the bucket key for an attachment from its target reference; the
/// target namespace defaults to the attachment's own.
pub fn target_key_of(snapshot: &AttachmentSnapshot) -> Option<TargetKey> {
    let group = snapshot.target_ref.group.as_deref().unwrap_or_default();
    let kind = TargetKind::from_group_kind(group, &snapshot.target_ref.kind)?;
    Some(TargetKey {
        kind,
        namespace: snapshot
            .target_ref
            .namespace_or(&snapshot.id.namespace)
            .to_string(),
        name: snapshot.target_ref.name.clone(),
    })
}
