//! Winner selection across all attachments of one `(policy kind, target)`
//! pair.
//!
//! The engine is pure: it receives immutable candidate descriptions and
//! returns one decision per candidate. The same snapshot always yields the
//! same decisions.

use crate::{registry::PolicyKind, scope::Scope, AttachmentId};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Why an attachment was rejected before conflict resolution ran.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rejection {
    TargetNotFound(String),
    NoAccess(String),
    Invalid(String),
}

/// The scopes an attachment claims on its target, as produced by the
/// decomposer. An empty claim set means no selector survived decomposition
/// and no default config was present.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Claims {
    pub scopes: Vec<Scope>,
}

#[derive(Clone, Debug)]
pub struct Candidate {
    pub id: AttachmentId,
    pub created_at: DateTime<Utc>,
    pub generation: i64,
    pub outcome: Result<Claims, Rejection>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reason {
    Accepted,
    Invalid,
    TargetNotFound,
    Conflicted,
    NoAccessToTarget,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Accepted => "Accepted",
            Reason::Invalid => "Invalid",
            Reason::TargetNotFound => "TargetNotFound",
            Reason::Conflicted => "Conflicted",
            Reason::NoAccessToTarget => "NoAccessToTarget",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decision {
    pub id: AttachmentId,
    pub generation: i64,
    pub accepted: bool,
    pub reason: Reason,
    pub message: String,
}

/// Resolves conflicts among all candidates sharing one target.
///
/// Candidates are ordered by creation timestamp, ties broken by
/// `(namespace, name)`. For each claimed scope the earliest claimant wins;
/// an attachment is accepted iff it wins at least one scope.
pub fn resolve(kind: PolicyKind, mut candidates: Vec<Candidate>) -> Vec<Decision> {
    candidates.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut winners: BTreeMap<Scope, AttachmentId> = BTreeMap::new();
    for candidate in &candidates {
        if let Ok(claims) = &candidate.outcome {
            for scope in &claims.scopes {
                winners
                    .entry(scope.clone())
                    .or_insert_with(|| candidate.id.clone());
            }
        }
    }

    candidates
        .into_iter()
        .map(|candidate| {
            let (accepted, reason, message) = match &candidate.outcome {
                Err(Rejection::TargetNotFound(message)) => {
                    (false, Reason::TargetNotFound, message.clone())
                }
                Err(Rejection::NoAccess(message)) => {
                    (false, Reason::NoAccessToTarget, message.clone())
                }
                Err(Rejection::Invalid(message)) => (false, Reason::Invalid, message.clone()),
                Ok(claims) if claims.scopes.is_empty() => (
                    false,
                    Reason::Invalid,
                    "no selector matches the target and no default config is set".to_string(),
                ),
                Ok(claims) => {
                    let won = claims
                        .scopes
                        .iter()
                        .any(|scope| winners.get(scope) == Some(&candidate.id));
                    if won {
                        (true, Reason::Accepted, format!("{kind} is accepted"))
                    } else {
                        // Every claimed scope is held by an earlier
                        // attachment; name the one shadowing the most
                        // specific claim.
                        let winner = claims
                            .scopes
                            .iter()
                            .max_by_key(|scope| scope.specificity())
                            .and_then(|scope| winners.get(scope))
                            .expect("a losing candidate claims at least one scope");
                        (
                            false,
                            Reason::Conflicted,
                            format!("Conflict with {kind}: {winner}"),
                        )
                    }
                }
            };
            Decision {
                id: candidate.id,
                generation: candidate.generation,
                accepted,
                reason,
                message,
            }
        })
        .collect()
}
