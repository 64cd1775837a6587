//! Ancestor walk used to refuse reparents that would close a loop.
//!
//! The walk starts at the proposed parent and follows `parent_id` links
//! upward. It stops at a root (no cycle), at the node being moved (cycle),
//! at a node seen earlier in the same walk (existing loop in the data), or
//! once the hop limit is spent. The last two also count as a cycle.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DbErr};
use tracing::warn;
use uuid::Uuid;

use crate::db::department;

/// Outcome of an ancestor walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reached a root; the reparent is safe.
    ReachedRoot,
    /// The node being moved is an ancestor of the proposed parent.
    ReachesSelf,
    /// A node repeated before reaching a root.
    Revisited(Uuid),
    /// Hop limit spent before reaching a root.
    DepthExceeded,
}

impl Verdict {
    pub fn is_cycle(self) -> bool {
        !matches!(self, Self::ReachedRoot)
    }
}

/// Next action of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetch the parent of this node and feed it back.
    Lookup(Uuid),
    Done(Verdict),
}

/// Walk state, independent of where parent links come from.
#[derive(Debug)]
pub struct AncestorWalk {
    node_id: Uuid,
    max_hops: usize,
    hops: usize,
    visited: HashSet<Uuid>,
}

impl AncestorWalk {
    pub fn new(node_id: Uuid, max_hops: usize) -> Self {
        Self {
            node_id,
            max_hops,
            hops: 0,
            visited: HashSet::new(),
        }
    }

    /// Number of lookups requested so far.
    pub fn hops(&self) -> usize {
        self.hops
    }

    /// Advance to `current`, the proposed parent on the first call and the
    /// fetched parent link afterwards.
    pub fn visit(&mut self, current: Option<Uuid>) -> Step {
        let Some(id) = current else {
            return Step::Done(Verdict::ReachedRoot);
        };
        if id == self.node_id {
            return Step::Done(Verdict::ReachesSelf);
        }
        if !self.visited.insert(id) {
            return Step::Done(Verdict::Revisited(id));
        }
        if self.hops >= self.max_hops {
            return Step::Done(Verdict::DepthExceeded);
        }
        self.hops += 1;
        Step::Lookup(id)
    }
}

/// Walk the stored ancestors of `proposed_parent_id` within the organization.
///
/// A link to a department missing from the organization ends the walk as a root.
pub async fn walk_ancestors<C: ConnectionTrait>(
    db: &C,
    organization_id: Uuid,
    node_id: Uuid,
    proposed_parent_id: Uuid,
    max_hops: usize,
) -> Result<Verdict, DbErr> {
    let mut walk = AncestorWalk::new(node_id, max_hops);
    let mut step = walk.visit(Some(proposed_parent_id));

    let verdict = loop {
        match step {
            Step::Done(verdict) => break verdict,
            Step::Lookup(id) => {
                let parent = department::parent_of(db, organization_id, id).await?.flatten();
                step = walk.visit(parent);
            }
        }
    };

    match verdict {
        Verdict::Revisited(repeated) => warn!(
            "Existing parent loop through department {repeated} in organization {organization_id} \
             (moving {node_id} under {proposed_parent_id})"
        ),
        Verdict::DepthExceeded => warn!(
            "Ancestor walk from {proposed_parent_id} stopped after {} hops in organization \
             {organization_id}; refusing to move {node_id}",
            walk.hops()
        ),
        Verdict::ReachedRoot | Verdict::ReachesSelf => {}
    }

    Ok(verdict)
}

/// True if making `proposed_parent_id` the parent of `node_id` would create
/// a cycle, or if that cannot be ruled out within `max_hops`.
pub async fn would_create_cycle<C: ConnectionTrait>(
    db: &C,
    node_id: Uuid,
    proposed_parent_id: Uuid,
    organization_id: Uuid,
    max_hops: usize,
) -> Result<bool, DbErr> {
    Ok(walk_ancestors(db, organization_id, node_id, proposed_parent_id, max_hops)
        .await?
        .is_cycle())
}
