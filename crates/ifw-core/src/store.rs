//! The rule store (§3 "Rule store", §4.D): five resolvers keyed by dispatch
//! kind, published as an atomic snapshot swap.

use std::sync::Arc;

use ifw_events::DispatchKind;

use crate::changeable::Changeable;
use crate::resolver::Resolver;
use crate::rule::{Rule, RuleId};

/// One immutable snapshot: the rule arena plus five resolvers. Built
/// off-path by the loader, then installed whole (§4.D "swap-in-place
/// publishing").
#[derive(Debug, Default)]
pub struct StoreData {
    pub rules: Vec<Rule>,
    pub activity: Resolver,
    pub broadcast: Resolver,
    pub service: Resolver,
    pub provider: Resolver,
    /// No intent semantics exist for package queries (§3): a flat list.
    pub package_rules: Vec<RuleId>,
}

impl StoreData {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn resolver(&self, kind: DispatchKind) -> Option<&Resolver> {
        match kind {
            DispatchKind::Activity => Some(&self.activity),
            DispatchKind::Broadcast => Some(&self.broadcast),
            DispatchKind::Service => Some(&self.service),
            DispatchKind::Provider => Some(&self.provider),
            DispatchKind::Package => None,
        }
    }
}

/// The live, swappable store. Readers call [`RuleStore::snapshot`] once at
/// the start of a dispatch and hold the returned `Arc` for its duration —
/// the essence of §5's "snapshot semantics": a publish mid-dispatch never
/// changes what that dispatch observes.
#[derive(Clone, Debug)]
pub struct RuleStore {
    inner: Changeable<Arc<StoreData>>,
}

impl RuleStore {
    pub fn new(initial: StoreData) -> Self {
        Self {
            inner: Changeable::new(Arc::new(initial)),
        }
    }

    /// Take a snapshot reference. Cheap: a refcount bump, no lock held past
    /// this call.
    pub fn snapshot(&self) -> Arc<StoreData> {
        self.inner.get()
    }

    /// Publish a freshly loaded store. Callers are expected to hold the
    /// dispatcher's coarse lock across this call (§4.D, §5) — `RuleStore`
    /// itself only guarantees the swap is atomic, not that it's
    /// lock-ordered with dispatch.
    pub fn publish(&self, new: StoreData) {
        self.inner.replace(Arc::new(new));
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(StoreData::default())
    }
}
