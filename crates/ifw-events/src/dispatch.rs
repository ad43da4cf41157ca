use std::fmt;

use crate::{CallerInfo, Component, Intent, Uid, UserId};

/// The category of inter-component call the firewall mediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchKind {
    Activity,
    Broadcast,
    Service,
    Provider,
    /// Package-metadata queries. Has no intent-filter semantics; see §3.
    Package,
}

impl DispatchKind {
    /// All kinds that carry intent-filter semantics (everything but `Package`).
    pub const INTENT_KINDS: [DispatchKind; 4] = [
        DispatchKind::Activity,
        DispatchKind::Broadcast,
        DispatchKind::Service,
        DispatchKind::Provider,
    ];
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Activity => "activity",
            Self::Broadcast => "broadcast",
            Self::Service => "service",
            Self::Provider => "provider",
            Self::Package => "package",
        };
        write!(f, "{s}")
    }
}

/// Which side of a rule's effect bits a check consults.
///
/// The enforcement path reads `block`/`log`; the query path reads
/// `block_query`/`log_query` (§4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectPath {
    Enforce,
    Query,
}

/// Everything the dispatch façade knows about one inter-component dispatch,
/// for the four intent-bearing kinds (activity, broadcast, service,
/// provider).
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub kind: DispatchKind,
    pub intent: Option<Intent>,
    pub resolved_component: Option<Component>,
    pub caller: CallerInfo,
    pub receiving_uid: Uid,
    pub resolved_type: Option<String>,
    pub user_id: UserId,
}

/// A package-metadata query: no intent, just a caller and a resolved package
/// name (§3, §4.B "package-query path").
#[derive(Debug, Clone)]
pub struct PackageQueryRequest {
    pub resolved_package: String,
    pub caller_uid: Uid,
    pub target_uid: Uid,
    pub user_id: UserId,
}
