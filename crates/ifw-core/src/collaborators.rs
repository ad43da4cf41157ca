//! The collaborator interfaces the core consumes but doesn't implement
//! (§1 "out of scope", §6 "Callback interface to the host dispatcher").
//!
//! Everything here is a trait an embedding host implements once; tests
//! implement a mock of each.

use ifw_events::{Pid, Uid};
use parking_lot::Mutex;

use crate::error::ProviderError;

/// Package and signature queries, backed by the host's package manager.
pub trait PackageQueries: Send + Sync {
    /// All package names sharing `uid` (a UID may back several via
    /// `sharedUserId`). `Err` when the package manager can't answer right
    /// now (§7 `ProviderUnavailable`) — the caller logs it and treats the
    /// query as having returned no packages.
    fn packages_for_uid(&self, uid: Uid) -> Result<Vec<String>, ProviderError>;

    /// Whether `uid`'s signing signature matches the platform signature
    /// (used to classify `sender`/`target` as `signature`, §4.A). `Err`
    /// when the signature check can't complete (§7 `ProviderUnavailable`).
    fn signature_matches_platform(&self, uid: Uid) -> Result<bool, ProviderError>;
}

/// The permission, lock, and configuration surface the host dispatcher
/// exposes (§6 "Callback interface").
pub trait HostCollaborator: Send + Sync {
    /// `(permission, pid, uid, owningUid, exported) -> granted?`, verbatim
    /// from §6. `Err` when the permission service can't answer (§7
    /// `ProviderUnavailable`).
    fn check_permission(
        &self,
        permission: &str,
        pid: Pid,
        uid: Uid,
        owning_uid: Uid,
        exported: bool,
    ) -> Result<bool, ProviderError>;

    /// The device-provisioned configuration bit the `provisioned` predicate
    /// reads (§3). `Err` when the configuration reader can't answer.
    fn device_provisioned(&self) -> Result<bool, ProviderError>;

    /// A handle to the dispatcher's coarse lock (§4.D, §5). The firewall
    /// never acquires this itself on the enforcement path — it's provided
    /// for the façade to assert it's held, and for the publish step.
    fn dispatch_lock(&self) -> &Mutex<()>;

    /// Drops the calling app's identity so that subsequent provider calls
    /// are attributed to the firewall, not the caller (§4.G). Returns an
    /// opaque token to hand back to [`restore_identity`][Self::restore_identity].
    fn drop_identity(&self) -> IdentityToken;

    /// Restores a previously dropped identity. Must be called exactly once
    /// per [`drop_identity`][Self::drop_identity] call, on every exit path.
    fn restore_identity(&self, token: IdentityToken);
}

/// Opaque handle returned by [`HostCollaborator::drop_identity`]. Hosts are
/// free to pack whatever they need into the inner value; the firewall only
/// ever round-trips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityToken(pub i64);

/// RAII scope that drops caller identity on construction and restores it on
/// drop, covering every exit path including panics (§4.G, testable property
/// 8: "every query-path entry restores caller identity on both normal and
/// exceptional exit").
pub struct CallerIdentityGuard<'a> {
    host: &'a dyn HostCollaborator,
    token: Option<IdentityToken>,
}

impl<'a> CallerIdentityGuard<'a> {
    pub fn acquire(host: &'a dyn HostCollaborator) -> Self {
        let token = host.drop_identity();
        Self {
            host,
            token: Some(token),
        }
    }
}

impl Drop for CallerIdentityGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.host.restore_identity(token);
        }
    }
}

/// Borrows both collaborators together, the way predicates need them (§4.A:
/// "`ctx` carries back-references to the package/permission provider and
/// configuration reader").
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub packages: &'a dyn PackageQueries,
    pub host: &'a dyn HostCollaborator,
}

impl<'a> EvalContext<'a> {
    pub fn new(packages: &'a dyn PackageQueries, host: &'a dyn HostCollaborator) -> Self {
        Self { packages, host }
    }
}
