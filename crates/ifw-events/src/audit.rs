use crate::{DispatchKind, Uid};

/// A structured audit record emitted on a logged denial or logged query
/// (§6 "Audit records").
///
/// `caller_packages_joined` is pre-built by the firewall (see
/// `ifw_core::audit::join_packages`) under the 150-character cap described
/// in §6 and exercised by scenario S8; this type just carries the result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditEvent {
    pub kind: DispatchKind,
    pub short_component: Option<String>,
    pub caller_uid: Uid,
    pub caller_package_count: usize,
    pub caller_packages_joined: String,
    pub action: Option<String>,
    pub resolved_type: Option<String>,
    pub data_string: Option<String>,
    pub intent_flags: u32,
}
