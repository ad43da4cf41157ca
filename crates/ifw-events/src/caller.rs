use crate::Uid;

/// Identity of the app that initiated a dispatch.
///
/// A UID may back multiple package names (shared UIDs), hence `packages`
/// being a list rather than a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallerInfo {
    pub uid: Uid,
    pub pid: crate::Pid,
    pub packages: Vec<String>,
}

impl CallerInfo {
    pub fn new(uid: impl Into<Uid>, pid: impl Into<crate::Pid>, packages: Vec<String>) -> Self {
        Self {
            uid: uid.into(),
            pid: pid.into(),
            packages,
        }
    }
}
