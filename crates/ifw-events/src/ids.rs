use std::fmt;

/// A stable numeric identity for an application installation.
///
/// May back multiple package names (the platform allows several packages to
/// share a UID via `sharedUserId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Uid(pub i32);

/// The root UID, always classified as `system`.
pub const ROOT_UID: Uid = Uid(0);

/// The first UID reserved for third-party applications; anything below this
/// (and not root) is a system UID.
pub const FIRST_APPLICATION_UID: Uid = Uid(10_000);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Uid {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// A process identity, scoped to a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Pid {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// A multi-user Android user handle (distinct from `Uid`, which is
/// per-(user, app) on a multi-user device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserId(pub i32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(v: i32) -> Self {
        Self(v)
    }
}
