//! Configuration for a firewall instance (§6 "Directory layout", §4.F).

use std::path::PathBuf;
use std::time::Duration;

/// The fixed debounce window from §4.F. Exposed as a default rather than a
/// constant so tests can shrink it (the teacher does the same for
/// `Config::throttle`).
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Where rules live and how reloads are paced.
#[derive(Debug, Clone)]
pub struct FirewallConfig {
    /// The writable, watched rules directory (§6: host data-system `ifw/`).
    pub writable_dir: PathBuf,
    /// Read-only directories, read once at startup, in the order they take
    /// effect. Later entries don't override earlier ones — rules are
    /// OR-combined regardless of which directory contributed them.
    pub readonly_dirs: Vec<PathBuf>,
    /// Debounce window for coalescing filesystem bursts (§4.F).
    pub debounce: Duration,
}

impl FirewallConfig {
    pub fn new(writable_dir: impl Into<PathBuf>) -> Self {
        Self {
            writable_dir: writable_dir.into(),
            readonly_dirs: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_readonly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.readonly_dirs.push(dir.into());
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// All directories to enumerate at load time, writable first, matching
    /// the order loader tests and the one-line summary log expect.
    pub fn all_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.writable_dir).chain(self.readonly_dirs.iter())
    }
}

/// The platform's standard read-only search path (§6), for hosts that want
/// the real layout rather than a test fixture.
pub fn platform_readonly_dirs() -> Vec<PathBuf> {
    [
        "/system/etc/ifw.d/",
        "/system_ext/etc/ifw.d/",
        "/product/etc/ifw.d/",
        "/odm/etc/ifw.d/",
        "/vendor/etc/ifw.d/",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}
