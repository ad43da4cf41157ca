//! The predicate tree (§3, §4.A): leaf predicates and boolean combinators
//! sharing one `matches`/`matches_package` contract.

use ifw_events::{Component, DispatchRequest, PackageQueryRequest, Uid, ROOT_UID, FIRST_APPLICATION_UID};
use regex::Regex;

use crate::collaborators::EvalContext;
use crate::error::ProviderError;

/// One of the five matching modes a string leaf accepts (§3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Equals,
    StartsWith,
    Contains,
    Pattern,
    Regex,
}

/// Which intent/component attribute a string leaf inspects (§3's ten
/// string-match leaves).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringAttr {
    Action,
    Component,
    ComponentName,
    ComponentPackage,
    Data,
    Host,
    MimeType,
    Scheme,
    Path,
    Ssp,
}

/// `sender`/`target` classification buckets (§3, §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleClass {
    Signature,
    System,
    User,
}

/// Which side of a dispatch a role-based leaf inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Target,
}

/// The `port` leaf's numeric spec: an exact port or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSpec {
    Exact(u16),
    Range(u16, u16),
}

impl PortSpec {
    fn admits(&self, port: u16) -> bool {
        match self {
            Self::Exact(p) => *p == port,
            Self::Range(lo, hi) => (*lo..=*hi).contains(&port),
        }
    }
}

/// One action/category/data/scheme/host/path/mime-type pattern, the unit
/// the platform's intent-filter semantics are built from (§3 "intent-filter",
/// §2.C). Reused both as a rule's top-level filter child (indexed by the
/// resolver) and as the `intent-filter` predicate leaf embedded inline in a
/// tree — the two placements share identical admission semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentFilterSpec {
    pub actions: Vec<String>,
    pub categories: Vec<String>,
    pub data_schemes: Vec<String>,
    pub data_hosts: Vec<String>,
    pub mime_types: Vec<String>,
}

impl IntentFilterSpec {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
            && self.categories.is_empty()
            && self.data_schemes.is_empty()
            && self.data_hosts.is_empty()
            && self.mime_types.is_empty()
    }

    /// Whether this filter admits `intent`, following the platform's
    /// intent-filter rule: an empty attribute list for a dimension means
    /// "don't constrain on it"; a non-empty list requires a match against
    /// at least one entry.
    pub fn admits(&self, intent: &ifw_events::Intent) -> bool {
        if !self.actions.is_empty() {
            let action_matches = intent
                .action
                .as_deref()
                .is_some_and(|a| self.actions.iter().any(|want| want == a));
            if !action_matches {
                return false;
            }
        }

        if !self.categories.is_empty() && !self.categories.iter().all(|c| intent.categories.contains(c)) {
            return false;
        }

        if !self.mime_types.is_empty() {
            let mime_matches = intent
                .mime_type
                .as_deref()
                .is_some_and(|m| self.mime_types.iter().any(|want| want == m));
            if !mime_matches {
                return false;
            }
        }

        if !self.data_schemes.is_empty() {
            let scheme_matches = intent
                .data
                .as_ref()
                .and_then(|d| d.scheme.as_deref())
                .is_some_and(|s| self.data_schemes.iter().any(|want| want == s));
            if !scheme_matches {
                return false;
            }
        }

        if !self.data_hosts.is_empty() {
            let host_matches = intent
                .data
                .as_ref()
                .and_then(|d| d.host.as_deref())
                .is_some_and(|h| self.data_hosts.iter().any(|want| want == h));
            if !host_matches {
                return false;
            }
        }

        true
    }
}

/// The tagged predicate tree (§3, §9 "Deep inheritance ... becomes a tagged
/// variant").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    StringMatch {
        attr: StringAttr,
        mode: MatchMode,
        literal: String,
    },
    Category(String),
    Port(PortSpec),
    RoleType {
        role: Role,
        class: RoleClass,
    },
    RolePackage {
        role: Role,
        package: String,
    },
    RolePermission {
        role: Role,
        permission: String,
    },
    IntentFilter(IntentFilterSpec),
    Provisioned,
}

impl Predicate {
    /// The enforcement/query-path contract (§4.A).
    pub fn matches(&self, ctx: EvalContext<'_>, req: &DispatchRequest) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.matches(ctx, req)),
            Self::Or(children) => children.iter().any(|c| c.matches(ctx, req)),
            Self::Not(child) => !child.matches(ctx, req),
            Self::StringMatch { attr, mode, literal } => {
                match_string(*mode, literal, dispatch_attr(*attr, req).as_deref())
            }
            Self::Category(name) => req.intent.as_ref().is_some_and(|i| i.categories.contains(name)),
            Self::Port(spec) => req
                .intent
                .as_ref()
                .and_then(|i| i.data.as_ref())
                .and_then(|d| d.port)
                .is_some_and(|p| spec.admits(p)),
            Self::RoleType { role, class } => {
                let uid = match role {
                    Role::Sender => req.caller.uid,
                    Role::Target => req.receiving_uid,
                };
                classify(ctx, uid) == *class
            }
            Self::RolePackage { role, package } => match role {
                Role::Sender => req.caller.packages.iter().any(|p| p == package),
                Role::Target => req
                    .resolved_component
                    .as_ref()
                    .is_some_and(|c| &c.package == package),
            },
            Self::RolePermission { role, permission } => {
                let result = match role {
                    Role::Sender => ctx.host.check_permission(
                        permission,
                        req.caller.pid,
                        req.caller.uid,
                        req.receiving_uid,
                        true,
                    ),
                    Role::Target => ctx.host.check_permission(
                        permission,
                        ifw_events::Pid(0),
                        req.receiving_uid,
                        req.caller.uid,
                        true,
                    ),
                };
                resolve_provider(result)
            }
            Self::IntentFilter(spec) => req.intent.as_ref().is_some_and(|intent| spec.admits(intent)),
            Self::Provisioned => resolve_provider(ctx.host.device_provisioned()),
        }
    }

    /// The package-query-path contract (§4.A, §4.B). Leaves that need an
    /// intent (string matches, category, port, intent-filter) have nothing
    /// to inspect on this path and evaluate to `false` — the same
    /// fail-closed-leaf-but-safe-overall default as an unavailable provider
    /// (§4.A "the safer default is to not match").
    pub fn matches_package(&self, ctx: EvalContext<'_>, req: &PackageQueryRequest) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.matches_package(ctx, req)),
            Self::Or(children) => children.iter().any(|c| c.matches_package(ctx, req)),
            Self::Not(child) => !child.matches_package(ctx, req),
            Self::RoleType { role, class } => {
                let uid = match role {
                    Role::Sender => req.caller_uid,
                    Role::Target => req.target_uid,
                };
                classify(ctx, uid) == *class
            }
            Self::RolePackage { role, package } => match role {
                Role::Sender => resolve_provider(ctx.packages.packages_for_uid(req.caller_uid))
                    .iter()
                    .any(|p| p == package),
                Role::Target => &req.resolved_package == package,
            },
            Self::RolePermission { role, permission } => {
                let (uid, owning_uid) = match role {
                    Role::Sender => (req.caller_uid, req.target_uid),
                    Role::Target => (req.target_uid, req.caller_uid),
                };
                resolve_provider(ctx.host.check_permission(permission, ifw_events::Pid(0), uid, owning_uid, true))
            }
            Self::Provisioned => resolve_provider(ctx.host.device_provisioned()),
            Self::StringMatch { .. }
            | Self::Category(_)
            | Self::Port(_)
            | Self::IntentFilter(_) => false,
        }
    }
}

fn classify(ctx: EvalContext<'_>, uid: Uid) -> RoleClass {
    if resolve_provider(ctx.packages.signature_matches_platform(uid)) {
        RoleClass::Signature
    } else if uid == ROOT_UID || uid.0 < FIRST_APPLICATION_UID.0 {
        RoleClass::System
    } else {
        RoleClass::User
    }
}

/// Unwraps a provider call, logging and falling back to the type's `Default`
/// (`false` for bool, an empty list for `Vec`) on failure — "the enclosing
/// dispatch logs the underlying provider error separately" (§4.A), and the
/// predicate itself degrades toward not matching (§7 `ProviderUnavailable`).
fn resolve_provider<T: Default>(result: Result<T, ProviderError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "provider call failed, predicate evaluates false");
            T::default()
        }
    }
}

fn dispatch_attr(attr: StringAttr, req: &DispatchRequest) -> Option<String> {
    match attr {
        StringAttr::Action => req.intent.as_ref().and_then(|i| i.action.clone()),
        StringAttr::Component => req.resolved_component.as_ref().map(Component::flatten),
        StringAttr::ComponentName => req.resolved_component.as_ref().map(|c| c.class.clone()),
        StringAttr::ComponentPackage => req.resolved_component.as_ref().map(|c| c.package.clone()),
        StringAttr::Data => req.intent.as_ref().and_then(|i| i.data.as_ref()).and_then(|d| d.full.clone()),
        StringAttr::Host => req.intent.as_ref().and_then(|i| i.data.as_ref()).and_then(|d| d.host.clone()),
        StringAttr::MimeType => req
            .resolved_type
            .clone()
            .or_else(|| req.intent.as_ref().and_then(|i| i.mime_type.clone())),
        StringAttr::Scheme => req.intent.as_ref().and_then(|i| i.data.as_ref()).and_then(|d| d.scheme.clone()),
        StringAttr::Path => req.intent.as_ref().and_then(|i| i.data.as_ref()).and_then(|d| d.path.clone()),
        StringAttr::Ssp => req.intent.as_ref().and_then(|i| i.data.as_ref()).and_then(|d| d.ssp.clone()),
    }
}

/// Compiles `pattern` mode's simplified glob (`*` = any run, everything else
/// literal) into an anchored regex. This crate's concrete choice for the
/// "glob grammar" §4.A leaves to the implementer.
fn compile_glob(literal: &str) -> Option<Regex> {
    let mut pattern = String::from("^");
    for part in literal.split('*') {
        pattern.push_str(&regex::escape(part));
        pattern.push_str(".*");
    }
    // split('*') leaves one trailing ".*" too many; trim it back off.
    pattern.truncate(pattern.len() - 2);
    pattern.push('$');
    Regex::new(&pattern).ok()
}

fn match_string(mode: MatchMode, literal: &str, subject: Option<&str>) -> bool {
    let Some(subject) = subject else {
        // §4.A: "An empty subject ... matches only an `equals` predicate
        // against the empty string for modes other than `contains`."
        return mode == MatchMode::Equals && literal.is_empty();
    };
    match mode {
        MatchMode::Equals => subject == literal,
        MatchMode::StartsWith => subject.starts_with(literal),
        MatchMode::Contains => subject.contains(literal),
        MatchMode::Pattern => compile_glob(literal).is_some_and(|re| re.is_match(subject)),
        MatchMode::Regex => Regex::new(literal).is_ok_and(|re| re.is_match(subject)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifw_events::{CallerInfo, DispatchKind, Intent, IntentData, UserId};

    fn req(intent: Option<Intent>) -> DispatchRequest {
        DispatchRequest {
            kind: DispatchKind::Activity,
            intent,
            resolved_component: Some(Component::new("com.x", "com.x.Main")),
            caller: CallerInfo::new(20000, 1234, vec!["com.caller".into()]),
            receiving_uid: Uid(20001),
            resolved_type: None,
            user_id: UserId(0),
        }
    }

    struct NoopHost;
    impl crate::collaborators::HostCollaborator for NoopHost {
        fn check_permission(&self, _: &str, _: ifw_events::Pid, _: Uid, _: Uid, _: bool) -> Result<bool, ProviderError> {
            Ok(false)
        }
        fn device_provisioned(&self) -> Result<bool, ProviderError> {
            Ok(true)
        }
        fn dispatch_lock(&self) -> &parking_lot::Mutex<()> {
            static LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
            &LOCK
        }
        fn drop_identity(&self) -> crate::collaborators::IdentityToken {
            crate::collaborators::IdentityToken(0)
        }
        fn restore_identity(&self, _: crate::collaborators::IdentityToken) {}
    }

    struct NoopPackages;
    impl crate::collaborators::PackageQueries for NoopPackages {
        fn packages_for_uid(&self, _: Uid) -> Result<Vec<String>, ProviderError> {
            Ok(Vec::new())
        }
        fn signature_matches_platform(&self, _: Uid) -> Result<bool, ProviderError> {
            Ok(false)
        }
    }

    fn ctx<'a>(host: &'a dyn crate::collaborators::HostCollaborator, pkgs: &'a NoopPackages) -> EvalContext<'a> {
        EvalContext::new(pkgs, host)
    }

    #[test]
    fn action_equals_matches() {
        let host = NoopHost;
        let pkgs = NoopPackages;
        let pred = Predicate::StringMatch {
            attr: StringAttr::Action,
            mode: MatchMode::Equals,
            literal: "a.b.C".into(),
        };
        let d = req(Some(Intent::new().with_action("a.b.C")));
        assert!(pred.matches(ctx(&host, &pkgs), &d));

        let d = req(Some(Intent::new().with_action("a.b.D")));
        assert!(!pred.matches(ctx(&host, &pkgs), &d));
    }

    #[test]
    fn absent_subject_only_matches_empty_equals() {
        let host = NoopHost;
        let pkgs = NoopPackages;
        let d = req(None);
        let equals_empty = Predicate::StringMatch {
            attr: StringAttr::Action,
            mode: MatchMode::Equals,
            literal: String::new(),
        };
        assert!(equals_empty.matches(ctx(&host, &pkgs), &d));

        let starts_with_empty = Predicate::StringMatch {
            attr: StringAttr::Action,
            mode: MatchMode::StartsWith,
            literal: String::new(),
        };
        assert!(!starts_with_empty.matches(ctx(&host, &pkgs), &d));
    }

    #[test]
    fn or_of_permissions() {
        let host = NoopHost;
        let pkgs = NoopPackages;
        let pred = Predicate::Or(vec![
            Predicate::RolePermission {
                role: Role::Sender,
                permission: "P1".into(),
            },
            Predicate::RolePermission {
                role: Role::Sender,
                permission: "P2".into(),
            },
        ]);
        let d = req(None);
        assert!(!pred.matches(ctx(&host, &pkgs), &d));
    }

    struct FailingHost;
    impl crate::collaborators::HostCollaborator for FailingHost {
        fn check_permission(&self, _: &str, _: ifw_events::Pid, _: Uid, _: Uid, _: bool) -> Result<bool, ProviderError> {
            Err(ProviderError::PermissionUnavailable("host unreachable".into()))
        }
        fn device_provisioned(&self) -> Result<bool, ProviderError> {
            Err(ProviderError::ConfigUnavailable("host unreachable".into()))
        }
        fn dispatch_lock(&self) -> &parking_lot::Mutex<()> {
            static LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
            &LOCK
        }
        fn drop_identity(&self) -> crate::collaborators::IdentityToken {
            crate::collaborators::IdentityToken(0)
        }
        fn restore_identity(&self, _: crate::collaborators::IdentityToken) {}
    }

    #[test]
    fn failed_provider_call_degrades_to_no_match() {
        let host = FailingHost;
        let pkgs = NoopPackages;
        let permission = Predicate::RolePermission {
            role: Role::Sender,
            permission: "P1".into(),
        };
        let d = req(None);
        assert!(!permission.matches(ctx(&host, &pkgs), &d));

        assert!(!Predicate::Provisioned.matches(ctx(&host, &pkgs), &d));
    }

    #[test]
    fn glob_pattern_matches_prefix_and_suffix() {
        let re = compile_glob("a.b.*").unwrap();
        assert!(re.is_match("a.b.C"));
        assert!(!re.is_match("x.a.b.C"));
    }

    #[test]
    fn not_inverts_child() {
        let host = NoopHost;
        let pkgs = NoopPackages;
        let pred = Predicate::Not(Box::new(Predicate::Category("c1".into())));
        let d = req(Some(Intent::new().with_category("c1")));
        assert!(!pred.matches(ctx(&host, &pkgs), &d));
    }
}
