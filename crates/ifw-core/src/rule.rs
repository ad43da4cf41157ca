//! A rule: package scoping, effect bits, and either `matchAll` or a set of
//! filters plus a predicate tree (§3 "Rule", §4.B).

use ifw_events::{DispatchRequest, PackageQueryRequest};

use crate::collaborators::EvalContext;
use crate::predicate::{IntentFilterSpec, Predicate};

/// A stable handle into the rule arena a [`crate::store::RuleStore`] owns.
/// Resolvers reference rules by id instead of cloning predicate trees
/// (§3 "Rule objects are immutable after parse").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// The four effect bits a rule carries (§3 "effects").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effects {
    pub block: bool,
    pub log_on_block_path: bool,
    pub block_query: bool,
    pub log_on_query_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub package_name: Option<String>,
    pub effects: Effects,
    pub match_all: bool,
    /// The `And` over the rule's non-filter predicate children (§3
    /// "the root of an AND combinator tree"). Always `Predicate::And`, even
    /// when empty (vacuously true).
    pub predicate: Predicate,
    pub intent_filters: Vec<IntentFilterSpec>,
    pub component_filters: Vec<ifw_events::Component>,
}

impl Rule {
    /// §4.B enforcement-path match: package scoping, then the predicate.
    pub fn matches(&self, ctx: EvalContext<'_>, req: &DispatchRequest) -> bool {
        if !self.package_scoping_passes(req.resolved_component.as_ref().map(|c| c.package.as_str())) {
            return false;
        }
        self.predicate.matches(ctx, req)
    }

    /// §4.B package-query-path match.
    pub fn matches_package(&self, ctx: EvalContext<'_>, req: &PackageQueryRequest) -> bool {
        if !self.package_scoping_passes(Some(req.resolved_package.as_str())) {
            return false;
        }
        self.predicate.matches_package(ctx, req)
    }

    fn package_scoping_passes(&self, resolved_package: Option<&str>) -> bool {
        match &self.package_name {
            None => true,
            Some(want) => resolved_package == Some(want.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifw_events::{CallerInfo, Component, DispatchKind, Intent, Uid, UserId};

    fn base_req() -> DispatchRequest {
        DispatchRequest {
            kind: DispatchKind::Activity,
            intent: Some(Intent::new().with_action("a.b.C")),
            resolved_component: Some(Component::new("com.y", "com.y.Z")),
            caller: CallerInfo::new(20000, 1, vec![]),
            receiving_uid: Uid(20001),
            resolved_type: None,
            user_id: UserId(0),
        }
    }

    struct AllowHost;
    impl crate::collaborators::HostCollaborator for AllowHost {
        fn check_permission(&self, _: &str, _: ifw_events::Pid, _: Uid, _: Uid, _: bool) -> Result<bool, crate::error::ProviderError> {
            Ok(true)
        }
        fn device_provisioned(&self) -> Result<bool, crate::error::ProviderError> {
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
    struct EmptyPackages;
    impl crate::collaborators::PackageQueries for EmptyPackages {
        fn packages_for_uid(&self, _: Uid) -> Result<Vec<String>, crate::error::ProviderError> {
            Ok(vec![])
        }
        fn signature_matches_platform(&self, _: Uid) -> Result<bool, crate::error::ProviderError> {
            Ok(false)
        }
    }

    #[test]
    fn package_scoping_rejects_mismatch() {
        let rule = Rule {
            package_name: Some("com.x".into()),
            effects: Effects {
                block: true,
                ..Default::default()
            },
            match_all: false,
            predicate: Predicate::And(vec![]),
            intent_filters: vec![],
            component_filters: vec![],
        };
        let host = AllowHost;
        let pkgs = EmptyPackages;
        let ctx = EvalContext::new(&pkgs, &host);
        // resolved component is com.y, rule scopes to com.x -> no match (S2).
        assert!(!rule.matches(ctx, &base_req()));
    }

    #[test]
    fn empty_and_is_vacuously_true() {
        let rule = Rule {
            package_name: None,
            effects: Effects::default(),
            match_all: false,
            predicate: Predicate::And(vec![]),
            intent_filters: vec![],
            component_filters: vec![],
        };
        let host = AllowHost;
        let pkgs = EmptyPackages;
        let ctx = EvalContext::new(&pkgs, &host);
        assert!(rule.matches(ctx, &base_req()));
    }
}
