//! The dispatch façade (§4.G): the nine entry points the host dispatcher
//! calls, orchestrating a dispatch through the store, the predicate tree,
//! and the audit sink.

use std::path::Path;
use std::time::Duration;

use ifw_events::{AuditEvent, DispatchKind, DispatchRequest, EffectPath, PackageQueryRequest};
use tracing::instrument;

use crate::audit::build_event;
use crate::collaborators::{CallerIdentityGuard, EvalContext, HostCollaborator, PackageQueries};
use crate::store::RuleStore;
use crate::watcher::RulesWatcher;

/// Write-only sink for audit events (§1 "out of scope": "Audit log sinks (a
/// write-only event interface)").
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Orchestrates the two-phase match for one dispatch and decides whether to
/// emit an audit record.
pub struct Firewall {
    store: RuleStore,
    sink: Box<dyn AuditSink>,
}

struct CheckOutcome {
    block: bool,
    log: bool,
}

impl Firewall {
    pub fn new(store: RuleStore, sink: Box<dyn AuditSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Starts the background watcher for `dir`; read-only directories are
    /// never watched (§4.F).
    pub fn watch(&self, dir: &Path, debounce: Duration, on_reload: impl Fn() + Send + 'static) -> notify::Result<RulesWatcher> {
        RulesWatcher::start(dir, debounce, on_reload)
    }

    // ---- enforcement path: identity is the dispatcher's own, no adjustment (§4.G) ----

    #[instrument(level = "debug", skip_all, fields(kind = "activity"))]
    pub fn check_start_activity(&self, req: &DispatchRequest, ctx: EvalContext<'_>) -> bool {
        self.check_intent_kind(DispatchKind::Activity, req, ctx, EffectPath::Enforce)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "service"))]
    pub fn check_service(&self, req: &DispatchRequest, ctx: EvalContext<'_>) -> bool {
        self.check_intent_kind(DispatchKind::Service, req, ctx, EffectPath::Enforce)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "broadcast"))]
    pub fn check_broadcast(&self, req: &DispatchRequest, ctx: EvalContext<'_>) -> bool {
        self.check_intent_kind(DispatchKind::Broadcast, req, ctx, EffectPath::Enforce)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "provider"))]
    pub fn check_provider(&self, req: &DispatchRequest, ctx: EvalContext<'_>) -> bool {
        self.check_intent_kind(DispatchKind::Provider, req, ctx, EffectPath::Enforce)
    }

    /// Grouped with the enforcement entries per §4.G even though it answers
    /// a metadata question: there is no separate "invoke" concept for
    /// package queries, so this is the package kind's sole entry point, and
    /// it reads the same `block`/`logOnBlockPath` bits the other four do.
    #[instrument(level = "debug", skip_all, fields(kind = "package"))]
    pub fn check_query_package(&self, req: &PackageQueryRequest, ctx: EvalContext<'_>) -> bool {
        let snapshot = self.store.snapshot();
        let mut block = false;
        let mut log = false;
        for &id in &snapshot.package_rules {
            let rule = snapshot.rule(id);
            if !rule.matches_package(ctx, req) {
                continue;
            }
            block |= rule.effects.block;
            log |= rule.effects.log_on_block_path;
            if block && log {
                break;
            }
        }
        if block && log {
            self.sink.emit(AuditEvent {
                kind: DispatchKind::Package,
                short_component: None,
                caller_uid: req.caller_uid,
                caller_package_count: 0,
                caller_packages_joined: String::new(),
                action: None,
                resolved_type: None,
                data_string: None,
                intent_flags: 0,
            });
        }
        !block
    }

    // ---- query path: drop caller identity around provider calls (§4.G, property 8) ----

    #[instrument(level = "debug", skip_all, fields(kind = "activity"))]
    pub fn check_query_activity(&self, req: &DispatchRequest, host: &dyn HostCollaborator, packages: &dyn PackageQueries) -> bool {
        self.check_query(DispatchKind::Activity, req, host, packages)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "service"))]
    pub fn check_query_service(&self, req: &DispatchRequest, host: &dyn HostCollaborator, packages: &dyn PackageQueries) -> bool {
        self.check_query(DispatchKind::Service, req, host, packages)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "broadcast"))]
    pub fn check_query_receiver(&self, req: &DispatchRequest, host: &dyn HostCollaborator, packages: &dyn PackageQueries) -> bool {
        self.check_query(DispatchKind::Broadcast, req, host, packages)
    }

    #[instrument(level = "debug", skip_all, fields(kind = "provider"))]
    pub fn check_query_provider(&self, req: &DispatchRequest, host: &dyn HostCollaborator, packages: &dyn PackageQueries) -> bool {
        self.check_query(DispatchKind::Provider, req, host, packages)
    }

    fn check_query(&self, kind: DispatchKind, req: &DispatchRequest, host: &dyn HostCollaborator, packages: &dyn PackageQueries) -> bool {
        let _guard = CallerIdentityGuard::acquire(host);
        let ctx = EvalContext::new(packages, host);
        self.check_intent_kind(kind, req, ctx, EffectPath::Query)
    }

    fn check_intent_kind(&self, kind: DispatchKind, req: &DispatchRequest, ctx: EvalContext<'_>, path: EffectPath) -> bool {
        let outcome = self.evaluate(kind, req, ctx, path);
        let should_audit = match path {
            // "a logged denial": only when the dispatch was actually blocked.
            EffectPath::Enforce => outcome.block && outcome.log,
            // "a logged query": any logged query, blocked or not.
            EffectPath::Query => outcome.log,
        };
        if should_audit {
            let short_component = req.resolved_component.as_ref().map(ifw_events::Component::short);
            self.sink.emit(build_event(
                kind,
                short_component,
                &req.caller,
                req.intent.as_ref(),
                req.resolved_type.clone(),
            ));
        }
        !outcome.block
    }

    /// Two-phase match over one dispatch kind (§4.C phase 1 + phase 2).
    fn evaluate(&self, kind: DispatchKind, req: &DispatchRequest, ctx: EvalContext<'_>, path: EffectPath) -> CheckOutcome {
        let snapshot = self.store.snapshot();
        let resolver = snapshot
            .resolver(kind)
            .expect("every intent-bearing dispatch kind has a resolver");
        let candidates = resolver.candidates(req.intent.as_ref(), req.resolved_component.as_ref());

        let mut block = false;
        let mut log = false;
        for id in candidates {
            let rule = snapshot.rule(id);
            if !rule.matches(ctx, req) {
                continue;
            }
            let (b, l) = match path {
                EffectPath::Enforce => (rule.effects.block, rule.effects.log_on_block_path),
                EffectPath::Query => (rule.effects.block_query, rule.effects.log_on_query_path),
            };
            block |= b;
            log |= l;
            if block && log {
                // §4.C: pure performance optimization, never changes the result.
                break;
            }
        }

        CheckOutcome { block, log }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::IdentityToken;
    use crate::predicate::Predicate;
    use crate::resolver::Resolver;
    use crate::rule::{Effects, Rule, RuleId};
    use crate::store::StoreData;
    use ifw_events::{CallerInfo, Component, Intent, Pid, Uid, UserId};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingSink(Arc<AtomicUsize>);
    impl AuditSink for RecordingSink {
        fn emit(&self, _event: AuditEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubHost;
    impl HostCollaborator for StubHost {
        fn check_permission(&self, _: &str, _: Pid, _: Uid, _: Uid, _: bool) -> Result<bool, crate::error::ProviderError> {
            Ok(false)
        }
        fn device_provisioned(&self) -> Result<bool, crate::error::ProviderError> {
            Ok(true)
        }
        fn dispatch_lock(&self) -> &Mutex<()> {
            static LOCK: Mutex<()> = Mutex::new(());
            &LOCK
        }
        fn drop_identity(&self) -> IdentityToken {
            IdentityToken(1)
        }
        fn restore_identity(&self, _: IdentityToken) {}
    }
    struct StubPackages;
    impl PackageQueries for StubPackages {
        fn packages_for_uid(&self, _: Uid) -> Result<Vec<String>, crate::error::ProviderError> {
            Ok(vec![])
        }
        fn signature_matches_platform(&self, _: Uid) -> Result<bool, crate::error::ProviderError> {
            Ok(false)
        }
    }

    fn action_block_store() -> StoreData {
        let mut activity = Resolver::new();
        activity.register_intent_filter(
            crate::predicate::IntentFilterSpec {
                actions: vec!["a.b.C".into()],
                ..Default::default()
            },
            RuleId(0),
        );
        StoreData {
            rules: vec![Rule {
                package_name: None,
                effects: Effects {
                    block: true,
                    log_on_block_path: false,
                    ..Default::default()
                },
                match_all: false,
                predicate: Predicate::And(vec![]),
                intent_filters: vec![],
                component_filters: vec![],
            }],
            activity,
            ..Default::default()
        }
    }

    fn dispatch(action: &str) -> DispatchRequest {
        DispatchRequest {
            kind: DispatchKind::Activity,
            intent: Some(Intent::new().with_action(action)),
            resolved_component: Some(Component::new("com.y", "com.y.Z")),
            caller: CallerInfo::new(20000, 1, vec![]),
            receiving_uid: Uid(20001),
            resolved_type: None,
            user_id: UserId(0),
        }
    }

    /// Scenario S1: action-based block.
    #[test]
    fn s1_action_based_block() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fw = Firewall::new(
            RuleStore::new(action_block_store()),
            Box::new(RecordingSink(counter)),
        );
        let host = StubHost;
        let packages = StubPackages;
        let ctx = EvalContext::new(&packages, &host);
        assert!(!fw.check_start_activity(&dispatch("a.b.C"), ctx));
    }

    /// Scenario S3: matchAll on broadcast blocks every broadcast but leaves
    /// activity untouched.
    #[test]
    fn s3_match_all_scoped_to_its_kind() {
        let mut broadcast = Resolver::new();
        broadcast.register_match_all(RuleId(0));
        let store = StoreData {
            rules: vec![Rule {
                package_name: None,
                effects: Effects {
                    block: true,
                    ..Default::default()
                },
                match_all: true,
                predicate: Predicate::And(vec![]),
                intent_filters: vec![],
                component_filters: vec![],
            }],
            broadcast,
            ..Default::default()
        };
        let counter = Arc::new(AtomicUsize::new(0));
        let fw = Firewall::new(RuleStore::new(store), Box::new(RecordingSink(counter)));
        let host = StubHost;
        let packages = StubPackages;
        let ctx = EvalContext::new(&packages, &host);

        assert!(!fw.check_broadcast(&dispatch("anything"), ctx));
        assert!(fw.check_start_activity(&dispatch("anything"), ctx));
    }

    /// Scenario S5: a rule blocked only on the query path allows
    /// enforcement but denies `checkQuery*`.
    #[test]
    fn s5_query_vs_enforce_asymmetry() {
        let mut activity = Resolver::new();
        activity.register_match_all(RuleId(0));
        let store = StoreData {
            rules: vec![Rule {
                package_name: None,
                effects: Effects {
                    block: false,
                    block_query: true,
                    ..Default::default()
                },
                match_all: true,
                predicate: Predicate::And(vec![]),
                intent_filters: vec![],
                component_filters: vec![],
            }],
            activity,
            ..Default::default()
        };
        let counter = Arc::new(AtomicUsize::new(0));
        let fw = Firewall::new(RuleStore::new(store), Box::new(RecordingSink(counter)));
        let host = StubHost;
        let packages = StubPackages;
        let ctx = EvalContext::new(&packages, &host);

        assert!(fw.check_start_activity(&dispatch("x"), ctx));
        assert!(!fw.check_query_activity(&dispatch("x"), &host, &packages));
    }
}
