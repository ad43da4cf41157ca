//! The per-dispatch-kind resolver index (§3 "Resolver (per kind)", §4.C).
//!
//! Phase 1 of matching: prune the full rule set down to a candidate list in
//! roughly constant expected time, using three cheap indices rather than
//! scanning every rule's predicate tree. Phase 2 (full predicate evaluation)
//! lives in [`crate::facade`].

use std::collections::HashMap;

use ifw_events::{Component, Intent};

use crate::predicate::IntentFilterSpec;
use crate::rule::RuleId;

/// `intentFilterIndex` / `componentIndex` / `matchAllList` for one dispatch
/// kind (§3, §4.C). Design freedom is explicitly granted for the
/// intent-filter index's internal shape (§4.C: "any correct implementation
/// of intent-filter semantics is acceptable") — this one is a flat scan over
/// filter entries, since rule-set sizes in this domain are small enough that
/// a prefix/bucket structure buys nothing a `Vec` scan doesn't already give.
#[derive(Debug, Default)]
pub struct Resolver {
    intent_filter_index: Vec<(IntentFilterSpec, RuleId)>,
    component_index: HashMap<Component, Vec<RuleId>>,
    match_all_list: Vec<RuleId>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_match_all(&mut self, rule: RuleId) {
        self.match_all_list.push(rule);
    }

    pub fn register_intent_filter(&mut self, filter: IntentFilterSpec, rule: RuleId) {
        self.intent_filter_index.push((filter, rule));
    }

    pub fn register_component(&mut self, component: Component, rule: RuleId) {
        self.component_index.entry(component).or_default().push(rule);
    }

    /// Builds the phase-1 candidate set for one dispatch: every rule whose
    /// intent-filter admits `intent`, plus every rule registered against
    /// `component`, plus every match-all rule — deduplicated by rule
    /// identity (§4.C step 4; Design Notes open question: dedup is required
    /// here, matching observable behavior).
    pub fn candidates(&self, intent: Option<&Intent>, component: Option<&Component>) -> Vec<RuleId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        if let Some(intent) = intent {
            for (spec, rule) in &self.intent_filter_index {
                if spec.admits(intent) && seen.insert(*rule) {
                    out.push(*rule);
                }
            }
        }

        if let Some(component) = component {
            if let Some(rules) = self.component_index.get(component) {
                for &rule in rules {
                    if seen.insert(rule) {
                        out.push(rule);
                    }
                }
            }
        }

        for &rule in &self.match_all_list {
            if seen.insert(rule) {
                out.push(rule);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::IntentFilterSpec;

    #[test]
    fn dedups_rule_matched_by_two_filters() {
        let mut resolver = Resolver::new();
        resolver.register_intent_filter(
            IntentFilterSpec {
                actions: vec!["a.b.C".into()],
                ..Default::default()
            },
            RuleId(7),
        );
        resolver.register_intent_filter(
            IntentFilterSpec {
                actions: vec!["a.b.C".into()],
                categories: vec!["cat".into()],
                ..Default::default()
            },
            RuleId(7),
        );

        let intent = Intent::new().with_action("a.b.C").with_category("cat");

        let candidates = resolver.candidates(Some(&intent), None);
        assert_eq!(candidates, vec![RuleId(7)]);
    }

    #[test]
    fn match_all_always_appended() {
        let mut resolver = Resolver::new();
        resolver.register_match_all(RuleId(1));
        let candidates = resolver.candidates(None, None);
        assert_eq!(candidates, vec![RuleId(1)]);
    }
}
