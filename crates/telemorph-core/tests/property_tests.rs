//! # Property-Based Tests
//!
//! Determinism and correctness invariants, checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use std::sync::Arc;
use telemorph_core::{
    Bindings, MacsecStatusTranslator, Notification, Path, PathElem, StateCache, Translator,
    TypedValue, apply_bind, bind_keys, compare_versions, path_matches, vars_to_wildcards,
};

// =============================================================================
// STRATEGIES
// =============================================================================

fn key_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.:-]{1,10}"
}

/// A key value that may contain characters needing escapes.
fn awkward_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9/\\]\\[=]{1,10}"
}

/// A template of `values.len()` elements, each keyed by one variable.
fn template(len: usize) -> Path {
    Path::new(
        (0..len)
            .map(|i| PathElem::new(format!("e{i}")).with_key("k", format!("<v{i}>")))
            .collect(),
    )
}

fn concrete(values: &[String]) -> Path {
    Path::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| PathElem::new(format!("e{i}")).with_key("k", v.clone()))
            .collect(),
    )
}

/// One flag update under `Et1`'s MACsec status tree.
type FlagUpdate = (Path, bool);

fn flag_updates(enabled: bool, sessions: &[(bool, bool)]) -> Vec<FlagUpdate> {
    let intf = |rest: &str| {
        Path::parse(&format!("eos_native:/macsec/status/intf[name=Et1]{rest}")).expect("parse")
    };
    let mut updates = vec![(intf("/port-enabled"), enabled)];
    for (i, (success, principal)) in sessions.iter().enumerate() {
        updates.push((intf(&format!("/mka/session[ckn=k{i}]/success")), *success));
        updates.push((intf(&format!("/mka/session[ckn=k{i}]/principal")), *principal));
    }
    updates
}

/// Apply updates one notification at a time, returning the last output.
fn replay(updates: &[FlagUpdate]) -> Option<Notification> {
    let t = MacsecStatusTranslator::new(Arc::new(StateCache::new()));
    let mut last = None;
    for (path, value) in updates {
        let n = Notification::new(1, Path::default().with_target("dev"))
            .with_update(path.clone(), TypedValue::Bool(*value));
        last = t.translate(&n).expect("translate");
    }
    last
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Binding a template to a concrete path and applying it gives the path back.
    #[test]
    fn bind_then_apply_reproduces_concrete(values in vec(key_value(), 1..8)) {
        let template = template(values.len());
        let concrete = concrete(&values);

        let bindings = bind_keys(&template, &concrete).expect("bind");
        prop_assert_eq!(bindings.len(), values.len());
        prop_assert_eq!(apply_bind(&bindings, &template).expect("apply"), concrete);
    }

    /// Any path produced by a template matches that template's wildcard pattern.
    #[test]
    fn applied_template_matches_its_pattern(values in vec(key_value(), 1..8)) {
        let template = template(values.len());
        let bindings: Bindings = values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("v{i}"), v.clone()))
            .collect();

        let produced = apply_bind(&bindings, &template).expect("apply");
        prop_assert!(path_matches(&produced, &vars_to_wildcards(&template)));
    }

    /// An extra key on the concrete side never matches.
    #[test]
    fn key_count_mismatch_never_matches(value in key_value(), extra in key_value()) {
        let pattern = Path::new(vec![PathElem::new("a").with_key("k", "*")]);
        let concrete = Path::new(vec![
            PathElem::new("a").with_key("k", value).with_key("z", extra),
        ]);
        prop_assert!(!path_matches(&concrete, &pattern));
    }

    /// Escaped key values survive rendering and parsing.
    #[test]
    fn rendered_paths_parse_back(values in vec(awkward_value(), 1..5)) {
        let path = concrete(&values).with_origin("openconfig");
        prop_assert_eq!(Path::parse(&path.to_string()).expect("parse"), path);
    }

    /// The final status does not depend on the order facts arrive in.
    #[test]
    fn fact_arrival_order_is_irrelevant(
        (ordered, shuffled) in (any::<bool>(), vec((any::<bool>(), any::<bool>()), 1..5))
            .prop_flat_map(|(enabled, sessions)| {
                let updates = flag_updates(enabled, &sessions);
                (Just(updates.clone()), Just(updates).prop_shuffle())
            })
    ) {
        let a = replay(&ordered);
        let b = replay(&shuffled);
        prop_assert!(a.is_some());
        prop_assert_eq!(a, b);
    }

    /// Translating the same notification twice gives the same output.
    #[test]
    fn translation_is_idempotent(
        enabled in any::<bool>(),
        sessions in vec((any::<bool>(), any::<bool>()), 1..5)
    ) {
        let t = MacsecStatusTranslator::new(Arc::new(StateCache::new()));
        let mut n = Notification::new(7, Path::default().with_target("dev"));
        for (path, value) in flag_updates(enabled, &sessions) {
            n = n.with_update(path, TypedValue::Bool(value));
        }
        let first = t.translate(&n).expect("translate");
        let second = t.translate(&n).expect("translate");
        prop_assert!(first.is_some());
        prop_assert_eq!(first, second);
    }

    /// Version comparison is antisymmetric.
    #[test]
    fn version_compare_antisymmetric(
        a in "[0-9]{1,2}(\\.[0-9]{1,2}[A-Z]?){0,3}",
        b in "[0-9]{1,2}(\\.[0-9]{1,2}[A-Z]?){0,3}"
    ) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }
}
