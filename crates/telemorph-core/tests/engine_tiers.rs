//! # Translation Tier Tests (T0-T3)
//!
//! End-to-end behavior of the stateful MACsec translator and the registry.
//!
//! ## Tiers
//! - T0: Derivation
//! - T1: Completeness & Ordering
//! - T2: Deletion
//! - T3: Failure Handling & Isolation

use std::sync::Arc;
use telemorph_core::{
    DeviceInfo, MacsecFact, MacsecStatusTranslator, Notification, Path, Registry, RenameSpec,
    RenameTranslator, StateCache, TelemorphError, Translator, TypedValue, json_blob,
};

// =============================================================================
// HELPERS
// =============================================================================

const TARGET: &str = "dev1";

fn p(s: &str) -> Path {
    Path::parse(s).expect("parse")
}

fn translator() -> MacsecStatusTranslator {
    MacsecStatusTranslator::new(Arc::new(StateCache::<MacsecFact>::new()))
}

/// Notification rooted at the vendor MACsec status tree.
fn status(ts: i64) -> Notification {
    Notification::new(ts, p("eos_native:/macsec/status").with_target(TARGET))
}

fn enabled(n: Notification, intf: &str, value: bool) -> Notification {
    n.with_update(
        p(&format!("/intf[name={intf}]/port-enabled")),
        TypedValue::Bool(value),
    )
}

fn session(n: Notification, intf: &str, ckn: &str, success: bool, principal: bool) -> Notification {
    n.with_update(
        p(&format!("/intf[name={intf}]/mka/session[ckn={ckn}]/success")),
        TypedValue::Bool(success),
    )
    .with_update(
        p(&format!("/intf[name={intf}]/mka/session[ckn={ckn}]/principal")),
        TypedValue::Bool(principal),
    )
}

fn strings(items: &[&str]) -> TypedValue {
    TypedValue::string_list(items.iter().copied())
}

/// (status list, ckn list) for `intf` in an output notification.
fn leaf_lists(out: &Notification, intf: &str) -> (TypedValue, TypedValue) {
    let find = |leaf: &str| {
        let path = format!("/interfaces/interface[name={intf}]/macsec/state/{leaf}");
        out.updates
            .iter()
            .find(|u| u.path.to_string() == path)
            .map(|u| u.value.clone())
            .expect("leaf-list update present")
    };
    (find("status"), find("ckn"))
}

/// String members of a leaf-list.
fn items(list: &TypedValue) -> Vec<String> {
    match list {
        TypedValue::LeafList(values) => values
            .iter()
            .filter_map(|v| match v {
                TypedValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn rendered(paths: &[Path]) -> Vec<String> {
    paths.iter().map(ToString::to_string).collect()
}

// =============================================================================
// TIER T0: DERIVATION
// =============================================================================

mod t0_derivation {
    use super::*;

    /// T0.1: All three flags true yields Secured, then Unknown once success flips.
    #[test]
    fn secured_then_unknown_then_deleted() {
        let t = translator();

        let first = session(enabled(status(1), "Eth1", true), "Eth1", "ckn1", true, true);
        let out = t.translate(&first).expect("translate").expect("output");
        assert_eq!(out.prefix.origin, "openconfig");
        assert_eq!(out.prefix.target, TARGET);
        assert_eq!(
            leaf_lists(&out, "Eth1"),
            (strings(&["Secured"]), strings(&["ckn1"]))
        );

        let second = status(2).with_update(
            p("/intf[name=Eth1]/mka/session[ckn=ckn1]/success"),
            TypedValue::Bool(false),
        );
        let out = t.translate(&second).expect("translate").expect("output");
        assert_eq!(out.timestamp, 2);
        assert_eq!(
            leaf_lists(&out, "Eth1"),
            (strings(&["Unknown"]), strings(&["ckn1"]))
        );

        let third = status(3).with_delete(p("/intf[name=Eth1]"));
        let out = t.translate(&third).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(
            rendered(&out.deletes),
            vec![
                "/interfaces/interface[name=Eth1]/macsec/state/status",
                "/interfaces/interface[name=Eth1]/macsec/state/ckn",
            ]
        );
    }

    /// T0.2: Each truth-table row reaches the output.
    #[test]
    fn labels_follow_truth_table() {
        let rows = [
            (true, true, false, "Standby"),
            (true, false, false, "Pending"),
            (false, false, false, "Disabled"),
            (false, true, true, "Unknown"),
        ];
        for (e, s, pr, label) in rows {
            let t = translator();
            let n = session(enabled(status(1), "Et9", e), "Et9", "c", s, pr);
            let out = t.translate(&n).expect("translate").expect("output");
            assert_eq!(leaf_lists(&out, "Et9").0, strings(&[label]), "({e}, {s}, {pr})");
        }
    }

    /// T0.3: Opaque JSON blobs and stringified booleans are accepted.
    #[test]
    fn opaque_values_resolve() {
        let t = translator();
        let n = status(1)
            .with_update(
                p("/intf[name=Et1]/port-enabled"),
                json_blob(&serde_json::json!(true)),
            )
            .with_update(
                p("/intf[name=Et1]/mka/session[ckn=k]/success"),
                json_blob(&serde_json::json!("true")),
            )
            .with_update(
                p("/intf[name=Et1]/mka/session[ckn=k]/principal"),
                TypedValue::string("false"),
            );
        let out = t.translate(&n).expect("translate").expect("output");
        assert_eq!(leaf_lists(&out, "Et1").0, strings(&["Standby"]));
    }
}

// =============================================================================
// TIER T1: COMPLETENESS & ORDERING
// =============================================================================

mod t1_completeness {
    use super::*;

    /// T1.1: Nothing is emitted until every required fact is known.
    #[test]
    fn incomplete_record_is_deferred() {
        let t = translator();

        let out = t.translate(&enabled(status(1), "Et1", true)).expect("translate");
        assert!(out.is_none());

        let n = status(2).with_update(
            p("/intf[name=Et1]/mka/session[ckn=k1]/success"),
            TypedValue::Bool(true),
        );
        assert!(t.translate(&n).expect("translate").is_none());

        let n = status(3).with_update(
            p("/intf[name=Et1]/mka/session[ckn=k1]/principal"),
            TypedValue::Bool(true),
        );
        let out = t.translate(&n).expect("translate").expect("output");
        assert_eq!(leaf_lists(&out, "Et1").0, strings(&["Secured"]));
    }

    /// T1.2: Incomplete sessions are left out of the lists.
    #[test]
    fn only_complete_sessions_are_listed() {
        let t = translator();
        let n = session(enabled(status(1), "Et1", true), "Et1", "a", true, true).with_update(
            p("/intf[name=Et1]/mka/session[ckn=b]/success"),
            TypedValue::Bool(true),
        );
        let out = t.translate(&n).expect("translate").expect("output");
        assert_eq!(
            leaf_lists(&out, "Et1"),
            (strings(&["Secured"]), strings(&["a"]))
        );
    }

    /// T1.3: Sessions are listed in lexicographic CKN order, entities likewise.
    #[test]
    fn output_order_is_lexicographic() {
        let t = translator();
        let n = enabled(enabled(status(1), "Et2", true), "Et1", true);
        let n = session(n, "Et2", "zz", true, false);
        let n = session(n, "Et1", "k2", false, false);
        let n = session(n, "Et1", "k1", true, true);

        let out = t.translate(&n).expect("translate").expect("output");
        assert_eq!(
            leaf_lists(&out, "Et1"),
            (strings(&["Secured", "Pending"]), strings(&["k1", "k2"]))
        );
        let order: Vec<String> = out.updates.iter().map(|u| u.path.to_string()).collect();
        assert!(order[0].contains("Et1") && order[2].contains("Et2"));
    }

    /// T1.4: Replaying a notification gives the same output.
    #[test]
    fn replay_is_idempotent() {
        let t = translator();
        let n = session(enabled(status(1), "Et1", true), "Et1", "k", true, false);
        let first = t.translate(&n).expect("translate");
        let second = t.translate(&n).expect("translate");
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    /// T1.5: Leaves that do not feed the status are ignored.
    #[test]
    fn unrelated_leaves_ignored() {
        let t = translator();
        let n = status(1)
            .with_update(
                p("/intf[name=Et1]/mka/session[ckn=k]/cipher"),
                TypedValue::string("gcm-aes-256"),
            )
            .with_update(p("/intf[name=Et1]/description"), TypedValue::string("uplink"));
        assert!(t.translate(&n).expect("translate").is_none());
        assert_eq!(t.cache().entity_count(TARGET), None);
    }
}

// =============================================================================
// TIER T2: DELETION
// =============================================================================

mod t2_deletion {
    use super::*;

    fn seeded() -> MacsecStatusTranslator {
        let t = translator();
        let n = enabled(enabled(status(1), "Et1", true), "Et2", true);
        let n = session(n, "Et1", "k1", true, true);
        let n = session(n, "Et1", "k2", true, false);
        let n = session(n, "Et2", "k1", true, true);
        t.translate(&n).expect("translate").expect("output");
        t
    }

    /// T2.1: Deleting an entity in the same notification as updating it wins.
    #[test]
    fn delete_wins_over_update() {
        let t = seeded();
        let n = session(status(2), "Et1", "k3", true, true).with_delete(p("/intf[name=Et1]"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(out.deletes.len(), 2);
        assert_eq!(t.cache().entity_count(TARGET), Some(1));
    }

    /// T2.2: Removing one session re-emits the remaining ones.
    #[test]
    fn session_delete_refreshes() {
        let t = seeded();
        let n = status(2).with_delete(p("/intf[name=Et1]/mka/session[ckn=k1]"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.deletes.is_empty());
        assert_eq!(
            leaf_lists(&out, "Et1"),
            (strings(&["Standby"]), strings(&["k2"]))
        );
    }

    /// T2.3: Removing the last session deletes the outputs.
    #[test]
    fn last_session_delete_removes_outputs() {
        let t = seeded();
        let n = status(2).with_delete(p("/intf[name=Et2]/mka/session[ckn=k1]"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(
            rendered(&out.deletes),
            vec![
                "/interfaces/interface[name=Et2]/macsec/state/status",
                "/interfaces/interface[name=Et2]/macsec/state/ckn",
            ]
        );
    }

    /// T2.4: Removing one session flag drops that session from the lists.
    #[test]
    fn session_leaf_delete_refreshes() {
        let t = seeded();
        let n = status(2).with_delete(p("/intf[name=Et1]/mka/session[ckn=k2]/principal"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert_eq!(
            leaf_lists(&out, "Et1"),
            (strings(&["Secured"]), strings(&["k1"]))
        );
    }

    /// T2.5: A target-level delete removes every entity's outputs.
    #[test]
    fn target_delete_removes_everything() {
        let t = seeded();
        let n = Notification::new(2, Path::default().with_origin("eos_native").with_target(TARGET))
            .with_delete(p("/macsec/status"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(out.deletes.len(), 4);
        assert!(out.deletes[0].to_string().contains("Et1"));
        assert!(out.deletes[3].to_string().contains("Et2"));
        assert_eq!(t.cache().entity_count(TARGET), Some(0));
    }

    /// T2.6: Clearing all sessions or the port flag removes the outputs.
    #[test]
    fn category_deletes_remove_outputs() {
        let t = seeded();
        let n = status(2)
            .with_delete(p("/intf[name=Et1]/mka"))
            .with_delete(p("/intf[name=Et2]/port-enabled"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(out.deletes.len(), 4);
    }

    /// T2.7: Unrecognized deletes are skipped without error.
    #[test]
    fn unrecognized_delete_skipped() {
        let t = seeded();
        let n = status(2).with_delete(p("/intf[name=Et1]/counters"));
        assert!(t.translate(&n).expect("translate").is_none());
        assert_eq!(t.cache().entity_count(TARGET), Some(2));
    }

    /// T2.8: Dropping a target resets its state.
    #[test]
    fn cache_teardown_forgets_target() {
        let t = seeded();
        assert!(t.cache().delete_target(TARGET));
        assert!(t.cache().targets().is_empty());

        let out = t.translate(&enabled(status(2), "Et1", true)).expect("translate");
        assert!(out.is_none());
    }

    /// T2.9: Deleting the only known flag of the only session destroys the record.
    #[test]
    fn last_session_flag_delete_destroys_record() {
        let t = translator();
        let n = status(1).with_update(
            p("/intf[name=Et1]/mka/session[ckn=k]/success"),
            TypedValue::Bool(true),
        );
        assert!(t.translate(&n).expect("translate").is_none());

        let n = status(2).with_delete(p("/intf[name=Et1]/mka/session[ckn=k]/success"));
        let out = t.translate(&n).expect("translate").expect("output");
        assert!(out.updates.is_empty());
        assert_eq!(out.deletes.len(), 2);
        assert_eq!(t.cache().entity_count(TARGET), Some(0));
    }
}

// =============================================================================
// TIER T3: FAILURE HANDLING & ISOLATION
// =============================================================================

mod t3_failures {
    use super::*;

    /// T3.1: A bad value aborts the notification before any fact is stored.
    #[test]
    fn bad_value_is_fail_fast() {
        let t = translator();
        let n = enabled(status(1), "Et1", true).with_update(
            p("/intf[name=Et1]/mka/session[ckn=k]/success"),
            TypedValue::Json(b"[true]".to_vec()),
        );
        let err = t.translate(&n);
        assert!(matches!(err, Err(TelemorphError::InvalidValue { .. })));
        assert_eq!(t.cache().entity_count(TARGET), None);
    }

    /// T3.2: A non-boolean flag is rejected.
    #[test]
    fn non_boolean_flag_rejected() {
        let t = translator();
        let n = status(1).with_update(p("/intf[name=Et1]/port-enabled"), TypedValue::Uint(1));
        assert!(matches!(
            t.translate(&n),
            Err(TelemorphError::InvalidValue { .. })
        ));
    }

    /// T3.3: Targets do not share state.
    #[test]
    fn targets_are_isolated() {
        let t = translator();
        let n = session(enabled(status(1), "Et1", true), "Et1", "k", true, true);
        t.translate(&n).expect("translate").expect("output");

        let other = Notification::new(2, p("eos_native:/macsec/status").with_target("dev2"))
            .with_update(
                p("/intf[name=Et1]/mka/session[ckn=k]/principal"),
                TypedValue::Bool(true),
            );
        assert!(t.translate(&other).expect("translate").is_none());
        assert_eq!(t.cache().targets(), vec!["dev1".to_string(), "dev2".to_string()]);
    }

    /// T3.4: Notifications for one target never observe each other half-applied.
    #[test]
    fn same_target_notifications_are_serialized() {
        const THREADS: usize = 8;
        let t = Arc::new(translator());
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let t = Arc::clone(&t);
                std::thread::spawn(move || {
                    let n = session(enabled(status(1), "Et1", true), "Et1", &format!("k{i}"), true, true);
                    t.translate(&n).expect("translate").expect("output")
                })
            })
            .collect();
        let outputs: Vec<Notification> = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .collect();

        let mut longest = 0;
        for out in &outputs {
            let (labels, ckns) = leaf_lists(out, "Et1");
            let (labels, names) = (items(&labels), items(&ckns));
            assert_eq!(labels.len(), names.len());
            assert!(labels.iter().all(|l| l == "Secured"));
            let mut sorted = names.clone();
            sorted.sort();
            assert_eq!(names, sorted);
            longest = longest.max(names.len());
        }
        assert_eq!(longest, THREADS);

        let sessions = t
            .cache()
            .with_existing_target(TARGET, |s| s.entity("Et1").map(|r| r.sub_keys().count()))
            .flatten();
        assert_eq!(sessions, Some(THREADS));
    }

    /// T3.5: The registry runs only applicable translators and keeps going on failure.
    #[test]
    fn registry_selects_by_device() {
        let cache = Arc::new(StateCache::new());
        let rename = RenameTranslator::from_specs(
            "port-enabled-mirror",
            &[RenameSpec {
                input: "/macsec/status/intf[name=<intf>]/port-enabled".into(),
                output: "/interfaces/interface[name=<intf>]/macsec/config/enabled".into(),
            }],
        )
        .expect("rules");

        let mut registry = Registry::new();
        registry.register(Arc::new(MacsecStatusTranslator::new(cache)));
        registry.register(Arc::new(rename));

        let n = session(enabled(status(1), "Et1", true), "Et1", "k", true, true);

        let arista = DeviceInfo::new("Arista", "DCS-7280", "4.28.1F");
        let report = registry.translate_all(&arista, &n);
        assert!(report.failures.is_empty());
        let ids: Vec<&str> = report.outputs.iter().map(|o| o.translator.as_str()).collect();
        assert_eq!(ids, vec!["macsec-status", "port-enabled-mirror"]);

        let old = DeviceInfo::new("Arista", "DCS-7280", "4.19.0");
        let report = registry.translate_all(&old, &n);
        let ids: Vec<&str> = report.outputs.iter().map(|o| o.translator.as_str()).collect();
        assert_eq!(ids, vec!["port-enabled-mirror"]);

        let bad = status(2).with_update(
            p("/intf[name=Et1]/port-enabled"),
            TypedValue::Json(b"{".to_vec()),
        );
        let report = registry.translate_all(&arista, &bad);
        assert_eq!(report.failures.len(), 2);
        assert!(report.outputs.is_empty());
    }
}
