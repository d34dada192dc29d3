//! # Translation Benchmarks
//!
//! Performance benchmarks for telemorph-core matching and translation.
//!
//! Run with: `cargo bench -p telemorph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use telemorph_core::{
    MacsecStatusTranslator, Notification, Path, PathElem, RenameSpec, RenameTranslator,
    StateCache, Translator, TypedValue, bind_keys, path_matches,
};

/// One notification carrying `interfaces` interfaces with two sessions each.
fn macsec_burst(interfaces: usize) -> Notification {
    let mut n = Notification::new(
        1,
        Path::parse("eos_native:/macsec/status")
            .expect("parse")
            .with_target("bench"),
    );
    for i in 0..interfaces {
        let intf = format!("Ethernet{i}");
        n = n.with_update(
            Path::parse(&format!("/intf[name={intf}]/port-enabled")).expect("parse"),
            TypedValue::Bool(true),
        );
        for ckn in ["a1", "b2"] {
            for leaf in ["success", "principal"] {
                n = n.with_update(
                    Path::parse(&format!("/intf[name={intf}]/mka/session[ckn={ckn}]/{leaf}"))
                        .expect("parse"),
                    TypedValue::Bool(ckn == "a1"),
                );
            }
        }
    }
    n
}

fn deep_path(depth: usize, key_value: &str) -> Path {
    Path::new(
        (0..depth)
            .map(|i| PathElem::new(format!("e{i}")).with_key("k", key_value))
            .collect(),
    )
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_path_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_matches");

    for depth in [4, 16, 64].iter() {
        let pattern = deep_path(*depth, "*");
        let concrete = deep_path(*depth, "value");

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(path_matches(&concrete, &pattern)));
        });
    }

    group.finish();
}

fn bench_bind_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("bind_keys");

    for depth in [4, 16, 64].iter() {
        let template = Path::new(
            (0..*depth)
                .map(|i| PathElem::new(format!("e{i}")).with_key("k", format!("<v{i}>")))
                .collect(),
        );
        let concrete = deep_path(*depth, "value");

        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, _| {
            b.iter(|| black_box(bind_keys(&template, &concrete)));
        });
    }

    group.finish();
}

fn bench_macsec_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("macsec_translate");

    for size in [10, 100, 1000].iter() {
        let translator = MacsecStatusTranslator::new(Arc::new(StateCache::new()));
        let burst = macsec_burst(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(translator.translate(&burst)));
        });
    }

    group.finish();
}

fn bench_rename_translate(c: &mut Criterion) {
    let translator = RenameTranslator::from_specs(
        "counters",
        &[RenameSpec {
            input: "/Sysdb/interface/counter[intf=<intf>]/in-octets".into(),
            output: "/interfaces/interface[name=<intf>]/state/counters/in-octets".into(),
        }],
    )
    .expect("rules");

    let mut n = Notification::new(1, Path::parse("/Sysdb/interface").expect("parse"));
    for i in 0..100 {
        n = n.with_update(
            Path::parse(&format!("/counter[intf=Ethernet{i}]/in-octets")).expect("parse"),
            TypedValue::Uint(i),
        );
    }

    c.bench_function("rename_translate_100", |b| {
        b.iter(|| black_box(translator.translate(&n)));
    });
}

criterion_group!(
    benches,
    bench_path_matches,
    bench_bind_keys,
    bench_macsec_translate,
    bench_rename_translate,
);
criterion_main!(benches);
