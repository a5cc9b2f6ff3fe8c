//! Benchmarks for target compilation and template interpolation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use tsds_datasource::query::{
    Aggregation, Aggregator, BoolOp, CompareOp, QueryCompiler, Target, WhereCondition, WhereGroup,
};
use tsds_datasource::template::{
    AdhocFilter, Interpolator, ScopedVars, StaticTemplateEngine, Variable,
};

fn compiler() -> QueryCompiler {
    let engine = StaticTemplateEngine::new()
        .with_variable(Variable::new("node", vec!["rtr1.chic", "rtr2.chic", "rtr3.chic"]))
        .with_variable(Variable::new("intf", "xe-0/1/0"))
        .with_adhoc_filter(AdhocFilter::new("circuit.name", "=", "ESnet"));

    QueryCompiler::new(Interpolator::new(Arc::new(engine), "tsds"))
}

fn structured_target(groups: usize) -> Target {
    let mut target = Target::new("interface")
        .metric("node")
        .metric("intf")
        .aggregate(Aggregation::new("input", Aggregator::named("average")).with_alias("In"))
        .aggregate(Aggregation::new("output", Aggregator::percentile(95)))
        .group_by("node");

    for i in 0..groups {
        let group = WhereGroup::new()
            .with_operator(if i % 2 == 0 { BoolOp::And } else { BoolOp::Or })
            .condition(WhereCondition::new("node", CompareOp::Eq, "$node"))
            .condition(
                WhereCondition::new("intf", CompareOp::Eq, "${intf}").with_connective(BoolOp::Or),
            );
        target = target.where_group(group);
    }

    target
}

fn bench_compile(c: &mut Criterion) {
    let compiler = compiler();
    let scoped = ScopedVars::default();
    let mut group = c.benchmark_group("compile");

    for groups in [1, 10, 50] {
        let target = structured_target(groups);
        group.throughput(Throughput::Elements(groups as u64));

        group.bench_function(format!("structured_{}_groups", groups), |b| {
            b.iter(|| compiler.compile(black_box(&target), &scoped).unwrap())
        });
    }

    let raw = Target::raw(
        "get node, aggregate(values.input, $quantify, average) between ($START,$END) \
         from interface where node = \"$node\"",
    );
    group.bench_function("raw", |b| {
        b.iter(|| compiler.compile(black_box(&raw), &scoped).unwrap())
    });

    group.finish();
}

fn bench_interpolate(c: &mut Criterion) {
    let compiler = compiler();
    let interpolator = compiler.interpolator();
    let scoped = ScopedVars::default();

    c.bench_function("resolve_query", |b| {
        b.iter(|| {
            interpolator.resolve_query(
                black_box("node = \"$node\" and intf = \"[[intf]]\" and x = \"${missing}\""),
                &scoped,
            )
        })
    });
}

criterion_group!(benches, bench_compile, bench_interpolate);
criterion_main!(benches);
