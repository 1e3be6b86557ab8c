use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tinyserver::{HttpRequestMethod, RequestContext, RouteTable};

use std::sync::Arc;

fn table_with(routes: usize) -> RouteTable {
    let mut table = RouteTable::new();
    for i in 0..routes {
        table
            .register(
                HttpRequestMethod::Get,
                &format!("/api/v1/resource{}/[id]", i),
                Arc::new(|ctx: &mut RequestContext| ctx.write("ok")),
            )
            .unwrap();
    }
    table
        .register(
            HttpRequestMethod::Get,
            "/static/*",
            Arc::new(|ctx: &mut RequestContext| ctx.write("ok")),
        )
        .unwrap();
    table
}

fn route_compile_benchmark(c: &mut Criterion) {
    c.bench_function("route_compile", |b| {
        b.iter(|| {
            let mut table = RouteTable::new();
            table
                .register(
                    HttpRequestMethod::Get,
                    black_box("/users/[user]/posts/[post]/*"),
                    Arc::new(|ctx: &mut RequestContext| ctx.write("ok")),
                )
                .unwrap();
            table
        });
    });
}

fn route_lookup_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_lookup");

    for size in [1usize, 10, 100].iter() {
        let table = table_with(*size);
        let hit = format!("/api/v1/resource{}/42", size - 1);
        group.bench_with_input(BenchmarkId::new("last_route", size), &hit, |b, path| {
            b.iter(|| table.lookup(HttpRequestMethod::Get, black_box(path)));
        });
        group.bench_with_input(BenchmarkId::new("wildcard", size), &"/static/css/site.css", |b, path| {
            b.iter(|| table.lookup(HttpRequestMethod::Get, black_box(path)));
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &"/nothing/here", |b, path| {
            b.iter(|| table.lookup(HttpRequestMethod::Get, black_box(path)));
        });
    }

    group.finish();
}

criterion_group!(benches, route_compile_benchmark, route_lookup_benchmark);
criterion_main!(benches);
