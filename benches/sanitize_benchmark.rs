use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fileserver::{sanitize_uri, Request};

fn sanitize_plain_benchmark(c: &mut Criterion) {
    c.bench_function("sanitize_plain", |b| {
        b.iter(|| {
            let _ = sanitize_uri(black_box("/static/css/site.min.css"));
        });
    });
}

fn sanitize_variants_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize_variants");

    let uris = [
        ("encoded", "/docs/%E4%B8%AD%E6%96%87/read%20me.txt"),
        ("traversal", "/static/../../etc/passwd"),
        ("encoded_traversal", "/%2e%2e/%2e%2e/etc/passwd"),
        ("insecure", "/search/%3Cscript%3Ealert(1)%3C/script%3E"),
        ("deep", "/a/b/c/d/e/f/g/h/i/j/k/l/m/n/o/p/q/r/s/t/u/v/w/x/y/z.txt"),
    ];

    for (name, uri) in uris.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), uri, |b, uri| {
            b.iter(|| {
                let _ = sanitize_uri(black_box(uri));
            });
        });
    }

    group.finish();
}

fn request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /path/to/resource?id=123&name=test HTTP/1.1\r\n\
                    Host: localhost:8080\r\n\
                    User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Language: en-US,en;q=0.9\r\n\
                    Connection: keep-alive\r\n\
                    \r\n";

    c.bench_function("request_parse", |b| {
        b.iter(|| {
            let _ = Request::parse(black_box(request), 0);
        });
    });
}

criterion_group!(
    benches,
    sanitize_plain_benchmark,
    sanitize_variants_benchmark,
    request_parse_benchmark
);
criterion_main!(benches);
