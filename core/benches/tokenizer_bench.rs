use criterion::{criterion_group, criterion_main, Criterion};
use search_core::TextPipeline;

const TEXT: &str = "A computer network is a collection of communicating computers and other devices, \
such as printers and smart phones. Today almost all computers are connected to a computer network, \
such as the global Internet or an embedded network such as those found in modern cars. Many \
applications have only limited functionality unless they are connected to a computer network.";

fn bench_term_frequencies(c: &mut Criterion) {
    let pipeline = TextPipeline::new();
    let text = TEXT.repeat(20);
    c.bench_function("term_frequencies", |b| b.iter(|| pipeline.term_frequencies(&text)));
}

criterion_group!(benches, bench_term_frequencies);
criterion_main!(benches);
