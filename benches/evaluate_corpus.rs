use criterion::{criterion_group, criterion_main, Criterion};
use disceval::{evaluate, Corpus, ParameterSpec, Profile};
use pprof::criterion::{Output, PProfProfiler};

const LABELS: [&str; 4] = ["S", "VP", "NP", "PP"];

/// A corpus of `sentences` discontinuous trees of `length` terminals over `nodes` chained
/// non-terminals. Terminal `i` is attached to non-terminal `i * stride % nodes`, so `stride` must be
/// coprime with `nodes`.
fn synthetic_corpus(sentences: u32, length: usize, nodes: usize, stride: usize) -> String {
    let mut out = String::new();
    for number in 1..=sentences {
        out += &format!("#BOS {number}\n");
        for i in 0..length {
            let tag = if i + 1 == length { "$." } else { "NN" };
            out += &format!("w{i}\t{tag}\t--\t--\t{}\n", 500 + i * stride % nodes);
        }
        for j in 0..nodes {
            let parent = if j + 1 == nodes { 0 } else { 501 + j };
            out += &format!("#{}\t{}\t--\t--\t{}\n", 500 + j, LABELS[j % LABELS.len()], parent);
        }
        out += &format!("#EOS {number}\n");
    }
    out
}

fn corpora(sentences: u32) -> (String, String) {
    (
        synthetic_corpus(sentences, 25, 10, 7),
        synthetic_corpus(sentences, 25, 10, 3),
    )
}

fn benchmark_parse_big_corpus(c: &mut Criterion) {
    let (gold, _) = corpora(10_000);
    c.bench_function("big_corpus_parse", |b| {
        b.iter(|| Corpus::parse("gold", &gold).unwrap())
    });
}

fn benchmark_evaluate_small_corpus(c: &mut Criterion) {
    let (gold, candidate) = corpora(100);
    let gold = Corpus::parse("gold", &gold).unwrap();
    let candidate = Corpus::parse("candidate", &candidate).unwrap();
    let params = ParameterSpec::from(Profile::Punctuation);
    c.bench_function("small_corpus_evaluate", |b| {
        b.iter(|| evaluate(&gold, &candidate, &params))
    });
}

fn benchmark_evaluate_big_corpus(c: &mut Criterion) {
    let (gold, candidate) = corpora(10_000);
    let gold = Corpus::parse("gold", &gold).unwrap();
    let candidate = Corpus::parse("candidate", &candidate).unwrap();
    let params = ParameterSpec::from(Profile::Punctuation);
    c.bench_function("big_corpus_evaluate", |b| {
        b.iter(|| evaluate(&gold, &candidate, &params))
    });
}

criterion_group!(
    name=corpus_benches;
    config = Criterion::default().sample_size(50).with_profiler(PProfProfiler::new(3000, Output::Flamegraph(None)));
    targets = benchmark_parse_big_corpus,
    benchmark_evaluate_small_corpus,
    benchmark_evaluate_big_corpus
);
criterion_main!(corpus_benches);
