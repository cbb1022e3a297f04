use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use imt_core::constraints::build_prefix_constraints;
use imt_core::model::{LexicalModel, ScoringModel};
use imt_core::search::{BeamSearch, SearchRequest};
use imt_core::settings::Settings;
use imt_core::text::Whitespace;
use imt_core::Vocabulary;

/// Synthetic parallel corpus: `s{i}` translates to `t{i}`, sentences are
/// sliding windows over a few hundred word pairs.
fn corpus(pairs: usize, len: usize) -> (Vec<String>, Vec<String>) {
    let mut src = Vec::new();
    let mut tgt = Vec::new();
    for start in 0..pairs {
        let ids = (start..start + len).map(|i| i % pairs);
        src.push(ids.clone().map(|i| format!("s{i}")).collect::<Vec<_>>().join(" "));
        tgt.push(ids.map(|i| format!("t{i}")).collect::<Vec<_>>().join(" "));
    }
    (src, tgt)
}

fn setup() -> (Vocabulary, Vocabulary, LexicalModel, Settings) {
    let settings = Settings::default();
    let (src, tgt) = corpus(300, 8);
    let sv = Vocabulary::from_corpus(src.iter().map(String::as_str), 1);
    let tv = Vocabulary::from_corpus(tgt.iter().map(String::as_str), 1);
    let encoded: Vec<(Vec<u32>, Vec<u32>)> = src
        .iter()
        .zip(&tgt)
        .map(|(s, t)| (sv.encode(s.split_whitespace()), tv.encode(t.split_whitespace())))
        .collect();
    let model = LexicalModel::train(
        sv.len(),
        tv.len(),
        &settings.model,
        encoded.iter().map(|(s, t)| (s.as_slice(), t.as_slice())),
    )
    .unwrap_or_else(|e| panic!("training failed: {e}"));
    (sv, tv, model, settings)
}

static PREFIXES: &[(&str, &str, char)] = &[
    ("first_char", "", 't'),
    ("one_word", "t10 ", 't'),
    ("four_words", "t10 t11 t12 t13", ' '),
];

fn bench_decode(c: &mut Criterion) {
    let (sv, tv, model, settings) = setup();
    let search = BeamSearch::new(&settings.search);
    let source = sv.encode("s10 s11 s12 s13 s14 s15".split_whitespace());
    let enc = model.encode(&source).unwrap_or_else(|e| panic!("{e}"));

    let mut group = c.benchmark_group("beam_search/decode");
    for &(label, validated, next) in PREFIXES {
        let constraints = build_prefix_constraints(validated, next, &tv, &Whitespace);
        let request = SearchRequest::from_constraints(&constraints, settings.search.max_extra_words);
        group.bench_with_input(BenchmarkId::new(label, validated.len()), &request, |b, req| {
            b.iter(|| search.decode(&model, &enc, req));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
