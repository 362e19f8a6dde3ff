use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::collections::HashSet;

// Import from the library
use citation_resolution::batch::cache_key;
use citation_resolution::ground_truth::{CorpusRecord, GenerationOptions, GroundTruthGenerator};
use citation_resolution::metrics::ranking::{mean_average_precision, ndcg_at_k_binary, RankedQuery};
use citation_resolution::metrics::{
    calculate_confidence_calibration, calculate_metrics_by_confidence_threshold,
    calculate_precision_recall_f1, title_similarity, MatchCriteria,
};
use citation_resolution::resolution::{MatchedRecord, ResolutionResult, ResolutionSource};

fn corpus(n: usize) -> Vec<CorpusRecord> {
    (0..n)
        .map(|i| CorpusRecord {
            paper_id: format!("p{}", i),
            title: format!("A study of large scale citation networks and their evolution, part {}", i),
            authors: vec![format!("Author{}, First Middle", i), "Second, Person".to_string()],
            year: Some(1980 + (i % 40) as i32),
            journal: Some("Journal of Benchmarks".to_string()),
            doi: Some(format!("10.1000/bench.{}", i)),
            openalex_id: Some(format!("W{}", i)),
            s2_id: None,
        })
        .collect()
}

fn bench_ground_truth(c: &mut Criterion) {
    let generator = GroundTruthGenerator::new(corpus(5000), 42);
    let options = GenerationOptions {
        num_samples: 1000,
        ..Default::default()
    };

    let mut group = c.benchmark_group("ground_truth");
    group.throughput(Throughput::Elements(1000));
    group.bench_function("generate_1000", |b| {
        b.iter(|| black_box(generator.generate_from_corpus(&options)))
    });
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let ground_truth = GroundTruthGenerator::new(corpus(2000), 7).generate_from_corpus(&GenerationOptions {
        num_samples: 2000,
        ..Default::default()
    });
    let results: Vec<ResolutionResult> = ground_truth
        .iter()
        .enumerate()
        .map(|(i, gt)| {
            ResolutionResult::resolved(
                gt.citation.clone(),
                ResolutionSource::Crossref,
                MatchedRecord {
                    doi: if i % 5 == 0 { Some("10.1/wrong".to_string()) } else { gt.ground_truth_doi.clone() },
                    title: Some(gt.ground_truth_title.clone()),
                    authors: gt.ground_truth_authors.clone(),
                    ..Default::default()
                },
                (i % 100) as f64 / 100.0,
            )
        })
        .collect();
    let thresholds: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();

    let mut group = c.benchmark_group("citation_metrics");
    group.throughput(Throughput::Elements(results.len() as u64));

    group.bench_function("precision_recall_f1_any", |b| {
        b.iter(|| calculate_precision_recall_f1(black_box(&ground_truth), black_box(&results), MatchCriteria::Any))
    });
    group.bench_function("precision_recall_f1_title_author", |b| {
        b.iter(|| {
            calculate_precision_recall_f1(black_box(&ground_truth), black_box(&results), MatchCriteria::TitleAuthor)
        })
    });
    group.bench_function("calibration_10_bins", |b| {
        b.iter(|| calculate_confidence_calibration(&ground_truth, &results, 10, MatchCriteria::Doi))
    });
    group.bench_function("threshold_sweep_20", |b| {
        b.iter(|| calculate_metrics_by_confidence_threshold(&ground_truth, &results, &thresholds, MatchCriteria::Doi))
    });
    group.finish();
}

fn bench_text(c: &mut Criterion) {
    let pairs = [
        ("Attention Is All You Need", "Attention is all you need."),
        ("Deep Residual Learning for Image Recognition", "Deep Residual Learnign for Image Recognition"),
        ("BERT: Pre-training of Deep Bidirectional Transformers", "BERT: Pre-training of Deep Bidirectional Tr..."),
    ];
    let citations = GroundTruthGenerator::new(corpus(100), 1).generate_from_corpus(&GenerationOptions::default());

    let mut group = c.benchmark_group("text");
    group.bench_function("title_similarity", |b| {
        b.iter(|| {
            for (a, t) in &pairs {
                black_box(title_similarity(a, t));
            }
        })
    });
    group.throughput(Throughput::Elements(citations.len() as u64));
    group.bench_function("cache_key", |b| {
        b.iter(|| {
            for gt in &citations {
                black_box(cache_key(&gt.citation));
            }
        })
    });
    group.finish();
}

fn bench_ranking(c: &mut Criterion) {
    let queries: Vec<RankedQuery<usize>> = (0..500)
        .map(|q| {
            let retrieved: Vec<usize> = (0..100).map(|i| (i * 7 + q) % 300).collect();
            let relevant: HashSet<usize> = (0..20).map(|i| (i * 13 + q) % 300).collect();
            RankedQuery::new(retrieved, relevant)
        })
        .collect();

    let mut group = c.benchmark_group("ranking");
    group.throughput(Throughput::Elements(queries.len() as u64));
    group.bench_function("map_500_queries", |b| b.iter(|| black_box(mean_average_precision(&queries))));
    group.bench_function("ndcg_at_10", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(ndcg_at_k_binary(&q.retrieved, &q.relevant, 10));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_ground_truth, bench_metrics, bench_text, bench_ranking);
criterion_main!(benches);
