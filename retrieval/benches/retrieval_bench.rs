use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lore_embeddings::{EmbeddingProvider, HashingEmbedder};
use lore_retrieval::{
    HybridRetrieval, LexicalIndex, LexicalSearcher, Reranker, RetrievalConfig, SemanticIndex,
    TermOverlapModel,
};
use lore_vector_store::{Document, DocumentStore, VectorStore};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Runtime;

const NAMES: [&str; 6] = ["Alex", "Maya", "Kestrel", "Orin", "Sable", "Juno"];
const PLACES: [&str; 5] = ["Zone Alpha", "the Nexus", "the Consortium", "Dockside", "the Spire"];

fn create_test_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            Document::new(format!(
                "Chapter {i}. {} walked through {} while the storm {} gathered overhead.",
                NAMES[i % NAMES.len()],
                PLACES[i % PLACES.len()],
                i
            ))
        })
        .collect()
}

async fn setup_retrieval(doc_count: usize) -> (HybridRetrieval, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::default());
    let store = VectorStore::new(&temp_dir.path().join("store.json"), Arc::clone(&embedder))
        .await
        .unwrap();
    store.add(create_test_documents(doc_count)).await.unwrap();
    let store: Arc<dyn DocumentStore> = Arc::new(store);

    let config = RetrievalConfig::default();
    let lexical = Arc::new(LexicalSearcher::from_config(&config));
    lexical.rebuild_from_store(store.as_ref()).await.unwrap();

    let reranker = Reranker::from_config(Arc::new(TermOverlapModel::new()), &config);
    let retrieval = HybridRetrieval::new(
        config,
        Some(lexical),
        Some(SemanticIndex::new(embedder, store)),
        Some(reranker),
    )
    .unwrap();

    (retrieval, temp_dir)
}

fn bench_search_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_latency");

    for doc_count in [100, 500, 1000] {
        group.throughput(Throughput::Elements(doc_count as u64));

        let (retrieval, _temp) = rt.block_on(setup_retrieval(doc_count));

        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, _| {
            b.to_async(&rt).iter(|| async {
                let results = retrieval
                    .retrieve(black_box("Who is Alex?"), 5, true, true)
                    .await
                    .unwrap();
                black_box(results);
            });
        });
    }

    group.finish();
}

fn bench_pipeline_modes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (retrieval, _temp) = rt.block_on(setup_retrieval(1000));

    let mut group = c.benchmark_group("pipeline_modes");

    for (name, use_hybrid, use_reranking) in [
        ("semantic_only", false, false),
        ("hybrid", true, false),
        ("hybrid_rerank", true, true),
    ] {
        group.bench_function(name, |b| {
            b.to_async(&rt).iter(|| async {
                let results = retrieval
                    .retrieve(black_box("storm over the Spire"), 5, use_hybrid, use_reranking)
                    .await
                    .unwrap();
                black_box(results);
            });
        });
    }

    group.finish();
}

fn bench_candidate_multiplier(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("candidate_multiplier");

    for multiplier in [1, 3, 5, 10] {
        let (base, _temp) = rt.block_on(setup_retrieval(1000));
        let config = RetrievalConfig {
            candidate_multiplier: multiplier,
            ..Default::default()
        };
        let retrieval = HybridRetrieval::new(
            config.clone(),
            base.lexical().cloned(),
            base.semantic().cloned(),
            Some(Reranker::from_config(Arc::new(TermOverlapModel::new()), &config)),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(multiplier), &multiplier, |b, _| {
            b.to_async(&rt).iter(|| async {
                let results = retrieval
                    .retrieve(black_box("Maya in Zone Alpha"), 5, true, true)
                    .await
                    .unwrap();
                black_box(results);
            });
        });
    }

    group.finish();
}

fn bench_lexical_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexical_build");

    for doc_count in [1000, 5000] {
        let documents = create_test_documents(doc_count);
        group.throughput(Throughput::Elements(doc_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &documents, |b, docs| {
            b.iter(|| {
                let index = LexicalIndex::build(black_box(docs.clone()), 1.5, 0.75).unwrap();
                black_box(index);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_search_latency,
    bench_pipeline_modes,
    bench_candidate_multiplier,
    bench_lexical_build
);
criterion_main!(benches);
