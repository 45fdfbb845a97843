use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::tokenizer::tokenize;
use log::{debug, info, warn};
use lore_vector_store::{Document, DocumentStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// Immutable BM25 (Okapi) index over a fixed document collection.
#[derive(Debug)]
pub struct LexicalIndex {
    documents: Vec<Document>,
    /// term -> (document position, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
    k1: f32,
    b: f32,
}

impl LexicalIndex {
    /// Build an index. An empty collection is an error.
    pub fn build(documents: Vec<Document>, k1: f32, b: f32) -> Result<Self> {
        if documents.is_empty() {
            return Err(RetrievalError::EmptyCollection);
        }

        let mut postings: HashMap<String, Vec<(usize, u32)>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(documents.len());

        for (position, document) in documents.iter().enumerate() {
            let tokens = tokenize(&document.content);
            doc_lengths.push(tokens.len() as u32);

            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *frequencies.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in frequencies {
                postings.entry(term).or_default().push((position, tf));
            }
        }

        let total: u64 = doc_lengths.iter().map(|&len| u64::from(len)).sum();
        let avg_doc_length = total as f32 / documents.len() as f32;

        debug!(
            "Built lexical index: {} documents, {} terms, avgdl {:.1}",
            documents.len(),
            postings.len(),
            avg_doc_length
        );

        Ok(Self {
            documents,
            postings,
            doc_lengths,
            avg_doc_length,
            k1,
            b,
        })
    }

    /// Top `k` `(document, raw BM25 score)` pairs, best first.
    ///
    /// Documents scoring 0 are excluded. Equal scores keep insertion order.
    pub fn search(&self, query: &str, k: usize) -> Vec<(Document, f32)> {
        if k == 0 {
            return Vec::new();
        }

        let n = self.documents.len() as f32;
        // A collection of empty documents has avgdl 0.
        let avgdl = if self.avg_doc_length > 0.0 {
            self.avg_doc_length
        } else {
            1.0
        };

        let mut scores = vec![0.0f32; self.documents.len()];
        for term in tokenize(query) {
            let Some(postings) = self.postings.get(&term) else {
                continue;
            };

            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for &(position, tf) in postings {
                let tf = tf as f32;
                let length_ratio = self.doc_lengths[position] as f32 / avgdl;
                let norm = self.k1 * (1.0 - self.b + self.b * length_ratio);
                scores[position] += idf * (tf * (self.k1 + 1.0)) / (tf + norm);
            }
        }

        let mut ranked: Vec<(usize, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(position, score)| (self.documents[position].clone(), score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }
}

/// Serves lexical queries from an atomically swapped index snapshot.
///
/// Rebuilds are serialized; queries running during a rebuild read the
/// previous snapshot.
pub struct LexicalSearcher {
    k1: f32,
    b: f32,
    snapshot: RwLock<Option<Arc<LexicalIndex>>>,
    rebuild_lock: Mutex<()>,
}

impl LexicalSearcher {
    /// Create an unbuilt searcher
    pub fn new(k1: f32, b: f32) -> Self {
        Self {
            k1,
            b,
            snapshot: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(config.bm25_k1, config.bm25_b)
    }

    /// Replace the index with one built over `documents`.
    ///
    /// An empty collection clears the snapshot and returns `EmptyCollection`.
    pub async fn rebuild(&self, documents: Vec<Document>) -> Result<usize> {
        let _guard = self.rebuild_lock.lock().await;
        self.build_and_swap(documents).await
    }

    /// Rebuild from every document held by `store`.
    ///
    /// The store is read under the rebuild lock so overlapping rebuilds
    /// swap in their snapshots in the order they read the store.
    pub async fn rebuild_from_store(&self, store: &dyn DocumentStore) -> Result<usize> {
        let _guard = self.rebuild_lock.lock().await;
        let documents = store.get_all().await?;
        self.build_and_swap(documents).await
    }

    // Caller must hold `rebuild_lock`.
    async fn build_and_swap(&self, documents: Vec<Document>) -> Result<usize> {
        let start = Instant::now();

        match LexicalIndex::build(documents, self.k1, self.b) {
            Ok(index) => {
                let count = index.len();
                *self.snapshot.write().await = Some(Arc::new(index));
                info!(
                    "Lexical index rebuilt with {count} documents in {}ms",
                    start.elapsed().as_millis()
                );
                Ok(count)
            }
            Err(err) => {
                *self.snapshot.write().await = None;
                warn!("Lexical index cleared: {err}");
                Err(err)
            }
        }
    }

    /// Current index, if one has been built
    pub async fn snapshot(&self) -> Option<Arc<LexicalIndex>> {
        self.snapshot.read().await.clone()
    }

    pub async fn is_built(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// Search the current snapshot. Fails with `EmptyCollection` when unbuilt.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>> {
        let index = self.snapshot().await.ok_or(RetrievalError::EmptyCollection)?;
        Ok(index.search(query, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lore_vector_store::VectorStoreError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store whose first `get_all` is slow and returns an older view.
    struct LaggingStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for LaggingStore {
        async fn add(
            &self,
            _documents: Vec<Document>,
        ) -> std::result::Result<usize, VectorStoreError> {
            Ok(0)
        }

        async fn query(
            &self,
            _embedding: &[f32],
            _k: usize,
        ) -> std::result::Result<Vec<(Document, f32)>, VectorStoreError> {
            Ok(Vec::new())
        }

        async fn get_all(&self) -> std::result::Result<Vec<Document>, VectorStoreError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                return Ok(vec![Document::new("old chapter")]);
            }
            Ok(vec![
                Document::new("old chapter"),
                Document::new("new chapter"),
            ])
        }

        async fn count(&self) -> std::result::Result<usize, VectorStoreError> {
            Ok(2)
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("Alex Chen is a Nexus technician"),
            Document::new("Maya is a programmer in Zone Alpha"),
            Document::new("The Nexus is the Consortium's data core"),
        ]
    }

    #[test]
    fn test_build_empty_fails() {
        let result = LexicalIndex::build(Vec::new(), 1.5, 0.75);
        assert!(matches!(result, Err(RetrievalError::EmptyCollection)));
    }

    #[test]
    fn test_search_ranks_exact_match_first() {
        let index = LexicalIndex::build(corpus(), 1.5, 0.75).unwrap();
        let results = index.search("Who is Alex?", 3);

        assert_eq!(results[0].0.content, "Alex Chen is a Nexus technician");
        assert!(results.iter().all(|(_, score)| *score > 0.0));
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn test_search_excludes_zero_scores() {
        let index = LexicalIndex::build(corpus(), 1.5, 0.75).unwrap();
        let results = index.search("Maya", 10);
        assert_eq!(results.len(), 1);

        assert!(index.search("dragon", 10).is_empty());
        assert!(index.search("", 10).is_empty());
    }

    #[test]
    fn test_search_truncates_to_k() {
        let index = LexicalIndex::build(corpus(), 1.5, 0.75).unwrap();
        assert_eq!(index.search("is", 2).len(), 2);
        assert!(index.search("is", 0).is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let docs = vec![
            Document::new("keeper one"),
            Document::new("keeper two"),
            Document::new("keeper three"),
        ];
        let index = LexicalIndex::build(docs, 1.5, 0.75).unwrap();
        let results = index.search("keeper", 3);

        let contents: Vec<_> = results.iter().map(|(d, _)| d.content.as_str()).collect();
        assert_eq!(contents, vec!["keeper one", "keeper two", "keeper three"]);
        assert_eq!(results[0].1, results[2].1);
    }

    #[test]
    fn test_rarer_term_scores_higher() {
        let docs = vec![
            Document::new("the ship sailed north"),
            Document::new("the ship sailed south"),
            Document::new("the kraken rose"),
        ];
        let index = LexicalIndex::build(docs, 1.5, 0.75).unwrap();
        let ship = index.search("ship", 1)[0].1;
        let kraken = index.search("kraken", 1)[0].1;
        assert!(kraken > ship);
    }

    #[test]
    fn test_documents_of_only_punctuation() {
        let docs = vec![Document::new("..."), Document::new("!!!")];
        let index = LexicalIndex::build(docs, 1.5, 0.75).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.search("anything", 5).is_empty());
    }

    #[tokio::test]
    async fn test_searcher_unbuilt_reports_empty_collection() {
        let searcher = LexicalSearcher::new(1.5, 0.75);
        assert!(!searcher.is_built().await);
        assert!(matches!(
            searcher.search("alex", 3).await,
            Err(RetrievalError::EmptyCollection)
        ));
    }

    #[tokio::test]
    async fn test_searcher_rebuild_swaps_snapshot() {
        let searcher = LexicalSearcher::new(1.5, 0.75);
        assert_eq!(searcher.rebuild(corpus()).await.unwrap(), 3);

        let before = searcher.snapshot().await.unwrap();
        searcher
            .rebuild(vec![Document::new("Kestrel the smuggler")])
            .await
            .unwrap();

        // Held snapshots stay valid after a swap
        assert_eq!(before.len(), 3);
        assert_eq!(searcher.snapshot().await.unwrap().len(), 1);
        assert_eq!(searcher.search("kestrel", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_searcher_rebuild_empty_clears() {
        let searcher = LexicalSearcher::new(1.5, 0.75);
        searcher.rebuild(corpus()).await.unwrap();

        let result = searcher.rebuild(Vec::new()).await;
        assert!(matches!(result, Err(RetrievalError::EmptyCollection)));
        assert!(!searcher.is_built().await);
    }

    #[tokio::test]
    async fn test_concurrent_rebuilds_are_serialized() {
        let searcher = Arc::new(LexicalSearcher::new(1.5, 0.75));

        let mut handles = Vec::new();
        for i in 1..=4 {
            let searcher = Arc::clone(&searcher);
            handles.push(tokio::spawn(async move {
                let docs = (0..i).map(|n| Document::new(format!("chapter {n}"))).collect();
                searcher.rebuild(docs).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let len = searcher.snapshot().await.unwrap().len();
        assert!((1..=4).contains(&len));
        assert_eq!(searcher.search("chapter", 10).await.unwrap().len(), len);
    }

    #[tokio::test]
    async fn test_overlapping_store_rebuilds_keep_latest_read() {
        let searcher = Arc::new(LexicalSearcher::new(1.5, 0.75));
        let store = Arc::new(LaggingStore {
            reads: AtomicUsize::new(0),
        });

        let first = {
            let searcher = Arc::clone(&searcher);
            let store = Arc::clone(&store);
            tokio::spawn(async move { searcher.rebuild_from_store(store.as_ref()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = {
            let searcher = Arc::clone(&searcher);
            let store = Arc::clone(&store);
            tokio::spawn(async move { searcher.rebuild_from_store(store.as_ref()).await })
        };

        assert_eq!(first.await.unwrap().unwrap(), 1);
        assert_eq!(second.await.unwrap().unwrap(), 2);
        assert_eq!(searcher.snapshot().await.unwrap().len(), 2);
    }
}
