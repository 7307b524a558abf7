//! In-memory vector store over a [`FlatIndex`].
//!
//! Holds the three parallel stores (chunk texts, chunk metadata, index) plus
//! the corpus text, all inside one immutable [`Snapshot`]. A build assembles
//! a complete new snapshot off to the side and then swaps a single `Arc`
//! under a short write lock, so readers observe either the previous corpus
//! or the new one, never a mix.
//!
//! Searches clone the current `Arc` and release the lock before calling the
//! embedder, so a long-running build never blocks queries against the old
//! snapshot.

use serde::Serialize;
use std::sync::{Arc, RwLock};

use crate::embedding::{l2_normalize, Embedder};
use crate::error::{CopilotError, Result};
use crate::index::{FlatIndex, NOT_FOUND};
use crate::models::{Chunk, ChunkMetadata, RetrievalHit};

/// Point-in-time view of the current build, read from a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreOverview {
    pub ready: bool,
    pub chunks: usize,
    /// Source names in build order, one per document.
    pub documents: Vec<String>,
}

/// Default number of texts sent to the embedder per call.
pub const DEFAULT_BATCH_SIZE: usize = 32;

struct Snapshot {
    texts: Vec<String>,
    metadatas: Vec<ChunkMetadata>,
    index: FlatIndex,
    corpus: String,
}

/// Build-once, query-many vector store.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            current: RwLock::new(None),
        }
    }

    /// Override the embedding batch size (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Build from chunks; the corpus becomes the space-joined chunk texts.
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<()> {
        let corpus = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        self.build_with_corpus(chunks, corpus).await
    }

    /// Build from chunks with an explicit corpus text for baseline mode,
    /// summaries and MCQs.
    ///
    /// Replaces any previous state wholesale. On error the previous state
    /// is left untouched.
    pub async fn build_with_corpus(&self, chunks: Vec<Chunk>, corpus: String) -> Result<()> {
        if chunks.is_empty() {
            return Err(CopilotError::InputValidation(
                "no texts supplied for vector store construction".to_string(),
            ));
        }

        let (texts, metadatas): (Vec<String>, Vec<ChunkMetadata>) =
            chunks.into_iter().map(|c| (c.text, c.metadata)).unzip();

        let mut index: Option<FlatIndex> = None;
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            log::debug!("embedding batch {} ({} texts)", batch_no, batch.len());
            let vectors = self.embed_normalized(batch).await?;
            for vector in vectors {
                let idx = index.get_or_insert_with(|| FlatIndex::new(vector.len()));
                if vector.len() != idx.dim() {
                    return Err(CopilotError::ExternalService {
                        service: "embedding",
                        message: format!(
                            "inconsistent embedding dimensions: {} then {}",
                            idx.dim(),
                            vector.len()
                        ),
                    });
                }
                idx.add(&vector)?;
            }
        }
        let index = index.ok_or_else(|| CopilotError::ExternalService {
            service: "embedding",
            message: "embedding service returned no vectors".to_string(),
        })?;

        debug_assert_eq!(texts.len(), metadatas.len());
        debug_assert_eq!(texts.len(), index.len());

        log::info!(
            "vector store built: {} chunks, {} dimensions, model {}",
            index.len(),
            index.dim(),
            self.embedder.model_name()
        );

        let snapshot = Arc::new(Snapshot {
            texts,
            metadatas,
            index,
            corpus,
        });
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(snapshot);
        Ok(())
    }

    /// True iff a build succeeded and holds at least one chunk.
    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some_and(|s| !s.texts.is_empty())
    }

    /// Number of indexed chunks (0 before the first build).
    pub fn len(&self) -> usize {
        self.snapshot().map(|s| s.texts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension fixed by the last build.
    pub fn dimension(&self) -> Option<usize> {
        self.snapshot().map(|s| s.index.dim())
    }

    /// Readiness, chunk count and document names of one build.
    ///
    /// A document starts at every chunk whose `chunk_index` is 0, so two
    /// documents sharing a name are both listed.
    pub fn overview(&self) -> StoreOverview {
        let Some(snapshot) = self.snapshot() else {
            return StoreOverview::default();
        };
        StoreOverview {
            ready: !snapshot.texts.is_empty(),
            chunks: snapshot.texts.len(),
            documents: snapshot
                .metadatas
                .iter()
                .filter(|m| m.chunk_index == 0)
                .filter_map(|m| m.source.clone())
                .collect(),
        }
    }

    /// Corpus text of the current build.
    pub fn corpus_text(&self) -> Result<String> {
        Ok(self.ready_snapshot()?.corpus.clone())
    }

    /// Return up to `top_k` chunks nearest to `query`, ascending by distance.
    ///
    /// Padding slots end the scan; indices outside the current arrays are
    /// skipped.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>> {
        let snapshot = self.ready_snapshot()?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embed_normalized(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CopilotError::ExternalService {
                service: "embedding",
                message: "empty embedding response for query".to_string(),
            })?;

        let neighbors = snapshot.index.search(&query_vec, top_k)?;
        let hits: Vec<RetrievalHit> = neighbors
            .take_while(|n| n.index != NOT_FOUND)
            .filter_map(|n| {
                let i = usize::try_from(n.index).ok()?;
                if i >= snapshot.texts.len() {
                    return None;
                }
                Some(RetrievalHit {
                    text: snapshot.texts[i].clone(),
                    metadata: snapshot.metadatas[i].clone(),
                    distance: n.distance,
                })
            })
            .collect();

        log::debug!("search top_k={} returned {} hits", top_k, hits.len());
        Ok(hits)
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn ready_snapshot(&self) -> Result<Arc<Snapshot>> {
        match self.snapshot() {
            Some(s) if !s.texts.is_empty() => Ok(s),
            _ => Err(CopilotError::NotReady(
                "vector store has not been built yet; ingest documents first".to_string(),
            )),
        }
    }

    /// Embed one batch and L2-normalize every vector.
    async fn embed_normalized(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = self
            .embedder
            .embed(texts)
            .await
            .map_err(|e| CopilotError::external("embedding", e))?;
        if vectors.len() != texts.len() {
            return Err(CopilotError::ExternalService {
                service: "embedding",
                message: format!(
                    "expected {} vectors, received {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }
        for v in vectors.iter_mut() {
            if v.is_empty() {
                return Err(CopilotError::ExternalService {
                    service: "embedding",
                    message: "received an empty embedding vector".to_string(),
                });
            }
            l2_normalize(v);
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{chunk_document, ChunkOptions};
    use crate::testing::HashEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    /// Wraps [`HashEmbedder`]; when armed, the next call parks until released.
    struct PausingEmbedder {
        inner: HashEmbedder,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Embedder for PausingEmbedder {
        fn model_name(&self) -> &str {
            "pausing"
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.embed(texts).await
        }
    }

    fn texts() -> Vec<Chunk> {
        [
            "Newton's second law states F=ma.",
            "The derivative of x squared is two x.",
            "Photosynthesis converts light into chemical energy.",
            "Ohm's law relates voltage, current and resistance.",
            "Entropy of an isolated system never decreases.",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| Chunk::bare(i, *t))
        .collect()
    }

    fn store(batch: usize) -> (Arc<HashEmbedder>, VectorStore) {
        let embedder = Arc::new(HashEmbedder::new(64));
        let store = VectorStore::new(embedder.clone()).with_batch_size(batch);
        (embedder, store)
    }

    #[tokio::test]
    async fn test_search_before_build_is_not_ready() {
        let (_, store) = store(32);
        assert!(!store.is_ready());
        assert!(matches!(
            store.search("anything", 3).await,
            Err(CopilotError::NotReady(_))
        ));
        assert!(matches!(store.corpus_text(), Err(CopilotError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_build_empty_is_input_validation() {
        let (_, store) = store(32);
        assert!(matches!(
            store.build(Vec::new()).await,
            Err(CopilotError::InputValidation(_))
        ));
        assert!(!store.is_ready());
    }

    #[tokio::test]
    async fn test_exact_text_is_nearest() {
        let (_, store) = store(32);
        let chunks = texts();
        store.build(chunks.clone()).await.unwrap();
        assert!(store.is_ready());
        assert_eq!(store.len(), 5);
        assert_eq!(store.dimension(), Some(64));

        for chunk in &chunks {
            let hits = store.search(&chunk.text, 3).await.unwrap();
            assert_eq!(hits.len(), 3);
            assert_eq!(hits[0].text, chunk.text);
            assert!(hits[0].distance <= hits[1].distance);
            assert!(hits[0].distance.abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_top_k_beyond_size_skips_padding() {
        let (_, store) = store(32);
        store.build(texts()).await.unwrap();
        let hits = store.search("energy", 50).await.unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_batching_does_not_change_results() {
        let (small_embedder, small) = store(2);
        let (_, large) = store(1000);
        small.build(texts()).await.unwrap();
        large.build(texts()).await.unwrap();

        assert_eq!(*small_embedder.batches.lock().unwrap(), vec![2, 2, 1]);

        for q in ["law", "energy and light", "derivative"] {
            let a = small.search(q, 5).await.unwrap();
            let b = large.search(q, 5).await.unwrap();
            assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let (embedder, store) = store(32);
        store.build(texts()).await.unwrap();
        embedder.set_dim(32);
        assert!(matches!(
            store.search("law", 2).await,
            Err(CopilotError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_everything() {
        let (_, store) = store(32);
        store.build(texts()).await.unwrap();
        let replacement = chunk_document(
            "Maxwell's equations describe electromagnetism.",
            &ChunkOptions::default(),
            Some("em.pdf"),
        );
        store
            .build_with_corpus(replacement, "Maxwell corpus".to_string())
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.corpus_text().unwrap(), "Maxwell corpus");
        let hits = store.search("Newton", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.source.as_deref(), Some("em.pdf"));
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_state() {
        let (embedder, store) = store(2);
        store.build(texts()).await.unwrap();
        let before = store.search("Ohm's law voltage", 2).await.unwrap();

        embedder.set_failing(true);
        let err = store
            .build_with_corpus(
                vec![Chunk::bare(0, "Maxwell's equations.")],
                "Maxwell corpus".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::ExternalService { .. }));
        assert!(err.to_string().contains("unreachable"));
        embedder.set_failing(false);

        assert!(store.is_ready());
        assert_eq!(store.len(), 5);
        assert_eq!(store.dimension(), Some(64));
        assert_eq!(
            store.corpus_text().unwrap(),
            texts()
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );
        assert_eq!(store.search("Ohm's law voltage", 2).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_search_during_rebuild_sees_old_snapshot() {
        let embedder = Arc::new(PausingEmbedder {
            inner: HashEmbedder::new(64),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let store = VectorStore::new(embedder.clone());
        store.build(texts()).await.unwrap();

        embedder.armed.store(true, Ordering::SeqCst);
        let rebuild = store.build_with_corpus(
            vec![Chunk::bare(0, "Maxwell's equations describe electromagnetism.")],
            "Maxwell corpus".to_string(),
        );
        let observe = async {
            embedder.entered.notified().await;
            assert_eq!(store.len(), 5);
            assert!(store.corpus_text().unwrap().starts_with("Newton's second law"));
            let hits = store.search("Newton's second law", 1).await.unwrap();
            assert_eq!(hits[0].text, "Newton's second law states F=ma.");
            embedder.release.notify_one();
        };
        let (built, ()) = tokio::join!(rebuild, observe);
        built.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.corpus_text().unwrap(), "Maxwell corpus");
    }

    #[tokio::test]
    async fn test_huge_top_k_returns_every_chunk() {
        let (_, store) = store(32);
        store.build(texts()).await.unwrap();
        let hits = store.search("law", usize::MAX).await.unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn test_overview_lists_documents_of_one_build() {
        let (_, store) = store(32);
        assert_eq!(store.overview(), StoreOverview::default());

        let options = ChunkOptions {
            chunk_size: 200,
            chunk_overlap: 0,
            ..ChunkOptions::default()
        };
        let mut chunks = chunk_document(&"Long notes on optics. ".repeat(30), &options, Some("optics.md"));
        assert!(chunks.len() > 1);
        chunks.extend(chunk_document("Short notes.", &options, Some("notes.md")));
        chunks.extend(chunk_document("Other short notes.", &options, Some("notes.md")));
        let total = chunks.len();
        store.build(chunks).await.unwrap();

        let overview = store.overview();
        assert!(overview.ready);
        assert_eq!(overview.chunks, total);
        assert_eq!(overview.documents, vec!["optics.md", "notes.md", "notes.md"]);

        store.build(texts()).await.unwrap();
        assert!(store.overview().documents.is_empty());
    }

    #[tokio::test]
    async fn test_default_corpus_joins_chunks() {
        let (_, store) = store(32);
        store
            .build(vec![Chunk::bare(0, "alpha"), Chunk::bare(1, "beta")])
            .await
            .unwrap();
        assert_eq!(store.corpus_text().unwrap(), "alpha beta");
    }

    #[tokio::test]
    async fn test_top_k_zero() {
        let (embedder, store) = store(32);
        store.build(texts()).await.unwrap();
        let before = embedder.calls.load(std::sync::atomic::Ordering::SeqCst);
        assert!(store.search("law", 0).await.unwrap().is_empty());
        assert_eq!(
            embedder.calls.load(std::sync::atomic::Ordering::SeqCst),
            before
        );
    }
}
