//! Retrieval pipeline integration tests.
//!
//! Exercises the full pipeline against the in-memory index: query
//! normalization, expansion, embedding cache reuse, concurrent source
//! fan-out, adaptive thresholding, notes reranking, and the strict
//! source-priority merge.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Utc;
use medrag::embedding::{EmbeddingMode, EmbeddingProvider, RetryPolicy, RetryingProvider};
use medrag::models::{DocumentChunk, ItemId, Note, ReferenceDoc};
use medrag::{
    HybridRetrievalService, InMemoryIndex, OwnerId, ResponseQualityValidator, RetrievalConfig,
    RetrievalQuery, RetrievedItem, SourceType,
};
use std::sync::atomic::{AtomicU32, Ordering};

/// Embedder producing a fixed unit vector for every input.
///
/// Item embeddings are then constructed to sit at a chosen cosine
/// similarity against it, so each test controls its scores exactly.
struct StubEmbedder {
    calls: AtomicU32,
}

impl StubEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> medrag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0, 0.0])
    }
}

/// Unit vector at cosine similarity `s` against the stub query vector.
fn vector_at_similarity(s: f32) -> Vec<f32> {
    vec![s, (1.0 - s * s).max(0.0).sqrt()]
}

fn note(id: &str, content: &str, favorite: bool, tags: &[&str]) -> RetrievedItem {
    RetrievedItem::Note(Note {
        id: ItemId::new(id),
        title: id.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        is_favorite: favorite,
        created_at: Some(Utc::now()),
        updated_at: None,
    })
}

fn document(id: &str, content: &str) -> RetrievedItem {
    RetrievedItem::Document(DocumentChunk {
        id: ItemId::new(id),
        filename: format!("{id}.pdf"),
        content: content.to_string(),
        created_at: Some(Utc::now()),
    })
}

fn reference(id: &str, title: &str, priority: u32) -> RetrievedItem {
    RetrievedItem::Reference(ReferenceDoc {
        id: ItemId::new(id),
        source: "ministerio-saude".to_string(),
        title: title.to_string(),
        specialty: Some("neurologia".to_string()),
        priority,
        content: title.to_string(),
    })
}

fn service_with(
    index: InMemoryIndex,
) -> HybridRetrievalService<StubEmbedder, InMemoryIndex> {
    HybridRetrievalService::new(StubEmbedder::new(), index, RetrievalConfig::default())
}

/// A weak favorite note must still precede a strong reference hit:
/// the merge never reorders across sources on similarity.
#[tokio::test]
async fn test_personal_note_outranks_stronger_reference_hit() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("enxaqueca", "crises de enxaqueca com aura", true, &["neuro", "cefaleia"]),
        Some(owner),
        vector_at_similarity(0.55),
    );
    index.upsert(
        reference("pcdt-cefaleia", "Protocolo de Cefaleia", 1),
        None,
        vector_at_similarity(0.9),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("dor de cabeça forte", owner))
        .await
        .expect("retrieve");

    assert_eq!(merged.len(), 2);
    assert_eq!(merged.results[0].source, SourceType::Notes);
    assert_eq!(merged.results[1].source, SourceType::Reference);
    assert!(merged.results[0].similarity < merged.results[1].similarity);
}

/// All three sources contribute, in fixed priority order.
#[tokio::test]
async fn test_three_source_merge_order() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("n1", "anotação sobre febre", false, &[]),
        Some(owner),
        vector_at_similarity(0.5),
    );
    index.upsert(
        document("d1", "conduta para febre em adultos"),
        Some(owner),
        vector_at_similarity(0.5),
    );
    index.upsert(
        reference("r1", "Protocolo de Febre", 2),
        None,
        vector_at_similarity(0.5),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("febre alta", owner))
        .await
        .expect("retrieve");

    let sources: Vec<SourceType> = merged.results.iter().map(|r| r.source).collect();
    assert_eq!(
        sources,
        vec![SourceType::Notes, SourceType::Documents, SourceType::Reference]
    );
    assert_eq!(merged.note_count, 1);
    assert_eq!(merged.document_count, 1);
    assert_eq!(merged.reference_count, 1);
}

/// Another owner's personal items never leak into the merge; the
/// shared reference corpus is visible to everyone.
#[tokio::test]
async fn test_owner_scoping() {
    let owner = OwnerId::generate();
    let other = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("theirs", "anotação de outro usuário", false, &[]),
        Some(other),
        vector_at_similarity(0.9),
    );
    index.upsert(
        reference("shared", "Protocolo Compartilhado", 1),
        None,
        vector_at_similarity(0.5),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("tosse seca", owner))
        .await
        .expect("retrieve");

    assert_eq!(merged.note_count, 0);
    assert_eq!(merged.reference_count, 1);
    assert_eq!(merged.results[0].item.id().as_str(), "shared");
}

/// An empty index yields the "no context" terminal state, not an error.
#[tokio::test]
async fn test_empty_index_is_no_context() {
    let service = service_with(InMemoryIndex::new());
    let merged = service
        .retrieve(&RetrievalQuery::new("prescrição de antibiótico", OwnerId::generate()))
        .await
        .expect("retrieve");

    assert!(!merged.has_context());
    assert!(merged.is_empty());
}

/// Repeated queries that normalize identically hit the embedding
/// cache; the provider is called once.
#[tokio::test]
async fn test_embedding_cache_reuse_across_retrievals() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("n1", "dor lombar crônica", false, &[]),
        Some(owner),
        vector_at_similarity(0.6),
    );

    let service = service_with(index);
    let _ = service
        .retrieve(&RetrievalQuery::new("Dor Lombar", owner))
        .await
        .expect("first");
    let _ = service
        .retrieve(&RetrievalQuery::new("  dor lombar  ", owner))
        .await
        .expect("second");

    assert_eq!(service.cache().len(), 1);
}

/// A zero TTL disables reuse: every retrieval re-embeds the query.
#[tokio::test]
async fn test_expired_cache_entry_re_embeds() {
    use std::sync::Arc;

    struct CountingEmbedder {
        calls: Arc<AtomicU32>,
    }

    impl EmbeddingProvider for CountingEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> medrag::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
    }

    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("n1", "anotação", false, &[]),
        Some(owner),
        vector_at_similarity(0.6),
    );

    let calls = Arc::new(AtomicU32::new(0));
    let service = HybridRetrievalService::new(
        CountingEmbedder {
            calls: Arc::clone(&calls),
        },
        index,
        RetrievalConfig::default().with_cache_ttl_secs(0),
    );

    let query = RetrievalQuery::new("anotação", owner);
    let _ = service.retrieve(&query).await.expect("first");
    let _ = service.retrieve(&query).await.expect("second");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Per-query limit override caps every source.
#[tokio::test]
async fn test_query_limit_override() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    for i in 0..5 {
        index.upsert(
            note(&format!("n{i}"), "sintomas variados", false, &[]),
            Some(owner),
            vector_at_similarity(0.5),
        );
    }

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("sintomas", owner).with_limit(2))
        .await
        .expect("retrieve");

    assert_eq!(merged.note_count, 2);
}

/// Per-query threshold override tightens the base cutoff.
#[tokio::test]
async fn test_query_threshold_override() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("weak", "nota fraca", false, &[]),
        Some(owner),
        vector_at_similarity(0.3),
    );
    index.upsert(
        note("strong", "nota forte", false, &[]),
        Some(owner),
        vector_at_similarity(0.8),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("nota", owner).with_threshold(0.5))
        .await
        .expect("retrieve");

    assert_eq!(merged.note_count, 1);
    assert_eq!(merged.results[0].item.id().as_str(), "strong");
}

/// With a strong result set, the adaptive threshold tightens and
/// drops the weak tail that cleared the base cutoff.
#[tokio::test]
async fn test_adaptive_threshold_drops_weak_tail() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        document("strong-a", "diretriz completa"),
        Some(owner),
        vector_at_similarity(0.9),
    );
    index.upsert(
        document("strong-b", "diretriz resumida"),
        Some(owner),
        vector_at_similarity(0.8),
    );
    index.upsert(
        document("weak", "texto tangencial"),
        Some(owner),
        vector_at_similarity(0.4),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("diretriz de conduta", owner))
        .await
        .expect("retrieve");

    // avg({0.9, 0.8, 0.4}) = 0.7 > 0.6, so the cutoff becomes 0.6.
    assert_eq!(merged.document_count, 2);
    assert!(merged.results.iter().all(|r| r.item.id().as_str() != "weak"));
}

/// Reranking promotes a favorite, tagged, fresh note over a slightly
/// more similar plain note.
#[tokio::test]
async fn test_rerank_promotes_favorite_note() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("plain", "anotação comum", false, &[]),
        Some(owner),
        vector_at_similarity(0.62),
    );
    index.upsert(
        note("pinned", "anotação favorita", true, &["importante"]),
        Some(owner),
        vector_at_similarity(0.58),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("anotação", owner))
        .await
        .expect("retrieve");

    assert_eq!(merged.results[0].item.id().as_str(), "pinned");
    assert!(merged.results[0].relevance > merged.results[1].relevance);
}

/// Reference results follow the curation rank first and similarity
/// second, not raw similarity.
#[tokio::test]
async fn test_reference_priority_rank_ordering() {
    let index = InMemoryIndex::new();
    index.upsert(
        reference("secondary", "Diretriz Regional", 3),
        None,
        vector_at_similarity(0.6),
    );
    index.upsert(
        reference("primary", "Protocolo Nacional", 1),
        None,
        vector_at_similarity(0.5),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("protocolo de tratamento", OwnerId::generate()))
        .await
        .expect("retrieve");

    assert_eq!(merged.reference_count, 2);
    assert_eq!(merged.results[0].item.id().as_str(), "primary");
    assert_eq!(merged.results[1].item.id().as_str(), "secondary");
}

/// A priority-1 protocol above the similarity cutoff survives even
/// when the per-source limit is filled by higher-similarity documents
/// of lower curation rank.
#[tokio::test]
async fn test_high_priority_reference_not_crowded_out() {
    let index = InMemoryIndex::new();
    for i in 0..5 {
        index.upsert(
            reference(&format!("secondary-{i}"), "Diretriz Regional", 2),
            None,
            vector_at_similarity(0.5),
        );
    }
    index.upsert(
        reference("primary", "Protocolo Nacional", 1),
        None,
        vector_at_similarity(0.3),
    );

    let service = service_with(index);
    let merged = service
        .retrieve(&RetrievalQuery::new("protocolo de tratamento", OwnerId::generate()))
        .await
        .expect("retrieve");

    // Default reference limit is 5: the priority-1 document leads and
    // one of the secondaries gives way.
    assert_eq!(merged.reference_count, 5);
    assert_eq!(merged.results[0].item.id().as_str(), "primary");
}

/// Empty queries are rejected before the provider is touched.
#[tokio::test]
async fn test_blank_query_is_invalid() {
    let service = service_with(InMemoryIndex::new());
    let result = service
        .retrieve(&RetrievalQuery::new("  \t ", OwnerId::generate()))
        .await;

    assert!(matches!(result, Err(medrag::Error::InvalidQuery(_))));
    assert_eq!(service.cache().len(), 0);
}

/// The retry decorator composes with the service: a provider that
/// fails twice still serves the retrieval on its third attempt.
#[tokio::test(start_paused = true)]
async fn test_flaky_provider_recovers_through_retry() {
    struct FlakyEmbedder {
        remaining_failures: AtomicU32,
    }

    impl EmbeddingProvider for FlakyEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> medrag::Result<Vec<f32>> {
            if self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(medrag::Error::ProviderUnavailable {
                    provider: "embedding".to_string(),
                    cause: "rate limited".to_string(),
                });
            }
            Ok(vec![1.0, 0.0])
        }
    }

    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("n1", "anotação", false, &[]),
        Some(owner),
        vector_at_similarity(0.6),
    );

    let provider = RetryingProvider::new(
        FlakyEmbedder {
            remaining_failures: AtomicU32::new(2),
        },
        RetryPolicy::default(),
    );
    let service = HybridRetrievalService::new(provider, index, RetrievalConfig::default());

    let merged = service
        .retrieve(&RetrievalQuery::new("anotação", owner))
        .await
        .expect("retrieve after retries");
    assert_eq!(merged.note_count, 1);
}

/// End-to-end quality check: a grounded answer citing the retrieved
/// context scores high; an ungrounded one does not.
#[tokio::test]
async fn test_quality_validation_after_retrieval() {
    let owner = OwnerId::generate();
    let index = InMemoryIndex::new();
    index.upsert(
        note("n1", "hidratação e analgesia para cefaleia", false, &[]),
        Some(owner),
        vector_at_similarity(0.7),
    );

    let service = service_with(index);
    let query_text = "conduta para cefaleia";
    let merged = service
        .retrieve(&RetrievalQuery::new(query_text, owner))
        .await
        .expect("retrieve");
    assert!(merged.has_context());

    let validator = ResponseQualityValidator::new();
    let grounded = validator.validate(
        "Conforme sua anotação, a conduta para cefaleia é hidratação e analgesia simples.",
        query_text,
        &merged.results,
    );
    assert!(grounded.uses_context);
    assert!(grounded.is_high_quality);

    let ungrounded = validator.validate("Não sei.", query_text, &merged.results);
    assert!(!ungrounded.uses_context);
    assert!(!ungrounded.is_high_quality);
}
