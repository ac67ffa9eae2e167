//! Session workspace holding every ingested document
//!
//! The state is an immutable [`SessionSnapshot`] behind an `Arc`. Ingestion
//! is serialised by a writer lock, builds the next snapshot off to the side
//! and publishes it with a single pointer swap, so readers always see a
//! passage list and vector index that belong together. A failed ingestion
//! publishes nothing.


use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::answer::{AnswerGenerator, OllamaGenerator, UNAVAILABLE_ANSWER};
use crate::config::{Config, EmbeddingProvider};
use crate::embeddings::{
    Chunker, ChunkingConfig, Embedder, HashingEmbedder, OllamaClient, Passage, VectorIndex,
    build_index,
};
use crate::extraction::{NO_READABLE_TEXT, PageText, PopplerExtractor, TextExtractor, read_document};
use crate::report::{MarkdownReport, RenderedReport, ReportRenderer};
use crate::risk::{
    DiligenceSummary, DocumentRecord, RiskFinding, RuleBook, aggregate, classify_document, detect,
};
use crate::search::{
    self, CrossEncoderReranker, DEFAULT_TOP_K, NoOpReranker, Reranker, ScoredPassage,
    TermOverlapScorer,
};
use crate::{DiligenceError, Result};

const FIRST_DOCUMENT_ID: u64 = 1;
const FIRST_CHUNK_ID: u64 = 0;

/// Immutable view of the session at one point in time
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Bumped by every reset; handles from an older generation are stale
    pub generation: u64,
    /// Bumped by every published change
    pub version: u64,
    pub documents: BTreeMap<u64, DocumentRecord>,
    pub findings: BTreeMap<u64, Vec<RiskFinding>>,
    /// All passages, sorted by `chunk_id`
    pub passages: Vec<Passage>,
    /// Index over `passages`, absent until the first ingestion
    pub index: Option<VectorIndex>,
    pub next_document_id: u64,
    pub next_chunk_id: u64,
}

impl SessionSnapshot {
    fn empty(generation: u64, version: u64) -> Self {
        Self {
            generation,
            version,
            documents: BTreeMap::new(),
            findings: BTreeMap::new(),
            passages: Vec::new(),
            index: None,
            next_document_id: FIRST_DOCUMENT_ID,
            next_chunk_id: FIRST_CHUNK_ID,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Outcome of one ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: u64,
    pub document_name: String,
    pub document_type: String,
    pub classification_confidence: f64,
    pub passages: usize,
    pub risks: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<ScoredPassage>,
}

struct CachedSummary {
    version: u64,
    summary: Arc<DiligenceSummary>,
}

/// A due-diligence session: documents, findings, passages and their index
pub struct Workspace {
    id: Uuid,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    reranker: Arc<dyn Reranker>,
    renderer: Arc<dyn ReportRenderer>,
    rules: Arc<RuleBook>,
    chunking: ChunkingConfig,
    top_k: usize,
    state: RwLock<Arc<SessionSnapshot>>,
    writer: tokio::sync::Mutex<()>,
    summary_cache: Mutex<Option<CachedSummary>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("chunking", &self.chunking)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Workspace with built-in rules, default chunking, no reranking and a
    /// markdown report
    #[inline]
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!("Creating workspace {}", id);

        Self {
            id,
            extractor,
            embedder,
            generator,
            reranker: Arc::new(NoOpReranker),
            renderer: Arc::new(MarkdownReport::default()),
            rules: Arc::new(RuleBook::default()),
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            state: RwLock::new(Arc::new(SessionSnapshot::empty(0, 0))),
            writer: tokio::sync::Mutex::new(()),
            summary_cache: Mutex::new(None),
        }
    }

    /// Wire every collaborator from configuration
    #[inline]
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let ollama =
            OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;

        let embedder: Arc<dyn Embedder> = match config.embedding.provider {
            EmbeddingProvider::Ollama => Arc::new(ollama.clone()),
            EmbeddingProvider::Hashing => {
                Arc::new(HashingEmbedder::new(config.embedding.hashing_dimension))
            }
        };

        let reranker: Arc<dyn Reranker> = if config.search.rerank {
            Arc::new(CrossEncoderReranker::new(
                TermOverlapScorer,
                config.search.rerank_top_k,
            ))
        } else {
            Arc::new(NoOpReranker)
        };

        let rules = config.load_rules().context("Failed to load rule book")?;

        info!(
            "Workspace uses {:?} embeddings, reranking {}",
            config.embedding.provider,
            if config.search.rerank { "on" } else { "off" }
        );

        Ok(Self::new(
            Arc::new(PopplerExtractor::new(config.extraction.clone())),
            embedder,
            Arc::new(OllamaGenerator::new(ollama)),
        )
        .with_reranker(reranker)
        .with_renderer(Arc::new(MarkdownReport::new(config.report.format)))
        .with_rules(rules)
        .with_chunking(config.chunking.clone())
        .with_top_k(config.search.top_k))
    }

    #[inline]
    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    #[inline]
    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    #[inline]
    pub fn with_rules(mut self, rules: RuleBook) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    #[inline]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Current state; never changes under the caller
    #[inline]
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        self.summary_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Extract, chunk, detect and re-index one uploaded document.
    ///
    /// With `reset`, the document starts a fresh session; the old session
    /// stays in place if ingestion fails.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        document_name: &str,
        use_ocr: bool,
        reset: bool,
    ) -> Result<IngestReport> {
        info!(
            "Ingesting '{}' ({} bytes, ocr: {}, reset: {})",
            document_name,
            bytes.len(),
            use_ocr,
            reset
        );

        let pages = read_document(self.extractor.as_ref(), bytes, use_ocr).await?;
        self.ingest_pages(pages, document_name, reset).await
    }

    /// Ingest already-extracted pages
    pub async fn ingest_pages(
        &self,
        pages: Vec<PageText>,
        document_name: &str,
        reset: bool,
    ) -> Result<IngestReport> {
        let pages: Vec<PageText> = pages
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .collect();
        if pages.is_empty() {
            return Err(DiligenceError::Extraction(NO_READABLE_TEXT.to_string()));
        }

        let _writer = self.writer.lock().await;
        let current = self.snapshot();

        let mut next = if reset {
            debug!("Resetting session before ingesting '{}'", document_name);
            SessionSnapshot::empty(current.generation + 1, current.version + 1)
        } else {
            SessionSnapshot {
                version: current.version + 1,
                ..(*current).clone()
            }
        };

        let document_id = next.next_document_id;
        let classification = classify_document(&pages, &self.rules.document_rules);

        let mut chunker = Chunker::starting_at(self.chunking.clone(), next.next_chunk_id);
        let passages = chunker.chunk(&pages, document_id, document_name);
        if passages.is_empty() {
            return Err(DiligenceError::Extraction(NO_READABLE_TEXT.to_string()));
        }

        let findings = detect(&passages, &self.rules.risk_rules);
        let report = IngestReport {
            document_id,
            document_name: document_name.to_string(),
            document_type: classification.document_type.clone(),
            classification_confidence: classification.confidence,
            passages: passages.len(),
            risks: findings.len(),
            generation: next.generation,
        };

        next.passages.extend(passages);
        next.index = Some(build_index(self.embedder.as_ref(), &next.passages).await?);
        next.next_chunk_id = chunker.next_chunk_id();
        next.next_document_id = document_id + 1;
        next.documents.insert(
            document_id,
            DocumentRecord {
                document_id,
                document_name: document_name.to_string(),
                document_type: classification.document_type,
                classification_confidence: classification.confidence,
            },
        );
        next.findings.insert(document_id, findings);

        self.publish(next);

        info!(
            "Indexed '{}' as document {} ({}, {} passages, {} risks)",
            report.document_name,
            report.document_id,
            report.document_type,
            report.passages,
            report.risks
        );
        Ok(report)
    }

    /// Semantic search over every indexed passage
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<ScoredPassage>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(DiligenceError::InvalidInput(
                "Query must not be empty".to_string(),
            ));
        }

        let snapshot = self.snapshot();
        let Some(index) = &snapshot.index else {
            return Err(DiligenceError::NoDocuments);
        };

        search::search(
            self.embedder.as_ref(),
            query,
            index,
            &snapshot.passages,
            top_k.unwrap_or(self.top_k),
        )
        .await
    }

    /// Answer a question from the top passages.
    ///
    /// Retrieval and generation failures degrade to a fallback answer.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DiligenceError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }

        let sources = match self.search(question, None).await {
            Ok(sources) => sources,
            Err(DiligenceError::NoDocuments) => return Err(DiligenceError::NoDocuments),
            Err(e) => {
                warn!("Retrieval failed for question: {}", e);
                return Ok(Answer {
                    answer: UNAVAILABLE_ANSWER.to_string(),
                    sources: Vec::new(),
                });
            }
        };

        let sources = match self.reranker.rerank(question, sources.clone()).await {
            Ok(reranked) => reranked,
            Err(e) => {
                warn!("Reranking failed, keeping retrieval order: {:#}", e);
                sources
            }
        };

        let answer = self.generator.answer(question, &sources).await;
        Ok(Answer { answer, sources })
    }

    /// Aggregate of the current state, recomputed only after a change
    #[inline]
    pub fn summary(&self) -> Arc<DiligenceSummary> {
        self.summary_for(&self.snapshot())
    }

    fn summary_for(&self, snapshot: &SessionSnapshot) -> Arc<DiligenceSummary> {
        let mut cache = self
            .summary_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = cache.as_ref().filter(|c| c.version == snapshot.version) {
            debug!("Summary cache hit for version {}", snapshot.version);
            return Arc::clone(&cached.summary);
        }

        debug!("Recomputing summary for version {}", snapshot.version);
        let summary = Arc::new(aggregate(
            &snapshot.findings,
            &snapshot.documents,
            &self.rules.flag_rules,
        ));
        *cache = Some(CachedSummary {
            version: snapshot.version,
            summary: Arc::clone(&summary),
        });
        summary
    }

    /// Render the report; fails when nothing has been ingested
    #[inline]
    pub fn report(&self) -> Result<RenderedReport> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Err(DiligenceError::NoDocuments);
        }
        self.renderer.render(&self.summary_for(&snapshot))
    }

    /// Drop every document, passage and finding and restart the counters
    pub async fn reset(&self) -> u64 {
        let _writer = self.writer.lock().await;
        let current = self.snapshot();
        let generation = current.generation + 1;

        self.publish(SessionSnapshot::empty(generation, current.version + 1));

        info!("Workspace {} reset to generation {}", self.id, generation);
        generation
    }
}
