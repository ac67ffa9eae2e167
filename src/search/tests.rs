use super::*;
use crate::embeddings::{HashingEmbedder, build_index};

fn passage(chunk_id: u64, text: &str) -> Passage {
    Passage {
        chunk_id,
        document_id: 1,
        document_name: "facility.pdf".to_string(),
        page_number: chunk_id as u32 + 1,
        text: text.to_string(),
        overlap_chars: 0,
    }
}

fn corpus() -> Vec<Passage> {
    vec![
        passage(0, "The Borrower shall repay the loan in twelve monthly instalments."),
        passage(1, "The Lender may terminate the facility upon an event of default."),
        passage(2, "Interest accrues at the agreed interest rate on the outstanding loan."),
        passage(3, "Shareholders holding equity shares may vote at general meetings."),
        passage(4, "Any dispute shall be settled by arbitration in Singapore."),
    ]
}

async fn indexed() -> (HashingEmbedder, VectorIndex, Vec<Passage>) {
    let embedder = HashingEmbedder::default();
    let passages = corpus();
    let index = build_index(&embedder, &passages)
        .await
        .expect("index should build");
    (embedder, index, passages)
}

#[tokio::test]
async fn ranked_descending_with_confidence() {
    let (embedder, index, passages) = indexed().await;

    let results = search(&embedder, "repay the loan", &index, &passages, 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].passage.chunk_id, 0);

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.rank, i + 1);
        assert_eq!(result.confidence_pct, (result.score * 1000.0).round() / 10.0);
        assert!(result.score >= -1.0 && result.score <= 1.0);
        assert!(result.rerank_score.is_none());
    }
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn short_index_is_not_padded() {
    let (embedder, index, passages) = indexed().await;
    let results = search(&embedder, "loan", &index, &passages, DEFAULT_TOP_K * 4)
        .await
        .expect("search should succeed");
    assert_eq!(results.len(), passages.len());
}

#[tokio::test]
async fn hits_without_passages_are_skipped() {
    let (embedder, index, passages) = indexed().await;
    let without_first: Vec<Passage> = passages.into_iter().skip(1).collect();

    let results = search(&embedder, "repay the loan", &index, &without_first, 5)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.passage.chunk_id != 0));
    let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn degenerate_query_and_zero_top_k_fail() {
    let (embedder, index, passages) = indexed().await;

    assert!(matches!(
        search(&embedder, "?!", &index, &passages, 5).await,
        Err(DiligenceError::Embedding(_))
    ));
    assert!(matches!(
        search(&embedder, "loan", &index, &passages, 0).await,
        Err(DiligenceError::Config(_))
    ));
}

#[tokio::test]
async fn serialized_result_is_flat() {
    let (embedder, index, passages) = indexed().await;
    let results = search(&embedder, "arbitration dispute", &index, &passages, 1)
        .await
        .expect("search should succeed");

    let json = serde_json::to_value(&results[0]).expect("serialize");
    assert_eq!(json["rank"], 1);
    assert_eq!(json["chunk_id"], 4);
    assert_eq!(json["document_name"], "facility.pdf");
    assert!(json.get("rerank_score").is_none());
}

#[tokio::test]
async fn cross_encoder_reorders_and_trims() {
    let (embedder, index, passages) = indexed().await;
    let results = search(&embedder, "loan", &index, &passages, 5)
        .await
        .expect("search should succeed");

    let reranker = CrossEncoderReranker::new(TermOverlapScorer, 2);
    let reranked = reranker
        .rerank("interest rate on the loan", results.clone())
        .await
        .expect("rerank should succeed");

    assert_eq!(reranked.len(), 2);
    assert_eq!(reranked[0].passage.chunk_id, 2);
    assert_eq!(reranked[0].rank, 1);
    assert_eq!(reranked[1].rank, 2);
    assert_eq!(reranked[0].rerank_score, Some(1.0));

    let again = reranker
        .rerank("interest rate on the loan", results)
        .await
        .expect("rerank should succeed");
    assert_eq!(reranked, again);
}

#[tokio::test]
async fn noop_reranker_keeps_results() {
    let (embedder, index, passages) = indexed().await;
    let results = search(&embedder, "loan", &index, &passages, 3)
        .await
        .expect("search should succeed");

    let unchanged = NoOpReranker
        .rerank("loan", results.clone())
        .await
        .expect("rerank should succeed");
    assert_eq!(unchanged, results);
}

#[test]
fn term_overlap_scores() {
    let scores = TermOverlapScorer
        .score(
            "Termination notice",
            &["notice of termination", "notice period", "nothing relevant"],
        )
        .expect("scoring never fails");
    assert_eq!(scores, vec![1.0, 0.5, 0.0]);

    let empty = TermOverlapScorer
        .score("...", &["anything"])
        .expect("scoring never fails");
    assert_eq!(empty, vec![0.0]);
}
