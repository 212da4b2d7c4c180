mod common;

use std::sync::Arc;

use rag_chatbot::error::ChatbotError;
use rag_chatbot::vector::{Document, SimilarityIndex};
use serde_json::json;

use common::{faq_documents, keyword_index, KeywordEmbedder};

#[tokio::test]
async fn create_rejects_empty_input() {
    let result = SimilarityIndex::create(Arc::new(KeywordEmbedder::new()), Vec::new()).await;
    assert!(matches!(result, Err(ChatbotError::EmptyInput)));
}

#[tokio::test]
async fn exact_text_scores_one() {
    let index = keyword_index(faq_documents()).await;
    for doc in faq_documents() {
        let hits = index.search(&doc.text, 4, 0.5).await.unwrap();
        assert_eq!(hits[0].text, doc.text);
        assert_eq!(hits[0].similarity, 1.0);
    }
}

#[tokio::test]
async fn printer_question_finds_printer_faq() {
    let doc = Document::new(
        "Printer not working? Check power, paper, ink.",
        json!({ "source": "FAQ - Printer" }).as_object().unwrap().clone(),
    );
    let index = keyword_index(vec![doc]).await;

    let hits = index.search("my printer won't print", 4, 0.3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source(), "FAQ - Printer");
    assert!(hits[0].similarity >= 0.3);
}

#[tokio::test]
async fn results_are_sorted_and_bounded_by_k() {
    let index = keyword_index(vec![
        Document::new("password", Default::default()),
        Document::new("password password vpn", Default::default()),
        Document::new("password vpn", Default::default()),
        Document::new("vpn", Default::default()),
    ])
    .await;

    let hits = index.search("password", 2, 0.0).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "password");
    assert!(hits[0].similarity >= hits[1].similarity);

    let all = index.search("password", 10, 0.0).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].similarity >= w[1].similarity));
}

#[tokio::test]
async fn threshold_is_a_hard_cutoff() {
    let index = keyword_index(faq_documents()).await;

    // Unrelated text is orthogonal to every document: similarity 1/3.
    let none = index.search("what is the meaning of life", 4, 0.5).await.unwrap();
    assert!(none.is_empty());

    let weak = index.search("what is the meaning of life", 4, 0.33).await.unwrap();
    assert_eq!(weak.len(), 3);

    let strict = index.search("what is the meaning of life", 4, 0.334).await.unwrap();
    assert!(strict.is_empty());
}

#[tokio::test]
async fn fewer_than_k_survive_filtering() {
    let index = keyword_index(faq_documents()).await;
    let hits = index.search("I forgot my password", 4, 0.5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source(), "FAQ - Password Reset");
    assert_eq!(hits[0].category(), "Authentication");
}

#[tokio::test]
async fn bulk_loaded_documents_are_searchable() {
    let mut index = keyword_index(faq_documents()).await;
    let added = index
        .add_documents(vec![Document::with_source(
            "Email not syncing on your phone? Remove and re-add the email account.",
            "FAQ - Email",
            "Email",
            "medium",
        )])
        .await
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(index.len(), 4);

    let hits = index
        .search("Email not syncing on your phone? Remove and re-add the email account.", 1, 0.5)
        .await
        .unwrap();
    assert_eq!(hits[0].similarity, 1.0);
    assert_eq!(hits[0].source(), "FAQ - Email");
}

#[tokio::test]
async fn save_and_load_restore_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("indexes").join("it_helpdesk_index.sqlite");

    let mut index = keyword_index(faq_documents()).await;
    assert!(!SimilarityIndex::exists(&path));
    index.save(&path).unwrap();
    assert!(SimilarityIndex::exists(&path));

    let loaded = SimilarityIndex::load(&path, Arc::new(KeywordEmbedder::new())).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.dimensions(), index.dimensions());
    assert_eq!(loaded.entries(), index.entries());
    assert_eq!(loaded.path(), Some(path.as_path()));

    let hits = loaded.search("reset my password", 4, 0.5).await.unwrap();
    assert_eq!(hits[0].source(), "FAQ - Password Reset");
    assert_eq!(hits[0].metadata["priority"], "high");
}

#[tokio::test]
async fn load_missing_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.sqlite");
    let result = SimilarityIndex::load(&path, Arc::new(KeywordEmbedder::new()));
    assert!(matches!(result, Err(ChatbotError::IndexNotFound(p)) if p == path));
}

#[tokio::test]
async fn garbage_file_is_not_an_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.sqlite");
    std::fs::write(&path, b"definitely not sqlite").unwrap();

    assert!(!SimilarityIndex::exists(&path));
    assert!(SimilarityIndex::load(&path, Arc::new(KeywordEmbedder::new())).is_err());
}

#[tokio::test]
async fn load_rejects_other_embedding_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    keyword_index(faq_documents()).await.save(&path).unwrap();

    let result = SimilarityIndex::load(&path, Arc::new(KeywordEmbedder::named("other-model")));
    assert!(matches!(result, Err(ChatbotError::Index(_))));
}

#[tokio::test]
async fn corrupt_metadata_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");
    keyword_index(faq_documents()).await.save(&path).unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE indexed_documents SET metadata = 'not json' WHERE position = 1", [])
        .unwrap();
    drop(conn);

    let result = SimilarityIndex::load(&path, Arc::new(KeywordEmbedder::new()));
    assert!(matches!(result, Err(ChatbotError::Index(msg)) if msg.contains("document 1")));
}

#[tokio::test]
async fn unwritable_path_keeps_added_documents_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blocked.sqlite");
    std::fs::create_dir(&path).unwrap();

    let mut index = keyword_index(faq_documents()).await;
    let result = index
        .add_documents_and_save(
            vec![Document::new("Email not syncing?", Default::default())],
            &path,
        )
        .await;

    assert!(result.is_err());
    assert_eq!(index.len(), 3);
    assert_eq!(index.path(), None);
    assert!(index.search("email", 1, 0.9).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_or_create_builds_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.sqlite");

    let first_embedder = Arc::new(KeywordEmbedder::new());
    let created = SimilarityIndex::open_or_create(&path, first_embedder.clone(), faq_documents())
        .await
        .unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(first_embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    // The second open loads from disk and never embeds the documents again.
    let second_embedder = Arc::new(KeywordEmbedder::new());
    let loaded = SimilarityIndex::open_or_create(&path, second_embedder.clone(), Vec::new())
        .await
        .unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(second_embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stats_describe_the_index() {
    let index = keyword_index(faq_documents()).await;
    let stats = index.stats();
    assert_eq!(stats.status, "ready");
    assert_eq!(stats.total_documents, 3);
    assert_eq!(stats.embedding_dimension, KeywordEmbedder::vectorize("x").len());
    assert_eq!(stats.embedding_model, "keyword-stub");
}
