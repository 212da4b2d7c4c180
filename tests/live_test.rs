// cargo test --test live_test -- --ignored --nocapture --test-threads=1
//
// Needs real credentials in .env (see Settings::from_env). Each test builds
// its index under a temp dir so nothing in ./vector_indexes is touched.

use rag_chatbot::chatbot::{AnswerMethod, RagChatbot};
use rag_chatbot::config::Settings;
use rag_chatbot::embed::{Embedder, EmbeddingModel};
use rag_chatbot::knowledge::UseCase;

fn live_settings(index_dir: &std::path::Path) -> Settings {
    let mut settings = Settings::from_env().unwrap();
    settings.index_dir = index_dir.to_path_buf();
    settings
}

// --- Test: Embeddings ---
// Goal: one vector per input, all of the same dimensionality.
#[tokio::test]
#[ignore]
async fn test_live_embeddings() {
    let dir = tempfile::tempdir().unwrap();
    let settings = live_settings(dir.path());
    let embedder = Embedder::new(settings.provider, settings.embedding.clone(), settings.retry).unwrap();

    let texts = vec!["printer is jammed".to_string(), "reset my password".to_string()];
    let vectors = embedder.embed_batch(&texts).await.unwrap();

    println!("{} vectors of {} dimensions", vectors.len(), vectors[0].len());
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), vectors[1].len());
}

// --- Test: Function calling ---
// Goal: a device question is answered through check_device_status.
#[tokio::test]
#[ignore]
async fn test_live_function_calling() {
    let dir = tempfile::tempdir().unwrap();
    let settings = live_settings(dir.path());
    let mut chatbot = RagChatbot::from_settings(&settings, UseCase::ItHelpdesk, true)
        .await
        .unwrap();

    let response = chatbot.chat("What's the status of printer01?", true, true).await;
    println!("{}\n{:?}", response.answer, response.method);

    assert!(response.success);
    assert_eq!(response.method, AnswerMethod::FunctionCalling);
    assert!(response.answer.to_lowercase().contains("online"));
}

// --- Test: Retrieval ---
// Goal: an FAQ question is grounded in the knowledge base.
#[tokio::test]
#[ignore]
async fn test_live_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    let settings = live_settings(dir.path());
    let mut chatbot = RagChatbot::from_settings(&settings, UseCase::HrAssistant, false)
        .await
        .unwrap();

    let response = chatbot.chat("How do I request time off?", true, false).await;
    println!("{}\nSources: {:?}", response.answer, response.sources);

    assert!(response.success);
    assert!(matches!(response.method, AnswerMethod::RagRetrieval | AnswerMethod::LlmDirect));
    assert_eq!(response.sources.len(), response.retrieved_documents.len());
    assert_eq!(chatbot.get_history().len(), 2);
}
