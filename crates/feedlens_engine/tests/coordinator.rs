mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{coordinator, recorder, FakeLoader, StaticStopwords, UnreachableStopwords};
use feedlens_engine::{CoordinatorError, LabelScore};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn no_labels_skips_the_model_entirely() {
    let loader = Arc::new(FakeLoader::new(&[0.9]));
    let coordinator = coordinator(loader.clone(), &[], Arc::new(StaticStopwords(vec![])));

    let outcome = coordinator.classify("Un post quelconque", None).await.unwrap();

    assert_eq!(outcome, None);
    assert_eq!(loader.loads(), 0);
    assert_eq!(loader.invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn low_scores_mark_the_post_negative() {
    let loader = Arc::new(FakeLoader::new(&[0.2, 0.4]));
    let coordinator = coordinator(
        loader.clone(),
        &["recrutement", "intelligence artificielle"],
        Arc::new(StaticStopwords(vec![])),
    );

    let result = coordinator.classify("Mon week-end", None).await.unwrap().unwrap();

    assert!(result.is_negative);
    assert_eq!(
        result.scores,
        vec![
            LabelScore {
                label: "recrutement".to_string(),
                score: 0.2
            },
            LabelScore {
                label: "intelligence artificielle".to_string(),
                score: 0.4
            },
        ]
    );
}

#[tokio::test]
async fn one_matching_label_keeps_the_post() {
    let loader = Arc::new(FakeLoader::new(&[0.1, 0.8]));
    let coordinator = coordinator(
        loader.clone(),
        &["sport", "rust"],
        Arc::new(StaticStopwords(vec![])),
    );

    let result = coordinator.classify("Rust 1.80 est sorti", None).await.unwrap().unwrap();

    assert!(!result.is_negative);
}

#[tokio::test]
async fn content_is_cleaned_before_the_model_sees_it() {
    let loader = Arc::new(FakeLoader::new(&[0.9]));
    let coordinator = coordinator(
        loader.clone(),
        &["rust"],
        Arc::new(StaticStopwords(vec!["le", "de"])),
    );

    coordinator
        .classify("Le langage 🚀 de Rust", None)
        .await
        .unwrap();

    assert_eq!(*loader.seen_texts.lock().unwrap(), vec!["langage rust".to_string()]);
}

#[tokio::test]
async fn stopword_outage_keeps_text_unfiltered() {
    let loader = Arc::new(FakeLoader::new(&[0.9]));
    let coordinator = coordinator(loader.clone(), &["rust"], Arc::new(UnreachableStopwords));

    let long = format!("Le langage 🚀 de Rust {}", "x".repeat(300));
    let result = coordinator.classify(&long, None).await.unwrap();

    assert!(result.is_some());
    let seen = loader.seen_texts.lock().unwrap();
    assert!(seen[0].starts_with("Le langage  de Rust x"));
    assert_eq!(seen[0].chars().count(), 200);
}

#[tokio::test]
async fn progress_reaches_the_caller() {
    let loader = Arc::new(FakeLoader::new(&[0.9]));
    let coordinator = coordinator(loader.clone(), &["rust"], Arc::new(StaticStopwords(vec![])));
    let (subscriber, events) = recorder();

    coordinator.classify("Rust", Some(subscriber)).await.unwrap();

    assert_eq!(events.lock().unwrap().len(), 3);
    assert!(coordinator.broker().is_ready());
}

#[tokio::test]
async fn pipeline_failure_is_reported() {
    let loader = Arc::new(FakeLoader::new(&[0.9]).failing());
    let coordinator = coordinator(loader.clone(), &["rust"], Arc::new(StaticStopwords(vec![])));

    let err = coordinator.classify("Rust", None).await.unwrap_err();

    assert!(matches!(err, CoordinatorError::Pipeline(_)));
}
