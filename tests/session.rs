//! End-to-end session tests with in-process embedder and generator doubles.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use study_copilot::config::Config;
use study_copilot::experiment::{ExperimentSink, MarkdownExperimentLog, NoopExperimentLog};
use study_copilot::session::{AskOptions, StudySession, TaskGenerators};
use study_copilot_core::chunk::ChunkOptions;
use study_copilot_core::embedding::Embedder;
use study_copilot_core::error::CopilotError;
use study_copilot_core::generation::{GenerationRequest, TextGenerator};
use study_copilot_core::models::{AnswerMode, SourceDocument};

/// Hashed bag-of-words vectors: texts that share words are close.
struct BagOfWords {
    calls: AtomicUsize,
    down: AtomicBool,
}

#[async_trait]
impl Embedder for BagOfWords {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            anyhow::bail!("embedding service down");
        }
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 128];
                for word in t
                    .to_lowercase()
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    let h = word
                        .bytes()
                        .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
                    v[(h % 128) as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

struct Scripted {
    reply: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl Scripted {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn last_prompt(&self) -> String {
        self.requests.lock().unwrap().last().unwrap().prompt.clone()
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

fn session_with(reply: &str, sink: Arc<dyn ExperimentSink>) -> (Arc<BagOfWords>, Arc<Scripted>, StudySession) {
    let embedder = Arc::new(BagOfWords {
        calls: AtomicUsize::new(0),
        down: AtomicBool::new(false),
    });
    let generator = Scripted::new(reply);
    let session = StudySession::new(
        Config::default(),
        embedder.clone(),
        TaskGenerators::uniform(generator.clone()),
        sink,
    );
    (embedder, generator, session)
}

fn doc(name: &str, text: &str) -> SourceDocument {
    SourceDocument {
        name: name.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn test_newton_end_to_end() {
    let (_, generator, session) = session_with(
        "Context: [physics.pdf] ... Question: ... Answer: Force equals mass times acceleration.",
        Arc::new(NoopExperimentLog),
    );

    let report = session
        .ingest(
            vec![doc("physics.pdf", "Newton's second law states F=ma.")],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 1);
    assert_eq!(report.chunk_size, 800);
    assert_eq!(report.dimension, Some(128));

    let response = session
        .ask("What is Newton's second law?", &AskOptions::default())
        .await
        .unwrap();
    assert_eq!(response.mode, AnswerMode::Rag);
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].text, "Newton's second law states F=ma.");
    assert_eq!(response.sources[0].metadata.source.as_deref(), Some("physics.pdf"));
    assert_eq!(response.answer, "Force equals mass times acceleration.");
    assert!(generator
        .last_prompt()
        .contains("[physics.pdf] Newton's second law states F=ma."));
}

#[tokio::test]
async fn test_ranking_across_documents() {
    let (_, _, session) = session_with("ok.", Arc::new(NoopExperimentLog));
    session
        .ingest(
            vec![
                doc("bio.md", "Photosynthesis converts light into chemical energy in chloroplasts."),
                doc("physics.md", "Newton's second law states that force equals mass times acceleration."),
                doc("circuits.md", "Ohm's law relates voltage current and resistance."),
            ],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();

    let response = session
        .ask(
            "Newton's second law force mass acceleration",
            &AskOptions {
                top_k: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0].metadata.source.as_deref(), Some("physics.md"));
    assert!(response.sources[0].distance <= response.sources[1].distance);
}

#[tokio::test]
async fn test_baseline_mode_uses_corpus_not_index() {
    let (embedder, generator, session) = session_with("It is F=ma.", Arc::new(NoopExperimentLog));
    session
        .ingest(
            vec![
                doc("a.md", "Newton's second law states F=ma."),
                doc("b.md", "Entropy never decreases."),
            ],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
    let calls = embedder.calls.load(Ordering::SeqCst);

    let response = session
        .ask(
            "What is Newton's second law?",
            &AskOptions {
                mode: AnswerMode::Baseline,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls);
    assert!(response.sources.is_empty());
    assert!(generator
        .last_prompt()
        .contains("Newton's second law states F=ma. Entropy never decreases."));
}

#[tokio::test]
async fn test_operations_before_ingest_are_not_ready() {
    let (_, _, session) = session_with("x", Arc::new(NoopExperimentLog));
    assert!(!session.status().ready);

    let err = session.ask("q?", &AskOptions::default()).await.unwrap_err();
    assert!(matches!(err, CopilotError::NotReady(_)));
    assert!(matches!(
        session.summarize(None).await.unwrap_err(),
        CopilotError::NotReady(_)
    ));
    assert!(matches!(
        session.mcqs(3, None).await.unwrap_err(),
        CopilotError::NotReady(_)
    ));
}

#[tokio::test]
async fn test_ingest_without_text_is_rejected() {
    let (_, _, session) = session_with("x", Arc::new(NoopExperimentLog));
    let err = session
        .ingest(vec![doc("blank.pdf", "   ")], &ChunkOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CopilotError::InputValidation(_)));

    let err = session.ingest(vec![], &ChunkOptions::default()).await.unwrap_err();
    assert!(matches!(err, CopilotError::InputValidation(_)));
}

#[tokio::test]
async fn test_ingest_reports_skipped_and_replaces_corpus() {
    let (_, _, session) = session_with("x", Arc::new(NoopExperimentLog));
    session
        .ingest(vec![doc("old.md", "Old material about optics.")], &ChunkOptions::default())
        .await
        .unwrap();

    let report = session
        .ingest(
            vec![doc("new.md", "New material about circuits."), doc("scan.pdf", "")],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.skipped, vec!["scan.pdf"]);

    let status = session.status();
    assert!(status.ready);
    assert_eq!(status.documents, vec!["new.md"]);
    assert_eq!(status.chunks, 1);

    let response = session.ask("optics", &AskOptions::default()).await.unwrap();
    assert!(response.sources.iter().all(|h| h.text.contains("circuits")));
}

#[tokio::test]
async fn test_failed_ingest_keeps_status_of_previous_build() {
    let (embedder, _, session) = session_with("x", Arc::new(NoopExperimentLog));
    session
        .ingest(
            vec![doc("optics.md", "Lenses refract light."), doc("waves.md", "Waves carry energy.")],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();

    embedder.down.store(true, Ordering::SeqCst);
    let err = session
        .ingest(vec![doc("new.md", "Circuits and resistors.")], &ChunkOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CopilotError::ExternalService { .. }));

    let status = session.status();
    assert!(status.ready);
    assert_eq!(status.chunks, 2);
    assert_eq!(status.documents, vec!["optics.md", "waves.md"]);
}

#[tokio::test]
async fn test_huge_top_k_returns_all_chunks() {
    let (_, _, session) = session_with("ok.", Arc::new(NoopExperimentLog));
    session
        .ingest(
            vec![doc("a.md", "Ohm's law."), doc("b.md", "Newton's law.")],
            &ChunkOptions::default(),
        )
        .await
        .unwrap();
    let response = session
        .ask(
            "law",
            &AskOptions {
                top_k: Some(usize::MAX),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(response.sources.len(), 2);
}

#[tokio::test]
async fn test_zero_top_k_override_rejected() {
    let (_, _, session) = session_with("x", Arc::new(NoopExperimentLog));
    session
        .ingest(vec![doc("a.md", "text")], &ChunkOptions::default())
        .await
        .unwrap();
    let err = session
        .ask(
            "q",
            &AskOptions {
                top_k: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CopilotError::InputValidation(_)));
}

#[tokio::test]
async fn test_mcq_well_formed_and_malformed() {
    let json = r#"[{"question":"Unit of force?","options":["A) N","B) J","C) W","D) Pa"],"answer":"A","explanation":"Newton."}]"#;
    let (_, _, session) = session_with(json, Arc::new(NoopExperimentLog));
    session
        .ingest(vec![doc("a.md", "Force is measured in newtons.")], &ChunkOptions::default())
        .await
        .unwrap();
    let set = session.mcqs(1, None).await.unwrap();
    assert_eq!(set.questions.len(), 1);
    assert_eq!(set.questions[0].answer(), Some(&serde_json::Value::from("A")));
    assert_eq!(
        serde_json::to_value(&set.questions).unwrap(),
        serde_json::from_str::<serde_json::Value>(json).unwrap()
    );

    let (_, _, session) = session_with("Sure! Here are your questions: 1) ...", Arc::new(NoopExperimentLog));
    session
        .ingest(vec![doc("a.md", "Force is measured in newtons.")], &ChunkOptions::default())
        .await
        .unwrap();
    let set = session.mcqs(1, None).await.unwrap();
    assert!(set.questions.is_empty());
    assert_eq!(set.raw, "Sure! Here are your questions: 1) ...");
}

#[tokio::test]
async fn test_summary_temperature_override() {
    let (_, generator, session) = session_with("  Notes.  ", Arc::new(NoopExperimentLog));
    session
        .ingest(vec![doc("a.md", "Thermodynamics basics.")], &ChunkOptions::default())
        .await
        .unwrap();
    assert_eq!(session.summarize(Some(9.0)).await.unwrap(), "Notes.");
    let temperature = generator.requests.lock().unwrap().last().unwrap().temperature;
    assert_eq!(temperature, 2.0);
}

#[tokio::test]
async fn test_record_experiment_writes_markdown() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("docs/experiments.md");
    let (_, _, session) = session_with("x", Arc::new(MarkdownExperimentLog::new(&path)));

    let logged = session.record_experiment(
        "chunk size sweep",
        &[("chunk_size".to_string(), 400usize.into())],
        "smaller chunks retrieved tighter context",
    );
    assert!(logged);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("### "));
    assert!(content.contains(" – chunk size sweep\n\n**Parameters:** chunk_size=400\n\n"));
    assert!(content.ends_with("**Observation:** smaller chunks retrieved tighter context\n\n---\n"));
}
