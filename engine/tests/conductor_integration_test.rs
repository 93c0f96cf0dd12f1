//! Integration tests for the orchestration loop
//!
//! Generation, search and publishing are in-process fakes so these tests
//! exercise routing, incident recording and progress events without any
//! network access.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::SearchHit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use syllabus_engine::agent::{AgentId, AgentSettings, AgentStatus, ROSTER};
use syllabus_engine::conductor::{Conductor, ConductorEvent};
use syllabus_engine::llm::{Completion, LLMError, LLMProvider, Message};
use syllabus_engine::state::{IncidentKind, NextAction, SharedState};
use syllabus_engine::tools::{PublishProvider, SearchProvider, Toolbox};
use tokio::sync::mpsc;

/// Replies with the role's section heading, or fails for chosen roles
struct ScriptedGenerator {
    fail_for: Vec<&'static str>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            fail_for: Vec::new(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing_for(mut self, role: &'static str) -> Self {
        self.fail_for.push(role);
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LLMProvider for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message]) -> syllabus_engine::llm::Result<Completion> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let system = messages.first().map(|m| m.content.clone()).unwrap_or_default();
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        if self.fail_for.iter().any(|role| system.contains(role)) {
            return Err(LLMError::InvalidRequest("500: upstream exploded".to_string()));
        }

        let role = ROSTER
            .iter()
            .find(|agent| system.contains(agent.role_name()))
            .map(|agent| agent.section_title())
            .unwrap_or("Unknown");
        Ok(Completion::new(format!("{} content", role)))
    }
}

struct FakeSearch {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeSearch {
    fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "fake_search"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EngineError::SearchUnavailable("connection refused".to_string()));
        }
        Ok(vec![SearchHit::new(
            format!("Result for {}", query),
            "https://example.com/result",
            "a snippet",
        )])
    }
}

struct FakePublisher {
    titles: Mutex<Vec<String>>,
    fail: bool,
    delay: Option<Duration>,
}

impl FakePublisher {
    fn ok() -> Self {
        Self {
            titles: Mutex::new(Vec::new()),
            fail: false,
            delay: None,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }
}

#[async_trait]
impl PublishProvider for FakePublisher {
    fn name(&self) -> &str {
        "fake_docs"
    }

    async fn publish(&self, title: &str, _text: &str) -> Result<String, EngineError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EngineError::PublishUnavailable("quota exceeded".to_string()));
        }
        let mut titles = self.titles.lock().unwrap();
        titles.push(title.to_string());
        Ok(format!(
            "https://docs.google.com/document/d/doc-{}/edit",
            titles.len()
        ))
    }
}

fn conductor(
    generator: Arc<ScriptedGenerator>,
    search: Arc<FakeSearch>,
    publisher: Option<Arc<FakePublisher>>,
) -> Conductor {
    let publisher = publisher.map(|p| p as Arc<dyn PublishProvider>);
    let toolbox = Toolbox::new(search, publisher);
    Conductor::new(generator, toolbox, AgentSettings::default())
}

#[tokio::test]
async fn test_full_run_produces_four_sections_and_links() {
    let generator = Arc::new(ScriptedGenerator::new());
    let search = Arc::new(FakeSearch::ok());
    let publisher = Arc::new(FakePublisher::ok());
    let conductor = conductor(generator.clone(), search.clone(), Some(publisher.clone()));

    let state = conductor.run("graph theory").await.unwrap();

    assert_eq!(state.topic, "graph theory");
    assert_eq!(state.completed, ROSTER.to_vec());
    assert_eq!(state.outputs.len(), 4);
    assert_eq!(state.document_links.len(), 4);
    assert!(state.error_log.is_empty());
    assert_eq!(state.next_action, Some(NextAction::Finish));

    assert_eq!(
        state.output_for(AgentId::KnowledgeBase),
        Some("Knowledge Base content")
    );
    assert_eq!(
        state.output_for(AgentId::Exercises),
        Some("Practice Materials content")
    );

    // Only the two searching roles hit the search adapter
    assert_eq!(search.calls.load(Ordering::SeqCst), 2);

    let titles = publisher.titles.lock().unwrap().clone();
    assert_eq!(
        titles,
        vec![
            "graph theory - Knowledge Base",
            "graph theory - Learning Roadmap",
            "graph theory - Curated Resources",
            "graph theory - Practice Materials",
        ]
    );
}

#[tokio::test]
async fn test_downstream_prompts_include_upstream_sections() {
    let generator = Arc::new(ScriptedGenerator::new());
    let conductor = conductor(generator.clone(), Arc::new(FakeSearch::ok()), None);

    conductor.run("graph theory").await.unwrap();

    let prompts = generator.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[1].contains("Knowledge Base content"));
    assert!(prompts[2].contains("Learning Roadmap content"));
    assert!(prompts[2].contains("Result for graph theory"));
    assert!(prompts[3].contains("Knowledge Base content"));
    assert!(prompts[3].contains("Learning Roadmap content"));
}

#[tokio::test]
async fn test_search_failure_is_recorded_for_searching_roles_only() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::failing()),
        Some(Arc::new(FakePublisher::ok())),
    );

    let state = conductor.run("graph theory").await.unwrap();

    assert_eq!(state.count_kind(IncidentKind::SearchUnavailable), 2);
    assert_eq!(state.error_log.len(), 2);
    assert_eq!(state.records_for(AgentId::Resources).count(), 1);
    assert_eq!(state.records_for(AgentId::Exercises).count(), 1);
    assert_eq!(state.document_links.len(), 4);
    assert_eq!(state.outputs.len(), 4);
}

#[tokio::test]
async fn test_publish_failure_keeps_text() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::ok()),
        Some(Arc::new(FakePublisher::failing())),
    );

    let state = conductor.run("graph theory").await.unwrap();

    assert!(state.document_links.is_empty());
    assert_eq!(state.count_kind(IncidentKind::PublishUnavailable), 4);
    for agent in ROSTER {
        assert!(state.output_for(agent).is_some_and(|t| !t.is_empty()));
    }
}

#[tokio::test]
async fn test_publishing_disabled_logs_nothing() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::ok()),
        None,
    );

    let state = conductor.run("graph theory").await.unwrap();

    assert!(state.document_links.is_empty());
    assert!(state.error_log.is_empty());
}

#[tokio::test]
async fn test_generation_failure_advances_loop() {
    let publisher = Arc::new(FakePublisher::ok());
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new().failing_for("Academic Advisor")),
        Arc::new(FakeSearch::ok()),
        Some(publisher.clone()),
    );

    let state = conductor.run("graph theory").await.unwrap();

    assert_eq!(state.completed, ROSTER.to_vec());
    assert_eq!(state.output_for(AgentId::Roadmap), Some(""));
    assert!(state.link_for(AgentId::Roadmap).is_none());
    assert_eq!(state.document_links.len(), 3);
    assert_eq!(state.count_kind(IncidentKind::GenerationFailed), 1);
    assert_eq!(publisher.titles.lock().unwrap().len(), 3);

    let record = state.records_for(AgentId::Roadmap).next().unwrap();
    assert!(record.message.contains("upstream exploded"));
}

#[tokio::test]
async fn test_slow_calls_are_bounded() {
    let search = Arc::new(FakeSearch {
        delay: Some(Duration::from_millis(500)),
        ..FakeSearch::ok()
    });
    let publisher = Arc::new(FakePublisher {
        delay: Some(Duration::from_millis(500)),
        ..FakePublisher::ok()
    });
    let toolbox = Toolbox::new(search, Some(publisher as Arc<dyn PublishProvider>))
        .with_timeouts(Duration::from_millis(20), Duration::from_millis(20));
    let settings = AgentSettings {
        generation_timeout: Duration::from_millis(20),
        ..AgentSettings::default()
    };
    let generator = Arc::new(ScriptedGenerator::new().slow(Duration::from_millis(500)));
    let conductor = Conductor::new(generator, toolbox, settings);

    let state = conductor.run("graph theory").await.unwrap();

    // Generation timed out everywhere, so nothing was published
    assert_eq!(state.completed.len(), 4);
    assert_eq!(state.count_kind(IncidentKind::GenerationFailed), 4);
    assert_eq!(state.count_kind(IncidentKind::SearchUnavailable), 2);
    assert_eq!(state.count_kind(IncidentKind::PublishUnavailable), 0);
    assert!(state
        .error_log
        .iter()
        .any(|r| r.message.contains("timed out")));
}

#[tokio::test]
async fn test_slow_publish_times_out_but_text_survives() {
    let publisher = Arc::new(FakePublisher {
        delay: Some(Duration::from_millis(500)),
        ..FakePublisher::ok()
    });
    let toolbox = Toolbox::new(
        Arc::new(FakeSearch::ok()),
        Some(publisher as Arc<dyn PublishProvider>),
    )
    .with_timeouts(Duration::from_secs(5), Duration::from_millis(20));
    let conductor = Conductor::new(
        Arc::new(ScriptedGenerator::new()),
        toolbox,
        AgentSettings::default(),
    );

    let state = conductor.run("graph theory").await.unwrap();

    assert_eq!(state.count_kind(IncidentKind::PublishUnavailable), 4);
    assert!(state.document_links.is_empty());
    assert_eq!(
        state.output_for(AgentId::Resources),
        Some("Curated Resources content")
    );
}

#[tokio::test]
async fn test_progress_events_in_order() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::ok()),
        Some(Arc::new(FakePublisher::ok())),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();

    conductor
        .run_with_progress("graph theory", Some(tx))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 9);
    assert_eq!(
        events[0],
        ConductorEvent::AgentStarted {
            agent: AgentId::KnowledgeBase,
            step: 1,
            total: 4
        }
    );
    assert!(matches!(
        &events[1],
        ConductorEvent::AgentFinished {
            agent: AgentId::KnowledgeBase,
            status: AgentStatus::Success,
            document_reference: Some(_),
            incidents: 0,
        }
    ));
    assert_eq!(
        events[8],
        ConductorEvent::Finished {
            completed: 4,
            errors: 0
        }
    );
}

#[tokio::test]
async fn test_dropped_progress_receiver_does_not_affect_run() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::ok()),
        None,
    );
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);

    let state = conductor
        .run_with_progress("graph theory", Some(tx))
        .await
        .unwrap();

    assert_eq!(state.completed.len(), 4);
    assert!(state.error_log.is_empty());
}

#[tokio::test]
async fn test_blank_topic_rejected_before_any_call() {
    let generator = Arc::new(ScriptedGenerator::new());
    let search = Arc::new(FakeSearch::ok());
    let conductor = conductor(generator.clone(), search.clone(), None);

    let err = conductor.run("   ").await.unwrap_err();

    assert!(matches!(err, EngineError::InvalidTopic(_)));
    assert!(generator.prompts.lock().unwrap().is_empty());
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_drive_resumes_restored_state() {
    let generator = Arc::new(ScriptedGenerator::new());
    let conductor = conductor(generator.clone(), Arc::new(FakeSearch::ok()), None);

    let mut partial = SharedState::new("graph theory");
    partial.completed = vec![AgentId::KnowledgeBase, AgentId::Roadmap];
    partial.outputs = vec![
        syllabus_engine::state::AgentOutput {
            agent: AgentId::KnowledgeBase,
            text: "saved kb".to_string(),
        },
        syllabus_engine::state::AgentOutput {
            agent: AgentId::Roadmap,
            text: "saved roadmap".to_string(),
        },
    ];
    let restored = SharedState::restore(&partial.to_json_pretty().unwrap()).unwrap();

    let state = conductor.drive(restored, None).await.unwrap();

    assert_eq!(state.completed, ROSTER.to_vec());
    assert_eq!(generator.prompts.lock().unwrap().len(), 2);
    assert_eq!(state.output_for(AgentId::KnowledgeBase), Some("saved kb"));
}

#[tokio::test]
async fn test_corrupted_state_is_fatal() {
    let conductor = conductor(
        Arc::new(ScriptedGenerator::new()),
        Arc::new(FakeSearch::ok()),
        None,
    );

    let mut state = SharedState::new("graph theory");
    state.completed = vec![AgentId::KnowledgeBase, AgentId::KnowledgeBase];

    let err = conductor.drive(state, None).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownRoutingState(_)));
}
