//! Integration tests for multi-agent routing.

mod common;

use common::ScriptedAgent;
use lodestar_agent::{Agent, AgentError, Decision, Handoff, MultiAgent};
use lodestar_models::{Content, Message, MessageBag, Options};
use lodestar_platform::ModelResult;
use serde_json::json;
use std::sync::Arc;

fn decision(agent_name: &str) -> ModelResult {
    ModelResult::object(serde_json::to_value(Decision::new(agent_name, "matched the topic")).unwrap())
}

fn question(text: &str) -> MessageBag {
    MessageBag::new()
        .with(Message::system("Be helpful."))
        .with(Message::user(text))
}

struct Fixture {
    orchestrator: Arc<ScriptedAgent>,
    technical: Arc<ScriptedAgent>,
    billing: Arc<ScriptedAgent>,
    fallback: Arc<ScriptedAgent>,
    router: MultiAgent,
}

fn fixture(orchestrator_results: Vec<ModelResult>) -> Fixture {
    let orchestrator = ScriptedAgent::with_results("orchestrator", orchestrator_results);
    let technical = ScriptedAgent::with_results("technical", [ModelResult::text("from technical")]);
    let billing = ScriptedAgent::with_results("billing", [ModelResult::text("from billing")]);
    let fallback = ScriptedAgent::with_results("general", [ModelResult::text("from fallback")]);

    let router = MultiAgent::new(
        orchestrator.clone(),
        vec![
            Handoff::new(technical.clone(), ["code", "errors"]).unwrap(),
            Handoff::new(billing.clone(), ["invoices"]).unwrap(),
        ],
        fallback.clone(),
    )
    .unwrap();

    Fixture {
        orchestrator,
        technical,
        billing,
        fallback,
        router,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn handoff_needs_a_condition() {
    let err = Handoff::new(ScriptedAgent::new("technical"), Vec::<String>::new()).unwrap_err();
    assert!(matches!(err, AgentError::InvalidArgument(_)));
    assert_eq!(err.to_string(), "Handoff must have at least one \"when\" condition");
}

#[test]
fn router_needs_a_handoff() {
    let err = MultiAgent::new(ScriptedAgent::new("o"), Vec::new(), ScriptedAgent::new("f")).unwrap_err();
    assert!(matches!(err, AgentError::InvalidArgument(_)));
    assert_eq!(err.to_string(), "MultiAgent requires at least 1 handoff.");
}

#[test]
fn configuration_is_inspectable() {
    let fixture = fixture(Vec::new());
    assert_eq!(fixture.router.name(), "multi-agent");
    assert_eq!(fixture.router.fallback().name(), "general");

    let targets: Vec<&str> = fixture.router.handoffs().iter().map(|h| h.to().name()).collect();
    assert_eq!(targets, ["technical", "billing"]);
    assert_eq!(fixture.router.handoffs()[0].when(), ["code", "errors"]);

    let renamed = fixture.router.with_name("support-desk");
    assert_eq!(renamed.name(), "support-desk");
}

// ═══════════════════════════════════════════════════════════════════════════════
// Routing
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn conversation_without_user_message_is_rejected() {
    let fixture = fixture(vec![decision("technical")]);
    let err = fixture
        .router
        .call(MessageBag::new().with(Message::system("Be helpful.")), Options::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Runtime(_)));
    assert_eq!(err.to_string(), "No user message found in conversation.");
    assert_eq!(fixture.orchestrator.call_count(), 0);
}

#[tokio::test]
async fn image_only_question_is_still_routed() {
    let fixture = fixture(vec![decision("")]);
    let messages =
        MessageBag::new().with(Message::user_with([Content::image_url("https://example.com/receipt.png")]));

    let result = fixture.router.call(messages.clone(), Options::new()).await.unwrap();

    assert_eq!(result.as_text().unwrap(), "from fallback");
    assert_eq!(fixture.orchestrator.call_count(), 1);
    assert_eq!(fixture.fallback.calls()[0].0, messages);
}

#[tokio::test]
async fn named_target_answers() {
    let fixture = fixture(vec![decision("technical")]);
    let options = Options::new().with("temperature", 0.3);

    let result = fixture
        .router
        .call(question("Why does my build fail?"), options.clone())
        .await
        .unwrap();

    assert_eq!(result.as_text().unwrap(), "from technical");
    assert_eq!(fixture.technical.call_count(), 1);
    assert_eq!(fixture.billing.call_count(), 0);
    assert_eq!(fixture.fallback.call_count(), 0);

    let calls = fixture.technical.calls();
    let (messages, forwarded) = &calls[0];
    assert_eq!(messages, &question("Why does my build fail?"));
    assert_eq!(forwarded, &options);
}

#[tokio::test]
async fn orchestrator_is_asked_for_a_decision() {
    let fixture = fixture(vec![decision("billing")]);
    fixture
        .router
        .call(question("Where is my invoice?"), Options::new().with("temperature", 0.3))
        .await
        .unwrap();

    let calls = fixture.orchestrator.calls();
    let (messages, options) = &calls[0];
    let prompt = messages.user_message().and_then(Message::text).unwrap();
    assert!(prompt.contains("Where is my invoice?"));
    assert!(prompt.contains("- technical: code, errors"));
    assert!(prompt.contains("- billing: invoices"));
    assert!(prompt.contains("Fallback agent: general"));

    let schema = options.response_format().unwrap();
    assert!(schema["properties"].get("agentName").is_some());
    assert!(schema["properties"].get("reasoning").is_some());
    assert_eq!(options.get("temperature"), Some(&json!(0.3)));

    assert!(fixture.billing.calls()[0].1.response_format().is_none());
}

#[tokio::test]
async fn latest_user_message_drives_routing() {
    let fixture = fixture(vec![decision("billing")]);
    let messages = MessageBag::new()
        .with(Message::user("My code crashes."))
        .with(Message::assistant("Fixed it?"))
        .with(Message::user("Now I need my invoice."));

    fixture.router.call(messages, Options::new()).await.unwrap();

    let prompt = fixture.orchestrator.calls()[0]
        .0
        .user_message()
        .and_then(Message::text)
        .unwrap();
    assert!(prompt.contains("Now I need my invoice."));
    assert!(!prompt.contains("My code crashes."));
}

#[tokio::test]
async fn empty_decision_uses_the_fallback() {
    let fixture = fixture(vec![decision("")]);
    let result = fixture.router.call(question("Hello"), Options::new()).await.unwrap();

    assert_eq!(result.as_text().unwrap(), "from fallback");
    assert_eq!(fixture.fallback.call_count(), 1);
    assert_eq!(fixture.technical.call_count(), 0);
}

#[tokio::test]
async fn unknown_target_uses_the_fallback() {
    let fixture = fixture(vec![decision("nonexistent")]);
    let result = fixture.router.call(question("Hello"), Options::new()).await.unwrap();

    assert_eq!(result.as_text().unwrap(), "from fallback");
    assert_eq!(fixture.fallback.calls()[0].0, question("Hello"));
}

#[tokio::test]
async fn inline_answer_asks_the_orchestrator_again() {
    let fixture = fixture(vec![
        ModelResult::text("I can answer that myself."),
        ModelResult::text("Paris."),
    ]);
    let options = Options::new().with("max_tokens", 50);

    let result = fixture
        .router
        .call(question("Capital of France?"), options.clone())
        .await
        .unwrap();

    assert_eq!(result.as_text().unwrap(), "Paris.");
    let calls = fixture.orchestrator.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1], (question("Capital of France?"), options));
    assert_eq!(fixture.fallback.call_count(), 0);
}

#[tokio::test]
async fn object_that_is_not_a_decision_is_an_inline_answer() {
    let fixture = fixture(vec![
        ModelResult::object(json!({"city": "Paris"})),
        ModelResult::text("Paris."),
    ]);

    let result = fixture.router.call(question("Capital?"), Options::new()).await.unwrap();
    assert_eq!(result.as_text().unwrap(), "Paris.");
    assert_eq!(fixture.orchestrator.call_count(), 2);
}
