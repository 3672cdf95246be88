// tests/chat_turns.rs
// Server-side chat turns with a scripted upstream

mod common;

use common::{ScriptedProvider, Step, citation, drain, test_state};
use quaestio::chat::{TurnError, TurnEvent};
use quaestio::llm::system_prompt;
use quaestio::store::{Mode, Role};

const SESSION: &str = "session_1_turns";

fn texts(events: &[TurnEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            TurnEvent::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn a_turn_persists_both_messages_with_citations() {
    let provider = ScriptedProvider::replying(vec![
        Step::Text("The Mass is "),
        Step::Text("a true sacrifice."),
        Step::Citations(vec![citation("Council of Trent"), citation("Mediator Dei")]),
    ]);
    let state = test_state(provider.clone()).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    let rx = state
        .chat
        .send(SESSION, &conversation.id, "  What is the Holy Mass?  ")
        .await
        .unwrap();
    let events = drain(rx).await;

    assert!(matches!(&events[0], TurnEvent::UserMessage(m) if m.content == "What is the Holy Mass?"));
    assert_eq!(texts(&events), "The Mass is a true sacrifice.");
    assert!(events.iter().any(|e| matches!(e, TurnEvent::Citations(c) if c.len() == 2)));
    let done = match events.last().unwrap() {
        TurnEvent::Done(message) => message.clone(),
        other => panic!("turn did not finish: {other:?}"),
    };
    assert_eq!(done.content, "The Mass is a true sacrifice.");

    let messages = state.messages.list(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].id, done.id);
    assert_eq!(messages[1].citations.as_ref().unwrap().len(), 2);

    assert_eq!(state.usage.get_today_usage(SESSION).await.unwrap().count, 1);
}

#[tokio::test]
async fn first_message_becomes_the_title() {
    let state = test_state(ScriptedProvider::replying(vec![Step::Text("Yes.")])).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    let long = "Is it lawful to work on Sundays when charity towards a neighbour requires it?";
    drain(state.chat.send(SESSION, &conversation.id, long).await.unwrap()).await;
    let titled = state.conversations.get(&conversation.id).await.unwrap().unwrap();
    assert_eq!(titled.title.chars().count(), 53);
    assert!(titled.title.ends_with("..."));

    drain(state.chat.send(SESSION, &conversation.id, "Thank you").await.unwrap()).await;
    let unchanged = state.conversations.get(&conversation.id).await.unwrap().unwrap();
    assert_eq!(unchanged.title, titled.title);
}

#[tokio::test]
async fn history_and_mode_reach_the_provider() {
    let provider = ScriptedProvider::replying(vec![Step::Text("Respondeo dicendum quod...")]);
    let state = test_state(provider.clone()).await;
    let conversation = state.conversations.create(SESSION, Mode::Aquinas).await.unwrap();

    drain(state.chat.send(SESSION, &conversation.id, "Whether God exists?").await.unwrap()).await;
    drain(state.chat.send(SESSION, &conversation.id, "Whether He is simple?").await.unwrap()).await;

    let request = provider.last_request();
    assert_eq!(request.mode, Mode::Aquinas);
    let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(request.messages[2].content, "Whether He is simple?");
    assert!(system_prompt(request.mode).contains("Videtur quod"));
}

#[tokio::test]
async fn upstream_refusal_leaves_only_the_user_message() {
    let state = test_state(ScriptedProvider::refusing()).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    let events = drain(state.chat.send(SESSION, &conversation.id, "Hello?").await.unwrap()).await;

    assert!(matches!(events.last(), Some(TurnEvent::Error(msg)) if msg == "Failed to get response"));
    let messages = state.messages.list(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn mid_stream_failure_removes_the_partial_reply() {
    let provider = ScriptedProvider::replying(vec![Step::Text("Half an ans"), Step::Fail]);
    let state = test_state(provider).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    let events = drain(state.chat.send(SESSION, &conversation.id, "Explain grace").await.unwrap()).await;

    assert!(matches!(events.last(), Some(TurnEvent::Error(_))));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::Done(_))));
    let messages = state.messages.list(&conversation.id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn refusals_happen_before_any_write() {
    let state = test_state(ScriptedProvider::replying(vec![Step::Text("x")])).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    assert!(matches!(
        state.chat.send(SESSION, &conversation.id, "   ").await,
        Err(TurnError::EmptyMessage)
    ));
    assert!(matches!(
        state.chat.send("someone_else", &conversation.id, "Hi").await,
        Err(TurnError::NotFound)
    ));
    assert!(matches!(
        state.chat.send(SESSION, "missing", "Hi").await,
        Err(TurnError::NotFound)
    ));

    assert_eq!(state.messages.count(&conversation.id).await.unwrap(), 0);
    assert_eq!(state.usage.get_today_usage(SESSION).await.unwrap().count, 0);
    assert_eq!(state.usage.get_today_usage("someone_else").await.unwrap().count, 0);
}

#[tokio::test]
async fn regenerate_replaces_the_last_reply_without_counting() {
    let provider = ScriptedProvider::replying(vec![Step::Text("Ite, missa est.")]);
    let state = test_state(provider.clone()).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    drain(state.chat.send(SESSION, &conversation.id, "How does Mass end?").await.unwrap()).await;
    let first = state.messages.list(&conversation.id).await.unwrap();

    let events = drain(state.chat.regenerate(SESSION, &conversation.id).await.unwrap()).await;
    assert!(matches!(events.last(), Some(TurnEvent::Done(_))));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::UserMessage(_))));

    let second = state.messages.list(&conversation.id).await.unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].id, first[0].id);
    assert_ne!(second[1].id, first[1].id);

    // The regenerated request ends on the user message
    let request = provider.last_request();
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);

    assert_eq!(state.usage.get_today_usage(SESSION).await.unwrap().count, 1);
}

#[tokio::test]
async fn regenerate_on_an_empty_conversation_is_rejected() {
    let state = test_state(ScriptedProvider::replying(vec![])).await;
    let conversation = state.conversations.create(SESSION, Mode::Standard).await.unwrap();

    assert!(matches!(
        state.chat.regenerate(SESSION, &conversation.id).await,
        Err(TurnError::EmptyMessage)
    ));
}
