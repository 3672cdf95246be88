// src/web/pages.rs
// Server-rendered HTML for every page

use super::markdown::{escape_html, render_markdown};
use crate::store::{Citation, Conversation, Message, Mode, Role, UsageSummary};

const TAGLINE: &str = "Traditional Catholic wisdom, grounded in the perennial Magisterium";
const DISCLAIMER: &str = "For important matters of faith and morals, consult a priest.";

const LOGO: &str = r#"<svg class="logo" viewBox="0 0 100 100" fill="none" stroke="currentColor" stroke-width="1.5" aria-hidden="true"><path d="M50 5 L95 30 L95 70 L50 95 L5 70 L5 30 Z"/><text x="50" y="62" text-anchor="middle" fill="currentColor" stroke="none" font-size="34" font-family="serif" font-weight="600">Q</text></svg>"#;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="icon" href="/static/favicon.svg" type="image/svg+xml">
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
{body}
<script src="/static/app.js" defer></script>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

fn page_title(title: &str) -> String {
    if title.is_empty() {
        "Quaestio".to_string()
    } else {
        format!("{title} | Quaestio")
    }
}

pub fn login_page(from: &str) -> String {
    let body = format!(
        r#"<main class="login">
  <div class="card">
    {LOGO}
    <h1>Quaestio</h1>
    <p class="tagline">{TAGLINE}</p>
    <form id="login-form" data-from="{from}">
      <input type="password" name="password" placeholder="Enter password" autofocus required>
      <p class="error" id="login-error" hidden></p>
      <button type="submit">Enter</button>
    </form>
  </div>
</main>"#,
        from = escape_html(from),
    );
    layout(&page_title("Login"), &body)
}

fn sidebar(conversations: &[Conversation], active: Option<&str>) -> String {
    let items = if conversations.is_empty() {
        r#"<li class="empty">No conversations yet</li>"#.to_string()
    } else {
        conversations
            .iter()
            .map(|c| {
                let class = if Some(c.id.as_str()) == active { " class=\"active\"" } else { "" };
                format!(
                    r#"<li{class}><a href="/chat/{id}"><span class="mode-dot {mode}"></span>{title}</a><button class="delete" data-delete="{id}" title="Delete conversation">&times;</button></li>"#,
                    id = escape_html(&c.id),
                    mode = c.mode.as_str(),
                    title = escape_html(&c.title),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"<aside class="sidebar">
  <a class="brand" href="/">Quaestio</a>
  <button class="new-chat" data-new-chat="standard">New conversation</button>
  <ul class="conversations">
{items}
  </ul>
  <button class="logout" id="logout">Sign out</button>
</aside>"#
    )
}

fn mode_card(mode: Mode, description: &str) -> String {
    format!(
        r#"<button class="mode-card {mode}" data-new-chat="{mode}"><span class="mode-name">{label}</span><span class="mode-desc">{description}</span></button>"#,
        mode = mode.as_str(),
        label = mode.label(),
    )
}

pub fn home_page(conversations: &[Conversation]) -> String {
    let body = format!(
        r#"<div class="app">
{sidebar}
<main class="home">
  {LOGO}
  <h1>Quaestio</h1>
  <p class="tagline">{TAGLINE}</p>
  <div class="modes">
    {standard}
    {aquinas}
  </div>
  <p class="disclaimer">{DISCLAIMER}</p>
</main>
</div>"#,
        sidebar = sidebar(conversations, None),
        standard = mode_card(Mode::Standard, "Traditional Catholic answers from pre-Vatican II sources"),
        aquinas = mode_card(Mode::Aquinas, "Scholastic disputatio format from the Summa Theologica"),
    );
    layout(&page_title(""), &body)
}

fn citation_cards(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return String::new();
    }
    let cards = citations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let year = c
                .year
                .as_deref()
                .map(|y| format!(" <span class=\"year\">({})</span>", escape_html(y)))
                .unwrap_or_default();
            let inner = format!(
                r#"<span class="index">{n}</span><span class="citation-body"><strong>{title}</strong>{year}<span class="excerpt">{source}</span></span>"#,
                n = i + 1,
                title = escape_html(&c.title),
                source = escape_html(&c.source),
            );
            match &c.url {
                Some(url) => format!(
                    r#"<a class="citation" href="{}" target="_blank" rel="noopener noreferrer">{inner}</a>"#,
                    escape_html(url)
                ),
                None => format!(r#"<div class="citation">{inner}</div>"#),
            }
        })
        .collect::<String>();

    format!(r#"<details class="references"><summary>References</summary>{cards}</details>"#)
}

pub fn message_html(message: &Message) -> String {
    match message.role {
        Role::User => format!(
            r#"<div class="message user" data-message-id="{id}"><div class="bubble">{content}</div></div>"#,
            id = escape_html(&message.id),
            content = escape_html(&message.content).replace('\n', "<br>"),
        ),
        Role::Assistant => format!(
            r#"<div class="message assistant" data-message-id="{id}"><div class="bubble markdown">{content}</div>{citations}<button class="copy" title="Copy">Copy</button></div>"#,
            id = escape_html(&message.id),
            content = render_markdown(&message.content),
            citations = citation_cards(message.citations.as_deref().unwrap_or_default()),
        ),
    }
}

fn mode_options(current: Mode) -> String {
    [Mode::Standard, Mode::Aquinas]
        .iter()
        .map(|m| {
            let selected = if *m == current { " selected" } else { "" };
            format!(r#"<option value="{}"{selected}>{}</option>"#, m.as_str(), m.label())
        })
        .collect()
}

pub fn chat_page(
    conversation: &Conversation,
    messages: &[Message],
    conversations: &[Conversation],
    usage: UsageSummary,
) -> String {
    let rendered: String = messages.iter().map(message_html).collect();
    let share_label = if conversation.is_public { "Stop sharing" } else { "Share" };
    let share_link = conversation
        .share_token
        .as_deref()
        .map(|t| format!("/share/{}", escape_html(t)))
        .unwrap_or_default();
    let disabled = if usage.can_send() { "" } else { " disabled" };
    let has_reply = messages.iter().any(|m| m.role == Role::Assistant);

    let body = format!(
        r#"<div class="app">
{sidebar}
<main class="chat" data-conversation-id="{id}">
  <header class="chat-header">
    <select id="mode-select" aria-label="Mode">{modes}</select>
    <h2 class="chat-title">{title}</h2>
    <div class="chat-actions">
      <span id="usage" class="usage">{remaining}/{limit} messages remaining</span>
      <button id="share-toggle">{share_label}</button>
      <input id="share-link" readonly value="{share_link}"{share_hidden}>
    </div>
  </header>
  <section id="messages" class="messages">
{rendered}
  </section>
  <div class="composer">
    <button id="regenerate"{regen_hidden}>Regenerate</button>
    <form id="chat-form">
      <textarea id="chat-input" rows="2" placeholder="Ask a question of faith or morals..."{disabled}></textarea>
      <button type="submit" id="send"{disabled}>Send</button>
      <button type="button" id="stop" hidden>Stop</button>
    </form>
    <p class="disclaimer">{DISCLAIMER}</p>
  </div>
</main>
</div>"#,
        sidebar = sidebar(conversations, Some(&conversation.id)),
        id = escape_html(&conversation.id),
        modes = mode_options(conversation.mode),
        title = escape_html(&conversation.title),
        remaining = usage.remaining.max(0),
        limit = usage.limit,
        share_hidden = if conversation.is_public { "" } else { " hidden" },
        regen_hidden = if has_reply { "" } else { " hidden" },
    );
    layout(&page_title(&conversation.title), &body)
}

pub fn share_page(conversation: &Conversation, messages: &[Message]) -> String {
    let rendered: String = messages.iter().map(message_html).collect();
    let body = format!(
        r#"<div class="shared">
  <header>
    <a class="brand" href="/">Quaestio</a>
    <h1>{title}</h1>
    <span class="muted">Shared conversation &middot; {mode}</span>
  </header>
  <section class="messages">
{rendered}
  </section>
  <footer>
    <p>This is a shared conversation from Quaestio.</p>
    <a href="/">Start your own conversation</a>
  </footer>
</div>"#,
        title = escape_html(&conversation.title),
        mode = conversation.mode.label(),
    );
    layout(&page_title(&conversation.title), &body)
}

pub fn not_found_page(detail: &str) -> String {
    let body = format!(
        r#"<main class="not-found">
  <h1>Conversation Not Found</h1>
  <p>{detail}</p>
  <a href="/">Start your own conversation</a>
</main>"#,
        detail = escape_html(detail),
    );
    layout(&page_title("Not Found"), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation {
            id: "c1".into(),
            session_id: "s".into(),
            title: "<b>Grace</b>".into(),
            mode: Mode::Aquinas,
            created_at: 1,
            updated_at: 1,
            is_deleted: false,
            is_public: true,
            share_token: Some("abc123def456".into()),
        }
    }

    #[test]
    fn chat_page_escapes_titles_and_shows_usage() {
        let html = chat_page(&conversation(), &[], &[conversation()], UsageSummary::from_count(3));
        assert!(html.contains("&lt;b&gt;Grace&lt;/b&gt;"));
        assert!(!html.contains("<b>Grace</b>"));
        assert!(html.contains("22/25 messages remaining"));
        assert!(html.contains("/share/abc123def456"));
        assert!(html.contains(r#"<option value="aquinas" selected>"#));
    }

    #[test]
    fn exhausted_quota_disables_the_composer() {
        let html = chat_page(&conversation(), &[], &[], UsageSummary::from_count(25));
        assert!(html.contains("0/25 messages remaining"));
        assert!(html.contains("<button type=\"submit\" id=\"send\" disabled>"));
    }

    #[test]
    fn assistant_messages_render_markdown_and_references() {
        let message = Message {
            id: "m1".into(),
            conversation_id: "c1".into(),
            role: Role::Assistant,
            content: "*Sed contra*".into(),
            citations: Some(vec![Citation {
                title: "Summa Theologiae".into(),
                source: "I, q. 2, a. 3".into(),
                url: Some("https://example.org/st".into()),
                year: Some("1274".into()),
            }]),
            created_at: 2,
        };
        let html = message_html(&message);
        assert!(html.contains("<em>Sed contra</em>"));
        assert!(html.contains("References"));
        assert!(html.contains("href=\"https://example.org/st\""));
        assert!(html.contains("(1274)"));
    }

    #[test]
    fn user_messages_are_plain_text() {
        let message = Message {
            id: "m0".into(),
            conversation_id: "c1".into(),
            role: Role::User,
            content: "*not emphasis*\n<i>".into(),
            citations: None,
            created_at: 1,
        };
        let html = message_html(&message);
        assert!(html.contains("*not emphasis*<br>&lt;i&gt;"));
    }
}
