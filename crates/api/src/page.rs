use chatter_core::{Speaker, Transcript};
use chrono::Local;

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center; }
.chat { background: #fff; width: 100%; max-width: 640px; height: 80vh; border-radius: 16px; box-shadow: 0 20px 40px rgba(0,0,0,0.15); display: flex; flex-direction: column; overflow: hidden; }
.chat header { display: flex; justify-content: space-between; align-items: center; padding: 16px 20px; background: #4f46e5; color: #fff; }
.chat header h1 { font-size: 1.1rem; margin: 0; }
.messages { flex: 1; overflow-y: auto; padding: 20px; display: flex; flex-direction: column; gap: 12px; }
.message { display: flex; flex-direction: column; max-width: 75%; }
.message.user { align-self: flex-end; align-items: flex-end; }
.message.bot { align-self: flex-start; }
.bubble { padding: 10px 14px; border-radius: 14px; white-space: pre-wrap; word-wrap: break-word; }
.message.user .bubble { background: #4f46e5; color: #fff; }
.message.bot .bubble { background: #f1f5f9; color: #0f172a; }
.time { font-size: 0.7rem; color: #94a3b8; margin-top: 4px; }
form.send { display: flex; gap: 8px; padding: 16px; border-top: 1px solid #e2e8f0; }
form.send input { flex: 1; padding: 10px 14px; border: 1px solid #cbd5e1; border-radius: 999px; font-size: 1rem; }
button { border: none; border-radius: 999px; padding: 10px 18px; cursor: pointer; font-size: 0.95rem; }
button.primary { background: #4f46e5; color: #fff; }
button.clear { background: rgba(255,255,255,0.2); color: #fff; }
.suggestions { padding: 0 16px 14px; font-size: 0.8rem; color: #64748b; }
"#;

const SUGGESTIONS: &str =
    "Try: &quot;Hello&quot;, &quot;What time is it?&quot;, &quot;5 + 3&quot;, &quot;What can you do?&quot;";

/// Escapes text for embedding in element content or quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_chat_page(transcript: &Transcript) -> String {
    let mut messages = String::new();
    for turn in transcript.turns() {
        let class = match turn.speaker {
            Speaker::User => "user",
            Speaker::Bot => "bot",
        };
        messages.push_str(&format!(
            r#"<div class="message {class}"><div class="bubble">{text}</div><span class="time">{time}</span></div>"#,
            text = escape_html(&turn.text),
            time = turn.at.with_timezone(&Local).format("%H:%M"),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Simple ChatBot</title>
<style>{STYLE}</style>
</head>
<body>
<main class="chat">
<header>
<h1>Simple ChatBot</h1>
<form method="post" action="/chat"><button type="submit" name="clear" value="1" class="clear">Clear Chat</button></form>
</header>
<section class="messages">{messages}</section>
<form class="send" method="post" action="/chat">
<input type="text" name="message" placeholder="Type your message..." autocomplete="off" autofocus required>
<button type="submit" class="primary">Send</button>
</form>
<p class="suggestions">{SUGGESTIONS}</p>
</main>
</body>
</html>
"#
    )
}
