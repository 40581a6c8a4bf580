use std::io::{self, BufRead, Write};

use chatter_core::{ResponseEngine, Transcript};
use tracing::debug;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";
const BLANK_INPUT_REPLY: &str = "Please say something! I'm here to chat.";
const EOF_FAREWELL: &str = "Goodbye! Thanks for chatting with me.";

pub fn print_welcome<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "🤖 Welcome to Simple ChatBot!")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "I'm a rule-based chatbot that can:")?;
    writeln!(out, "• Have conversations and answer questions")?;
    writeln!(
        out,
        "• Perform basic math calculations (e.g., '5 + 3', '10 * 2')"
    )?;
    writeln!(out, "• Tell you the current time and date")?;
    writeln!(out, "• Respond to greetings and common phrases")?;
    writeln!(
        out,
        "\nTry saying: 'Hello', 'What time is it?', '15 + 25', or 'What can you do?'"
    )?;
    writeln!(out, "Type 'bye', 'quit', or 'exit' to end the conversation.")?;
    writeln!(out, "{THIN_RULE}")
}

/// Prints turn counts once the conversation has gone past a single exchange.
pub fn print_summary<W: Write>(out: &mut W, transcript: &Transcript) -> io::Result<()> {
    if transcript.len() <= 2 {
        return Ok(());
    }

    let summary = transcript.summary();
    writeln!(out, "\n📊 Conversation Summary:")?;
    writeln!(out, "   • You sent {} messages", summary.user_turns)?;
    writeln!(out, "   • I sent {} responses", summary.bot_turns)?;
    writeln!(
        out,
        "   • Total conversation length: {} messages",
        summary.total_turns
    )
}

/// Runs the terminal conversation until an exit intent or end of input and
/// hands back the transcript.
pub fn run_chat<R, W>(engine: &ResponseEngine, mut input: R, out: &mut W) -> io::Result<Transcript>
where
    R: BufRead,
    W: Write,
{
    let mut transcript = Transcript::new();
    print_welcome(out)?;

    loop {
        write!(out, "\n💬 You: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out, "\n\n🤖 Bot: {EOF_FAREWELL}")?;
            print_summary(out, &transcript)?;
            break;
        }

        let message = line.trim();
        if message.is_empty() {
            writeln!(out, "🤖 Bot: {BLANK_INPUT_REPLY}")?;
            continue;
        }

        transcript.push_user(message);
        let result = engine.classify(message);
        transcript.push_bot(result.reply_text.as_str());
        debug!(
            source = %result.source.label(),
            should_exit = result.should_exit,
            "reply chosen"
        );

        writeln!(out, "🤖 Bot: {}", result.reply_text)?;

        if result.should_exit {
            print_summary(out, &transcript)?;
            break;
        }
    }

    Ok(transcript)
}
