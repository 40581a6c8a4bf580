mod repl;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatter_core::{
    ReplyPicker, ResponseEngine, RuleBook, SeededPicker, SystemClock, ThreadRngPicker,
};
use chatter_observability::init_tracing;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "chatbot")]
#[command(about = "Rule-based terminal chatbot")]
struct Cli {
    /// JSON rule book to use instead of the built-in one.
    #[arg(long, env = "CHATTER_RULES_PATH", global = true)]
    rules: Option<PathBuf>,

    /// Seed for reproducible reply selection.
    #[arg(long, env = "CHATTER_SEED", global = true)]
    seed: Option<u64>,

    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation (default).
    Chat,
    /// Classify one utterance and print the result as JSON.
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List the active rules in dispatch order.
    Rules,
    /// Print the active rule book as JSON.
    ExportRules,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    init_tracing("chatbot", level);

    let engine = build_engine(cli.rules.as_ref(), cli.seed)?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let stdin = io::stdin();
            let mut stdout = io::stdout().lock();
            let transcript = repl::run_chat(&engine, stdin.lock(), &mut stdout)
                .context("terminal conversation failed")?;
            info!(turns = transcript.len(), "conversation finished");
        }
        Command::Ask { text } => {
            let result = engine.classify(&text.join(" "));
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Rules => {
            for (position, rule) in engine.rule_book().rules().iter().enumerate() {
                println!(
                    "{:>2}. {} (exits: {}) keywords: [{}] responses: {}",
                    position + 1,
                    rule.name(),
                    rule.exits(),
                    rule.keywords().join(", "),
                    rule.responses().len()
                );
            }
            println!(
                "fallback replies: {}; exit keywords: [{}]",
                engine.rule_book().fallback().len(),
                engine.rule_book().exit_keywords().join(", ")
            );
        }
        Command::ExportRules => {
            println!("{}", engine.rule_book().to_json_pretty()?);
        }
    }

    Ok(())
}

fn build_engine(rules: Option<&PathBuf>, seed: Option<u64>) -> Result<ResponseEngine> {
    let book = match rules {
        Some(path) => RuleBook::load(path)
            .with_context(|| format!("failed loading rule book from {}", path.display()))?,
        None => RuleBook::builtin(),
    };
    let picker: Arc<dyn ReplyPicker> = match seed {
        Some(seed) => Arc::new(SeededPicker::new(seed)),
        None => Arc::new(ThreadRngPicker),
    };

    info!(rules = book.rules().len(), seeded = seed.is_some(), "engine ready");
    Ok(ResponseEngine::with_seams(book, Arc::new(SystemClock), picker))
}
