//! Example support desk CLI.
//!
//! Routes each question to the orders, billing or front-desk agent and prints
//! the answer. Every question is asked twice; the second answer comes from
//! the result cache.
//!
//! # Usage
//!
//! ```bash
//! support-desk [question]...
//! ```
//!
//! # Example
//!
//! ```bash
//! LODESTAR_LOG=lodestar_agent=debug support-desk "Where is order 1077?" "Can I get a refund?"
//! ```

#![expect(clippy::print_stdout, clippy::print_stderr, reason = "command-line output")]

use example::{platform, support_desk};
use lodestar_agent::Agent;
use lodestar_core::TracingConfig;
use lodestar_models::{Message, MessageBag, Options};

const DEFAULT_QUESTIONS: [&str; 3] = [
    "Where is order 1042?",
    "I was charged twice on my last invoice.",
    "What are your opening hours?",
];

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    TracingConfig::from_env().init();

    let mut questions: Vec<String> = std::env::args().skip(1).collect();
    if questions.is_empty() {
        questions = DEFAULT_QUESTIONS.iter().map(ToString::to_string).collect();
    }

    let desk = match support_desk(platform()) {
        Ok(desk) => desk,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let options = Options::new().with(Options::PROMPT_CACHE_KEY, "support-desk");

    for question in questions {
        let messages = MessageBag::new().with(Message::user(question.as_str()));
        for round in ["asked", "asked again"] {
            match desk.call(messages.clone(), options.clone()).await {
                Ok(result) => match result.as_text() {
                    Ok(text) => println!("> {question} ({round})\n  {text}"),
                    Err(err) => eprintln!("> {question} ({round})\n  unexpected result: {err}"),
                },
                Err(err) => eprintln!("> {question} ({round})\n  Error: {err}"),
            }
        }
    }
}
