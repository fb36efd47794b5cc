use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use seqflow::config::SequenceConfig;
use seqflow::error::{Error, SequenceError, TransportError};
use seqflow::i18n::KeyTranslator;
use seqflow::sequence::{SequenceAnswer, SequenceCatalog, SequenceOrchestrator, SequenceSession, SessionStore, definitions};
use seqflow::transport::{Keyboard, SequenceResultHandler, SequenceTransport};

/// Stdout transport for running a sequence in a terminal.
struct ConsoleTransport;

#[async_trait]
impl SequenceTransport for ConsoleTransport {
    fn name(&self) -> &str {
        "cli"
    }

    async fn send_question(
        &self,
        _user_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        println!("\n{text}");
        if let Some(keyboard) = keyboard {
            for row in &keyboard.rows {
                for button in row {
                    // token tail is the value the user should type back
                    let value = button.token.splitn(3, ':').nth(2).unwrap_or(&button.token);
                    println!("  [{value}] {}", button.label);
                }
            }
        }
        Ok(())
    }

    async fn edit_question(
        &self,
        user_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        // a terminal has no message to edit, send a fresh one
        self.send_question(user_id, text, keyboard).await
    }

    async fn send_completion(&self, _user_id: i64, text: &str) -> Result<(), TransportError> {
        println!("\n{text}");
        Ok(())
    }
}

/// Prints the collected answers once the sequence finishes.
struct ConsoleResultHandler;

#[async_trait]
impl SequenceResultHandler for ConsoleResultHandler {
    async fn on_sequence_completed(
        &self,
        session: &SequenceSession,
        answers: &[SequenceAnswer],
    ) -> anyhow::Result<()> {
        println!("\n--- {} answers ---", session.sequence_name);
        for answer in answers {
            println!("  {}: {}", answer.question_key, answer.value);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let sequence_name =
        std::env::var("SEQFLOW_SEQUENCE").unwrap_or_else(|_| "user_info".to_string());

    let catalog = Arc::new(SequenceCatalog::new());
    catalog.register(definitions::user_info_sequence())?;

    let orchestrator = SequenceOrchestrator::new(
        catalog,
        Arc::new(SessionStore::new()),
        Arc::new(ConsoleTransport),
        Arc::new(KeyTranslator),
        Some(Arc::new(ConsoleResultHandler)),
        SequenceConfig::default(),
    );

    eprintln!("seqflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Running sequence '{sequence_name}'. Type an answer and press Enter. /quit to exit.");

    const USER_ID: i64 = 1;
    orchestrator.start(USER_ID, &sequence_name).await?;
    orchestrator.send_first_question(USER_ID).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            orchestrator.abandon(USER_ID).await?;
            break;
        }

        match orchestrator.handle_answer(USER_ID, None, input, false).await {
            Ok(outcome) if outcome.completed => break,
            Ok(_) => {}
            Err(Error::Sequence(SequenceError::Validation { reason, .. })) => {
                eprintln!("That answer was not accepted: {reason}");
                orchestrator.send_current_question(USER_ID, false).await?;
            }
            Err(error) => return Err(error.into()),
        }
    }

    Ok(())
}
