use financial_chat_assistant::{agent::Orchestrator, config::AppConfig, ChatAnswer};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CLI_CONVERSATION_ID: &str = "cli";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr so answers stay clean on stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    if !config.llm.api_key_configured() {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Get your free key at: https://aistudio.google.com/app/apikey");
        std::process::exit(1);
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    info!(model = %orchestrator.model_name(), "Financial chat assistant starting");

    // One-shot mode: the arguments form the question
    let question = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !question.trim().is_empty() {
        let answer = orchestrator.chat(CLI_CONVERSATION_ID, &question).await?;
        print_answer(&answer);
        return Ok(());
    }

    println!("=== Financial Chat Assistant ===");
    println!("Ask about taxes, mutual funds, insurance, schemes, stocks, gold or crypto.");
    println!("Commands: /clear to reset the conversation, /quit to exit.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                orchestrator.clear(CLI_CONVERSATION_ID).await?;
                println!("Conversation cleared\n");
            }
            message => match orchestrator.chat(CLI_CONVERSATION_ID, message).await {
                Ok(answer) => print_answer(&answer),
                Err(e) => eprintln!("Error: {}\n", e),
            },
        }
    }

    Ok(())
}

fn print_answer(answer: &ChatAnswer) {
    println!("\n{}\n", answer.response);
    if !answer.tools_used.is_empty() {
        println!("[tools: {}]\n", answer.tools_used.join(", "));
    }
}
