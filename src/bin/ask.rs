use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use math_game_backend::llm::{LlmClient, LlmError, ReasoningEffort};

/// Send a prompt to an OpenAI reasoning model and print its reasoning and reply as JSON.
#[derive(Parser, Debug)]
#[command(name = "ask")]
struct Cli {
    /// Model name (e.g. o3-mini-2025-01-31, o1)
    #[arg(short, long)]
    model: String,

    /// Optional reasoning effort level for reasoning models
    #[arg(short, long, value_enum)]
    reasoning_effort: Option<ReasoningEffort>,

    /// Prompt to send; read from stdin when omitted
    #[arg(short, long)]
    prompt: Option<String>,
}

/// Ask for a prompt on `output` and read one line from `input`, without its
/// line ending.
fn read_prompt(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<String> {
    write!(output, "Enter your prompt: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn run(cli: Cli, client: Result<LlmClient, LlmError>) -> Result<String, String> {
    let prompt = match cli.prompt {
        Some(p) => p,
        None => read_prompt(&mut io::stdin().lock(), &mut io::stdout())
            .map_err(|e| e.to_string())?,
    };

    let output = client
        .map_err(|e| e.to_string())?
        .query(&cli.model, &prompt, cli.reasoning_effort)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&output).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    match run(cli, LlmClient::from_env()).await {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(msg) => {
            eprintln!("Error: {msg}");
            ExitCode::FAILURE
        }
    }
}
