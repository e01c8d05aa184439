//! Command-line A2A client: ask an agent, chat with it, smoke-test it, or
//! (un)register agents with a registry.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use mimalloc::MiMalloc;

use agent_lab::a2a::{A2aClient, A2aError, PollPolicy};
use agent_lab::registration::RegistryClient;
use agent_lab::telemetry;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const SMOKE_QUESTIONS: [&str; 4] = [
    "What time is it?",
    "Calculate 2 + 2",
    "What's sqrt(144)?",
    "Calculate 3.14159 * 2",
];

#[derive(Parser, Debug)]
#[command(name = "a2a-client", author, version, about = "Talk to A2A agents", long_about = None)]
struct Cli {
    /// Base URL of the agent
    #[arg(long, global = true, env = "A2A_AGENT", default_value = "http://localhost:9999")]
    agent: String,

    /// HTTP timeout in seconds
    #[arg(long, global = true, default_value_t = 60)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Interactive session; `quit`, `exit` or `q` to leave
    Chat,
    /// Run the canned lab questions
    Smoke,
    /// Register an agent with a registry
    Register {
        registry: String,
        agent_url: String,
        name: Option<String>,
    },
    /// Remove an agent from a registry
    Unregister { registry: String, agent_url: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv();
    telemetry::init_stderr();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Command::Ask { question } => {
            let client = A2aClient::new(&cli.agent, timeout)?;
            println!("{}", ask(&client, &question.join(" ")).await?);
        }
        Command::Chat => chat(&A2aClient::new(&cli.agent, timeout)?).await?,
        Command::Smoke => smoke(&A2aClient::new(&cli.agent, timeout)?).await,
        Command::Register {
            registry,
            agent_url,
            name,
        } => {
            let reg = RegistryClient::new(&registry)?
                .register(&agent_url, name.as_deref())
                .await
                .context("registration failed")?;
            println!("Registered as '{}' at {}", reg.name, reg.url);
        }
        Command::Unregister {
            registry,
            agent_url,
        } => {
            if !RegistryClient::new(&registry)?.unregister(&agent_url).await? {
                bail!("{agent_url} is not registered at {registry}");
            }
            println!("Unregistered {agent_url}");
        }
    }
    Ok(())
}

async fn ask(client: &A2aClient, question: &str) -> Result<String, A2aError> {
    let outcome = client.ask(question, &PollPolicy::default()).await?;
    Ok(outcome.response_text())
}

async fn chat(client: &A2aClient) -> anyhow::Result<()> {
    println!("A2A Client - talking to {}", client.base_url());
    println!("{}", "=".repeat(40));
    println!("Type your questions. Type 'quit' to exit.\n");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!("\nBye!");
            break;
        };
        let question = line?;
        let question = question.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Bye!");
            break;
        }

        match ask(client, question).await {
            Ok(answer) => println!("Agent: {answer}\n"),
            Err(A2aError::Http(e)) if e.is_connect() => {
                println!(
                    "Error: cannot connect to {}. Is the agent running?\n",
                    client.base_url()
                );
            }
            Err(e) => println!("Error: {e}\n"),
        }
    }
    Ok(())
}

async fn smoke(client: &A2aClient) {
    println!("Testing A2A communication with {}...", client.base_url());
    println!("{}", "=".repeat(50));

    for question in SMOKE_QUESTIONS {
        println!("\nQ: {question}");
        match ask(client, question).await {
            Ok(answer) => println!("A: {answer}"),
            Err(e) => println!("Error: {e}"),
        }
    }

    println!("\n{}", "=".repeat(50));
    println!("Test complete!");
}
