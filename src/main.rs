use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use modelgate_core::config::{self, Config};
use modelgate_core::{ChatRequest, Message, OverallHealth, Router};

#[derive(Parser)]
#[command(
    name = "modelgate",
    about = "modelgate - multi-provider chat-completion router",
    version = modelgate_core::VERSION,
)]
struct Cli {
    /// Config file (default: ~/.modelgate/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every provider and show its health
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a message through the router (interactive when no message is given)
    Chat {
        /// Message to send
        message: Vec<String>,
        /// Model override, used by providers that accept it
        #[arg(short, long)]
        model: Option<String>,
        /// Sampling temperature (0.0-2.0)
        #[arg(short, long, default_value_t = 0.7)]
        temperature: f64,
        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,
        /// System prompt
        #[arg(short, long)]
        system: Option<String>,
        /// Report an error instead of answering with demo text when no provider responds
        #[arg(long)]
        no_fallback: bool,
    },
    /// Write a default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("modelgate=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Status { json } => cmd_status(config_path, json).await?,
        Commands::Chat {
            message,
            model,
            temperature,
            max_tokens,
            system,
            no_fallback,
        } => {
            let opts = ChatOptions {
                model,
                temperature,
                max_tokens,
                system,
            };
            cmd_chat(config_path, message, opts, no_fallback).await?
        }
        Commands::Onboard => cmd_onboard(config_path)?,
    }

    Ok(())
}

// ====== Commands ======

fn load(config_path: Option<&std::path::Path>) -> Config {
    let cfg = config::load_config_from_env_at(config_path);
    tracing::debug!(
        "Loaded config with {} providers ({} with credentials), fallback {}",
        cfg.providers.len(),
        cfg.providers.iter().filter(|p| !p.api_key.is_empty()).count(),
        cfg.router.fallback
    );
    cfg
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn cmd_status(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let cfg = load(config_path);
    let router = Router::from_config(&cfg)?;

    let pb = spinner("Probing providers...")?;
    let status = router.get_status().await;
    pb.finish_and_clear();
    router.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let overall = match status.overall {
        OverallHealth::Healthy => "healthy",
        OverallHealth::Unhealthy => "unhealthy",
    };
    println!("modelgate status: {}", overall);
    println!(
        "Preferred provider: {}",
        status.active_preferred.as_deref().unwrap_or("none")
    );
    println!("Fallback: {}\n", if cfg.router.fallback { "on" } else { "off" });

    if status.per_provider.is_empty() {
        println!("No providers configured. Run `modelgate onboard` and add an API key.");
        return Ok(());
    }

    println!("{:<14} {:>4}  {:<7} {:>8}  DETAIL", "PROVIDER", "PRI", "HEALTH", "LATENCY");
    for report in &status.per_provider {
        let latency = report
            .latency_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string());
        let detail = match (&report.error, report.models.is_empty()) {
            (Some(e), _) => e.clone(),
            (None, false) => report.models.join(", "),
            (None, true) => String::new(),
        };
        println!(
            "{:<14} {:>4}  {:<7} {:>8}  {}",
            report.name,
            report.priority,
            if report.healthy { "ok" } else { "down" },
            latency,
            detail
        );
    }
    Ok(())
}

struct ChatOptions {
    model: Option<String>,
    temperature: f64,
    max_tokens: Option<u32>,
    system: Option<String>,
}

impl ChatOptions {
    fn request(&self, messages: Vec<Message>) -> ChatRequest {
        let mut req = ChatRequest::new(messages).with_temperature(self.temperature);
        if let Some(ref model) = self.model {
            req = req.with_model(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            req = req.with_max_tokens(max_tokens);
        }
        req
    }
}

async fn cmd_chat(
    config_path: Option<&std::path::Path>,
    message: Vec<String>,
    opts: ChatOptions,
    no_fallback: bool,
) -> Result<()> {
    let mut cfg = load(config_path);
    if no_fallback {
        cfg.router.fallback = false;
    }
    let router = Router::from_config(&cfg)?;

    let mut history: Vec<Message> = opts.system.iter().map(Message::system).collect();

    if !message.is_empty() {
        history.push(Message::user(message.join(" ")));
        let result = ask(&router, &opts, &history).await;
        router.close();
        println!("{}", result?);
        return Ok(());
    }

    println!("modelgate chat (Ctrl+D to exit)\n");
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        history.push(Message::user(input));
        match ask(&router, &opts, &history).await {
            Ok(reply) => {
                println!("\n{}\n", reply);
                history.push(Message::assistant(reply));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                history.pop();
            }
        }
    }

    router.close();
    Ok(())
}

async fn ask(router: &Router, opts: &ChatOptions, history: &[Message]) -> Result<String> {
    let pb = spinner("Thinking...")?;
    let result = router.complete_chat(&opts.request(history.to_vec())).await;
    pb.finish_and_clear();
    Ok(result?)
}

fn cmd_onboard(config_path: Option<&std::path::Path>) -> Result<()> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(config::get_config_path);

    if path.exists() {
        println!("Config already exists at {}", path.display());
        println!("Delete it first to re-onboard.");
        return Ok(());
    }

    config::save_config(&Config::default(), Some(&path))?;
    println!("Created config at {}", path.display());
    println!("\nNext steps:");
    println!("  1. Add an API key to a provider in {}", path.display());
    println!("     or export LOCAL_LLM_API_KEY / OPENROUTER_API_KEY / OPENAI_API_KEY");
    println!("  2. Check providers: modelgate status");
    println!("  3. Chat: modelgate chat \"analyze BTC\"");
    Ok(())
}
