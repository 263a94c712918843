mod config;
mod error;
mod render;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runtime::{McpLauncher, OpenAiBackend, Session, SessionHandle};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "parley.toml";
const LOG_ENV: &str = "PARLEY_LOG";

type ChatHandle = SessionHandle<OpenAiBackend, McpLauncher>;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Chat with a language model that can call tools on an MCP server", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Tool server script to connect on start-up
    #[arg(short, long)]
    server: Option<String>,

    /// Model id (overrides config and MODEL)
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List the tools offered by a server script
    Tools {
        /// Server script (.py or .js by default)
        path: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(model) = cli.model {
        config.backend.model = model;
    }
    if let Some(server) = cli.server {
        config.server.path = Some(server);
    }

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Tools { path }) => cmd_tools(&config, &path).await,
    }
}

fn build_backend(config: &Config) -> OpenAiBackend {
    OpenAiBackend::builder(&config.backend.model)
        .api_base(&config.backend.api_base)
        .max_output_tokens(config.backend.max_output_tokens)
        .build()
}

fn build_session(config: &Config, backend: OpenAiBackend) -> Session<OpenAiBackend, McpLauncher> {
    let mut session = Session::new(backend, McpLauncher).with_launch_table(config.launch_table());
    if let Some(prompt) = &config.system_prompt {
        session = session.with_system_prompt(prompt);
    }
    if let Some(key) = &config.backend.api_key {
        session = session.with_credential(key);
    }
    session
}

async fn cmd_tools(config: &Config, path: &str) -> Result<()> {
    let mut session = build_session(config, build_backend(config));
    let result = session.try_connect(path).await;
    session.shutdown().await;

    let tools = result?;
    if tools.is_empty() {
        println!("No tools offered by {path}");
        return Ok(());
    }
    for tool in tools {
        println!("{:<24}  {}", tool.name, tool.description);
    }
    Ok(())
}

async fn cmd_chat(config: &Config) -> Result<()> {
    println!("parley v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_backend(config);
    println!("Model: {}", backend.model());

    let session = build_session(config, backend);
    println!("Session ID: {}", session.id());

    let handle = SessionHandle::new(session);
    println!("{}", handle.credential_status().await);

    if let Some(path) = &config.server.path {
        println!("{}", handle.connect(path).await);
    }
    println!("Type /help for commands, /quit or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => println!("{HELP}\n"),
            Command::Key(key) => println!("{}\n", handle.set_credential(key).await),
            Command::Status => {
                let connected = if handle.is_connected().await {
                    "connected"
                } else {
                    "not connected"
                };
                println!("{}; tool server {connected}\n", handle.credential_status().await);
            }
            Command::Connect(path) => println!("{}\n", handle.connect(path).await),
            Command::Tools => match handle.list_tools().await {
                Ok(tools) => {
                    for tool in tools {
                        println!("{:<24}  {}", tool.name, tool.description);
                    }
                    println!();
                }
                Err(e) => eprintln!("Error: {e}\n"),
            },
            Command::Clear => {
                handle.clear().await;
                println!("Conversation cleared.\n");
            }
            Command::Unknown(command) => eprintln!("Unknown command: {command}. Try /help.\n"),
            Command::Message(input) => chat_turn(&handle, input).await,
        }
    }

    handle.disconnect().await;
    println!("\nSession ended.");
    Ok(())
}

/// Submit one message and print what the turn added, even if it failed
/// part-way.
async fn chat_turn(handle: &ChatHandle, input: &str) {
    let before = handle.transcript().await.len();
    let outcome = handle.submit(input).await;

    let transcript = match &outcome {
        Ok(submission) => submission.transcript.clone(),
        Err(_) => handle.transcript().await,
    };
    let rendered = render::render_since(&transcript, before);
    if !rendered.is_empty() {
        println!("\n{rendered}\n");
    }
    if let Err(e) = outcome {
        eprintln!("Error: {e}\n");
    }
}

const HELP: &str = "\
/key <key>       set the API key
/status          show API key and connection status
/connect <path>  connect to a tool server script
/tools           list the connected server's tools
/clear           clear the conversation
/quit            exit";

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Quit,
    Help,
    Key(&'a str),
    Status,
    Connect(&'a str),
    Tools,
    Clear,
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let input = line.trim();
        if input.is_empty() {
            return Self::Empty;
        }
        if input == "quit" || input == "exit" {
            return Self::Quit;
        }
        let Some(command) = input.strip_prefix('/') else {
            return Self::Message(input);
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(name, arg)| (name, arg.trim()))
            .unwrap_or((command, ""));
        match name {
            "quit" | "exit" => Self::Quit,
            "help" => Self::Help,
            "key" => Self::Key(arg),
            "status" => Self::Status,
            "connect" if !arg.is_empty() => Self::Connect(arg),
            "tools" => Self::Tools,
            "clear" => Self::Clear,
            _ => Self::Unknown(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  \n"), Command::Empty);
        assert_eq!(Command::parse("quit\n"), Command::Quit);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/key  gsk_abc \n"), Command::Key("gsk_abc"));
        assert_eq!(Command::parse("/key"), Command::Key(""));
        assert_eq!(Command::parse("/status"), Command::Status);
        assert_eq!(
            Command::parse("/connect ../server/business-recorder.py"),
            Command::Connect("../server/business-recorder.py")
        );
        assert_eq!(Command::parse("/tools"), Command::Tools);
        assert_eq!(Command::parse("/clear"), Command::Clear);
    }

    #[test]
    fn connect_requires_a_path() {
        assert_eq!(Command::parse("/connect"), Command::Unknown("/connect"));
    }

    #[test]
    fn other_input_is_a_message() {
        assert_eq!(
            Command::parse("What's the latest news?\n"),
            Command::Message("What's the latest news?")
        );
        assert_eq!(Command::parse("/frobnicate"), Command::Unknown("/frobnicate"));
    }

    #[test]
    fn session_is_built_from_config() {
        let config = Config::parse("[backend]\nmodel = \"m1\"\napi_key = \"gsk_test\"").unwrap();

        let backend = build_backend(&config);
        assert_eq!(backend.model(), "m1");

        let session = build_session(&config, backend);
        assert_eq!(session.credential_status(), "API key is set");
        assert!(!session.is_connected());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from(["parley", "--server", "tool.py", "-m", "m1", "tools", "x.js"])
            .unwrap();
        assert_eq!(cli.server.as_deref(), Some("tool.py"));
        assert_eq!(cli.model.as_deref(), Some("m1"));
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
        assert!(matches!(cli.command, Some(Commands::Tools { path }) if path == "x.js"));
    }
}
