//! scrum - terminal driver for the Scrum ceremony facilitator

mod commands;
mod config;
mod transcript;
mod utils;

use clap::Parser;
use scrum_ai::{HttpSpeechRecognizer, Model, Provider, SpeechRecognizer, Transcription};
use scrum_facilitator::{
    BusyPolicy, CeremonyDescriptor, CeremonyType, Facilitator, FacilitatorEvent, ProviderTransport,
    SessionRunner, SubmitOutcome,
};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// scrum - AI-facilitated Scrum ceremonies in the terminal
#[derive(Parser, Debug)]
#[command(name = "scrum")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ceremony to run (standup, planning, retro, review, general)
    #[arg(long, default_value = "standup")]
    ceremony: String,

    /// Model to use (default: $MODEL_NAME or mistral)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider (ollama, openai)
    #[arg(short, long)]
    provider: Option<String>,

    /// Backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Say one thing, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Reply immediately instead of pausing as if typing
    #[arg(long)]
    no_typing_delay: bool,

    /// Write a JSONL transcript of this session
    #[arg(long)]
    transcript: bool,

    /// List saved transcripts
    #[arg(long)]
    transcripts: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("scrum=debug,scrum_facilitator=debug,scrum_ai=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_model(provider: &str, model_id: String, base_url: String) -> Model {
    match Provider::parse(provider) {
        Provider::Ollama => Model::ollama(model_id, base_url),
        Provider::OpenAI => Model::openai_compatible(model_id, base_url),
        Provider::Custom => {
            let mut model = Model::openai_compatible(model_id, base_url);
            model.provider = Provider::Custom;
            model
        }
    }
}

fn build_descriptor(
    ceremony: CeremonyType,
    cfg: &config::Config,
    no_typing_delay: bool,
) -> anyhow::Result<CeremonyDescriptor> {
    let mut descriptor = if ceremony == CeremonyType::Planning && cfg.simple_planning() {
        CeremonyDescriptor::planning_simple()
    } else {
        CeremonyDescriptor::for_ceremony(ceremony)
    };

    if no_typing_delay || cfg.typing_delay == Some(false) {
        descriptor = descriptor.with_typing_delay(None);
    }
    if let Some(policy) = cfg.failure_policy {
        descriptor = descriptor.with_failure_policy(policy);
    }
    if let Some(prompt) = cfg.system_prompt()? {
        descriptor = descriptor.with_system_prompt(Some(prompt));
    }
    Ok(descriptor)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    if args.transcripts {
        return list_transcripts();
    }

    let Some(ceremony) = CeremonyType::parse(&args.ceremony) else {
        eprintln!("Unknown ceremony: {}", args.ceremony);
        eprintln!("Available: standup, planning, retro, review, general");
        std::process::exit(1);
    };

    let cfg = config::Config::load();

    // Merge config with CLI args (CLI takes precedence)
    let provider = args
        .provider
        .or(cfg.provider.clone())
        .unwrap_or_else(|| "ollama".to_string());
    let model_id = args.model.unwrap_or_else(|| cfg.model_name(&provider));
    let base_url = args.base_url.unwrap_or_else(|| cfg.base_url(&provider));
    let model = build_model(&provider, model_id, base_url);

    let api_key = cfg.get_api_key(&provider);
    if model.provider == Provider::OpenAI && api_key.is_none() {
        eprintln!("Error: No API key found for {}", provider);
        eprintln!("Set your API key with: export OPENAI_API_KEY=your-key");
        eprintln!("Or add it to config file: scrum --init-config");
        std::process::exit(1);
    }

    let transport = Arc::new(
        ProviderTransport::new(model.clone())
            .with_api_key(api_key)
            .streaming(cfg.stream.unwrap_or(false)),
    );
    let descriptor = build_descriptor(ceremony, &cfg, args.no_typing_delay)?;
    let facilitator = Facilitator::new(descriptor, transport);
    let runner = SessionRunner::spawn(facilitator, BusyPolicy::Queue);

    let mut log = if args.transcript || cfg.transcript.unwrap_or(false) {
        match transcript::TranscriptLog::create(ceremony.id(), &model.id) {
            Ok(log) => {
                tracing::info!("Writing transcript to {}", log.path().display());
                Some(log)
            }
            Err(e) => {
                eprintln!("Warning: transcript disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let recognizer = cfg
        .speech_url
        .as_deref()
        .map(HttpSpeechRecognizer::new);

    let printer = spawn_printer(&runner);

    let result = if let Some(command) = args.command {
        run_command(&runner, &command, log.as_mut()).await
    } else {
        run_interactive(&runner, ceremony, &model, recognizer.as_ref(), log.as_mut()).await
    };

    runner.shutdown().await;
    let _ = printer.await;
    result
}

/// Print facilitator events as they arrive
fn spawn_printer(runner: &SessionRunner) -> tokio::task::JoinHandle<()> {
    let mut receiver = runner.subscribe();
    tokio::spawn(async move {
        // whether "Alex: " is on screen and whether reply text followed it
        let mut started = false;
        let mut streamed = false;
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Display lagged, skipped {} events", n);
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            if event.is_terminal() {
                break;
            }
            match event {
                FacilitatorEvent::ReplyStart => {
                    print!("Alex: ");
                    io::stdout().flush().ok();
                    started = true;
                }
                FacilitatorEvent::ReplyDelta { delta } => {
                    print!("{}", delta);
                    io::stdout().flush().ok();
                    streamed = true;
                }
                FacilitatorEvent::Reply { text, .. } => {
                    if streamed {
                        println!();
                    } else {
                        println!("{}", text);
                    }
                    (started, streamed) = (false, false);
                }
                FacilitatorEvent::BackendFailed { apology, .. } => {
                    if streamed {
                        println!();
                    }
                    if !started || streamed {
                        print!("Alex: ");
                    }
                    println!("{}", apology);
                    (started, streamed) = (false, false);
                }
                FacilitatorEvent::ScriptedTurn { text } => println!("Alex: {}", text),
                FacilitatorEvent::StageChanged { to, .. } => println!("[stage: {}]", to),
                FacilitatorEvent::SpeakerChanged { speaker } => match speaker {
                    Some(name) => println!("[speaker: {}]", name),
                    None => println!("[speaker cleared]"),
                },
                FacilitatorEvent::System { message } => println!("[{}]", message),
                FacilitatorEvent::UserTurn { .. } | FacilitatorEvent::Closed => {}
            }
        }
    })
}

async fn sync_log(runner: &SessionRunner, log: Option<&mut transcript::TranscriptLog>) {
    let Some(log) = log else {
        return;
    };
    match runner.snapshot().await {
        Ok((session, transcript)) => {
            if let Err(e) = log.sync(&session, &transcript) {
                tracing::warn!("Failed to write transcript: {}", e);
            }
        }
        Err(e) => tracing::debug!("No snapshot for transcript: {}", e),
    }
}

/// Give the printer a moment to drain events before the next prompt
async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}

fn report(outcome: scrum_facilitator::Result<SubmitOutcome>) {
    match outcome {
        Ok(SubmitOutcome::Busy) => println!("[still waiting on the last reply]"),
        Ok(_) => {}
        Err(e) if e.is_session_closed() => println!("[session closed]"),
        Err(e) => eprintln!("Error: {}", e),
    }
}

async fn run_command(
    runner: &SessionRunner,
    command: &str,
    mut log: Option<&mut transcript::TranscriptLog>,
) -> anyhow::Result<()> {
    println!("> {}", command);
    report(runner.submit(command).await);
    settle().await;
    sync_log(runner, log.as_deref_mut()).await;
    Ok(())
}

async fn run_interactive(
    runner: &SessionRunner,
    ceremony: CeremonyType,
    model: &Model,
    recognizer: Option<&HttpSpeechRecognizer>,
    mut log: Option<&mut transcript::TranscriptLog>,
) -> anyhow::Result<()> {
    if io::IsTerminal::is_terminal(&io::stderr()) {
        match log.as_deref() {
            Some(l) => eprintln!("scrum {} ({}) transcript: {}", ceremony.id(), model.id, &l.id()[..8]),
            None => eprintln!("scrum {} ({})", ceremony.id(), model.id),
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    // the opening turn
    let (_, transcript) = runner.snapshot().await?;
    if let Some(opening) = transcript.first() {
        println!("Alex: {}", opening.text);
    }
    sync_log(runner, log.as_deref_mut()).await;

    loop {
        println!();
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            let (session, transcript) = runner.snapshot().await?;
            if let Some(result) = commands::execute_command(input, &session, &transcript) {
                match result {
                    commands::CommandResult::Exit => break,
                    commands::CommandResult::Message(msg) => println!("{}", msg),
                    commands::CommandResult::Unknown(cmd) => {
                        println!("Unknown command: /{}", cmd);
                        println!("Type /help for available commands.");
                    }
                    commands::CommandResult::Listen => {
                        let Some(recognizer) = recognizer else {
                            println!("Speech recognition is not configured (set speech_url).");
                            continue;
                        };
                        println!("[listening...]");
                        let transcription = recognizer
                            .listen()
                            .await
                            .unwrap_or_else(|e| Transcription::failed(e.to_string()));
                        if let Some(text) = transcription.utterance() {
                            println!("> {}", text);
                        }
                        report(runner.submit_transcription(transcription).await);
                        settle().await;
                        sync_log(runner, log.as_deref_mut()).await;
                    }
                }
                continue;
            }
        }

        report(runner.submit(input).await);
        settle().await;
        sync_log(runner, log.as_deref_mut()).await;
    }

    Ok(())
}

fn list_transcripts() -> anyhow::Result<()> {
    match transcript::TranscriptLog::list() {
        Ok(transcripts) => {
            if transcripts.is_empty() {
                println!("No saved transcripts found.");
                println!(
                    "Transcripts are stored in: {}",
                    transcript::TranscriptLog::transcripts_dir().display()
                );
            } else {
                println!("Saved transcripts:\n");
                println!("{:<38} {:<20} {:<15} {:<8} Model", "ID", "Created", "Ceremony", "Lines");
                println!("{}", "-".repeat(100));
                for t in transcripts {
                    println!(
                        "{:<38} {:<20} {:<15} {:<8} {}",
                        t.id,
                        t.created_at_display(),
                        t.ceremony,
                        t.visible_count,
                        t.model
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing transcripts: {}", e);
        }
    }
    Ok(())
}
