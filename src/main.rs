//! Command-line chat over the RAG chatbot library.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::error;

use rag_chatbot::chatbot::{index_path, AnswerMethod, ChatResponse, RagChatbot};
use rag_chatbot::config::storage::IndexStore;
use rag_chatbot::config::Settings;
use rag_chatbot::error::Result;
use rag_chatbot::knowledge::UseCase;
use rag_chatbot::speech::{synthesize_all, SpeechClient, DEFAULT_SPEECH_WORKERS};

#[derive(Parser, Debug)]
#[command(name = "rag-chatbot", version, about = "Retrieval-augmented chatbot for IT, customer support and HR questions")]
struct Cli {
    /// it_helpdesk, customer_support or hr_assistant
    #[arg(long, default_value = "it_helpdesk", value_parser = parse_use_case)]
    use_case: UseCase,

    /// Run the demo questions and exit
    #[arg(long)]
    demo: bool,

    /// Disable function calling
    #[arg(long)]
    no_functions: bool,

    /// Disable knowledge-base retrieval
    #[arg(long)]
    no_rag: bool,

    /// Delete and rebuild the vector index before starting
    #[arg(long)]
    rebuild_index: bool,

    /// Resume a saved conversation transcript
    #[arg(long, value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Directory for MP3 files written by the `speak` command
    #[arg(long, value_name = "DIR")]
    speak_dir: Option<PathBuf>,

    /// Concurrent text-to-speech jobs
    #[arg(long, default_value_t = DEFAULT_SPEECH_WORKERS)]
    tts_workers: usize,
}

fn parse_use_case(raw: &str) -> std::result::Result<UseCase, String> {
    raw.parse().map_err(|e: rag_chatbot::error::ChatbotError| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;

    if cli.rebuild_index {
        let path = index_path(&settings.index_dir, cli.use_case);
        IndexStore::new(&path)?.delete()?;
        println!("Removed index at {}", path.display());
    }

    println!("Initializing {} chatbot...", cli.use_case.display_name());
    let mut chatbot = RagChatbot::from_settings(&settings, cli.use_case, !cli.no_functions).await?;

    if let Some(path) = &cli.resume {
        chatbot.restore_history(path)?;
        println!("Resumed conversation from {}", path.display());
    }

    let mut session = Session {
        chatbot,
        settings,
        use_rag: !cli.no_rag,
        use_functions: !cli.no_functions,
        speak_dir: cli.speak_dir,
        tts_workers: cli.tts_workers,
    };

    if cli.demo {
        session.run_demo().await;
        return Ok(());
    }
    session.interactive().await
}

struct Session {
    chatbot: RagChatbot,
    settings: Settings,
    use_rag: bool,
    use_functions: bool,
    speak_dir: Option<PathBuf>,
    tts_workers: usize,
}

impl Session {
    async fn interactive(&mut self) -> Result<()> {
        println!("\n🤖 {} Assistant", self.chatbot.use_case().display_name());
        println!("{}", "=".repeat(50));
        println!("Type 'help' for commands or 'quit' to exit.\n");

        let stdin = io::stdin();
        loop {
            print!("You: ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input.to_lowercase().as_str() {
                "quit" | "exit" | "bye" => {
                    println!("Goodbye!");
                    break;
                }
                "help" => print_help(),
                "demo" => self.run_demo().await,
                "clear" => {
                    self.chatbot.clear_conversation();
                    println!("Conversation history cleared.");
                }
                "stats" => self.print_stats(),
                "history" => self.print_history(),
                "save" => match self.save() {
                    Ok(path) => println!("Conversation saved to {}", path.display()),
                    Err(e) => println!("Could not save conversation: {}", e),
                },
                "speak" => self.speak().await,
                _ => {
                    let response = self.chatbot.chat(input, self.use_rag, self.use_functions).await;
                    print_response(&response);
                }
            }
        }
        Ok(())
    }

    async fn run_demo(&mut self) {
        let use_case = self.chatbot.use_case();
        println!("\n🎬 Running {} demo", use_case.display_name());
        for (i, question) in use_case.demo_questions().iter().enumerate() {
            println!("\nDemo {}: {}", i + 1, question);
            println!("{}", "-".repeat(50));
            let response = self.chatbot.chat(question, self.use_rag, self.use_functions).await;
            print_response(&response);
        }
    }

    fn print_stats(&self) {
        match serde_json::to_string_pretty(&self.chatbot.get_stats()) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("Could not render stats: {}", e),
        }
    }

    fn print_history(&self) {
        let exchanges = self.chatbot.exchanges();
        if exchanges.is_empty() {
            println!("No conversation history yet.");
            return;
        }
        let skip = exchanges.len().saturating_sub(5);
        for (i, (user, assistant)) in exchanges.iter().enumerate().skip(skip) {
            println!("{}. You: {}", i + 1, user);
            println!("   Bot: {}", clip(assistant, 100));
        }
    }

    fn save(&mut self) -> Result<PathBuf> {
        fs::create_dir_all(&self.settings.conversation_dir)?;
        let dir = self.settings.conversation_dir.clone();
        self.chatbot.save_history(&dir)
    }

    async fn speak(&self) {
        let (Some(dir), Some(service)) = (&self.speak_dir, &self.settings.speech) else {
            println!("Speech needs --speak-dir and AZURE_OPENAI_TTS_MODEL.");
            return;
        };

        let client = match SpeechClient::new(
            self.settings.provider,
            service.clone(),
            self.settings.speech_voice.clone(),
            self.settings.retry,
        ) {
            Ok(client) => client,
            Err(e) => {
                println!("Could not create speech client: {}", e);
                return;
            }
        };

        let items: Vec<(usize, String)> = self
            .chatbot
            .exchanges()
            .into_iter()
            .map(|(_, answer)| answer)
            .enumerate()
            .collect();
        let requested = items.len();
        let audio = synthesize_all(&client, items, self.tts_workers).await;

        if let Err(e) = write_audio(dir, &audio) {
            println!("Could not write audio: {}", e);
            return;
        }
        println!("Wrote {} of {} answers to {}", audio.len(), requested, dir.display());
    }
}

fn write_audio(dir: &Path, audio: &std::collections::BTreeMap<usize, Vec<u8>>) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    for (index, bytes) in audio {
        fs::write(dir.join(format!("answer-{}.mp3", index + 1)), bytes)?;
    }
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  help     - Show this help message");
    println!("  demo     - Run the demo questions");
    println!("  clear    - Clear the conversation history");
    println!("  stats    - Show chatbot statistics");
    println!("  history  - Show the last 5 exchanges");
    println!("  save     - Save the conversation transcript");
    println!("  speak    - Convert answers to MP3 files");
    println!("  quit     - Exit (also 'exit' or 'bye')");
}

fn print_response(response: &ChatResponse) {
    println!("\nAssistant: {}", response.answer);
    match response.method {
        AnswerMethod::FunctionCalling => println!(
            "🔧 Method: Function Calling ({} calls)",
            response.function_calls_made.unwrap_or(0)
        ),
        AnswerMethod::RagRetrieval => {
            println!("📚 Method: RAG Retrieval");
            if !response.sources.is_empty() {
                let shown: Vec<&str> = response.sources.iter().take(3).map(String::as_str).collect();
                println!("Sources: {}", shown.join(", "));
            }
        }
        AnswerMethod::LlmDirect => println!("💬 Method: Direct LLM (no relevant documents)"),
        AnswerMethod::Error | AnswerMethod::Fallback => {
            if let Some(error) = &response.error {
                println!("⚠️ Error: {}", error);
            }
        }
    }
    println!();
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}
