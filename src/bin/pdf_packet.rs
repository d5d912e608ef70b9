//! Build reading packets from a PDF library
//!
//! Usage:
//!   pdf_packet add [FILES...] [--topic T]
//!   pdf_packet list
//!   pdf_packet remove <TITLE>
//!   pdf_packet paper [--interactive] [--topic T] [--soft N] [--hard N] [--output DIR]

use clap::{Parser, Subcommand};
use pdf_packet::{
    DocumentOutcome, InteractiveOutcome, InteractiveSession, JsonRegistry, Library, PacketConfig,
    PacketGenerator, Registry,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf_packet", version, about = "Slice and merge PDF chapters into reading packets")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library directory (overrides the configuration)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Registry file (overrides the configuration)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active documents
    List,
    /// Add documents to the library
    Add {
        /// PDFs to copy into the library; without any, register every
        /// unregistered PDF already there
        files: Vec<PathBuf>,
        /// Topic to file the documents under
        #[arg(long)]
        topic: Option<String>,
    },
    /// Stop including a document in packets
    Remove {
        /// Registered title (file name)
        title: String,
    },
    /// Generate a reading packet
    Paper {
        /// Pick chapters by hand
        #[arg(short, long)]
        interactive: bool,
        /// Only use documents filed under this topic
        #[arg(long)]
        topic: Option<String>,
        /// Soft page limit per document
        #[arg(long)]
        soft: Option<usize>,
        /// Hard page limit per document
        #[arg(long)]
        hard: Option<usize>,
        /// Directory for the packet
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> pdf_packet::Result<PacketConfig> {
    let mut config = match &cli.config {
        Some(path) => PacketConfig::from_file(path)?,
        None => PacketConfig::default(),
    };
    if let Some(dir) = &cli.library {
        config = config.with_library_dir(dir);
    }
    if let Some(path) = &cli.registry {
        config = config.with_registry_path(path);
    }
    Ok(config)
}

fn run(cli: Cli) -> pdf_packet::Result<()> {
    let mut config = load_config(&cli)?;
    let library = Library::open(&config.library_dir)?;
    let mut registry = JsonRegistry::open(&config.registry_path)?;

    match cli.command {
        Commands::List => print_library(&registry)?,
        Commands::Add { files, topic } => {
            let titles = if files.is_empty() {
                library.unregistered(&registry)?
            } else {
                library.import_all(files.as_slice())?
            };
            if titles.is_empty() {
                println!("Nothing to add");
            }
            for title in titles {
                let record = registry.register(&title, topic.as_deref())?;
                println!("Added {}", record.title);
            }
        },
        Commands::Remove { title } => {
            let id = match registry.find_by_title(&title) {
                Some(record) if record.active => record.id,
                _ => return Err(pdf_packet::Error::DocumentNotFound(title)),
            };
            registry.deactivate(id)?;
            println!("Removed {}", title);
        },
        Commands::Paper {
            interactive,
            topic,
            soft,
            hard,
            output,
        } => {
            let soft = soft.unwrap_or(config.soft_limit);
            let hard = hard.unwrap_or(config.hard_limit);
            config = config.with_limits(soft, hard);
            if let Some(dir) = output {
                config = config.with_output_dir(dir);
            }
            config.validate()?;

            if interactive {
                let stdin = std::io::stdin();
                let session = InteractiveSession::new(config, stdin.lock(), std::io::stdout());
                match session.run(&mut registry, topic.as_deref())? {
                    InteractiveOutcome::Saved(_) | InteractiveOutcome::Empty => {},
                    InteractiveOutcome::Aborted => println!("Aborted, nothing saved"),
                }
            } else {
                let report = PacketGenerator::new(config)?.generate(&mut registry, topic.as_deref())?;
                for doc in &report.documents {
                    let status = match &doc.outcome {
                        DocumentOutcome::Resumable(name) => format!("resume after '{}'", name),
                        DocumentOutcome::Exhausted => "finished".to_string(),
                        DocumentOutcome::NoBookmarks => "skipped, no bookmarks".to_string(),
                        DocumentOutcome::CorruptOutline(reason) => format!("skipped, {}", reason),
                        DocumentOutcome::Unreadable(reason) => format!("skipped, {}", reason),
                    };
                    println!("{:>4} pages  {}  ({})", doc.pages, doc.title, status);
                }
                match &report.output {
                    Some(path) => println!("Paper saved to {} ({} pages)", path.display(), report.pages()),
                    None => println!("Nothing to read"),
                }
            }
        },
    }
    Ok(())
}

fn print_library(registry: &JsonRegistry) -> pdf_packet::Result<()> {
    let records = registry.list_active(None)?;
    if records.is_empty() {
        println!("Library is empty");
        return Ok(());
    }

    let width = records.iter().map(|r| r.title.len()).max().unwrap_or(5).max(5);
    println!("     {:<width$}     {:<10} checkpoint", "title", "topic", width = width);
    for (index, record) in records.iter().enumerate() {
        println!(
            "{:<5}{:<width$}     {:<10} {}",
            format!("{})", index + 1),
            record.title,
            record.topic.as_deref().unwrap_or("-"),
            record.checkpoint.as_deref().unwrap_or("-"),
            width = width
        );
    }
    Ok(())
}
