//! mcqa CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use mcqa_core::model::{Modality, QuestionFormat};

mod commands;

#[derive(Parser)]
#[command(
    name = "mcqa",
    version,
    about = "Multiple-choice question answering and evaluation against LLMs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer and score every question in a CSV file
    Run {
        /// Question CSV file
        #[arg(long)]
        input: PathBuf,

        /// Question format: raw, rephrase, synthetic
        #[arg(long, default_value = "raw")]
        format: QuestionFormat,

        /// Output directory (defaults to the configured one)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep options in their given order
        #[arg(long)]
        no_randomize: bool,

        /// Questions requested per synthetic prompt
        #[arg(long)]
        synthetic_count: Option<usize>,

        /// Pause between rows in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Answer and score a single question
    Ask {
        /// Question text
        #[arg(long)]
        question: String,

        /// Answer option (repeat for each option)
        #[arg(long = "option", required = true)]
        options: Vec<String>,

        /// Correct option text
        #[arg(long)]
        answer: String,

        /// Context type: text, pdf, image
        #[arg(long, default_value = "text")]
        context_type: Modality,

        /// Inline text, or a path to the context file
        #[arg(long)]
        context: String,

        /// Short context rendered next to the question
        #[arg(long)]
        short_context: Option<String>,

        /// Question format: raw, rephrase, synthetic
        #[arg(long, default_value = "raw")]
        format: QuestionFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a question CSV file for problems
    Validate {
        /// Question CSV file
        #[arg(long)]
        input: PathBuf,
    },

    /// Create starter config and example question file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mcqa=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            format,
            output,
            no_randomize,
            synthetic_count,
            delay_ms,
            config,
        } => {
            commands::run::execute(commands::run::RunArgs {
                input,
                format,
                output,
                no_randomize,
                synthetic_count,
                delay_ms,
                config,
            })
            .await
        }
        Commands::Ask {
            question,
            options,
            answer,
            context_type,
            context,
            short_context,
            format,
            config,
        } => {
            commands::ask::execute(commands::ask::AskArgs {
                question,
                options,
                answer,
                context_type,
                context,
                short_context,
                format,
                config,
            })
            .await
        }
        Commands::Validate { input } => commands::validate::execute(input),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
