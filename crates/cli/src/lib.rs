pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::{read_argument, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "finmate",
    about = "Finmate advisor CLI",
    long_about = "Run the rule-based slot extractor, the chat content segmenter and classifier, share links, and a text-mode advisor conversation.",
    after_help = "Examples:\n  finmate extract --product-type 적금 \"매달 50만원씩 1년\"\n  echo '```json {\"products\": []} ```' | finmate segment -\n  finmate share-decode eyJ2IjoxLCJkYXRhIjp7InByb2R1Y3RzIjpbXX19\n  finmate chat --catalog products.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Extract amounts, terms and eligibility answers from one user message")]
    Extract {
        #[arg(long, help = "Product type label, e.g. 적금, 예금, 연금저축, 주담대, 전세자금대출, 신용대출")]
        product_type: String,
        #[arg(long = "question", help = "A question the assistant asked just before (repeatable)")]
        questions: Vec<String>,
        #[arg(help = "User message, or - to read stdin")]
        message: String,
    },
    #[command(about = "Split an assistant message into text and structured blocks")]
    Segment {
        #[arg(help = "Assistant message, or - to read stdin")]
        message: String,
    },
    #[command(about = "Classify one JSON payload as slot state, recommendation, or unclassified")]
    Classify {
        #[arg(help = "Raw JSON, or - to read stdin")]
        raw: String,
    },
    #[command(about = "Encode a recommendation bundle into a share token")]
    ShareEncode {
        #[arg(help = "Bundle JSON, or - to read stdin")]
        bundle: String,
    },
    #[command(about = "Decode a share token back into its recommendation bundle")]
    ShareDecode {
        #[arg(help = "Share token")]
        token: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Talk to the advisor line by line on stdin")]
    Chat {
        #[arg(long, help = "JSON file with product rows to recommend from")]
        catalog: Option<PathBuf>,
        #[arg(long, help = "Fix the product type instead of inferring it from the first message")]
        product_type: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Extract { product_type, questions, message } => {
            with_argument("extract", &message, |message| {
                commands::extract::run(&product_type, &questions, message)
            })
        }
        Command::Segment { message } => with_argument("segment", &message, commands::segment::run),
        Command::Classify { raw } => with_argument("classify", &raw, commands::classify::run),
        Command::ShareEncode { bundle } => {
            with_argument("share-encode", &bundle, commands::share::encode)
        }
        Command::ShareDecode { token } => commands::share::decode(&token),
        Command::Config => commands::config::run(),
        Command::Chat { catalog, product_type } => {
            commands::chat::run(catalog.as_deref(), product_type.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn with_argument(
    command: &str,
    argument: &str,
    run: impl FnOnce(&str) -> CommandResult,
) -> CommandResult {
    match read_argument(argument) {
        Ok(text) => run(&text),
        Err(error) => CommandResult::invalid_input(command, format!("failed to read stdin: {error}")),
    }
}
