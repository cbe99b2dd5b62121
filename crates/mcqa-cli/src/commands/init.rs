//! The `mcqa init` command.

use std::path::Path;

use anyhow::{Context, Result};

fn write_once(path: &str, content: &str) -> Result<()> {
    if Path::new(path).exists() {
        println!("{path} already exists, skipping.");
    } else {
        std::fs::write(path, content).with_context(|| format!("failed to write {path}"))?;
        println!("Created {path}");
    }
    Ok(())
}

pub fn execute() -> Result<()> {
    write_once("mcqa.toml", SAMPLE_CONFIG)?;

    std::fs::create_dir_all("questions").context("failed to create questions/")?;
    write_once("questions/antibiotics.txt", EXAMPLE_CONTEXT)?;
    write_once("questions/example.csv", EXAMPLE_QUESTIONS)?;

    println!("\nNext steps:");
    println!("  1. Edit mcqa.toml with your API keys and models");
    println!("  2. Run: mcqa validate --input questions/example.csv");
    println!("  3. Run: mcqa run --input questions/example.csv");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mcqa configuration

text_model = "openai/gpt-4o"
multimodal_model = "openai/gpt-4o"
temperature = 0.01
max_tokens = 4096
max_retries = 2
retry_delay_ms = 1000
request_delay_ms = 0
randomize_options = true
synthetic_count = 5
output_dir = "./mcqa-results"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;

const EXAMPLE_CONTEXT: &str = "\
Penicillin is a beta-lactam antibiotic that inhibits bacterial cell wall synthesis. \
Bacteria that produce beta-lactamase can inactivate it. \
Ibuprofen is a non-steroidal anti-inflammatory drug (NSAID).
";

const EXAMPLE_QUESTIONS: &str = "\
source_path,Question,options,Correct Answer,Short_Context?,source_type
questions/antibiotics.txt,Which drug is a beta-lactam antibiotic?,\"['A. Ibuprofen', 'B. Penicillin', 'C. Aspirin']\",Penicillin,,txt
questions/antibiotics.txt,Which enzyme inactivates penicillin?,\"['A. Lipase', 'B. Beta-lactamase', 'C. Amylase']\",Beta-lactamase,Microbiology,txt
questions/antibiotics.txt,Which drug class does ibuprofen belong to?,A. NSAID B. Opioid C. Antibiotic,A. NSAID,,txt
";
