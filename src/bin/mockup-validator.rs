use std::path::{Path, PathBuf};

use clap::Parser;

use mockup_compiler::bundle::validate_text_bundle;
use mockup_compiler::{Error, Result};

/// Check the structure of a text bundle.
#[derive(Debug, Parser)]
#[command(name = "mockup-validator", version)]
struct Cli {
    /// Bundle file to validate
    path: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli.path) {
        Ok(count) => {
            println!("{}: OK, {count} files", cli.path.display());
        }
        Err(err) => {
            eprintln!("{err}");
            for line in err.context_lines() {
                eprintln!("{line}");
            }
            std::process::exit(1);
        }
    }
}

fn run(path: &Path) -> Result<usize> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::from(e).with_file(path.display().to_string()))?;
    let files = validate_text_bundle(&text)?;
    Ok(files.len())
}
