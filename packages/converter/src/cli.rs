//! Command-line interface for the converter.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{ConvertOptions, MatchingLayout, MAX_QUESTIONS_PER_ITEM};
use crate::converter::{convert_archive, ConversionReport};
use crate::error::{ConverterError, Result};

/// QTI Converter - Convert QTI 1.2 quiz exports into Learnosity content.
#[derive(Parser)]
#[command(name = "qti-converter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a course export archive into a Learnosity export archive.
    Convert {
        /// Source zip archive containing imsmanifest.xml
        input: PathBuf,

        /// Output archive (default: <input>_learnosity.zip next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Child questions kept per stimulus item
        #[arg(long, default_value_t = MAX_QUESTIONS_PER_ITEM)]
        max_questions_per_item: usize,

        /// Layout used for matching questions
        #[arg(long, value_enum, default_value_t = MatchingLayout::Dropdown)]
        matching_layout: MatchingLayout,

        /// Write the conversion report with per-item errors as JSON
        #[arg(long)]
        errors: Option<PathBuf>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            max_questions_per_item,
            matching_layout,
            errors,
        } => {
            let options = ConvertOptions::default()
                .with_max_questions(max_questions_per_item)
                .with_matching_layout(matching_layout);
            convert_command(&input, output.as_deref(), errors.as_deref(), &options)
        }
    }
}

/// Default output path: `<stem>_learnosity.zip` next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    input.with_file_name(format!("{stem}_learnosity.zip"))
}

/// Execute the convert command.
fn convert_command(
    input: &Path,
    output: Option<&Path>,
    errors: Option<&Path>,
    options: &ConvertOptions,
) -> Result<()> {
    // Validate input before opening anything
    if !input.is_file() {
        return Err(ConverterError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input archive does not exist: {}", input.display()),
        )));
    }

    let output_path = output.map_or_else(|| default_output(input), Path::to_path_buf);

    println!(
        "{} {}",
        style("Converting").bold(),
        style(input.display()).cyan()
    );
    println!();

    // Create progress spinner
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Converting item banks and assessments...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let report = match convert_archive(input, &output_path, options) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();
    print_report(&report);

    if let Some(errors_path) = errors {
        fs::write(errors_path, serde_json::to_vec_pretty(&report)?)?;
        println!(
            "{} {}",
            style("Report written to:").green().bold(),
            errors_path.display()
        );
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        output_path.display()
    );

    Ok(())
}

fn print_report(report: &ConversionReport) {
    println!("  Activities: {}", report.assessments);
    println!("  Item banks: {}", report.item_banks);
    println!("  Items: {}", report.items);
    println!("  Widgets: {}", report.widgets);
    println!("  Assets: {}", report.assets);
    if !report.missing_assets.is_empty() {
        println!(
            "  Missing assets: {}",
            style(report.missing_assets.len()).yellow().bold()
        );
    }
    let error_count = report.error_count();
    if error_count > 0 {
        println!("  Errors: {}", style(error_count).yellow().bold());
    }
}
