//! Dataprep CLI - Load, clean and export tabular datasets
//!
//! # Main Commands
//!
//! ```bash
//! dataprep serve                          # Start HTTP server (port 3000)
//! dataprep inspect sales.csv              # Overview, columns, issues, preview
//! dataprep process sales.csv --ops ops.json --format excel --output out.xlsx
//! dataprep operations                     # Show available operations
//! ```

use clap::{Parser, Subcommand};
use dataprep::{
    execute, export, load_path, operations_description, parse_operations, preview, profile,
    quality_issues, Config, ExportFormat, Overview,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dataprep")]
#[command(about = "Load, clean and export CSV, Excel and JSON datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a dataset: overview, columns, quality issues, first rows
    Inspect {
        /// Input file (csv, txt, xlsx, xls, json, anything else as raw text)
        input: PathBuf,

        /// Number of preview rows (default: DATAPREP_PREVIEW_ROWS or 5)
        #[arg(short, long)]
        rows: Option<usize>,
    },

    /// Apply an operation list and export the result
    Process {
        /// Input file
        input: PathBuf,

        /// JSON file with one operation or an array of operations
        #[arg(long)]
        ops: PathBuf,

        /// Export format: csv, excel or json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if any operation is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Show available operations
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: DATAPREP_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();

    let result = match cli.command {
        Commands::Inspect { input, rows } => cmd_inspect(&input, rows.unwrap_or(config.preview_rows)),

        Commands::Process {
            input,
            ops,
            format,
            output,
            strict,
        } => cmd_process(&input, &ops, &format, output.as_deref(), strict),

        Commands::Operations => cmd_operations(),

        Commands::Serve { port } => cmd_serve(config.with_port(port)).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_inspect(input: &Path, rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let loaded = load_path(input)?;
    let doc = &loaded.document;
    let overview = Overview::of(doc);

    if let Some(ref encoding) = loaded.source.encoding {
        eprintln!("   Encoding: {}{}", encoding, if loaded.source.used_fallback { " (fallback)" } else { "" });
    }
    if let Some(delimiter) = loaded.source.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    eprintln!("   Rows: {}", overview.rows);
    eprintln!("   Columns: {}", overview.columns);
    eprintln!("   Missing values: {}", overview.missing);

    eprintln!("\n📊 Columns:");
    for column in profile(doc) {
        eprintln!(
            "   {:<24} {:<12} missing: {:<6} unique: {}",
            column.name, column.kind.to_string(), column.missing, column.unique
        );
    }

    let issues = quality_issues(doc);
    if !issues.is_empty() {
        eprintln!("\n💡 Suggestions:");
        for issue in &issues {
            eprintln!("   {}: {}", issue.column, issue.detail);
        }
    }

    let json = serde_json::to_string_pretty(&preview(doc, rows))?;
    println!("{}", json);
    Ok(())
}

fn cmd_process(
    input: &Path,
    ops_path: &Path,
    format: &str,
    output: Option<&Path>,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format: ExportFormat = format.parse()?;
    let operations = parse_operations(&fs::read_to_string(ops_path)?)?;

    eprintln!("📄 Processing: {}", input.display());
    let loaded = load_path(input)?;
    eprintln!(
        "   Loaded {} rows x {} columns",
        loaded.document.row_count(),
        loaded.document.column_count()
    );

    let report = execute(&loaded.document, &operations);
    for step in report.failed() {
        eprintln!(
            "   ❌ Step {} ({}): {}",
            step.index + 1,
            step.description,
            step.error.as_deref().unwrap_or_default()
        );
    }
    eprintln!("\n⚙️  {}", report.summary());

    if strict && !report.is_ok() {
        return Err(format!("{} operations failed", report.failed().count()).into());
    }

    let file = export(&report.document, format)?;
    match output {
        Some(path) => {
            fs::write(path, &file.data)?;
            eprintln!("💾 Output written to: {}", path.display());
        }
        None => std::io::stdout().write_all(&file.data)?,
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

async fn cmd_serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    dataprep::server::start_server(config).await
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
