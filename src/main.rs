use clap::{Parser, Subcommand};
use royalbit_sheetmap::cli::{self, SnapshotFormat};
use royalbit_sheetmap::mapping::DEFAULT_ERROR_HEADER;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetmap")]
#[command(about = "Inspect spreadsheets and write import errors back next to the rows that caused them")]
#[command(long_about = "Sheetmap - spreadsheet rows ↔ typed records

COMMANDS:
  sheets     - List the worksheets of a workbook
  snapshot   - Dump sheet contents as JSON or YAML
  annotate   - Write per-row error text into an error column

EXAMPLES:
  sheetmap sheets students.xlsx
  sheetmap snapshot students.xlsx --sheet 0 --format yaml
  sheetmap annotate students.xlsx --errors errors.json --start-row 1 --error-column 3 -o out.xlsx

Set RUST_LOG=royalbit_sheetmap=debug for import/export diagnostics.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List worksheets
    Sheets {
        /// Workbook to inspect (.xlsx, .xls, .ods)
        file: PathBuf,

        /// Show row counts
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Dump sheet contents as JSON or YAML.

Every non-empty row is listed with its cells from the first to the last
stored column. Each cell carries its type (none, string, boolean, numeric,
datetime, bytes) and value.

Without --sheet, every worksheet is dumped.")]
    /// Dump sheet contents
    Snapshot {
        /// Workbook to read
        file: PathBuf,

        /// Sheet name or 0-based index
        #[arg(short, long)]
        sheet: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = SnapshotFormat::Json)]
        format: SnapshotFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(long_about = "Write per-row error text into an error column.

The errors file maps 0-based row numbers to messages, as JSON
({\"2\": \"age must be a number\"}) or YAML (2: age must be a number).
The header goes on the row above --start-row, which must exist.
Rows are written in ascending order; if any target row is missing
nothing is written.")]
    /// Annotate rows with error text
    Annotate {
        /// Workbook to annotate
        file: PathBuf,

        /// JSON or YAML file of {row: message}
        #[arg(short, long)]
        errors: PathBuf,

        /// Sheet name or 0-based index (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// First data row (0-based); the header is written one row above
        #[arg(long, env = "SHEETMAP_START_ROW")]
        start_row: u32,

        /// 0-based column that receives the error text
        #[arg(long, env = "SHEETMAP_ERROR_COLUMN")]
        error_column: u16,

        /// Header text of the error column
        #[arg(long, default_value = DEFAULT_ERROR_HEADER)]
        header: String,

        /// Output workbook (.xlsx)
        #[arg(short, long)]
        output: PathBuf,

        /// Show verbose annotation steps
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "royalbit_sheetmap=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sheets { file, verbose } => cli::sheets(file, verbose)?,

        Commands::Snapshot {
            file,
            sheet,
            format,
            output,
        } => cli::snapshot(file, sheet, format, output)?,

        Commands::Annotate {
            file,
            errors,
            sheet,
            start_row,
            error_column,
            header,
            output,
            verbose,
        } => cli::annotate(
            file,
            errors,
            sheet,
            start_row,
            error_column,
            header,
            output,
            verbose,
        )?,
    }

    Ok(())
}
