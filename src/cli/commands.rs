use crate::error::{SheetError, SheetResult};
use crate::mapping::ErrorAnnotator;
use crate::snapshot::{snapshot_sheet, SheetSnapshot};
use crate::types::Record;
use crate::workbook::{CellStyle, SheetRead, SheetSelector, Workbook};
use clap::ValueEnum;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Light red fill used for error cells written by `annotate`.
const ERROR_FILL: u32 = 0xFFC7CE;

/// Output format of the `snapshot` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SnapshotFormat {
    #[default]
    Json,
    Yaml,
}

/// Parse a `--sheet` argument: a bare number is a position, anything else a name.
pub fn parse_selector(sheet: &str) -> SheetSelector {
    match sheet.parse::<usize>() {
        Ok(index) => SheetSelector::Index(index),
        Err(_) => SheetSelector::Name(sheet.to_string()),
    }
}

/// Execute the sheets command
pub fn sheets(file: PathBuf, verbose: bool) -> SheetResult<()> {
    println!("{}", "📒 Sheetmap - Worksheets".bold().green());
    println!("   File: {}\n", file.display());

    let workbook = Workbook::open(&file)?;

    for (index, sheet) in workbook.sheets().iter().enumerate() {
        if verbose {
            println!(
                "   {} {}  ({} rows)",
                format!("[{}]", index).bright_black(),
                sheet.name().bright_blue(),
                sheet.row_count()
            );
        } else {
            println!("   {} {}", format!("[{}]", index).bright_black(), sheet.name().bright_blue());
        }
    }

    println!("\n   {} worksheet(s)", workbook.sheet_count());
    Ok(())
}

/// Execute the snapshot command. Output goes to stdout unless `output` is set,
/// so it can be piped.
pub fn snapshot(
    file: PathBuf,
    sheet: Option<String>,
    format: SnapshotFormat,
    output: Option<PathBuf>,
) -> SheetResult<()> {
    let workbook = Workbook::open(&file)?;

    let snapshots: Vec<SheetSnapshot> = match sheet {
        Some(sheet) => {
            let index = workbook.sheet_index(&parse_selector(&sheet))?;
            vec![snapshot_sheet(&workbook, index)?]
        }
        None => workbook.snapshot_all(),
    };

    let text = render_snapshots(&snapshots, format)?;

    match output {
        Some(path) => {
            fs::write(&path, text)?;
            eprintln!(
                "{} {} sheet(s) → {}",
                "✅".green(),
                snapshots.len(),
                path.display()
            );
        }
        None => print!("{}", text),
    }
    Ok(())
}

pub fn render_snapshots(snapshots: &[SheetSnapshot], format: SnapshotFormat) -> SheetResult<String> {
    match format {
        SnapshotFormat::Json => {
            let mut text = serde_json::to_string_pretty(snapshots)?;
            text.push('\n');
            Ok(text)
        }
        SnapshotFormat::Yaml => Ok(serde_yaml::to_string(snapshots)?),
    }
}

/// Read a `{row: message}` map from a JSON or YAML file (by extension).
pub fn load_error_map(path: &Path) -> SheetResult<BTreeMap<u32, String>> {
    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Execute the annotate command
#[allow(clippy::too_many_arguments)]
pub fn annotate(
    file: PathBuf,
    errors: PathBuf,
    sheet: Option<String>,
    start_row: u32,
    error_column: u16,
    header: String,
    output: PathBuf,
    verbose: bool,
) -> SheetResult<()> {
    println!("{}", "📒 Sheetmap - Error annotation".bold().green());
    println!("   Input:  {}", file.display());
    println!("   Errors: {}", errors.display());
    println!("   Output: {}\n", output.display());

    let error_map = load_error_map(&errors)?;
    if verbose {
        println!("   {} error row(s) loaded", error_map.len());
    }

    let records: Vec<Record<()>> = error_map
        .into_iter()
        .map(|(row, message)| {
            let mut record = Record::new(row, ());
            record.push_error(message);
            record
        })
        .collect();

    let mut workbook = Workbook::open(&file)?;
    let selector = sheet.as_deref().map_or(SheetSelector::Index(0), parse_selector);
    let index = workbook.sheet_index(&selector)?;
    let target = workbook
        .sheet_mut(index)
        .ok_or_else(|| SheetError::SheetNotFound(selector.to_string()))?;

    if verbose {
        println!("   Sheet: {}", target.name().bright_blue());
        println!("   Header row: {}, error column: {}", start_row.saturating_sub(1), error_column);
    }

    let written = ErrorAnnotator::new(start_row, error_column)
        .with_header(header)
        .with_style(CellStyle::default().with_background(ERROR_FILL))
        .annotate(target, &records)?;

    workbook.save(&output)?;

    println!("{}", "✅ Annotation Complete!".bold().green());
    println!("   {} row(s) annotated → {}\n", written, output.display());
    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
