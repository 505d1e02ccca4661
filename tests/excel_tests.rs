//! Excel file round trips: export to .xlsx, reopen with calamine, import again

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use royalbit_sheetmap::bind;
use royalbit_sheetmap::mapping::{export_rows, uniform_style, Binding, SheetImporter, SheetRecord};
use royalbit_sheetmap::session::ImportSession;
use royalbit_sheetmap::types::{CellValue, Record};
use royalbit_sheetmap::workbook::{CellStyle, SheetRead, Workbook};
use royalbit_sheetmap::SheetError;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Default, Clone, PartialEq)]
struct Student {
    name: String,
    age: i32,
    sex: Option<i32>,
    birthday: Option<NaiveDateTime>,
}

impl SheetRecord for Student {
    fn columns() -> Vec<Binding<Self>> {
        vec![
            bind!(Student, 0 => name),
            bind!(Student, 1 => age),
            bind!(Student, 2 => sex),
            bind!(Student, 3 => birthday),
        ]
    }
}

#[derive(Debug, Default, Clone)]
struct Line {
    label: String,
    amount: f64,
    total: String,
}

impl SheetRecord for Line {
    fn columns() -> Vec<Binding<Self>> {
        vec![
            bind!(Line, 0 => label),
            bind!(Line, 1 => amount),
            bind!(Line, 2 => total),
        ]
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn students() -> Vec<Student> {
    vec![
        Student {
            name: "Nancy".into(),
            age: 13,
            sex: Some(1),
            birthday: Some(date(2011, 2, 3)),
        },
        Student {
            name: "Tom".into(),
            age: 12,
            sex: None,
            birthday: None,
        },
    ]
}

fn template() -> Workbook {
    let mut book = Workbook::new();
    let sheet = book.add_sheet("Students");
    for (col, title) in ["Name", "Age", "Sex", "Birthday"].iter().enumerate() {
        sheet.set(0, col as u16, *title).unwrap();
    }
    book
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT → FILE → IMPORT
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_xlsx_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("students.xlsx");

    let book = export_rows(&students(), template(), "Students", 1, None).unwrap();
    book.save(&path).unwrap();

    let reopened = Workbook::open(&path).unwrap();
    let sheet = reopened.sheet_by_name("Students").unwrap();
    assert_eq!(sheet.cell(0, 3), Some(&CellValue::from("Birthday")));

    let (records, _) = SheetImporter::new(1, 4)
        .import::<Student, _>(sheet)
        .unwrap();
    let decoded: Vec<Student> = records.into_iter().map(Record::into_inner).collect();
    assert_eq!(decoded, students());
}

#[test]
fn test_styled_export_reopens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("styled.xlsx");

    let style = CellStyle::default().with_border(true);
    let book =
        export_rows(&students(), template(), 0usize, 1, Some(uniform_style(style))).unwrap();
    book.save(&path).unwrap();

    let reopened = Workbook::open(&path).unwrap();
    let sheet = reopened.sheet(0).unwrap();
    assert_eq!(sheet.cell(1, 0), Some(&CellValue::from("Nancy")));
    assert_eq!(sheet.cell(2, 1), Some(&CellValue::Numeric(12.0)));
}

#[test]
fn test_formula_fields_pass_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lines.xlsx");

    let lines = vec![
        Line {
            label: "a".into(),
            amount: 2.0,
            total: "=B2*2".into(),
        },
        Line {
            label: "b".into(),
            amount: 3.0,
            total: "plain".into(),
        },
    ];
    let mut book = Workbook::new();
    book.add_sheet("Lines").set(0, 0, "Label").unwrap();
    let book = export_rows(&lines, book, "Lines", 1, None).unwrap();

    let in_memory = book.sheet(0).unwrap();
    assert_eq!(in_memory.get(1, 2).unwrap().formula.as_deref(), Some("B2*2"));
    assert_eq!(in_memory.get(2, 2).unwrap().formula, None);

    book.save(&path).unwrap();
    let reopened = Workbook::open(&path).unwrap();
    let sheet = reopened.sheet(0).unwrap();
    assert_eq!(sheet.get(1, 2).unwrap().formula.as_deref(), Some("B2*2"));
    assert_eq!(sheet.cell(2, 2), Some(&CellValue::from("plain")));
}

// ═══════════════════════════════════════════════════════════════════════════
// TEMPLATE LAYOUT
// ═══════════════════════════════════════════════════════════════════════════

/// A template with a bold header, a wide first column and a merged footer.
fn layout_template(path: &Path) {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
    sheet.get_cell_mut("A1").set_value_string("Name");
    sheet.get_cell_mut("B1").set_value_string("Age");
    sheet.get_style_mut("A1").get_font_mut().set_bold(true);
    sheet.get_column_dimension_mut("A").set_width(40.0);
    sheet.get_cell_mut("A10").set_value_string("Totals");
    sheet.add_merge_cells("A10:C10");
    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

fn assert_layout_kept(template: &Path, output: &Path) {
    let before = umya_spreadsheet::reader::xlsx::read(template).unwrap();
    let after = umya_spreadsheet::reader::xlsx::read(output).unwrap();
    let before = before.get_sheet_by_name("Sheet1").unwrap();
    let after = after.get_sheet_by_name("Sheet1").unwrap();

    assert_eq!(
        format!("{:?}", after.get_style("A1")),
        format!("{:?}", before.get_style("A1"))
    );
    assert_ne!(
        format!("{:?}", after.get_style("A1")),
        format!("{:?}", after.get_style("B1"))
    );

    let width = format!("{:?}", after.get_column_dimension("A"));
    assert_eq!(width, format!("{:?}", before.get_column_dimension("A")));
    assert!(width.contains("40.0"));

    let merges = after.get_merge_cells();
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].get_range(), "A10:C10");
}

#[test]
fn test_export_into_xlsx_template_keeps_layout() {
    let dir = TempDir::new().unwrap();
    let template_path = dir.path().join("template.xlsx");
    let output = dir.path().join("filled.xlsx");
    layout_template(&template_path);

    let template = Workbook::open(&template_path).unwrap();
    assert!(template.keeps_source_layout());

    #[derive(Debug, Default)]
    struct Person {
        name: String,
        age: i32,
    }

    impl SheetRecord for Person {
        fn columns() -> Vec<Binding<Self>> {
            vec![bind!(Person, 0 => name), bind!(Person, 1 => age)]
        }
    }

    let people = vec![
        Person {
            name: "Nancy".into(),
            age: 13,
        },
        Person {
            name: "Tom".into(),
            age: 12,
        },
    ];
    let book = export_rows(&people, template, "Sheet1", 1, None).unwrap();
    book.save(&output).unwrap();

    let reopened = Workbook::open(&output).unwrap();
    let sheet = reopened.sheet(0).unwrap();
    assert_eq!(sheet.cell(0, 0), Some(&CellValue::from("Name")));
    assert_eq!(sheet.cell(1, 0), Some(&CellValue::from("Nancy")));
    assert_eq!(sheet.cell(2, 1), Some(&CellValue::Numeric(12.0)));
    assert_eq!(sheet.cell(9, 0), Some(&CellValue::from("Totals")));

    assert_layout_kept(&template_path, &output);
}

#[test]
fn test_annotated_file_keeps_layout() {
    let dir = TempDir::new().unwrap();
    let template_path = dir.path().join("source.xlsx");
    let output = dir.path().join("errors.xlsx");
    layout_template(&template_path);

    let mut source = umya_spreadsheet::reader::xlsx::read(&template_path).unwrap();
    let sheet = source.get_sheet_by_name_mut("Sheet1").unwrap();
    sheet.get_cell_mut("A2").set_value_string("Nancy");
    sheet.get_cell_mut("B2").set_value_string("thirteen");
    umya_spreadsheet::writer::xlsx::write(&source, &template_path).unwrap();

    let mut session = ImportSession::open(&template_path)
        .unwrap()
        .with_error_style(CellStyle::default().with_background(0xFFC7CE));
    let records = session.import::<Student>(0usize, 1, 4).unwrap();
    let failed: Vec<Record<Student>> = records
        .into_iter()
        .filter(|r| r.has_error() && r.row_number == 1)
        .collect();
    assert_eq!(failed.len(), 1);
    session.write_error_file(&failed, &output, "Error").unwrap();

    let reopened = Workbook::open(&output).unwrap();
    let sheet = reopened.sheet(0).unwrap();
    assert_eq!(sheet.cell(0, 4), Some(&CellValue::from("Error")));
    assert!(sheet.cell(1, 4).unwrap().to_string().starts_with("invalid value at col 1:"));

    assert_layout_kept(&template_path, &output);
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION ERROR FILES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_session_writes_error_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.xlsx");
    let errors = dir.path().join("errors.xlsx");

    let mut book = template();
    let sheet = book.sheet_mut(0).unwrap();
    sheet.set(1, 0, "Nancy").unwrap();
    sheet.set(1, 1, "thirteen").unwrap();
    sheet.set(2, 0, "Tom").unwrap();
    sheet.set(2, 1, 12.0).unwrap();
    book.save(&source).unwrap();

    let mut session = ImportSession::open(&source).unwrap();
    let records = session
        .import_with_hook("Students", 1, 4, |mut record: Record<Student>, _| {
            if record.birthday.is_none() {
                record.push_error("birthday can not be null");
            }
            record
        })
        .unwrap();
    assert_eq!(records.len(), 2);

    let failed: Vec<Record<Student>> = records.into_iter().filter(|r| r.has_error()).collect();
    session.write_error_file(&failed, &errors, "Error").unwrap();

    let reopened = Workbook::open(&errors).unwrap();
    let sheet = reopened.sheet(0).unwrap();
    assert_eq!(sheet.cell(0, 4), Some(&CellValue::from("Error")));

    let nancy = sheet.cell(1, 4).unwrap().to_string();
    assert!(nancy.starts_with("invalid value at col 1:"));
    assert!(nancy.ends_with(";birthday can not be null"));
    assert_eq!(
        sheet.cell(2, 4),
        Some(&CellValue::from("birthday can not be null"))
    );
    // The source file is left as it was
    let original = Workbook::open(&source).unwrap();
    assert_eq!(original.sheet(0).unwrap().cell(0, 4), None);
}

#[test]
fn test_open_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Workbook::open(dir.path().join("absent.xlsx"));
    assert!(matches!(result, Err(SheetError::Open(_))));
}
