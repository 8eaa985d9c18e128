/// Example rebuilding dense rows from the XML parts of an `.xlsx` workbook.
///
/// Usage:
/// - `cargo run --example reconstruct_xlsx` reconstructs a small built-in sheet
/// - `cargo run --example reconstruct_xlsx -- <dir>` reads the parts of an
///   unzipped workbook from `<dir>/xl/`

use gridfold::{SessionConfig, XlsxParts, XlsxReader};
use std::fs;
use std::path::Path;

const SHARED_STRINGS: &str = r#"<sst><si><t>item</t></si><si><t>price</t></si><si><t>sold</t></si><si><t>apples</t></si></sst>"#;

const STYLES: &str = r#"<styleSheet>
    <numFmts><numFmt numFmtId="164" formatCode="0.00"/></numFmts>
    <cellXfs><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="14"/></cellXfs>
</styleSheet>"#;

// Column B is empty on the second row; the reader fills it with a null cell.
const SHEET: &str = r#"<worksheet><sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
    <row r="2"><c r="A2" t="s"><v>3</v></c><c r="C2" s="2"><v>45292</v></c></row>
    <row r="3"><c r="B3" s="1"><v>1.5</v></c></row>
</sheetData></worksheet>"#;

fn load_parts(dir: &Path) -> Result<XlsxParts, Box<dyn std::error::Error>> {
    let xl = dir.join("xl");
    let mut parts = XlsxParts::new();
    if let Ok(xml) = fs::read_to_string(xl.join("sharedStrings.xml")) {
        parts = parts.with_shared_strings(xml);
    }
    if let Ok(xml) = fs::read_to_string(xl.join("styles.xml")) {
        parts = parts.with_styles(xml);
    }

    // sheet1.xml, sheet2.xml, ... in workbook order
    let mut sheets: Vec<_> = fs::read_dir(xl.join("worksheets"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "xml"))
        .collect();
    sheets.sort_by_key(|path| {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.trim_start_matches("sheet").parse::<u32>().ok())
            .unwrap_or(u32::MAX)
    });
    for path in sheets {
        let name = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string);
        parts = parts.with_sheet(name.as_deref(), fs::read_to_string(&path)?);
    }
    Ok(parts)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== gridfold XLSX Reconstruction Example ===\n");

    let parts = match std::env::args().nth(1) {
        Some(dir) => {
            println!("Reading parts from {dir}\n");
            load_parts(Path::new(&dir))?
        },
        None => {
            println!("Using the built-in sample sheet\n");
            XlsxParts::new()
                .with_shared_strings(SHARED_STRINGS)
                .with_styles(STYLES)
                .with_sheet(Some("Sales"), SHEET)
        },
    };

    let mut reader = XlsxReader::new(SessionConfig::new());
    reader.open(parts)?;
    println!("Sheets: {}", reader.sheet_count()?);

    let table = reader.process_all_sheets()?;
    println!("Rows: {}, widest row: {}\n", table.len(), table.width());
    for (index, row) in table.iter().enumerate() {
        let cells: Vec<&str> = row
            .iter()
            .map(|cell| cell.as_deref().unwrap_or("<null>"))
            .collect();
        println!("{:>4}: {}", index + 1, cells.join(" | "));
    }
    Ok(())
}
