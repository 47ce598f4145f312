use docx_rs::{
    read_docx, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};

use super::ExtractionError;

/// Returns the body text of a DOCX file, one line per paragraph.
/// Table cells are walked in row order so tabular resumes keep their content.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = read_docx(bytes).map_err(|e| ExtractionError::CorruptDocument {
        kind: "DOCX",
        reason: format!("{e:?}"),
    })?;

    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => collect_table(t, &mut lines),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                match run_child {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}

fn collect_table(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => lines.push(paragraph_text(p)),
                    TableCellContent::Table(t) => collect_table(t, lines),
                    _ => {}
                }
            }
        }
    }
}
