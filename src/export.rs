use crate::library::FolderEntry;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, XlsxError};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No matched folders to export")]
    NothingToExport,
    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

pub const SHEET_NAME: &str = "Albums";

const COLUMNS: [(&str, f64); 12] = [
    ("Folder Name", 15.0),
    ("Artist", 25.0),
    ("Album", 25.0),
    ("Year", 15.0),
    ("Label", 25.0),
    ("Catalog Number", 15.0),
    ("Genre", 15.0),
    ("Style", 15.0),
    ("Notes", 40.0),
    ("Discogs ID", 15.0),
    ("Country", 15.0),
    ("Folder Path", 40.0),
];

fn row_values(entry: &FolderEntry) -> Option<[String; 12]> {
    let album = entry.album()?;
    let persisted = album.to_persisted();

    Some([
        entry.name().to_string(),
        persisted.artist,
        persisted.album,
        persisted.year,
        persisted.label,
        persisted.catalog_number,
        persisted.genre,
        persisted.style,
        persisted.notes,
        persisted
            .discogs_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        persisted.country,
        entry.path().display().to_string(),
    ])
}

/// Write one row per matched entry to an xlsx workbook at `path`.
///
/// Returns the number of data rows written.
pub fn export_spreadsheet<'a, I>(entries: I, path: &Path) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a FolderEntry>,
{
    let rows: Vec<[String; 12]> = entries.into_iter().filter_map(row_values).collect();
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x366092))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let body_format = Format::new().set_align(FormatAlign::Top).set_text_wrap();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (header, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &header_format)?;
        sheet.set_column_width(col, *width)?;
    }

    for (row, values) in rows.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, value) in values.iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, value, &body_format)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    workbook.save(path)?;

    info!("Exported {} album(s) to {}", rows.len(), path.display());
    Ok(rows.len())
}
