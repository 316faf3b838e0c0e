use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor},
    path::PathBuf,
};

use potion::HtmlError;
use printpdf::{BuiltinFont, Mm, PdfDocument};

use super::list::ShoppingList;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;

const HEADER_Y: f32 = PAGE_HEIGHT - 20.0;
const FIRST_LINE_Y: f32 = PAGE_HEIGHT - 40.0;
const FOOTER_Y: f32 = 10.0;
const LINE_STEP: f32 = 10.0;

const HEADER_FONT_SIZE: f32 = 20.0;
const BODY_FONT_SIZE: f32 = 14.0;
const FOOTER_FONT_SIZE: f32 = 10.0;

pub const LINES_PER_PAGE: usize = 24;

pub const EMPTY_NOTICE: &str = "Your shopping cart is empty.";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not read font: {0}")]
    Font(#[from] std::io::Error),
    #[error("could not render pdf: {0}")]
    Pdf(String),
}

impl From<ExportError> for potion::Error {
    fn from(value: ExportError) -> Self {
        log::error!("{value}");
        HtmlError::InternalServerError.new("Failed to render shopping list")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfOptions {
    pub title: String,
    pub font_path: Option<PathBuf>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: String::from("Shopping list"),
            font_path: None,
        }
    }
}

/// The built-in Helvetica only covers Latin-1.
pub fn needs_unicode_font(list: &ShoppingList) -> bool {
    list.items.iter().any(|item| {
        item.name
            .chars()
            .chain(item.measurement_unit.chars())
            .any(|c| u32::from(c) > 0xFF)
    })
}

/// Splits the numbered lines into pages. There is always at least one
/// page; an empty list gets a single notice line.
pub fn layout(list: &ShoppingList, lines_per_page: usize) -> Vec<Vec<String>> {
    if list.is_empty() {
        return vec![vec![EMPTY_NOTICE.to_string()]];
    }

    list.lines()
        .chunks(lines_per_page.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

pub fn render_pdf(list: &ShoppingList, options: &PdfOptions) -> Result<Vec<u8>, ExportError> {
    let pages = layout(list, LINES_PER_PAGE);
    if options.font_path.is_none() && needs_unicode_font(list) {
        log::warn!("shopping list has non Latin-1 names but no PDF font is set; set PDF_FONT_PATH");
    }

    let (doc, first_page, first_layer) = PdfDocument::new(
        options.title.as_str(),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Layer 1",
    );

    let font = match &options.font_path {
        Some(path) => doc.add_external_font(BufReader::new(File::open(path)?)),
        None => doc.add_builtin_font(BuiltinFont::Helvetica),
    }
    .map_err(|e| ExportError::Pdf(e.to_string()))?;

    let mut targets = vec![(first_page, first_layer)];
    for number in 2..=pages.len() {
        targets.push(doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {number}"),
        ));
    }

    for (index, ((page, layer), lines)) in targets.into_iter().zip(pages.iter()).enumerate() {
        let layer = doc.get_page(page).get_layer(layer);

        layer.use_text(
            options.title.as_str(),
            HEADER_FONT_SIZE,
            Mm(MARGIN),
            Mm(HEADER_Y),
            &font,
        );
        for (row, line) in lines.iter().enumerate() {
            layer.use_text(
                line.as_str(),
                BODY_FONT_SIZE,
                Mm(MARGIN + 5.0),
                Mm(FIRST_LINE_Y - row as f32 * LINE_STEP),
                &font,
            );
        }
        layer.use_text(
            format!("Page {}", index + 1),
            FOOTER_FONT_SIZE,
            Mm(PAGE_WIDTH / 2.0 - 8.0),
            Mm(FOOTER_Y),
            &font,
        );
    }

    let mut writer = BufWriter::new(Cursor::new(Vec::new()));
    doc.save(&mut writer)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Pdf(e.to_string()))?
        .into_inner();

    log::debug!(
        "rendered shopping list: {} items on {} pages, {} bytes",
        list.items.len(),
        pages.len(),
        bytes.len()
    );
    Ok(bytes)
}
