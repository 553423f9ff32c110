//! Export of letters to PDF and DOCX

use anyhow::{Context, Result};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::models::{AppSettings, Letter, Resident, VillageInfo};
use crate::services::docx;
use crate::utils::date::format_long_id;
use crate::utils::error::AppError;
use crate::utils::path::{get_extension, is_image_file, sanitize_filename};

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Docx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF",
            ExportFormat::Docx => "Word (DOCX)",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "docx" | "word" => Some(ExportFormat::Docx),
            _ => None,
        }
    }
}

/// Everything a renderer needs, detached from the database
#[derive(Debug, Clone)]
pub struct LetterDocument {
    pub letter: Letter,
    pub resident: Resident,
    pub village: VillageInfo,
    /// Printed before the issue date; village name when unset
    pub place_name: Option<String>,
}

impl LetterDocument {
    pub fn new(letter: Letter, resident: Resident, village: VillageInfo) -> Self {
        Self {
            letter,
            resident,
            village,
            place_name: None,
        }
    }

    pub fn place(&self) -> &str {
        self.place_name
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.village.name)
    }

    /// "Sukamaju, 17 Agustus 1945"
    pub fn place_and_date(&self) -> String {
        let date = format_long_id(self.letter.issued_date);
        if self.place().is_empty() {
            date
        } else {
            format!("{}, {}", self.place(), date)
        }
    }

    pub fn number_line(&self) -> String {
        format!("Nomor: {}", self.letter.letter_number)
    }

    /// Title above the leader's signature, e.g. "Kepala Desa Sukamaju"
    pub fn leader_heading(&self) -> String {
        if self.village.name.is_empty() {
            self.village.leader_title.clone()
        } else {
            format!("{} {}", self.village.leader_title, self.village.name)
        }
    }

    pub fn logo(&self) -> Option<ImageAsset> {
        self.village.logo_path.as_deref().and_then(ImageAsset::load)
    }

    pub fn signature(&self) -> Option<ImageAsset> {
        self.village.signature_path.as_deref().and_then(ImageAsset::load)
    }
}

/// Image file read for embedding, with pixel dimensions
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// "png" or "jpeg"
    pub extension: &'static str,
}

impl ImageAsset {
    /// Missing or unreadable images are skipped so the letter still exports
    pub fn load(path: &str) -> Option<Self> {
        let path = Path::new(path);
        if !is_image_file(path) {
            tracing::warn!("Not an embeddable image: {:?}", path);
            return None;
        }

        let (width, height) = match image::image_dimensions(path) {
            Ok(dims) => dims,
            Err(e) => {
                tracing::warn!("Could not read image {:?}: {}", path, e);
                return None;
            }
        };
        if width == 0 || height == 0 {
            return None;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not read image {:?}: {}", path, e);
                return None;
            }
        };

        let extension = match get_extension(path).as_deref() {
            Some("png") => "png",
            _ => "jpeg",
        };

        Some(Self {
            bytes,
            width,
            height,
            extension,
        })
    }

    /// Height when drawn `width` units wide
    pub fn scaled_height(&self, width: f32) -> f32 {
        width * self.height as f32 / self.width as f32
    }
}

/// Export result
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub path: PathBuf,
    pub file_size: usize,
}

/// Export service
pub struct ExportService<'a> {
    db: &'a Database,
    export_directory: PathBuf,
    place_name: Option<String>,
}

impl<'a> ExportService<'a> {
    pub fn new(db: &'a Database, settings: &AppSettings) -> Self {
        Self {
            db,
            export_directory: settings.export_directory.clone(),
            place_name: settings.place_name.clone(),
        }
    }

    /// Load a letter with its resident and village data
    pub fn load_document(&self, letter_id: i64) -> Result<LetterDocument> {
        let letter = self
            .db
            .letters()
            .find_by_id(letter_id)?
            .ok_or_else(|| AppError::not_found(format!("Letter with ID {}", letter_id)))?;
        let resident = self
            .db
            .residents()
            .find_by_id(letter.resident_id)?
            .ok_or_else(|| {
                AppError::not_found(format!("Resident with ID {}", letter.resident_id))
            })?;
        let village = self.db.village().get()?;

        let mut document = LetterDocument::new(letter, resident, village);
        document.place_name = self.place_name.clone();
        Ok(document)
    }

    /// Export one letter. Without a path the file lands in the export
    /// directory under a generated name.
    pub fn export_letter(
        &self,
        letter_id: i64,
        format: ExportFormat,
        path: Option<&Path>,
    ) -> Result<ExportResult> {
        let document = self.load_document(letter_id)?;

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.export_directory.join(generate_filename(
                &document.letter,
                &document.resident.name,
                format,
            )),
        };

        let bytes = match format {
            ExportFormat::Pdf => render_pdf(&document)?,
            ExportFormat::Docx => render_docx(&document)?,
        };

        // Bare file name has an empty parent
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Could not create export directory")?;
            }
        }
        std::fs::write(&path, &bytes).context("Could not write export file")?;

        tracing::info!(
            "Exported letter {} as {} to {:?}",
            document.letter.letter_number,
            format.display_name(),
            path
        );

        Ok(ExportResult {
            format,
            path,
            file_size: bytes.len(),
        })
    }
}

/// `{type}_{number}_{name}.{ext}` with path-unsafe characters replaced
pub fn generate_filename(letter: &Letter, resident_name: &str, format: ExportFormat) -> String {
    let stem = format!(
        "{}_{}_{}",
        letter.letter_type.as_str(),
        letter.letter_number,
        resident_name
    );
    let stem = sanitize_filename(&stem).replace(char::is_whitespace, "_");
    format!("{}.{}", stem, format.extension())
}

pub fn render_docx(document: &LetterDocument) -> Result<Vec<u8>> {
    docx::render(document)
}

pub fn render_pdf(document: &LetterDocument) -> Result<Vec<u8>> {
    let (bytes, _) = build_pdf(document)?;
    Ok(bytes)
}

// A4 page layout in millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 5.5;
const LOGO_WIDTH: f32 = 22.0;
const SIGNATURE_WIDTH: f32 = 35.0;
const SIGNATURE_BLOCK_HEIGHT: f32 = 55.0;
/// Left edge of the three signature columns
const COLUMNS: [f32; 3] = [MARGIN_LEFT, 80.0, 140.0];

/// Approximate width of `text` in mm for the builtin Times fonts
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

fn chars_per_line(size: f32) -> usize {
    let usable = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    (usable / (size * 0.5 * 0.3528)) as usize
}

/// Greedy word wrap on character count
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };

        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Page cursor that opens a new page when the current one is full
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Halaman 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc.add_builtin_font(BuiltinFont::TimesRoman)?;
        let bold = doc.add_builtin_font(BuiltinFont::TimesBold)?;

        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: PAGE_HEIGHT - MARGIN_TOP,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Halaman {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN_TOP;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn centered(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(LINE_HEIGHT);
        let x = ((PAGE_WIDTH - text_width(text, size)) / 2.0).max(MARGIN_LEFT);
        self.text_at(text, size, x, bold);
        self.advance(size * 0.3528 + 1.5);
    }

    fn rule(&mut self) {
        let line = Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN_RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(1.5);
        self.layer.add_line(line);
    }

    /// Draw an image with its top-left corner at (x, y); returns its height
    fn image(&self, asset: &ImageAsset, x: f32, width: f32) -> Option<f32> {
        let decoded = match printpdf::image_crate::load_from_memory(&asset.bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Skipping image that could not be decoded: {}", e);
                return None;
            }
        };
        let rgb = printpdf::image_crate::DynamicImage::ImageRgb8(decoded.to_rgb8());

        let height = asset.scaled_height(width);
        let dpi = asset.width as f32 * 25.4 / width;

        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(self.y - height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        Some(height)
    }

    fn finish(self) -> Result<(Vec<u8>, usize)> {
        let pages = self.pages;
        let bytes = self.doc.save_to_bytes().context("Could not save PDF")?;
        Ok((bytes, pages))
    }
}

/// Render the letter; also returns the page count
fn build_pdf(document: &LetterDocument) -> Result<(Vec<u8>, usize)> {
    let letter = &document.letter;
    let village = &document.village;
    let mut pdf = PdfWriter::new(&letter.title)?;

    // Letterhead
    let header_top = pdf.y;
    let logo_height = document
        .logo()
        .and_then(|logo| pdf.image(&logo, MARGIN_LEFT, LOGO_WIDTH))
        .unwrap_or(0.0);

    let heads = village.letterhead_lines();
    let last = heads.len().saturating_sub(1);
    for (i, line) in heads.iter().enumerate() {
        let size = if i == last { 16.0 } else { 13.0 };
        pdf.centered(line, size, true);
    }
    let contact = village.contact_line();
    if !contact.is_empty() {
        pdf.centered(&contact, 9.0, false);
    }

    // Rule goes below whichever is taller, logo or text
    let header_bottom = header_top - logo_height;
    if pdf.y > header_bottom {
        pdf.y = header_bottom;
    }
    pdf.advance(1.0);
    pdf.rule();
    pdf.advance(LINE_HEIGHT * 2.0);

    // Title and number
    pdf.centered(&letter.title.to_uppercase(), 13.0, true);
    pdf.centered(&document.number_line(), BODY_SIZE, false);
    pdf.advance(LINE_HEIGHT);

    // Body
    let width = chars_per_line(BODY_SIZE);
    for paragraph in letter.content.lines() {
        if paragraph.trim().is_empty() {
            pdf.advance(LINE_HEIGHT / 2.0);
            continue;
        }
        for line in wrap_text(paragraph, width) {
            pdf.ensure_space(LINE_HEIGHT);
            pdf.text_at(&line, BODY_SIZE, MARGIN_LEFT, false);
            pdf.advance(LINE_HEIGHT);
        }
    }

    // Signature block
    pdf.advance(LINE_HEIGHT);
    pdf.ensure_space(SIGNATURE_BLOCK_HEIGHT);
    pdf.text_at(&document.place_and_date(), BODY_SIZE, COLUMNS[2], false);
    pdf.advance(LINE_HEIGHT);

    pdf.text_at("Pemohon,", BODY_SIZE, COLUMNS[0], false);
    pdf.text_at("Saksi,", BODY_SIZE, COLUMNS[1], false);
    pdf.text_at(&format!("{},", document.leader_heading()), BODY_SIZE, COLUMNS[2], false);
    pdf.advance(LINE_HEIGHT);

    if let Some(signature) = document.signature() {
        pdf.image(&signature, COLUMNS[2], SIGNATURE_WIDTH);
    }
    pdf.advance(25.0);

    pdf.text_at(&document.resident.name, BODY_SIZE, COLUMNS[0], true);
    pdf.text_at("(.........................)", BODY_SIZE, COLUMNS[1], false);
    pdf.text_at(&village.leader_name, BODY_SIZE, COLUMNS[2], true);

    pdf.finish()
}
