//! Minimal WordprocessingML writer for letters
//!
//! Produces a single-section document: letterhead, title, body paragraphs
//! and a three-column signature table.

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::services::export::{ImageAsset, LetterDocument};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Default Extension="jpeg" ContentType="image/jpeg"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const PICTURE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const NAMESPACES: [(&str, &str); 5] = [
    ("xmlns:w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    ("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ("xmlns:wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
    ("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("xmlns:pic", PICTURE_URI),
];

/// English Metric Units per centimetre
const EMU_PER_CM: f32 = 360_000.0;
const LOGO_WIDTH_CM: f32 = 2.2;
const SIGNATURE_WIDTH_CM: f32 = 3.5;

#[derive(Debug, Clone, Copy, Default)]
struct RunStyle {
    bold: bool,
    /// Half-points, as WordprocessingML counts them
    size: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

/// One cell of the signature table
enum Cell {
    Blank,
    Text(String, bool),
    Image(ImageAsset, &'static str),
}

struct Media {
    rel_id: String,
    file_name: String,
    bytes: Vec<u8>,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn start(xml: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    xml.write_event(Event::Start(elem))?;
    Ok(())
}

fn empty(xml: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    xml.write_event(Event::Empty(elem))?;
    Ok(())
}

fn end(xml: &mut XmlWriter, name: &str) -> Result<()> {
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn declaration(xml: &mut XmlWriter) -> Result<()> {
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(())
}

/// Streams `word/document.xml` and collects embedded media
struct DocxBuilder {
    xml: XmlWriter,
    media: Vec<Media>,
}

impl DocxBuilder {
    fn new() -> Result<Self> {
        let mut xml = Writer::new(Cursor::new(Vec::new()));
        declaration(&mut xml)?;
        start(&mut xml, "w:document", &NAMESPACES)?;
        start(&mut xml, "w:body", &[])?;
        Ok(Self {
            xml,
            media: Vec::new(),
        })
    }

    fn run(&mut self, text: &str, style: RunStyle) -> Result<()> {
        start(&mut self.xml, "w:r", &[])?;

        if style.bold || style.size.is_some() {
            start(&mut self.xml, "w:rPr", &[])?;
            if style.bold {
                empty(&mut self.xml, "w:b", &[])?;
            }
            if let Some(size) = style.size {
                let size = size.to_string();
                empty(&mut self.xml, "w:sz", &[("w:val", size.as_str())])?;
                empty(&mut self.xml, "w:szCs", &[("w:val", size.as_str())])?;
            }
            end(&mut self.xml, "w:rPr")?;
        }

        start(&mut self.xml, "w:t", &[("xml:space", "preserve")])?;
        self.xml.write_event(Event::Text(BytesText::new(text)))?;
        end(&mut self.xml, "w:t")?;

        end(&mut self.xml, "w:r")
    }

    fn open_paragraph(&mut self, align: Align) -> Result<()> {
        start(&mut self.xml, "w:p", &[])?;
        let jc = match align {
            Align::Left => None,
            Align::Center => Some("center"),
            Align::Right => Some("right"),
        };
        if let Some(jc) = jc {
            start(&mut self.xml, "w:pPr", &[])?;
            empty(&mut self.xml, "w:jc", &[("w:val", jc)])?;
            end(&mut self.xml, "w:pPr")?;
        }
        Ok(())
    }

    fn paragraph(&mut self, text: &str, style: RunStyle, align: Align) -> Result<()> {
        self.open_paragraph(align)?;
        self.run(text, style)?;
        end(&mut self.xml, "w:p")
    }

    fn image_paragraph(&mut self, asset: &ImageAsset, name: &str, width_cm: f32) -> Result<()> {
        self.open_paragraph(Align::Center)?;
        self.image_run(asset, name, width_cm)?;
        end(&mut self.xml, "w:p")
    }

    fn empty_paragraph(&mut self) -> Result<()> {
        empty(&mut self.xml, "w:p", &[])
    }

    /// Paragraph with a thick bottom border under the letterhead
    fn rule(&mut self) -> Result<()> {
        start(&mut self.xml, "w:p", &[])?;
        start(&mut self.xml, "w:pPr", &[])?;
        start(&mut self.xml, "w:pBdr", &[])?;
        empty(
            &mut self.xml,
            "w:bottom",
            &[("w:val", "thick"), ("w:sz", "12"), ("w:space", "1"), ("w:color", "000000")],
        )?;
        end(&mut self.xml, "w:pBdr")?;
        end(&mut self.xml, "w:pPr")?;
        end(&mut self.xml, "w:p")
    }

    /// Register an image and write its inline drawing run
    fn image_run(&mut self, asset: &ImageAsset, name: &str, width_cm: f32) -> Result<()> {
        let index = (self.media.len() + 1).to_string();
        let rel_id = format!("rIdImage{}", index);
        let file_name = format!("{}.{}", name, asset.extension);

        let cx = ((width_cm * EMU_PER_CM) as u64).to_string();
        let cy = (asset.scaled_height(width_cm * EMU_PER_CM) as u64).to_string();
        let extent = [("cx", cx.as_str()), ("cy", cy.as_str())];

        let xml = &mut self.xml;
        start(xml, "w:r", &[])?;
        start(xml, "w:drawing", &[])?;
        start(
            xml,
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?;
        empty(xml, "wp:extent", &extent)?;
        empty(xml, "wp:docPr", &[("id", index.as_str()), ("name", name)])?;

        start(xml, "a:graphic", &[])?;
        start(xml, "a:graphicData", &[("uri", PICTURE_URI)])?;
        start(xml, "pic:pic", &[])?;

        start(xml, "pic:nvPicPr", &[])?;
        empty(xml, "pic:cNvPr", &[("id", index.as_str()), ("name", file_name.as_str())])?;
        empty(xml, "pic:cNvPicPr", &[])?;
        end(xml, "pic:nvPicPr")?;

        start(xml, "pic:blipFill", &[])?;
        empty(xml, "a:blip", &[("r:embed", rel_id.as_str())])?;
        start(xml, "a:stretch", &[])?;
        empty(xml, "a:fillRect", &[])?;
        end(xml, "a:stretch")?;
        end(xml, "pic:blipFill")?;

        start(xml, "pic:spPr", &[])?;
        start(xml, "a:xfrm", &[])?;
        empty(xml, "a:off", &[("x", "0"), ("y", "0")])?;
        empty(xml, "a:ext", &extent)?;
        end(xml, "a:xfrm")?;
        start(xml, "a:prstGeom", &[("prst", "rect")])?;
        empty(xml, "a:avLst", &[])?;
        end(xml, "a:prstGeom")?;
        end(xml, "pic:spPr")?;

        end(xml, "pic:pic")?;
        end(xml, "a:graphicData")?;
        end(xml, "a:graphic")?;
        end(xml, "wp:inline")?;
        end(xml, "w:drawing")?;
        end(xml, "w:r")?;

        self.media.push(Media {
            rel_id,
            file_name,
            bytes: asset.bytes.clone(),
        });
        Ok(())
    }

    /// Borderless table, three equal columns
    fn table(&mut self, rows: &[[Cell; 3]]) -> Result<()> {
        start(&mut self.xml, "w:tbl", &[])?;

        start(&mut self.xml, "w:tblPr", &[])?;
        empty(&mut self.xml, "w:tblW", &[("w:w", "5000"), ("w:type", "pct")])?;
        start(&mut self.xml, "w:tblBorders", &[])?;
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            empty(&mut self.xml, side, &[("w:val", "nil")])?;
        }
        end(&mut self.xml, "w:tblBorders")?;
        end(&mut self.xml, "w:tblPr")?;

        start(&mut self.xml, "w:tblGrid", &[])?;
        for _ in 0..3 {
            empty(&mut self.xml, "w:gridCol", &[("w:w", "3000")])?;
        }
        end(&mut self.xml, "w:tblGrid")?;

        for row in rows {
            start(&mut self.xml, "w:tr", &[])?;
            for cell in row {
                start(&mut self.xml, "w:tc", &[])?;
                start(&mut self.xml, "w:tcPr", &[])?;
                empty(&mut self.xml, "w:tcW", &[("w:w", "1667"), ("w:type", "pct")])?;
                end(&mut self.xml, "w:tcPr")?;

                match cell {
                    // A cell must hold at least one paragraph
                    Cell::Blank => {
                        for _ in 0..3 {
                            self.empty_paragraph()?;
                        }
                    }
                    Cell::Text(text, bold) => {
                        let style = RunStyle { bold: *bold, size: None };
                        self.paragraph(text, style, Align::Center)?;
                    }
                    Cell::Image(asset, name) => {
                        self.image_paragraph(asset, name, SIGNATURE_WIDTH_CM)?;
                    }
                }

                end(&mut self.xml, "w:tc")?;
            }
            end(&mut self.xml, "w:tr")?;
        }

        end(&mut self.xml, "w:tbl")
    }

    /// Close the body with an A4 section and return the XML bytes
    fn finish_document(mut self) -> Result<(Vec<u8>, Vec<Media>)> {
        start(&mut self.xml, "w:sectPr", &[])?;
        empty(&mut self.xml, "w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        empty(
            &mut self.xml,
            "w:pgMar",
            &[
                ("w:top", "1134"),
                ("w:right", "1134"),
                ("w:bottom", "1134"),
                ("w:left", "1134"),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        end(&mut self.xml, "w:sectPr")?;
        end(&mut self.xml, "w:body")?;
        end(&mut self.xml, "w:document")?;

        Ok((self.xml.into_inner().into_inner(), self.media))
    }
}

fn document_rels(media: &[Media]) -> Result<Vec<u8>> {
    let mut xml = Writer::new(Cursor::new(Vec::new()));
    declaration(&mut xml)?;
    start(&mut xml, "Relationships", &[("xmlns", RELS_NS)])?;
    for item in media {
        let target = format!("media/{}", item.file_name);
        empty(
            &mut xml,
            "Relationship",
            &[("Id", item.rel_id.as_str()), ("Type", IMAGE_REL_TYPE), ("Target", target.as_str())],
        )?;
    }
    end(&mut xml, "Relationships")?;
    Ok(xml.into_inner().into_inner())
}

/// Zip the package parts together
fn package(document_xml: Vec<u8>, media: Vec<Media>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec()),
        ("word/_rels/document.xml.rels", document_rels(&media)?),
        ("word/document.xml", document_xml),
    ];
    for (name, content) in &parts {
        zip.start_file(*name, options)
            .with_context(|| format!("Could not add {} to DOCX", name))?;
        zip.write_all(content)?;
    }

    for item in &media {
        zip.start_file(format!("word/media/{}", item.file_name), options)?;
        zip.write_all(&item.bytes)?;
    }

    let cursor = zip.finish().context("Could not finish DOCX archive")?;
    Ok(cursor.into_inner())
}

/// Render a letter as a DOCX package
pub fn render(document: &LetterDocument) -> Result<Vec<u8>> {
    let letter = &document.letter;
    let village = &document.village;
    let mut docx = DocxBuilder::new()?;

    // Letterhead
    if let Some(logo) = document.logo() {
        docx.image_paragraph(&logo, "logo", LOGO_WIDTH_CM)?;
    }
    let heads = village.letterhead_lines();
    let last = heads.len().saturating_sub(1);
    for (i, line) in heads.iter().enumerate() {
        // Village name line is the largest
        let size = if i == last { 32 } else { 26 };
        docx.paragraph(line, RunStyle { bold: true, size: Some(size) }, Align::Center)?;
    }
    let contact = village.contact_line();
    if !contact.is_empty() {
        docx.paragraph(&contact, RunStyle { bold: false, size: Some(18) }, Align::Center)?;
    }
    docx.rule()?;
    docx.empty_paragraph()?;

    // Title and number
    docx.paragraph(
        &letter.title.to_uppercase(),
        RunStyle { bold: true, size: Some(26) },
        Align::Center,
    )?;
    docx.paragraph(&document.number_line(), RunStyle::default(), Align::Center)?;
    docx.empty_paragraph()?;

    // Body, one paragraph per line
    for paragraph in letter.content.lines() {
        if paragraph.trim().is_empty() {
            docx.empty_paragraph()?;
        } else {
            docx.paragraph(paragraph, RunStyle::default(), Align::Left)?;
        }
    }
    docx.empty_paragraph()?;

    // Signature block
    docx.paragraph(&document.place_and_date(), RunStyle::default(), Align::Right)?;

    let signature = match document.signature() {
        Some(asset) => Cell::Image(asset, "signature"),
        None => Cell::Blank,
    };
    let rows = [
        [
            Cell::Text("Pemohon,".into(), false),
            Cell::Text("Saksi,".into(), false),
            Cell::Text(format!("{},", document.leader_heading()), false),
        ],
        [Cell::Blank, Cell::Blank, signature],
        [
            Cell::Text(document.resident.name.clone(), true),
            Cell::Text("(.........................)".into(), false),
            Cell::Text(village.leader_name.clone(), true),
        ],
    ];
    docx.table(&rows)?;

    let (document_xml, media) = docx.finish_document()?;
    package(document_xml, media)
}
