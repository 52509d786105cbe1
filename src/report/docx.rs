//! Minimal WordprocessingML writer.
//!
//! A report becomes a zip package with the main document, a style part
//! carrying the default font, and one PNG media part per figure. Timestamps
//! inside the package are fixed, so identical reports produce identical files.

use std::{
    fmt::Write as _,
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use zip::{write::SimpleFileOptions, CompressionMethod, DateTime, ZipWriter};

use crate::error::{ReportError, Result};

use super::{Block, Figure, Report};

const EMU_PER_INCH: f64 = 914_400.0;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// US Letter with one-inch margins leaves 6.5 inches of text width.
const SECTION_PROPERTIES: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;

pub fn write_docx(report: &Report, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    let mut writer = write_package(report, BufWriter::new(file))?;
    writer.flush().map_err(|e| ReportError::io(path, e))?;

    Ok(())
}

/// Writes the package into `inner` and hands it back.
pub fn write_package<W: Write + Seek>(report: &Report, inner: W) -> Result<W> {
    let mut zip = ZipWriter::new(inner);
    let xml = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let media = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());

    let figures: Vec<&Figure> = report.figures().collect();

    put(&mut zip, "[Content_Types].xml", CONTENT_TYPES.as_bytes(), xml)?;
    put(&mut zip, "_rels/.rels", PACKAGE_RELS.as_bytes(), xml)?;
    put(&mut zip, "word/document.xml", document_xml(report).as_bytes(), xml)?;
    put(&mut zip, "word/styles.xml", styles_xml(report).as_bytes(), xml)?;
    put(
        &mut zip,
        "word/_rels/document.xml.rels",
        document_rels(figures.len()).as_bytes(),
        xml,
    )?;
    for (i, figure) in figures.iter().enumerate() {
        put(&mut zip, &format!("word/media/image{}.png", i + 1), &figure.png, media)?;
    }

    Ok(zip.finish()?)
}

fn put<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(name, options)?;
    zip.write_all(bytes)
        .map_err(|e| ReportError::io(Path::new(name), e))
}

fn document_rels(images: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    let _ = write!(xml, r#"<Relationship Id="rId1" Type="{REL_STYLES}" Target="styles.xml"/>"#);
    for n in 1..=images {
        let _ = write!(
            xml,
            r#"<Relationship Id="rId{}" Type="{REL_IMAGE}" Target="media/image{n}.png"/>"#,
            n + 1
        );
    }
    xml.push_str("</Relationships>");

    xml
}

fn styles_xml(report: &Report) -> String {
    let font = escape(&report.style.font);
    // sizes are in half-points
    let size = report.style.font_size_pt * 2;

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/><w:sz w:val="{size}"/><w:szCs w:val="{size}"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style></w:styles>"#
    )
}

fn document_xml(report: &Report) -> String {
    let mut body = String::new();
    let mut image = 0;

    for section in &report.sections {
        paragraph(&mut body, "center", true, &section.heading);

        for block in &section.blocks {
            match block {
                Block::Caption(text) => paragraph(&mut body, "left", false, text),
                Block::Text(text) => {
                    for part in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
                        paragraph(&mut body, "both", false, part);
                    }
                }
                Block::Figure(figure) => {
                    image += 1;
                    drawing(&mut body, image, figure, report.style.image_width_in);
                }
                Block::PageBreak => body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
            }
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>{body}{SECTION_PROPERTIES}</w:body></w:document>"#
    )
}

fn paragraph(out: &mut String, align: &str, bold: bool, text: &str) {
    let run_props = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    let _ = write!(
        out,
        r#"<w:p><w:pPr><w:jc w:val="{align}"/></w:pPr><w:r>{run_props}<w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    );
}

fn drawing(out: &mut String, n: usize, figure: &Figure, width_in: f64) {
    let (cx, cy) = extent_emu(figure.width, figure.height, width_in);
    let rid = n + 1;
    let descr = figure.kind.suffix();

    let _ = write!(
        out,
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{n}" name="Picture {n}" descr="{descr}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="{n}" name="image{n}.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="rId{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#
    );
}

/// Picture size in EMU at a fixed width, keeping the pixel aspect ratio.
pub fn extent_emu(width_px: u32, height_px: u32, width_in: f64) -> (u64, u64) {
    let cx = (width_in * EMU_PER_INCH).round();
    let cy = if width_px == 0 {
        0.0
    } else {
        (cx * f64::from(height_px) / f64::from(width_px)).round()
    };

    (cx as u64, cy as u64)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }

    out
}

// -- Tests -------------------------------------------------------------------
