use std::path::{Path, PathBuf};

use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::templates::{PageLayout, Template};

const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.35;
const BORDER_INSET: f32 = 7.0;
const INNER_BORDER_GAP: f32 = 3.5;
const WATERMARK_WIDTH: f32 = 70.0;
const WATERMARK_OPACITY: f32 = 0.06;
const WATERMARK_DPI: f32 = 300.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pdf error: {0}")]
    Pdf(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Lays out certificate templates as PDF pages.
#[derive(Debug, Clone, Default)]
pub struct CertificateRenderer {
    watermark_path: Option<PathBuf>,
}

impl CertificateRenderer {
    pub fn new(watermark_path: Option<PathBuf>) -> Self {
        Self { watermark_path }
    }

    pub fn render(&self, template: &Template) -> RenderResult<RenderedDocument> {
        let geometry = PageGeometry::for_layout(template.layout);
        let title = format!(
            "{} {}",
            template.kind.label(),
            template.certificate_number
        );
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(geometry.width), Mm(geometry.height), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let fonts = Fonts::load(&doc)?;
        let watermark = self
            .watermark_path
            .as_deref()
            .and_then(load_watermark);

        let mut canvas = Canvas {
            doc: &doc,
            layer,
            fonts,
            geometry,
            palette: Palette::for_layout(template.layout),
            watermark,
            cursor: 0.0,
            pages: 0,
        };
        canvas.decorate_page();
        layout_template(&mut canvas, template);

        let page_count = canvas.pages;
        drop(canvas);

        let bytes = doc
            .save_to_bytes()
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        debug!(
            certificate_number = %template.certificate_number,
            pages = page_count,
            size_bytes = bytes.len(),
            "rendered certificate"
        );
        Ok(RenderedDocument { bytes, page_count })
    }
}

fn layout_template(canvas: &mut Canvas<'_>, template: &Template) {
    let align = match template.layout {
        PageLayout::Letter => Align::Left,
        PageLayout::Certificate => Align::Center,
    };
    let palette = canvas.palette;

    match template.layout {
        PageLayout::Letter => {
            canvas.paragraph(&template.title, 18.0, FontWeight::Bold, palette.heading, align);
            canvas.paragraph(&template.subtitle, 11.0, FontWeight::Regular, palette.text, align);
        }
        PageLayout::Certificate => {
            canvas.paragraph(&template.title, 28.0, FontWeight::Bold, palette.heading, align);
            canvas.gap(1.5);
            canvas.paragraph(&template.subtitle, 14.0, FontWeight::Regular, palette.accent, align);
            canvas.gap(3.0);
        }
    }
    canvas.paragraph(&template.organization, 18.0, FontWeight::Bold, palette.heading, align);
    canvas.paragraph(&template.tagline, 12.0, FontWeight::Regular, palette.accent, align);
    canvas.gap(5.0);

    if template.layout == PageLayout::Letter {
        let date = format!("Date: {}", format_issue_date(template));
        canvas.paragraph(&date, 11.0, FontWeight::Regular, palette.text, align);
        canvas.gap(2.0);
    }

    if !template.subject.is_empty() {
        let subject = format!("Subject: {}", template.subject);
        canvas.paragraph(&subject, 13.0, FontWeight::Bold, palette.accent, align);
        canvas.gap(2.0);
    }

    for fact in &template.facts {
        canvas.paragraph(fact, 11.0, FontWeight::Regular, palette.text, align);
    }
    if !template.facts.is_empty() {
        canvas.gap(2.0);
    }

    if !template.salutation.is_empty() {
        canvas.paragraph(&template.salutation, 12.0, FontWeight::Regular, palette.text, align);
        canvas.gap(2.0);
    }

    for paragraph in &template.body {
        if paragraph.emphasis {
            canvas.gap(1.0);
            canvas.paragraph(&paragraph.text, 18.0, FontWeight::Bold, palette.heading, align);
            canvas.gap(1.0);
        } else {
            canvas.paragraph(&paragraph.text, 12.0, FontWeight::Regular, palette.text, align);
            if template.layout == PageLayout::Letter {
                canvas.gap(3.0);
            }
        }
    }
    canvas.gap(4.0);

    for achievement in &template.achievements {
        canvas.bullet(achievement, 10.0, palette.accent, align);
    }
    if !template.achievements.is_empty() {
        canvas.gap(3.0);
    }

    for endorsement in &template.endorsements {
        canvas.paragraph(endorsement, 10.0, FontWeight::Regular, palette.text, align);
        canvas.gap(1.5);
    }
    canvas.gap(3.0);

    canvas.signatures(&template.signatories);
    canvas.gap(2.0);

    let id_line = format!("Certificate ID: {}", template.certificate_number);
    let issued_line = format!("Issued on: {}", format_issue_date(template));
    canvas.paragraph(&id_line, 9.0, FontWeight::Regular, palette.muted, align);
    canvas.paragraph(&issued_line, 9.0, FontWeight::Regular, palette.muted, align);
}

fn format_issue_date(template: &Template) -> String {
    template.issued_on.format("%B %d, %Y").to_string()
}

#[derive(Debug, Clone, Copy)]
struct PageGeometry {
    width: f32,
    height: f32,
    margin_x: f32,
    margin_top: f32,
    margin_bottom: f32,
    bottom_strip: bool,
}

impl PageGeometry {
    fn for_layout(layout: PageLayout) -> Self {
        match layout {
            PageLayout::Letter => Self {
                width: 210.0,
                height: 297.0,
                margin_x: 22.0,
                margin_top: 22.0,
                margin_bottom: 28.0,
                bottom_strip: true,
            },
            PageLayout::Certificate => Self {
                width: 297.0,
                height: 210.0,
                margin_x: 28.0,
                margin_top: 16.0,
                margin_bottom: 14.0,
                bottom_strip: false,
            },
        }
    }

    fn text_width(&self) -> f32 {
        self.width - 2.0 * self.margin_x
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    outer_border: (u8, u8, u8),
    inner_border: (u8, u8, u8),
    heading: (u8, u8, u8),
    accent: (u8, u8, u8),
    text: (u8, u8, u8),
    muted: (u8, u8, u8),
}

impl Palette {
    fn for_layout(layout: PageLayout) -> Self {
        match layout {
            PageLayout::Letter => Self {
                outer_border: (0x00, 0x00, 0x80),
                inner_border: (0x2A, 0x9D, 0x8F),
                heading: (0x1B, 0x7A, 0x3A),
                accent: (0x2B, 0x6C, 0xB0),
                text: (0x1A, 0x1A, 0x1A),
                muted: (0x4A, 0x55, 0x68),
            },
            PageLayout::Certificate => Self {
                outer_border: (0x23, 0x4E, 0x70),
                inner_border: (0x2A, 0x9D, 0x8F),
                heading: (0x1D, 0x35, 0x57),
                accent: (0x2A, 0x9D, 0x8F),
                text: (0x23, 0x4E, 0x70),
                muted: (0x4A, 0x55, 0x68),
            },
        }
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> RenderResult<Self> {
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        Ok(Self { regular, bold })
    }

    fn get(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    geometry: PageGeometry,
    palette: Palette,
    watermark: Option<DynamicImage>,
    /// Baseline of the next line, in mm from the bottom edge.
    cursor: f32,
    pages: usize,
}

impl Canvas<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(self.geometry.width),
            Mm(self.geometry.height),
            "Layer 1",
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.decorate_page();
    }

    fn decorate_page(&mut self) {
        let g = self.geometry;

        self.layer.set_fill_color(rgb((0xFF, 0xFF, 0xFF)));
        self.layer.add_rect(
            Rect::new(Mm(0.0), Mm(0.0), Mm(g.width), Mm(g.height)).with_mode(PaintMode::Fill),
        );

        if let Some(image) = &self.watermark {
            place_watermark(&self.layer, image, g);
        }

        self.layer.set_outline_color(rgb(self.palette.outer_border));
        self.layer.set_outline_thickness(2.0);
        self.layer.add_rect(
            Rect::new(
                Mm(BORDER_INSET),
                Mm(BORDER_INSET),
                Mm(g.width - BORDER_INSET),
                Mm(g.height - BORDER_INSET),
            )
            .with_mode(PaintMode::Stroke),
        );

        let inner = BORDER_INSET + INNER_BORDER_GAP;
        self.layer.set_outline_color(rgb(self.palette.inner_border));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_rect(
            Rect::new(
                Mm(inner),
                Mm(inner),
                Mm(g.width - inner),
                Mm(g.height - inner),
            )
            .with_mode(PaintMode::Stroke),
        );

        if g.bottom_strip {
            self.layer.set_fill_color(rgb(self.palette.outer_border));
            self.layer.add_rect(
                Rect::new(
                    Mm(inner),
                    Mm(inner),
                    Mm(g.width - inner),
                    Mm(inner + 4.0),
                )
                .with_mode(PaintMode::Fill),
            );
        }

        self.cursor = g.height - g.margin_top;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < self.geometry.margin_bottom {
            self.new_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    fn paragraph(
        &mut self,
        text: &str,
        size: f32,
        weight: FontWeight,
        color: (u8, u8, u8),
        align: Align,
    ) {
        let text = pdf_safe_text(text);
        if text.trim().is_empty() {
            return;
        }
        let max_width = self.geometry.text_width();
        for line in wrap_text(&text, size, weight, max_width) {
            self.line(&line, size, weight, color, align, 0.0);
        }
    }

    fn bullet(&mut self, text: &str, size: f32, color: (u8, u8, u8), align: Align) {
        let text = pdf_safe_text(text);
        let indent = 5.0;
        let max_width = self.geometry.text_width() - indent;
        let lines = wrap_text(&text, size, FontWeight::Regular, max_width);
        for (index, line) in lines.iter().enumerate() {
            let x = self.line(line, size, FontWeight::Regular, color, align, indent);
            if index == 0 {
                let marker = size * PT_TO_MM * 0.3;
                let baseline = self.cursor;
                self.layer.set_fill_color(rgb(color));
                self.layer.add_rect(
                    Rect::new(
                        Mm(x - indent + 1.0),
                        Mm(baseline + marker * 0.6),
                        Mm(x - indent + 1.0 + marker),
                        Mm(baseline + marker * 1.6),
                    )
                    .with_mode(PaintMode::Fill),
                );
            }
        }
        self.gap(0.5);
    }

    /// Writes one line and returns the x position it started at.
    fn line(
        &mut self,
        text: &str,
        size: f32,
        weight: FontWeight,
        color: (u8, u8, u8),
        align: Align,
        indent: f32,
    ) -> f32 {
        let height = line_height(size);
        self.ensure_space(height);
        let width = text_width(text, size, weight);
        let x = match align {
            Align::Left => self.geometry.margin_x + indent,
            Align::Center => ((self.geometry.width - width + indent) / 2.0).max(self.geometry.margin_x),
        };
        self.cursor -= height;
        self.layer.set_fill_color(rgb(color));
        self.layer
            .use_text(text, size, Mm(x), Mm(self.cursor), self.fonts.get(weight));
        x
    }

    fn signatures(&mut self, captions: &[String; 2]) {
        let block = 20.0;
        self.ensure_space(block);
        let g = self.geometry;
        let rule_width = 60.0;
        let rule_y = self.cursor - 10.0;
        let caption_size = 11.0;

        for (index, caption) in captions.iter().enumerate() {
            let center = if index == 0 {
                g.width / 4.0
            } else {
                g.width * 3.0 / 4.0
            };
            self.layer.set_fill_color(rgb(self.palette.heading));
            self.layer.add_rect(
                Rect::new(
                    Mm(center - rule_width / 2.0),
                    Mm(rule_y),
                    Mm(center + rule_width / 2.0),
                    Mm(rule_y + 0.3),
                )
                .with_mode(PaintMode::Fill),
            );

            let caption = pdf_safe_text(caption);
            let width = text_width(&caption, caption_size, FontWeight::Regular);
            self.layer.use_text(
                caption,
                caption_size,
                Mm(center - width / 2.0),
                Mm(rule_y - line_height(caption_size)),
                self.fonts.get(FontWeight::Regular),
            );
        }

        self.cursor -= block;
    }
}

fn place_watermark(layer: &PdfLayerReference, image: &DynamicImage, g: PageGeometry) {
    let natural_width = image.width() as f32 / WATERMARK_DPI * 25.4;
    let natural_height = image.height() as f32 / WATERMARK_DPI * 25.4;
    if natural_width <= 0.0 || natural_height <= 0.0 {
        return;
    }
    let scale = WATERMARK_WIDTH / natural_width;
    let height = natural_height * scale;

    Image::from_dynamic_image(image).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm((g.width - WATERMARK_WIDTH) / 2.0)),
            translate_y: Some(Mm((g.height - height) / 2.0)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            dpi: Some(WATERMARK_DPI),
            ..Default::default()
        },
    );
}

/// Missing files are skipped quietly; unreadable ones are logged.
fn load_watermark(path: &Path) -> Option<DynamicImage> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read watermark image");
            return None;
        }
    };

    match image_crate::load_from_memory(&bytes) {
        Ok(image) => Some(fade(image)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to decode watermark image");
            None
        }
    }
}

/// Blends the image toward white, standing in for layer opacity.
/// Flattens onto white using the alpha channel, then lightens toward white.
fn fade(image: DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let rgb = image_crate::RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        image_crate::Rgb([r, g, b].map(|channel| {
            let ink = f32::from(channel) * alpha + 255.0 * (1.0 - alpha);
            let ink = (255.0 - ink) * WATERMARK_OPACITY;
            255 - ink.round() as u8
        }))
    });
    DynamicImage::ImageRgb8(rgb)
}

fn line_height(size: f32) -> f32 {
    size * LINE_SPACING * PT_TO_MM
}

/// The base-14 fonts only cover ASCII reliably.
fn pdf_safe_text(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '*',
            '\n' | '\t' => ' ',
            ch if ch.is_ascii() && !ch.is_ascii_control() => ch,
            _ => '?',
        })
        .collect()
}

// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

fn text_width(text: &str, size: f32, weight: FontWeight) -> f32 {
    let units: u32 = text
        .chars()
        .map(|ch| {
            let code = ch as u32;
            if (32..=126).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 32) as usize])
            } else {
                556
            }
        })
        .sum();
    let factor = match weight {
        FontWeight::Regular => 1.0,
        FontWeight::Bold => 1.06,
    };
    units as f32 / 1000.0 * size * PT_TO_MM * factor
}

fn wrap_text(text: &str, size: f32, weight: FontWeight, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if current.is_empty() || text_width(&candidate, size, weight) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
