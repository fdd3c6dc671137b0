use crate::report::ReportContent;
use crate::text::strip_diacritics;
use ab_glyph::{Font, FontArc, GlyphId};
use anyhow::{anyhow, Context};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Turns one student's report content into a finished document.
///
/// Implementations must be pure per call: the generator may invoke `render`
/// for several students at once from worker threads.
pub trait DocumentRenderer: Sync {
    fn render(&self, content: &ReportContent) -> anyhow::Result<Vec<u8>>;

    fn file_extension(&self) -> &'static str {
        "pdf"
    }
}

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const CM: f32 = 28.3465;
const MARGIN: f32 = 2.0 * CM;

const TITLE: &str = "Mokinio pasiekimų įrašas";
const SUBJECT_HEADER: &str = "Dalykas";
const VALUE_HEADER: &str = "Įvertinimas";

const FONT_FILE: &str = "DejaVuSerif.ttf";
const FONT_ENV: &str = "REPORTCARDD_FONT";
const SYSTEM_FONT_DIRS: [&str; 2] = ["/usr/share/fonts/truetype/dejavu", "/usr/share/fonts/TTF"];

/// Fonts and metrics, set up once and shared by every render call.
///
/// With `font_path` set, that TrueType font is embedded and carries every
/// Lithuanian letter. Without it (or when it fails to load) the standard
/// Helvetica pair is used with WinAnsi encoding.
#[derive(Debug, Clone)]
pub struct PdfStyle {
    pub font_path: Option<PathBuf>,
    pub regular_font: &'static str,
    pub bold_font: &'static str,
    pub title_size: f32,
    pub title_leading: f32,
    pub body_size: f32,
    pub body_leading: f32,
    pub table_size: f32,
    pub row_height: f32,
    pub subject_col_width: f32,
    pub value_col_width: f32,
}

impl Default for PdfStyle {
    fn default() -> Self {
        Self {
            font_path: None,
            regular_font: "Helvetica",
            bold_font: "Helvetica-Bold",
            title_size: 16.0,
            title_leading: 20.0,
            body_size: 10.0,
            body_leading: 14.0,
            table_size: 9.0,
            row_height: 16.0,
            subject_col_width: 10.0 * CM,
            value_col_width: 4.0 * CM,
        }
    }
}

impl PdfStyle {
    /// Default style using the first `DejaVuSerif.ttf` found: `$REPORTCARDD_FONT`,
    /// the working directory, the executable's directory, then system font dirs.
    pub fn discover() -> Self {
        Self {
            font_path: discover_font(),
            ..Self::default()
        }
    }
}

pub fn discover_font() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(p) = std::env::var(FONT_ENV) {
        if !p.trim().is_empty() {
            candidates.push(PathBuf::from(p));
        }
    }
    candidates.push(PathBuf::from(FONT_FILE));
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join(FONT_FILE));
    }
    candidates.extend(SYSTEM_FONT_DIRS.iter().map(|d| Path::new(d).join(FONT_FILE)));
    candidates.into_iter().find(|p| p.is_file())
}

/// TrueType font read once and embedded whole into each document.
pub struct EmbeddedFont {
    base_name: String,
    face: FontArc,
    units_per_em: f32,
    /// Compressed `FontFile2` stream, cloned into every document.
    file_stream: Stream,
}

impl EmbeddedFont {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.to_string_lossy()))?;
        let face = FontArc::try_from_vec(data.clone())
            .map_err(|e| anyhow!("invalid font {}: {e}", path.to_string_lossy()))?;
        let units_per_em = face.units_per_em().unwrap_or(1000.0);

        let mut file_stream = Stream::new(dictionary! { "Length1" => data.len() as i64 }, data);
        file_stream.compress().context("failed to compress font program")?;

        let base_name: String = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let base_name = if base_name.is_empty() {
            "EmbeddedFont".to_string()
        } else {
            base_name
        };

        Ok(Self {
            base_name,
            face,
            units_per_em,
            file_stream,
        })
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Glyph for `ch`, falling back to the base letter when the font lacks it.
    fn glyph(&self, ch: char) -> u16 {
        let id = self.face.glyph_id(ch).0;
        if id != 0 {
            return id;
        }
        strip_diacritics(ch.encode_utf8(&mut [0u8; 4]))
            .chars()
            .next()
            .map(|c| self.face.glyph_id(c).0)
            .unwrap_or(0)
    }

    /// Advance width in PDF glyph space (1000 units per em).
    fn advance(&self, glyph: u16) -> f32 {
        self.face.h_advance_unscaled(GlyphId(glyph)) * 1000.0 / self.units_per_em
    }

    fn scaled(&self, v: f32) -> i64 {
        (v * 1000.0 / self.units_per_em).round() as i64
    }

    fn text_width(&self, s: &str, size: f32) -> f32 {
        s.chars().map(|c| self.advance(self.glyph(c))).sum::<f32>() * size / 1000.0
    }
}

#[derive(Clone)]
pub struct PdfRenderer {
    style: PdfStyle,
    font: Option<Arc<EmbeddedFont>>,
}

impl PdfRenderer {
    pub fn new(style: PdfStyle) -> Self {
        let font = match &style.font_path {
            None => {
                tracing::warn!("no TrueType font found, using Helvetica; Lithuanian letters lose diacritics");
                None
            }
            Some(path) => match EmbeddedFont::load(path) {
                Ok(font) => {
                    tracing::info!(path = %path.to_string_lossy(), "embedding font");
                    Some(Arc::new(font))
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "font failed to load, using Helvetica");
                    None
                }
            },
        };
        Self { style, font }
    }

    /// Name of the font the documents are set in.
    pub fn font_name(&self) -> &str {
        match &self.font {
            Some(f) => f.base_name(),
            None => self.style.regular_font,
        }
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new(PdfStyle::default())
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, content: &ReportContent) -> anyhow::Result<Vec<u8>> {
        let flow = layout_report(&self.style, self.font.as_deref(), content);
        assemble_pdf(&self.style, self.font.as_deref(), &content.student_name, flow)
    }
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

struct PageFlow<'a> {
    style: &'a PdfStyle,
    font: Option<&'a EmbeddedFont>,
    pages: Vec<Vec<Operation>>,
    /// Glyphs shown so far with the character each one stands for.
    used: BTreeMap<u16, char>,
    y: f32,
}

impl<'a> PageFlow<'a> {
    fn new(style: &'a PdfStyle, font: Option<&'a EmbeddedFont>) -> Self {
        Self {
            style,
            font,
            pages: vec![Vec::new()],
            used: BTreeMap::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn width(&self, s: &str, size: f32) -> f32 {
        match self.font {
            Some(f) => f.text_width(s, size),
            None => standard_width(s, size),
        }
    }

    fn fit(&self, s: &str, size: f32, max_width: f32) -> String {
        fit_text(s, max_width, |t| self.width(t, size))
    }

    fn encode(&mut self, s: &str) -> Object {
        let Some(font) = self.font else {
            return Object::String(encode_win_ansi(s), StringFormat::Literal);
        };
        let mut bytes = Vec::with_capacity(s.len() * 2);
        for ch in s.chars() {
            let glyph = font.glyph(ch);
            self.used.entry(glyph).or_insert(ch);
            bytes.extend_from_slice(&glyph.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Starts a new page when `height` no longer fits. Returns true on a break.
    fn reserve(&mut self, height: f32) -> bool {
        if self.y - height >= MARGIN {
            return false;
        }
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
        true
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text_at(&mut self, face: Face, size: f32, x: f32, y: f32, s: &str) {
        let text = self.encode(s);
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![face.resource().into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![text]));
        ops.push(Operation::new("ET", vec![]));
    }

    fn labeled_line(&mut self, label: &str, value: &str) {
        let size = self.style.body_size;
        self.reserve(self.style.body_leading);
        self.y -= self.style.body_leading;
        let y = self.y;
        self.text_at(Face::Regular, size, MARGIN, y, label);
        let x = MARGIN + self.width(label, size) + self.width(" ", size);
        self.text_at(Face::Bold, size, x, y, value);
    }

    fn table_row(&mut self, subject: &str, value: &str, header: bool) {
        let s = self.style;
        let h = s.row_height;
        let total = s.subject_col_width + s.value_col_width;
        let x0 = (PAGE_WIDTH - total) / 2.0;
        let bottom = self.y - h;

        if header {
            let ops = self.ops();
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("rg", vec![0.83f32.into(), 0.83f32.into(), 0.83f32.into()]));
            ops.push(Operation::new("re", vec![x0.into(), bottom.into(), total.into(), h.into()]));
            ops.push(Operation::new("f", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }

        {
            let ops = self.ops();
            ops.push(Operation::new("q", vec![]));
            ops.push(Operation::new("RG", vec![0.5f32.into(), 0.5f32.into(), 0.5f32.into()]));
            ops.push(Operation::new("w", vec![0.25f32.into()]));
            for (x, w) in [(x0, s.subject_col_width), (x0 + s.subject_col_width, s.value_col_width)] {
                ops.push(Operation::new("re", vec![x.into(), bottom.into(), w.into(), h.into()]));
            }
            ops.push(Operation::new("S", vec![]));
            ops.push(Operation::new("Q", vec![]));
        }

        let size = s.table_size;
        let baseline = bottom + (h - size) / 2.0 + 1.5;
        let subject = self.fit(subject, size, s.subject_col_width - 12.0);
        self.text_at(Face::Regular, size, x0 + 6.0, baseline, &subject);
        let value = self.fit(value, size, s.value_col_width - 12.0);
        let vx = x0 + s.subject_col_width + (s.value_col_width - self.width(&value, size)) / 2.0;
        self.text_at(Face::Regular, size, vx, baseline, &value);

        self.y = bottom;
    }
}

fn layout_report<'a>(
    style: &'a PdfStyle,
    font: Option<&'a EmbeddedFont>,
    content: &ReportContent,
) -> PageFlow<'a> {
    let mut flow = PageFlow::new(style, font);

    flow.y -= style.title_leading;
    let title_x = (PAGE_WIDTH - flow.width(TITLE, style.title_size)) / 2.0;
    let title_y = flow.y;
    flow.text_at(Face::Bold, style.title_size, title_x, title_y, TITLE);
    flow.y -= 10.0;

    if !content.institution.is_empty() {
        flow.labeled_line("Mokykla:", &content.institution);
    }
    if !content.class_label.is_empty() {
        flow.labeled_line("Klasė:", &content.class_label);
    }
    if !content.academic_year.is_empty() {
        flow.labeled_line("Mokslo metai:", &content.academic_year);
    }
    flow.labeled_line("Mokinys:", &content.student_name);
    flow.y -= 10.0;

    flow.reserve(style.row_height * 2.0);
    flow.table_row(SUBJECT_HEADER, VALUE_HEADER, true);
    for (subject, value) in &content.subjects {
        if flow.reserve(style.row_height) {
            flow.table_row(SUBJECT_HEADER, VALUE_HEADER, true);
        }
        flow.table_row(subject, value, false);
    }

    flow.y -= 10.0;
    flow.reserve(style.body_leading);
    flow.y -= style.body_leading;
    let y = flow.y;
    flow.text_at(Face::Regular, style.body_size, MARGIN, y, content.closing.sentence());

    flow
}

/// Type0 font over an Identity-H CID font, with a ToUnicode map for the glyphs shown.
fn add_embedded_font(doc: &mut Document, font: &EmbeddedFont, used: &BTreeMap<u16, char>) -> ObjectId {
    let name = || Object::Name(font.base_name.as_bytes().to_vec());
    let file_id = doc.add_object(font.file_stream.clone());

    let ascent = font.scaled(font.face.ascent_unscaled());
    let descent = font.scaled(font.face.descent_unscaled());
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => name(),
        "Flags" => 32,
        "FontBBox" => vec![Object::Integer(-1000), Object::Integer(descent), Object::Integer(2000), Object::Integer(ascent)],
        "ItalicAngle" => 0,
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => ascent,
        "StemV" => 80,
        "FontFile2" => file_id,
    });

    let mut widths: Vec<Object> = Vec::with_capacity(used.len() * 2);
    for &glyph in used.keys() {
        widths.push(Object::Integer(glyph as i64));
        widths.push(Object::Array(vec![Object::Integer(font.advance(glyph).round() as i64)]));
    }
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => name(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(used)));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => name(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    })
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let pairs: Vec<(&u16, &char)> = used.iter().collect();
    // bfchar blocks hold at most 100 entries.
    for chunk in pairs.chunks(100) {
        out.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (glyph, ch) in chunk {
            let target: String = ch
                .encode_utf16(&mut [0u16; 2])
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            out.push_str(&format!("<{glyph:04X}> <{target}>\n"));
        }
        out.push_str("endbfchar\n");
    }
    out.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    out.into_bytes()
}

fn assemble_pdf(
    style: &PdfStyle,
    font: Option<&EmbeddedFont>,
    student_name: &str,
    flow: PageFlow<'_>,
) -> anyhow::Result<Vec<u8>> {
    let PageFlow { pages, used, .. } = flow;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let (regular_id, bold_id) = match font {
        Some(font) => {
            let id = add_embedded_font(&mut doc, font, &used);
            (id, id)
        }
        None => {
            let regular = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.regular_font,
                "Encoding" => "WinAnsiEncoding",
            });
            let bold = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.bold_font,
                "Encoding" => "WinAnsiEncoding",
            });
            (regular, bold)
        }
    };
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Face::Regular.resource() => regular_id,
            Face::Bold.resource() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let encoded = Content { operations }
            .encode()
            .context("failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.0f32.into(), 0.0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let created = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(utf16_text(&format!("{TITLE} – {student_name}")), StringFormat::Hexadecimal),
        "Producer" => Object::string_literal(concat!("reportcardd ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).context("failed to serialize pdf")?;
    Ok(out)
}

/// PDF text string with a UTF-16BE byte order mark, for document info fields.
fn utf16_text(s: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Maps text onto the WinAnsi code page of the standard fonts. Letters it
/// lacks (most Lithuanian ones among them) fall back to their base letter.
pub fn encode_win_ansi(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        if let Some(b) = win_ansi_byte(ch) {
            out.push(b);
            continue;
        }
        let folded = strip_diacritics(ch.encode_utf8(&mut [0u8; 4]));
        let mut pushed = false;
        for f in folded.chars() {
            if let Some(b) = win_ansi_byte(f) {
                out.push(b);
                pushed = true;
            }
        }
        if !pushed {
            out.push(b'?');
        }
    }
    out
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    if (0x20..0x7F).contains(&code) || (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }
    let b = match ch {
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '–' => 0x96,
        '—' => 0x97,
        'Š' => 0x8A,
        'š' => 0x9A,
        'Ž' => 0x8E,
        'ž' => 0x9E,
        _ => return None,
    };
    Some(b)
}

/// Rough Helvetica advance widths, good enough for centering and clipping.
fn standard_width(s: &str, size: f32) -> f32 {
    s.chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | 'Į' | 'į' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.24,
            ' ' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '/' | '-' => 0.32,
            'm' | 'w' | 'M' | 'W' => 0.82,
            c if c.is_uppercase() => 0.68,
            c if c.is_ascii_digit() => 0.56,
            _ => 0.54,
        })
        .sum::<f32>()
        * size
}

fn fit_text(s: &str, max_width: f32, width: impl Fn(&str) -> f32) -> String {
    if width(s) <= max_width {
        return s.to_string();
    }
    let ellipsis = width("…");
    let mut out: String = s.to_string();
    while !out.is_empty() && width(&out) + ellipsis > max_width {
        out.pop();
    }
    format!("{}…", out.trim_end())
}
