//! Minimal PDF 1.4 writer for text-only documents.
//!
//! Produces A4 pages with the two standard Helvetica fonts and uncompressed
//! content streams, so the text of a document can be found in its bytes.
//! Output depends only on the input lines: no creation date, no document id.

use std::fmt::Write as _;

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 56;
const LINE_HEIGHT: u32 = 28;
const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LINE_HEIGHT) as usize;

/// Font objects are fixed at 3 (regular) and 4 (bold).
const FIRST_PAGE_OBJECT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextStyle {
    Heading,
    Body,
}

impl TextStyle {
    fn font(self) -> &'static str {
        match self {
            TextStyle::Heading => "F2",
            TextStyle::Body => "F1",
        }
    }

    fn size(self) -> u32 {
        match self {
            TextStyle::Heading => 16,
            TextStyle::Body => 12,
        }
    }

    /// Rough Helvetica capacity of one line at this size.
    fn max_chars(self) -> usize {
        match self {
            TextStyle::Heading => 55,
            TextStyle::Body => 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextLine {
    pub style: TextStyle,
    pub text: String,
}

impl TextLine {
    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            style: TextStyle::Heading,
            text: text.into(),
        }
    }

    pub fn body(text: impl Into<String>) -> Self {
        Self {
            style: TextStyle::Body,
            text: text.into(),
        }
    }
}

/// Lays `lines` out top to bottom, wrapping long lines and starting a new
/// page when the current one is full.
pub(crate) fn write_document(lines: &[TextLine]) -> Vec<u8> {
    let wrapped: Vec<TextLine> = lines
        .iter()
        .flat_map(|line| {
            wrap(&line.text, line.style.max_chars())
                .into_iter()
                .map(move |text| TextLine {
                    style: line.style,
                    text,
                })
        })
        .collect();

    let pages: Vec<&[TextLine]> = if wrapped.is_empty() {
        vec![&[]]
    } else {
        wrapped.chunks(LINES_PER_PAGE).collect()
    };

    let mut writer = PdfWriter::new();

    writer.object("<< /Type /Catalog /Pages 2 0 R >>");

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJECT + 2 * i))
        .collect();
    writer.object(&format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        pages.len()
    ));

    writer.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>");
    writer.object("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>");

    for (i, page) in pages.iter().enumerate() {
        let contents = FIRST_PAGE_OBJECT + 2 * i + 1;
        writer.object(&format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {contents} 0 R >>"
        ));
        writer.stream(&page_content(page));
    }

    writer.finish()
}

fn page_content(lines: &[TextLine]) -> String {
    let mut content = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        // Writing into a String cannot fail.
        let _ = writeln!(
            content,
            "BT /{} {} Tf {} {} Td ({}) Tj ET",
            line.style.font(),
            line.style.size(),
            MARGIN,
            y,
            escape(&line.text)
        );
        y -= LINE_HEIGHT;
    }
    content
}

/// Escapes PDF string delimiters; characters outside printable ASCII become `?`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + word.len() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Tracks byte offsets of numbered objects for the cross-reference table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        Self {
            buf: b"%PDF-1.4\n".to_vec(),
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &str) {
        self.offsets.push(self.buf.len());
        let number = self.offsets.len();
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    fn stream(&mut self, content: &str) {
        self.object(&format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let size = self.offsets.len() + 1;

        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
        );

        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
