//! Page layout as plain data.
//!
//! Renderers draw onto a [`Canvas`] in millimetres measured from the top-left
//! corner. The finished [`Layout`] is handed to the PDF writer, and tests can
//! inspect it without decoding a PDF.

/// Millimetres per typographic point.
pub const PT_TO_MM: f32 = 0.3528;

const FOOTER_BAND: f32 = 18.0;
const RUNNING_HEADER_Y: f32 = 12.0;
const CONTINUATION_START: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

pub const BLACK: Color = Color(33, 37, 41);
pub const MUTED: Color = Color(108, 117, 125);
pub const RULE: Color = Color(206, 212, 218);
pub const ACCENT: Color = Color(232, 62, 140);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub weight: Weight,
    pub color: Color,
    pub align: Align,
}

impl TextStyle {
    pub const fn regular(size: f32) -> Self {
        Self {
            size,
            weight: Weight::Regular,
            color: BLACK,
            align: Align::Left,
        }
    }

    pub const fn bold(size: f32) -> Self {
        Self {
            size,
            weight: Weight::Bold,
            color: BLACK,
            align: Align::Left,
        }
    }

    pub const fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub const fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Height of one text line, in millimetres.
    pub fn line_height(&self) -> f32 {
        self.size * PT_TO_MM * 1.4
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        style: TextStyle,
        text: String,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        thickness: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Line { .. } => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|text| text.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub size: PageSize,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn contains_text(&self, needle: &str) -> bool {
        self.pages.iter().any(|page| page.contains_text(needle))
    }
}

pub struct Canvas {
    size: PageSize,
    margin: f32,
    pages: Vec<Page>,
    cursor: f32,
    running_header: Option<String>,
}

impl Canvas {
    pub fn new(size: PageSize, margin: f32) -> Self {
        Self {
            size,
            margin,
            pages: vec![Page::default()],
            cursor: margin,
            running_header: None,
        }
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.size.width - self.margin
    }

    pub fn printable_width(&self) -> f32 {
        self.size.width - 2.0 * self.margin
    }

    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    pub fn set_cursor(&mut self, y: f32) {
        self.cursor = y;
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor += dy;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text repeated at the top of every page after the first.
    pub fn set_running_header(&mut self, text: impl Into<String>) {
        self.running_header = Some(text.into());
    }

    fn bottom_limit(&self) -> f32 {
        self.size.height - FOOTER_BAND
    }

    /// Start a new page unless `height` still fits below the cursor.
    /// Returns `true` when a page was added.
    pub fn ensure_space(&mut self, height: f32) -> bool {
        if self.cursor + height <= self.bottom_limit() {
            return false;
        }
        self.new_page();
        true
    }

    pub fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor = self.margin;

        if let Some(header) = self.running_header.clone() {
            let (left, right) = (self.left(), self.right());
            self.text(left, RUNNING_HEADER_Y, TextStyle::bold(9.0).with_color(MUTED), header);
            self.line((left, RUNNING_HEADER_Y + 2.0), (right, RUNNING_HEADER_Y + 2.0), 0.3, RULE);
            self.cursor = CONTINUATION_START;
        }
    }

    pub fn text(&mut self, x: f32, y: f32, style: TextStyle, text: impl Into<String>) {
        self.push(DrawOp::Text {
            x,
            y,
            style,
            text: text.into(),
        });
    }

    /// Draw at the cursor, then move it down one line.
    pub fn text_line(&mut self, x: f32, style: TextStyle, text: impl Into<String>) {
        self.ensure_space(style.line_height());
        let y = self.cursor;
        self.text(x, y, style, text);
        self.cursor += style.line_height();
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), thickness: f32, color: Color) {
        self.push(DrawOp::Line {
            from,
            to,
            thickness,
            color,
        });
    }

    /// Horizontal rule across the printable width at the cursor.
    pub fn rule(&mut self, thickness: f32, color: Color) {
        let (left, right, y) = (self.left(), self.right(), self.cursor);
        self.line((left, y), (right, y), thickness, color);
    }

    fn push(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Stamp every page with the generation date and its page number.
    pub fn finish(mut self, generated_on: &str) -> Layout {
        let total = self.pages.len();
        let (left, right) = (self.left(), self.right());
        let rule_y = self.size.height - 14.0;
        let text_y = self.size.height - 9.0;
        let style = TextStyle::regular(8.0).with_color(MUTED);

        for (index, page) in self.pages.iter_mut().enumerate() {
            page.ops.push(DrawOp::Line {
                from: (left, rule_y),
                to: (right, rule_y),
                thickness: 0.3,
                color: RULE,
            });
            page.ops.push(DrawOp::Text {
                x: left,
                y: text_y,
                style,
                text: format!("Generated: {}", generated_on),
            });
            page.ops.push(DrawOp::Text {
                x: right,
                y: text_y,
                style: style.aligned(Align::Right),
                text: format!("Page {} of {}", index + 1, total),
            });
        }

        Layout {
            size: self.size,
            pages: self.pages,
        }
    }
}

/// Estimated rendered width of `text` in Helvetica, in millimetres.
pub fn text_width(text: &str, size: f32, weight: Weight) -> f32 {
    let em = match weight {
        Weight::Regular => 0.5,
        Weight::Bold => 0.55,
    };
    text.chars().count() as f32 * size * em * PT_TO_MM
}

/// Word-wrap to `max_width`. Words longer than a line are split.
pub fn wrap_text(text: &str, max_width: f32, size: f32, weight: Weight) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            for piece in split_long_word(word, max_width, size, weight) {
                let candidate = if current.is_empty() {
                    piece.clone()
                } else {
                    format!("{} {}", current, piece)
                };
                if text_width(&candidate, size, weight) > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current = piece;
                } else {
                    current = candidate;
                }
            }
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn split_long_word(word: &str, max_width: f32, size: f32, weight: Weight) -> Vec<String> {
    if text_width(word, size, weight) <= max_width {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if text_width(&current, size, weight) > max_width && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
