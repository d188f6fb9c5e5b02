//! Grid layout for the rich renderer: fixed-width columns, wrapped cells,
//! header row repeated after page breaks.

use crate::export::canvas::{wrap_text, Align, Canvas, TextStyle, MUTED, PT_TO_MM, RULE};

const CELL_PADDING: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub width: f32,
    pub align: Align,
}

impl Column {
    pub const fn new(title: &'static str, width: f32, align: Align) -> Self {
        Self {
            title,
            width,
            align,
        }
    }
}

pub struct Table<'a> {
    columns: &'a [Column],
    header: TextStyle,
    body: TextStyle,
}

impl<'a> Table<'a> {
    pub fn new(columns: &'a [Column], font_size: f32) -> Self {
        Self {
            columns,
            header: TextStyle::bold(font_size),
            body: TextStyle::regular(font_size),
        }
    }

    pub fn width(&self) -> f32 {
        columns_width(self.columns)
    }

    fn cell_x(x: f32, column: &Column) -> f32 {
        match column.align {
            Align::Left => x + CELL_PADDING,
            Align::Center => x + column.width / 2.0,
            Align::Right => x + column.width - CELL_PADDING,
        }
    }

    fn draw_header(&self, canvas: &mut Canvas, left: f32) {
        let row_height = self.header.line_height() + 2.0 * CELL_PADDING;
        canvas.ensure_space(row_height);

        let baseline = canvas.cursor() + CELL_PADDING + self.header.size * PT_TO_MM;
        let mut x = left;
        for column in self.columns {
            let style = self.header.with_color(MUTED).aligned(column.align);
            canvas.text(Self::cell_x(x, column), baseline, style, column.title);
            x += column.width;
        }

        canvas.advance(row_height);
        let y = canvas.cursor();
        canvas.line((left, y), (left + self.width(), y), 0.5, MUTED);
    }

    /// Draw `rows` at the cursor, starting at `left`. Each row holds one
    /// cell per column.
    pub fn draw(&self, canvas: &mut Canvas, left: f32, rows: &[Vec<String>]) {
        self.draw_header(canvas, left);

        for row in rows {
            let cells: Vec<Vec<String>> = self
                .columns
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    let text = row.get(index).map(String::as_str).unwrap_or("");
                    wrap_text(
                        text,
                        column.width - 2.0 * CELL_PADDING,
                        self.body.size,
                        self.body.weight,
                    )
                })
                .collect();

            let line_count = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
            let row_height = line_count as f32 * self.body.line_height() + 2.0 * CELL_PADDING;

            if canvas.ensure_space(row_height) {
                self.draw_header(canvas, left);
            }

            let top = canvas.cursor() + CELL_PADDING + self.body.size * PT_TO_MM;
            let mut x = left;
            for (column, lines) in self.columns.iter().zip(&cells) {
                let style = self.body.aligned(column.align);
                for (offset, line) in lines.iter().enumerate() {
                    let y = top + offset as f32 * self.body.line_height();
                    canvas.text(Self::cell_x(x, column), y, style, line.clone());
                }
                x += column.width;
            }

            canvas.advance(row_height);
            let y = canvas.cursor();
            canvas.line((left, y), (left + self.width(), y), 0.2, RULE);
        }
    }
}

pub fn columns_width(columns: &[Column]) -> f32 {
    columns.iter().map(|c| c.width).sum()
}
