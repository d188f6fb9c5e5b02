use crate::export::canvas::{
    wrap_text, Align, Canvas, Layout, TextStyle, Weight, MUTED, RULE,
};
use crate::export::{
    created_label, detail_rows, period_label, running_header, summary_rows, RenderContext,
    SettlementDocument, SettlementRenderer, PAGE_MARGIN, TOTAL_LABEL,
};
use crate::models::dates::format_short_date;
use crate::models::money::format_currency;

/// Detail columns as shares of the printable width.
const DETAIL_STOPS: [(&str, f32, Align); 6] = [
    ("#", 0.06, Align::Left),
    ("Date", 0.14, Align::Left),
    ("Time", 0.09, Align::Left),
    ("Client", 0.22, Align::Left),
    ("Services", 0.32, Align::Left),
    ("Total", 0.17, Align::Right),
];

/// Text and rules only; works on any page width.
pub struct PlainRenderer;

impl PlainRenderer {
    /// One detail row; cells too wide for their slot wrap onto extra lines.
    fn detail_row(canvas: &mut Canvas, cells: &[String], style: TextStyle) {
        let width = canvas.printable_width();
        let wrapped: Vec<Vec<String>> = DETAIL_STOPS
            .iter()
            .zip(cells)
            .map(|((_, share, _), cell)| {
                wrap_text(cell, width * share - 2.0, style.size, style.weight)
            })
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let row_height = line_count as f32 * style.line_height();

        canvas.ensure_space(row_height);
        let top = canvas.cursor();
        let mut x = canvas.left();

        for ((_, share, align), lines) in DETAIL_STOPS.iter().zip(wrapped) {
            let slot = width * share;
            let anchor = match align {
                Align::Right => x + slot,
                Align::Center => x + slot / 2.0,
                Align::Left => x,
            };
            for (offset, line) in lines.into_iter().enumerate() {
                let y = top + offset as f32 * style.line_height();
                canvas.text(anchor, y, style.aligned(*align), line);
            }
            x += slot;
        }
        canvas.advance(row_height);
    }
}

impl SettlementRenderer for PlainRenderer {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn render(&self, document: &SettlementDocument<'_>, context: &RenderContext) -> Layout {
        let settlement = document.settlement;
        let mut canvas = Canvas::new(context.page, PAGE_MARGIN);
        canvas.set_running_header(running_header(&context.brand_name, settlement));
        let (left, right) = (canvas.left(), canvas.right());
        let body = TextStyle::regular(10.0);

        canvas.set_cursor(25.0);
        canvas.text_line(left, TextStyle::bold(16.0), context.brand_name.as_str());
        canvas.text_line(
            left,
            TextStyle::regular(11.0).with_color(MUTED),
            format!("{} #{}", context.document_title, settlement.id),
        );
        canvas.advance(2.0);
        canvas.rule(0.5, MUTED);
        canvas.advance(8.0);

        for line in [
            format!("Provider: {}", settlement.provider_name()),
            format!("Period: {}", period_label(settlement)),
            format!("Created: {}", created_label(settlement)),
        ] {
            canvas.text_line(left, body, line);
        }
        canvas.advance(4.0);

        canvas.text_line(left, TextStyle::bold(11.0), "Summary");
        for (name, amount) in summary_rows(settlement) {
            let style = if name == TOTAL_LABEL {
                TextStyle::bold(11.0)
            } else {
                body
            };
            canvas.ensure_space(style.line_height());
            let y = canvas.cursor();
            canvas.text(left, y, style, name);
            canvas.text(right, y, style.aligned(Align::Right), amount);
            canvas.advance(style.line_height());
        }
        canvas.advance(4.0);

        if let Some(notes) = settlement.notes() {
            canvas.text_line(left, TextStyle::bold(11.0), "Notes");
            for line in wrap_text(notes, canvas.printable_width(), body.size, Weight::Regular) {
                canvas.text_line(left, body, line);
            }
            canvas.advance(4.0);
        }

        if !document.lines.is_empty() {
            canvas.text_line(
                left,
                TextStyle::bold(11.0),
                format!("Appointment Detail ({})", document.lines.len()),
            );

            let headings: Vec<String> = DETAIL_STOPS.iter().map(|(title, _, _)| title.to_string()).collect();
            let heading_style = TextStyle::bold(9.0).with_color(MUTED);
            Self::detail_row(&mut canvas, &headings, heading_style);
            canvas.rule(0.3, RULE);
            canvas.advance(1.5);

            let row_style = TextStyle::regular(9.0);
            for row in detail_rows(document.lines) {
                if canvas.ensure_space(row_style.line_height()) {
                    Self::detail_row(&mut canvas, &headings, heading_style);
                }
                Self::detail_row(&mut canvas, &row, row_style);
            }

            canvas.advance(2.0);
            canvas.ensure_space(8.0);
            canvas.rule(0.5, MUTED);
            canvas.advance(6.0);
            let y = canvas.cursor();
            let total_style = TextStyle::bold(11.0);
            canvas.text(left, y, total_style, format!("{}:", TOTAL_LABEL));
            canvas.text(
                right,
                y,
                total_style.aligned(Align::Right),
                format_currency(settlement.total_a_pagar),
            );
        }

        canvas.finish(&format_short_date(context.generated_on))
    }
}
