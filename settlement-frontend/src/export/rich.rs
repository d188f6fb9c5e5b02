use crate::export::canvas::{
    wrap_text, Align, Canvas, Layout, PageSize, TextStyle, Weight, ACCENT, MUTED,
};
use crate::export::table::{columns_width, Column, Table};
use crate::export::{
    created_label, detail_rows, period_label, running_header, summary_rows, RenderContext,
    SettlementDocument, SettlementRenderer, PAGE_MARGIN, TOTAL_LABEL,
};
use crate::models::dates::format_short_date;
use crate::models::money::format_currency;

const SUMMARY_COLUMNS: [Column; 2] = [
    Column::new("Concept", 110.0, Align::Left),
    Column::new("Value", 60.0, Align::Right),
];

const DETAIL_COLUMNS: [Column; 6] = [
    Column::new("#", 10.0, Align::Center),
    Column::new("Date", 22.0, Align::Left),
    Column::new("Time", 14.0, Align::Left),
    Column::new("Client", 40.0, Align::Left),
    Column::new("Services", 59.0, Align::Left),
    Column::new("Total", 25.0, Align::Right),
];

/// Table-based layout.
pub struct TableRenderer;

impl TableRenderer {
    /// Whether both tables fit between the margins of `page`.
    pub fn fits(page: PageSize) -> bool {
        let printable = page.width - 2.0 * PAGE_MARGIN;
        columns_width(&DETAIL_COLUMNS) <= printable && columns_width(&SUMMARY_COLUMNS) <= printable
    }
}

impl SettlementRenderer for TableRenderer {
    fn name(&self) -> &'static str {
        "rich"
    }

    fn render(&self, document: &SettlementDocument<'_>, context: &RenderContext) -> Layout {
        let settlement = document.settlement;
        let mut canvas = Canvas::new(context.page, PAGE_MARGIN);
        canvas.set_running_header(running_header(&context.brand_name, settlement));
        let (left, right) = (canvas.left(), canvas.right());

        // Title block
        canvas.text(left, 25.0, TextStyle::bold(18.0), context.brand_name.as_str());
        canvas.text(
            right,
            25.0,
            TextStyle::bold(14.0).with_color(ACCENT).aligned(Align::Right),
            format!("Settlement #{}", settlement.id),
        );
        canvas.text(
            left,
            33.0,
            TextStyle::regular(12.0).with_color(MUTED),
            context.document_title.as_str(),
        );
        canvas.set_cursor(38.0);
        canvas.rule(0.8, ACCENT);

        // Provider and period, total payable on the right
        canvas.set_cursor(48.0);
        let label = TextStyle::bold(10.0);
        let value = TextStyle::regular(10.0);
        let details = [
            ("Provider:", settlement.provider_name()),
            ("Period:", period_label(settlement)),
            ("Created:", created_label(settlement)),
        ];
        for (name, text) in details {
            let y = canvas.cursor();
            canvas.text(left, y, label, name);
            canvas.text(left + 25.0, y, value, text);
            canvas.advance(6.0);
        }
        canvas.text(
            right,
            48.0,
            TextStyle::bold(10.0).with_color(MUTED).aligned(Align::Right),
            format!("{}:", TOTAL_LABEL),
        );
        canvas.text(
            right,
            57.0,
            TextStyle::bold(16.0).with_color(ACCENT).aligned(Align::Right),
            format_currency(settlement.total_a_pagar),
        );
        canvas.advance(6.0);

        // Summary
        canvas.text_line(left, TextStyle::bold(12.0), "Settlement Summary");
        canvas.advance(1.0);
        let rows: Vec<Vec<String>> = summary_rows(settlement)
            .into_iter()
            .map(|(name, amount)| vec![name.to_string(), amount])
            .collect();
        Table::new(&SUMMARY_COLUMNS, 10.0).draw(&mut canvas, left, &rows);
        canvas.advance(8.0);

        if let Some(notes) = settlement.notes() {
            canvas.text_line(left, TextStyle::bold(12.0), "Notes");
            let style = TextStyle::regular(10.0);
            for line in wrap_text(notes, canvas.printable_width(), style.size, Weight::Regular) {
                canvas.text_line(left, style, line);
            }
            canvas.advance(6.0);
        }

        if !document.lines.is_empty() {
            canvas.text_line(
                left,
                TextStyle::bold(12.0),
                format!("Appointment Detail ({})", document.lines.len()),
            );
            canvas.advance(1.0);
            Table::new(&DETAIL_COLUMNS, 9.0).draw(&mut canvas, left, &detail_rows(document.lines));

            canvas.advance(4.0);
            canvas.ensure_space(10.0);
            canvas.advance(5.0);
            let y = canvas.cursor();
            canvas.text(
                right - 45.0,
                y,
                TextStyle::bold(12.0).aligned(Align::Right),
                format!("{}:", TOTAL_LABEL),
            );
            canvas.text(
                right,
                y,
                TextStyle::bold(14.0).with_color(ACCENT).aligned(Align::Right),
                format_currency(settlement.total_a_pagar),
            );
        }

        canvas.finish(&format_short_date(context.generated_on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PageFormat;

    #[test]
    fn detail_table_fits_a4_and_letter_only() {
        assert!(TableRenderer::fits(PageFormat::A4.size()));
        assert!(TableRenderer::fits(PageFormat::Letter.size()));
        assert!(!TableRenderer::fits(PageFormat::A5.size()));
    }
}
