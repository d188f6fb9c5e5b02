//! Writes a [`Layout`] out through `printpdf` with the built-in Helvetica faces.

use crate::export::canvas::{text_width, Align, Color as LayoutColor, DrawOp, Layout, Weight};
use crate::export::RenderError;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use std::io::BufWriter;

pub fn write_pdf(layout: &Layout, title: &str) -> Result<Vec<u8>, RenderError> {
    let (width, height) = (layout.size.width, layout.size.height);
    let (doc, first_page, first_layer) = PdfDocument::new(title, Mm(width), Mm(height), "Layer 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(format!("font error: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(format!("font error: {}", e)))?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(width), Mm(height), format!("Layer {}", index + 1));
            doc.get_page(page_index).get_layer(layer_index)
        };

        for op in &page.ops {
            draw(&layer, op, height, &regular, &bold);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Pdf(format!("save error: {}", e)))?;
    buf.into_inner()
        .map_err(|e| RenderError::Pdf(format!("buffer error: {}", e)))
}

fn draw(
    layer: &PdfLayerReference,
    op: &DrawOp,
    page_height: f32,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    match op {
        DrawOp::Text { x, y, style, text } => {
            let width = text_width(text, style.size, style.weight);
            let left = match style.align {
                Align::Left => *x,
                Align::Center => x - width / 2.0,
                Align::Right => x - width,
            };
            let font = match style.weight {
                Weight::Regular => regular,
                Weight::Bold => bold,
            };
            layer.set_fill_color(rgb(style.color));
            layer.use_text(text.as_str(), style.size, Mm(left), Mm(page_height - y), font);
        }
        DrawOp::Line {
            from,
            to,
            thickness,
            color,
        } => {
            layer.set_outline_color(rgb(*color));
            layer.set_outline_thickness(*thickness);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(from.0), Mm(page_height - from.1)), false),
                    (Point::new(Mm(to.0), Mm(page_height - to.1)), false),
                ],
                is_closed: false,
            });
        }
    }
}

fn rgb(color: LayoutColor) -> Color {
    let LayoutColor(r, g, b) = color;
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}
