//! Invoice PDF rendering.
//!
//! Renders an invoice snapshot onto A4 pages with the built-in Helvetica
//! fonts. Long item lists continue on additional pages.

use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use rust_decimal::Decimal;
use thiserror::Error;

use factura_shared::AppError;

const PAGE_WIDTH: u16 = 210;
const PAGE_HEIGHT: u16 = 297;
const MARGIN_LEFT: u16 = 15;
const MARGIN_RIGHT: u16 = 195;
const TOP: u16 = 282;
const BOTTOM: u16 = 30;

const COL_QTY: u16 = 115;
const COL_UNIT: u16 = 140;
const COL_AMOUNT: u16 = 170;
const COL_LABEL: u16 = 130;

/// PDF rendering errors.
#[derive(Debug, Error)]
pub enum PdfError {
    /// printpdf refused to build the document.
    #[error("failed to render invoice PDF: {0}")]
    Render(String),

    /// Serialising the document failed.
    #[error("failed to write invoice PDF: {0}")]
    Write(String),
}

impl From<PdfError> for AppError {
    fn from(err: PdfError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A party block printed on the invoice.
#[derive(Debug, Clone, Default)]
pub struct Party {
    /// Display name.
    pub name: String,
    /// Tax id (Matricule Fiscal), business side only.
    pub tax_id: Option<String>,
    /// Email, client side only.
    pub email: Option<String>,
    /// Pre-formatted address lines.
    pub address: Vec<String>,
}

/// One printed line item.
#[derive(Debug, Clone)]
pub struct DocumentLine {
    /// Item description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit price.
    pub unit_price: Decimal,
    /// `quantity × unit_price`.
    pub amount: Decimal,
}

/// Everything printed on an invoice PDF.
#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    /// `INV-<year>-<seq>`.
    pub number: String,
    /// Status label.
    pub status: String,
    /// Issue date.
    pub date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Issuing business.
    pub business: Party,
    /// Billed client.
    pub client: Party,
    /// Line items.
    pub items: Vec<DocumentLine>,
    /// Sum of line amounts.
    pub subtotal: Decimal,
    /// Tax percentage, if any.
    pub tax_rate: Option<Decimal>,
    /// Tax amount.
    pub tax: Decimal,
    /// `subtotal + tax`.
    pub total: Decimal,
    /// Currency code.
    pub currency: String,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Formats an amount with three decimals.
#[must_use]
pub fn format_amount(value: Decimal) -> String {
    format!("{value:.3}")
}

fn mm(value: u16) -> Mm {
    Mm(f32::from(value))
}

/// Writes onto the current page and opens new pages when it runs out of room.
struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: u16,
}

impl Canvas {
    fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) =
            PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PdfError::Render(e.to_string()))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
        })
    }

    fn text(&self, text: &str, size: f32, x: u16) {
        self.layer.use_text(text, size, mm(x), mm(self.y), &self.regular);
    }

    fn bold(&self, text: &str, size: f32, x: u16) {
        self.layer.use_text(text, size, mm(x), mm(self.y), &self.bold);
    }

    fn rule(&self) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(mm(MARGIN_LEFT), mm(self.y)), false),
                (Point::new(mm(MARGIN_RIGHT), mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    /// Moves down `step` millimetres, starting a new page when needed.
    fn advance(&mut self, step: u16) {
        match self.y.checked_sub(step) {
            Some(y) if y >= BOTTOM => self.y = y,
            _ => {
                let (page, layer) = self.doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
                self.layer = self.doc.get_page(page).get_layer(layer);
                self.y = TOP;
            }
        }
    }

    fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| PdfError::Write(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| PdfError::Write(e.to_string()))
    }
}

/// Renders an invoice to PDF bytes.
///
/// # Errors
///
/// Returns `PdfError` if printpdf cannot build or serialise the document.
pub fn render_invoice(invoice: &InvoiceDocument) -> Result<Vec<u8>, PdfError> {
    let mut canvas = Canvas::new(&format!("Facture {}", invoice.number))?;

    canvas.bold("FACTURE / INVOICE", 20.0, MARGIN_LEFT);
    canvas.advance(10);
    canvas.text(&format!("Numéro: {}", invoice.number), 10.0, MARGIN_LEFT);
    canvas.advance(5);
    canvas.text(&format!("Date: {}", invoice.date.format("%d/%m/%Y")), 10.0, MARGIN_LEFT);
    canvas.advance(5);
    canvas.text(
        &format!("Échéance: {}", invoice.due_date.format("%d/%m/%Y")),
        10.0,
        MARGIN_LEFT,
    );
    canvas.advance(5);
    canvas.text(&format!("Statut: {}", invoice.status), 10.0, MARGIN_LEFT);

    canvas.advance(8);
    canvas.rule();
    canvas.advance(8);

    draw_party(&mut canvas, "DE:", &invoice.business);
    canvas.advance(4);
    draw_party(&mut canvas, "À:", &invoice.client);

    canvas.advance(8);
    canvas.bold("Description", 10.0, MARGIN_LEFT);
    canvas.bold("Qté", 10.0, COL_QTY);
    canvas.bold("P.U.", 10.0, COL_UNIT);
    canvas.bold("Montant", 10.0, COL_AMOUNT);
    canvas.advance(3);
    canvas.rule();
    canvas.advance(6);

    for item in &invoice.items {
        canvas.text(&item.description, 10.0, MARGIN_LEFT);
        canvas.text(&format_amount(item.quantity), 10.0, COL_QTY);
        canvas.text(&format_amount(item.unit_price), 10.0, COL_UNIT);
        canvas.text(&format_amount(item.amount), 10.0, COL_AMOUNT);
        canvas.advance(6);
    }

    canvas.rule();
    canvas.advance(8);
    canvas.text("Sous-total HT:", 10.0, COL_LABEL);
    canvas.text(&format_amount(invoice.subtotal), 10.0, COL_AMOUNT);
    if let Some(rate) = invoice.tax_rate {
        canvas.advance(6);
        canvas.text(&format!("TVA ({}%):", rate.normalize()), 10.0, COL_LABEL);
        canvas.text(&format_amount(invoice.tax), 10.0, COL_AMOUNT);
    }
    canvas.advance(7);
    canvas.bold("TOTAL TTC:", 12.0, COL_LABEL);
    canvas.bold(
        &format!("{} {}", format_amount(invoice.total), invoice.currency),
        12.0,
        COL_AMOUNT - 5,
    );

    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        canvas.advance(14);
        canvas.bold("Notes:", 10.0, MARGIN_LEFT);
        for line in notes.lines() {
            canvas.advance(5);
            canvas.text(line, 9.0, MARGIN_LEFT);
        }
    }

    canvas.advance(15);
    canvas.text("Merci pour votre confiance", 9.0, MARGIN_LEFT);

    canvas.finish()
}

fn draw_party(canvas: &mut Canvas, label: &str, party: &Party) {
    canvas.bold(label, 11.0, MARGIN_LEFT);
    canvas.advance(6);
    canvas.bold(&party.name, 10.0, MARGIN_LEFT);
    if let Some(tax_id) = &party.tax_id {
        canvas.advance(5);
        canvas.text(&format!("Matricule Fiscal: {tax_id}"), 9.0, MARGIN_LEFT);
    }
    if let Some(email) = &party.email {
        canvas.advance(5);
        canvas.text(email, 9.0, MARGIN_LEFT);
    }
    for line in &party.address {
        canvas.advance(5);
        canvas.text(line, 9.0, MARGIN_LEFT);
    }
    canvas.advance(5);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn document(item_count: usize) -> InvoiceDocument {
        let items = (0..item_count)
            .map(|i| DocumentLine {
                description: format!("Prestation {i}"),
                quantity: dec!(2),
                unit_price: dec!(10),
                amount: dec!(20),
            })
            .collect();

        InvoiceDocument {
            number: "INV-2026-001".into(),
            status: "DRAFT".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            business: Party {
                name: "Atelier Sfax".into(),
                tax_id: Some("1234567/A/B/M/000".into()),
                email: None,
                address: vec!["12 rue de la Liberté".into(), "3000 Sfax, Tunisie".into()],
            },
            client: Party {
                name: "Client SARL".into(),
                tax_id: None,
                email: Some("client@example.com".into()),
                address: vec![],
            },
            items,
            subtotal: dec!(25),
            tax_rate: Some(dec!(19)),
            tax: dec!(4.75),
            total: dec!(29.75),
            currency: "TND".into(),
            notes: Some("Paiement à 30 jours\nMerci".into()),
        }
    }

    #[test]
    fn test_format_amount_three_decimals() {
        assert_eq!(format_amount(dec!(29.75)), "29.750");
        assert_eq!(format_amount(dec!(0)), "0.000");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_invoice(&document(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_invoices_overflow_to_new_pages() {
        let short = render_invoice(&document(1)).unwrap();
        let long = render_invoice(&document(120)).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }
}
