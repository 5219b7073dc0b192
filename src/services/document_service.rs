// src/services/document_service.rs

use genpdf::{elements, style, Alignment, Element};
use image::Luma;
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{invoice::InvoiceDetail, user::User},
    services::invoice_service::InvoiceService,
};

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

/// Conteúdo do QR code: número da fatura e saldo em aberto
pub fn qr_payload(detail: &InvoiceDetail) -> String {
    format!(
        "{}|TOTAL:{:.2}|BALANCE:{:.2}",
        detail.invoice.invoice.invoice_number, detail.invoice.invoice.total_amount, detail.balance_due
    )
}

#[derive(Clone)]
pub struct DocumentService {
    invoice_service: InvoiceService,
    company_name: String,
    fonts_dir: String,
}

impl DocumentService {
    pub fn new(invoice_service: InvoiceService, company_name: String, fonts_dir: String) -> Self {
        Self {
            invoice_service,
            company_name,
            fonts_dir,
        }
    }

    pub async fn invoice_pdf(&self, user: &User, invoice_id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let detail = self.invoice_service.detail(user, invoice_id).await?;
        let bytes = self.render_invoice(&detail)?;
        Ok((detail.invoice.invoice.invoice_number.clone(), bytes))
    }

    pub fn render_invoice(&self, detail: &InvoiceDetail) -> Result<Vec<u8>, AppError> {
        let header = &detail.invoice.invoice;

        // Carrega a fonte da pasta configurada
        let font_family = genpdf::fonts::from_files(&self.fonts_dir, "Roboto", None).map_err(|e| {
            tracing::error!("🔥 Fonte Roboto não encontrada em {}: {}", self.fonts_dir, e);
            AppError::FontNotFound(format!("Roboto in {}", self.fonts_dir))
        })?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Invoice {}", header.invoice_number));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(
            elements::Paragraph::new(self.company_name.clone())
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(elements::Break::new(1.5));
        doc.push(
            elements::Paragraph::new(format!("INVOICE {}", header.invoice_number))
                .styled(style::Style::new().bold().with_font_size(14)),
        );
        doc.push(elements::Paragraph::new(format!(
            "Date: {}",
            header.invoice_date.format("%d/%m/%Y")
        )));
        if let Some(due) = header.due_date {
            doc.push(elements::Paragraph::new(format!("Due: {}", due.format("%d/%m/%Y"))));
        }
        doc.push(elements::Paragraph::new(format!("Status: {}", header.status.as_str())));
        doc.push(elements::Break::new(1));

        // --- DISTRIBUIDOR ---
        doc.push(
            elements::Paragraph::new(format!("Bill to: {}", detail.invoice.distributor_name))
                .styled(style::Style::new().bold()),
        );
        if let Some(address) = &detail.distributor_address {
            doc.push(elements::Paragraph::new(address.clone()));
        }
        if let Some(ntn) = &detail.distributor_ntn {
            doc.push(elements::Paragraph::new(format!("NTN: {}", ntn)));
        }
        if let Some(staff) = &detail.invoice.sales_staff_name {
            doc.push(elements::Paragraph::new(format!("Sales staff: {}", staff)));
        }
        doc.push(elements::Break::new(2));

        // --- ITENS ---
        // Pesos: Produto (4), Qtd (1), Unitário (2), Desc% (1), Imposto% (1), Total (2)
        let mut table = elements::TableLayout::new(vec![4, 1, 2, 1, 1, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Product").styled(style_bold))
            .element(elements::Paragraph::new("Qty").styled(style_bold))
            .element(elements::Paragraph::new("Unit price").styled(style_bold))
            .element(elements::Paragraph::new("Disc %").styled(style_bold))
            .element(elements::Paragraph::new("Tax %").styled(style_bold))
            .element(elements::Paragraph::new("Total").styled(style_bold))
            .push()
            .map_err(pdf_error)?;

        for line in &detail.items {
            table
                .row()
                .element(elements::Paragraph::new(format!(
                    "{} ({})",
                    line.product_name, line.product_code
                )))
                .element(elements::Paragraph::new(format!(
                    "{} {}",
                    line.item.quantity.normalize(),
                    line.unit_of_measure
                )))
                .element(elements::Paragraph::new(format!("{:.2}", line.item.unit_price)))
                .element(elements::Paragraph::new(format!("{:.2}", line.item.discount_percent)))
                .element(elements::Paragraph::new(format!("{:.2}", line.item.tax_rate)))
                .element(elements::Paragraph::new(format!("{:.2}", line.item.line_total)))
                .push()
                .map_err(pdf_error)?;
        }

        doc.push(table);
        doc.push(elements::Break::new(1.5));

        // --- TOTAIS ---
        let totals = [
            ("Subtotal", header.subtotal),
            ("Discount", header.discount_amount),
            ("Tax", header.tax_amount),
            ("Total", header.total_amount),
            ("Paid", header.paid_amount),
            ("Balance due", detail.balance_due),
        ];
        for (label, amount) in totals {
            let mut paragraph = elements::Paragraph::new(format!("{}: {:.2}", label, amount));
            paragraph.set_alignment(Alignment::Right);
            doc.push(paragraph.styled(style::Style::new().bold().with_font_size(11)));
        }

        // --- PAGAMENTOS ---
        if !detail.payments.is_empty() {
            doc.push(elements::Break::new(1.5));
            doc.push(
                elements::Paragraph::new("PAYMENTS").styled(style::Style::new().bold().with_font_size(12)),
            );
            for payment in &detail.payments {
                doc.push(elements::Paragraph::new(format!(
                    "{}  {}  {:.2}",
                    payment.payment_date.format("%d/%m/%Y"),
                    payment.payment_method.label(),
                    payment.amount
                )));
            }
        }

        // --- QR CODE ---
        doc.push(elements::Break::new(2));
        let code = QrCode::new(qr_payload(detail).as_bytes()).map_err(pdf_error)?;
        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);
        let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
            .map_err(pdf_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        if let Some(notes) = &header.notes {
            doc.push(elements::Break::new(1));
            doc.push(elements::Paragraph::new(notes.clone()).styled(style::Style::new().italic().with_font_size(8)));
        }

        // Renderiza em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(pdf_error)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        DistributorRepository, InvoiceRepository, PaymentRepository, ProductRepository, UserRepository,
    };
    use crate::models::invoice::{Invoice, InvoiceStatus, InvoiceSummary};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    fn detail() -> InvoiceDetail {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-202501-0007".into(),
            distributor_id: Uuid::new_v4(),
            sales_staff_id: None,
            invoice_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            due_date: None,
            subtotal: dec!(1000),
            tax_amount: dec!(170),
            discount_amount: dec!(0),
            total_amount: dec!(1170),
            paid_amount: dec!(500),
            status: InvoiceStatus::PartialPaid,
            notes: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        InvoiceDetail {
            balance_due: invoice.balance_due(),
            invoice: InvoiceSummary {
                invoice,
                distributor_name: "Al-Noor Traders".into(),
                sales_staff_name: None,
            },
            distributor_ntn: None,
            distributor_address: None,
            items: vec![],
            payments: vec![],
        }
    }

    #[test]
    fn qr_payload_carries_number_and_balance() {
        assert_eq!(qr_payload(&detail()), "INV-202501-0007|TOTAL:1170.00|BALANCE:670.00");
    }

    #[tokio::test]
    async fn missing_fonts_are_reported() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/invoicing_test")
            .unwrap();
        let invoices = InvoiceService::new(
            InvoiceRepository::new(pool.clone()),
            ProductRepository::new(pool.clone()),
            DistributorRepository::new(pool.clone()),
            PaymentRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            pool,
        );
        let service = DocumentService::new(invoices, "Test Co".into(), "./no-such-fonts-dir".into());

        let err = service.render_invoice(&detail()).unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
