mod client;
mod invoice;
mod invoice_line;
mod product;
mod catalog;
mod reference;
mod page;

pub use client::Client;
pub use invoice::{Invoice, InvoiceStatus};
pub use invoice_line::InvoiceLine;
pub use product::Product;
pub use catalog::{CatalogEntry, CatalogKind};
pub use reference::{DocumentType, PaymentMethod, Salesperson};
pub use page::Page;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn invoice_list_rows_decode_without_lines() {
        let body = r#"{
            "items": [
                {
                    "id": 12,
                    "number": "F-0012",
                    "client_id": 3,
                    "client_name": "ACME",
                    "date": "2024-03-01",
                    "status": "issued",
                    "payment_method_id": 1,
                    "salesperson_id": null,
                    "general_discount": 0.0,
                    "total": 97.5
                }
            ],
            "page": 1,
            "total_pages": 4,
            "total": 61
        }"#;

        let page: Page<Invoice> = serde_json::from_str(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more());

        let invoice = &page.items[0];
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(invoice.lines.is_empty());
    }

    #[test]
    fn invoice_detail_decodes_with_lines() {
        let body = r#"{
            "id": 12,
            "number": "F-0012",
            "client_id": 3,
            "client_name": "ACME",
            "date": "2024-03-01",
            "status": "draft",
            "payment_method_id": 1,
            "salesperson_id": 7,
            "general_discount": 5.0,
            "lines": [
                {
                    "product_id": 1,
                    "product_name": "Widget",
                    "unit_price": 100.0,
                    "quantity": 2.0,
                    "discount": 10.0
                }
            ],
            "total": 171.0
        }"#;

        let invoice: Invoice = serde_json::from_str(body).unwrap();
        assert_eq!(invoice.salesperson_id, Some(7));
        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].quantity, 2.0);
    }

    #[test]
    fn status_round_trips_in_lowercase() {
        let encoded = serde_json::to_string(&InvoiceStatus::Cancelled).unwrap();
        assert_eq!(encoded, "\"cancelled\"");

        let decoded: InvoiceStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(decoded, InvoiceStatus::Paid);
    }

    #[test]
    fn client_decodes_with_nullable_fields() {
        let body = r#"{
            "id": 3,
            "name": "ACME",
            "tax_id": "20100012345",
            "document_type_id": null,
            "email": "billing@acme.test",
            "phone": "",
            "address": null
        }"#;

        let client: Client = serde_json::from_str(body).unwrap();
        assert_eq!(client.document_type_id, None);
        assert_eq!(client.address, None);
    }

    #[test]
    fn service_product_decodes() {
        let body = r#"{
            "id": 8,
            "code": "SVC-001",
            "name": "Installation",
            "price": 50.0,
            "stock": 0.0,
            "is_service": true,
            "product_type_id": 2,
            "category_id": null,
            "brand_id": null
        }"#;

        let product: Product = serde_json::from_str(body).unwrap();
        assert!(product.is_service);
        assert_eq!(product.product_type_id, Some(2));
    }
}
