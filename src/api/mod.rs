use chrono::NaiveDate;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Config;
use crate::models::{
    CatalogEntry, CatalogKind, Client, DocumentType, Invoice, InvoiceStatus, Page, PaymentMethod,
    Product, Salesperson,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Status { status: StatusCode, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error body the backend attaches to non-2xx responses. Every field is
/// optional; plenty of errors arrive with an empty body.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the invoicing backend
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl ApiClient {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            page_size: config.page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.url(path);
        log::debug!("GET {url} {query:?}");

        let response = self.http.get(&url).query(query).send().await?;
        decode(response).await
    }

    // Invoice operations
    pub async fn list_invoices(
        &self,
        page: usize,
        status: Option<InvoiceStatus>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> ApiResult<Page<Invoice>> {
        let query = invoice_list_params(page, self.page_size, status, from, to);
        self.get_json("invoices", &query).await
    }

    pub async fn get_invoice(&self, id: i32) -> ApiResult<Invoice> {
        self.get_json(&format!("invoices/{id}"), &[]).await
    }

    pub async fn create_invoice(&self, invoice: &Invoice) -> ApiResult<Invoice> {
        let url = self.url("invoices");
        log::debug!("POST {url}");

        let response = self.http.post(&url).json(invoice).send().await?;
        decode(response).await
    }

    pub async fn update_invoice(&self, invoice: &Invoice) -> ApiResult<()> {
        let url = self.url(&format!("invoices/{}", invoice.id));
        log::debug!("PUT {url}");

        let response = self.http.put(&url).json(invoice).send().await?;
        decode_empty(response).await
    }

    // Client operations
    pub async fn list_clients(&self, page: usize, search: Option<&str>) -> ApiResult<Page<Client>> {
        let query = search_params(page, self.page_size, search);
        self.get_json("clients", &query).await
    }

    pub async fn get_client(&self, id: i32) -> ApiResult<Client> {
        self.get_json(&format!("clients/{id}"), &[]).await
    }

    pub async fn create_client(&self, client: &Client) -> ApiResult<Client> {
        let url = self.url("clients");
        log::debug!("POST {url}");

        let response = self.http.post(&url).json(client).send().await?;
        decode(response).await
    }

    pub async fn update_client(&self, client: &Client) -> ApiResult<()> {
        let url = self.url(&format!("clients/{}", client.id));
        log::debug!("PUT {url}");

        let response = self.http.put(&url).json(client).send().await?;
        decode_empty(response).await
    }

    pub async fn delete_client(&self, id: i32) -> ApiResult<()> {
        let url = self.url(&format!("clients/{id}"));
        log::debug!("DELETE {url}");

        let response = self.http.delete(&url).send().await?;
        decode_empty(response).await
    }

    // Product operations
    pub async fn list_products(
        &self,
        page: usize,
        search: Option<&str>,
    ) -> ApiResult<Page<Product>> {
        let query = search_params(page, self.page_size, search);
        self.get_json("products", &query).await
    }

    // Reference data, consumed read-only
    pub async fn document_types(&self) -> ApiResult<Vec<DocumentType>> {
        self.get_json("document-types", &[]).await
    }

    pub async fn payment_methods(&self) -> ApiResult<Vec<PaymentMethod>> {
        self.get_json("payment-methods", &[]).await
    }

    pub async fn salespeople(&self) -> ApiResult<Vec<Salesperson>> {
        self.get_json("salespeople", &[]).await
    }

    // Master-data lists (product types, categories, brands)
    pub async fn list_catalog(&self, kind: CatalogKind) -> ApiResult<Vec<CatalogEntry>> {
        self.get_json(kind.path(), &[]).await
    }

    pub async fn create_catalog(&self, kind: CatalogKind, name: &str) -> ApiResult<CatalogEntry> {
        let url = self.url(kind.path());
        log::debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn update_catalog(&self, kind: CatalogKind, entry: &CatalogEntry) -> ApiResult<()> {
        let url = self.url(&format!("{}/{}", kind.path(), entry.id));
        log::debug!("PUT {url}");

        let response = self.http.put(&url).json(entry).send().await?;
        decode_empty(response).await
    }

    pub async fn delete_catalog(&self, kind: CatalogKind, id: i32) -> ApiResult<()> {
        let url = self.url(&format!("{}/{}", kind.path(), id));
        log::debug!("DELETE {url}");

        let response = self.http.delete(&url).send().await?;
        decode_empty(response).await
    }
}

/// Build the query string for the invoice list. Absent filters stay out of
/// the query entirely; the backend treats a missing parameter as "all".
fn invoice_list_params(
    page: usize,
    page_size: usize,
    status: Option<InvoiceStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
    ];

    if let Some(status) = status {
        query.push(("status", status.as_param().to_string()));
    }
    if let Some(from) = from {
        query.push(("from", from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = to {
        query.push(("to", to.format("%Y-%m-%d").to_string()));
    }

    query
}

/// Query string for searchable lists (clients, products). An empty search is
/// the same as no search.
fn search_params(
    page: usize,
    page_size: usize,
    search: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", page.to_string()),
        ("page_size", page_size.to_string()),
    ];

    if let Some(term) = search {
        if !term.is_empty() {
            query.push(("search", term.to_string()));
        }
    }

    query
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = check_status(response).await?;
    Ok(response.json::<T>().await?)
}

async fn decode_empty(response: Response) -> ApiResult<()> {
    check_status(response).await?;
    Ok(())
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.text().await {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| format!("request failed with HTTP {status}")),
        Err(_) => format!("request failed with HTTP {status}"),
    };

    Err(ApiError::Status { status, message })
}

/// Build the API client from configuration
pub fn init(config: &Config) -> ApiResult<ApiClient> {
    ApiClient::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_params_carry_active_filters() {
        let query = invoice_list_params(
            3,
            20,
            Some(InvoiceStatus::Issued),
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        );

        assert!(query.contains(&("page", "3".to_string())));
        assert!(query.contains(&("status", "issued".to_string())));
        assert!(query.contains(&("from", "2024-01-01".to_string())));
        assert!(query.contains(&("to", "2024-01-31".to_string())));
    }

    #[test]
    fn cleared_filters_drop_out_of_the_query() {
        let query = invoice_list_params(1, 20, None, None, None);

        assert_eq!(
            query,
            vec![("page", "1".to_string()), ("page_size", "20".to_string())]
        );
    }

    #[test]
    fn empty_search_is_no_search() {
        assert_eq!(search_params(1, 20, Some("")), search_params(1, 20, None));

        let query = search_params(2, 20, Some("acme"));
        assert!(query.contains(&("search", "acme".to_string())));
    }
}
