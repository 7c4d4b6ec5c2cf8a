//! Record catalog reader.
//!
//! Authenticates against the source admin API, then pages through all image
//! records ordered by creation time (descending) until an empty page. Any
//! failure is `CatalogUnavailable`: later phases assume a complete enumeration.

mod graphql;

use serde_json::json;

use crate::error::{MigrationError, TransportError};
use crate::http::{bearer, HttpClient};
use crate::record::Record;

/// Records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Unauthenticated handle to the catalog endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: HttpClient,
    endpoint: String,
}

/// Authenticated catalog handle. Built once by `CatalogClient::login` and passed by reference.
#[derive(Debug, Clone)]
pub struct CatalogSession {
    http: HttpClient,
    endpoint: String,
    auth_header: String,
}

impl CatalogClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// Exchange email/password for a bearer token.
    pub fn login(&self, email: &str, password: &str) -> Result<CatalogSession, MigrationError> {
        let body = graphql::request(
            graphql::CREATE_SESSION,
            json!({ "email": email, "password": password }),
        );
        let token = self
            .http
            .post_json(&self.endpoint, &[], &body)
            .and_then(|resp| graphql::session_token(&resp))
            .map_err(|e| MigrationError::catalog("login", e))?;
        tracing::info!("authenticated against catalog at {}", self.endpoint);
        Ok(CatalogSession {
            http: self.http.clone(),
            endpoint: self.endpoint.clone(),
            auth_header: bearer(&token),
        })
    }
}

impl CatalogSession {
    /// One page of records starting at `skip`.
    pub fn fetch_page(&self, skip: u64, take: u32) -> Result<Vec<Record>, TransportError> {
        let body = graphql::request(
            graphql::IMAGES,
            json!({
                "take": take,
                "skip": skip,
                "sort": graphql::SORT_FIELD,
                "order": graphql::SORT_ORDER,
            }),
        );
        let resp = self
            .http
            .post_json(&self.endpoint, std::slice::from_ref(&self.auth_header), &body)?;
        graphql::image_nodes(&resp)
    }

    /// Every record in catalog order.
    pub fn list_all_records(&self, page_size: u32) -> Result<Vec<Record>, MigrationError> {
        collect_pages(page_size, |skip, take| self.fetch_page(skip, take))
    }
}

/// Pagination loop: request `take` records at `skip = page * take` until a page is empty.
/// Pages are concatenated as returned; no deduplication.
pub fn collect_pages<F>(page_size: u32, mut fetch: F) -> Result<Vec<Record>, MigrationError>
where
    F: FnMut(u64, u32) -> Result<Vec<Record>, TransportError>,
{
    let take = page_size.max(1);
    let mut records = Vec::new();
    let mut page: u64 = 0;
    loop {
        let skip = page * u64::from(take);
        tracing::info!("fetching catalog page {} (skip {})", page, skip);
        let nodes = fetch(skip, take).map_err(|e| MigrationError::catalog(format!("page {}", page), e))?;
        if nodes.is_empty() {
            break;
        }
        records.extend(nodes);
        page += 1;
    }
    tracing::info!("catalog lists {} record(s) over {} page(s)", records.len(), page);
    Ok(records)
}
