//! URL construction for client stubs.

use crate::query::QueryParams;

/// Builds `{base}/{type}[/{id}|/{id1,id2}][?query]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base_url: String,
}

impl UrlBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ids are percent-encoded one by one and joined with commas; an empty id list addresses
    /// the whole collection.
    pub fn build(&self, resource_type: &str, ids: &[String], params: Option<&QueryParams>) -> String {
        let mut url = format!("{}/{}", self.base_url, resource_type);
        if !ids.is_empty() {
            let ids: Vec<_> = ids.iter().map(|id| urlencoding::encode(id)).collect();
            url.push('/');
            url.push_str(&ids.join(","));
        }
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            url.push('?');
            url.push_str(&params.to_query_string());
        }
        url
    }
}
