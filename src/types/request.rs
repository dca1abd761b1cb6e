//! Request Types
//!
//! Immutable description of an outbound API call.

use std::collections::BTreeMap;
use url::Url;

use crate::error::{ApiResult, ConfigurationError};

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Description of a read-only API request.
///
/// Builder methods consume `self` and return a new value; an auth strategy
/// derives a decorated copy and leaves the original untouched. Query
/// parameter names are unique: setting an existing name replaces its value
/// in place. Parameters with an absent value are omitted from the URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestSpec {
    method: HttpMethod,
    base_url: String,
    query: Vec<(String, Option<String>)>,
    headers: BTreeMap<String, String>,
}

impl RequestSpec {
    /// Create a GET request for `base_url`.
    pub fn get(base_url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            base_url: base_url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
        }
    }

    /// Add or replace a query parameter.
    pub fn with_query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_optional_query(name, Some(value.into()))
    }

    /// Add or replace a query parameter whose value may be absent.
    pub fn with_optional_query(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        let name = name.into();
        match self.query.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.query.push((name, value)),
        }
        self
    }

    /// Add or replace a header. Header names are case-insensitive and stored lowercased.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters in insertion order, including absent ones.
    pub fn query(&self) -> &[(String, Option<String>)] {
        &self.query
    }

    /// Query parameters that carry a value, in insertion order.
    pub fn present_query(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (name.as_str(), v)))
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(existing, _)| existing == name)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse the base URL without query parameters applied.
    pub fn parsed_base_url(&self) -> ApiResult<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            ConfigurationError::InvalidUrl {
                url: self.base_url.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Full URL with present query parameters applied.
    ///
    /// A parameter set on the request replaces every base-URL pair of the same
    /// name, so each name appears at most once; an absent value removes it.
    pub fn url(&self) -> ApiResult<Url> {
        let mut url = self.parsed_base_url()?;
        if self.query.is_empty() {
            return Ok(url);
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !self.query.iter().any(|(own, _)| own == name))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        url.set_query(None);
        let mut present = kept
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(self.present_query())
            .peekable();
        if present.peek().is_some() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }
}
