use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use scholar_logging::{scholar_debug, scholar_warn};

use crate::types::{
    normalize_facets, RawFiltersResponse, RawHarvestResponse, RawHealthResponse,
    RawSearchResponse,
};
use crate::{BackendError, FailureKind, HarvestOutcome, HealthReport, SearchPage, SearchRequest};

/// How the deployment spells its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiFlavor {
    /// `POST /harvest`, `POST /elis-live-search`, `POST /harvest-incremental` with JSON bodies.
    #[default]
    PostBody,
    /// `GET /search?q=..`, `GET /live-search`, `GET /filters`, `GET /harvest-now`.
    QueryString,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub flavor: ApiFlavor,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            flavor: ApiFlavor::PostBody,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            max_bytes: 8 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError>;

    async fn harvest(&self, category: &str) -> Result<HarvestOutcome, BackendError>;

    async fn health(&self) -> Result<HealthReport, BackendError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CachedSearchBody<'a> {
    category: &'a str,
    query: &'a str,
    page: u32,
    page_size: u32,
    filters: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveSearchBody<'a> {
    query: &'a str,
    page: u32,
    page_size: u32,
}

#[derive(Serialize)]
struct HarvestBody<'a> {
    category: &'a str,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let base = Url::parse(settings.base_url.trim())
            .map_err(|err| BackendError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::new(
                FailureKind::InvalidUrl,
                format!("{base} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| BackendError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        name: &str,
        body: &B,
    ) -> Result<Vec<u8>, BackendError> {
        let url = self.endpoint(name)?;
        scholar_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.read_body(response).await
    }

    async fn get(&self, name: &str, params: &[(&str, String)]) -> Result<Vec<u8>, BackendError> {
        let mut url = self.endpoint(name)?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        scholar_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.read_body(response).await
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(BackendError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(BackendError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn fetch_filters(&self) -> Result<crate::FacetMap, BackendError> {
        let bytes = self.get("filters", &[]).await?;
        let facets = match parse::<RawFiltersResponse>(&bytes)? {
            RawFiltersResponse::Wrapped { facets } | RawFiltersResponse::Bare(facets) => facets,
        };
        Ok(normalize_facets(facets))
    }

    fn query_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", request.query.clone()),
            ("page", request.page.to_string()),
            ("pageSize", request.page_size.to_string()),
        ];
        if !request.live {
            params.push(("category", request.category.clone()));
            for (name, value) in &request.filters {
                if let Some(key) = known_filter_param(name) {
                    params.push((key, value.clone()));
                }
            }
            params.push(("cachedOnly", "true".to_string()));
        }
        params
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, BackendError> {
        let bytes = match (self.settings.flavor, request.live) {
            (ApiFlavor::PostBody, false) => {
                let body = CachedSearchBody {
                    category: &request.category,
                    query: &request.query,
                    page: request.page,
                    page_size: request.page_size,
                    filters: &request.filters,
                };
                self.post_json("harvest", &body).await?
            }
            (ApiFlavor::PostBody, true) => {
                let body = LiveSearchBody {
                    query: &request.query,
                    page: request.page,
                    page_size: request.page_size,
                };
                self.post_json("elis-live-search", &body).await?
            }
            (ApiFlavor::QueryString, false) => {
                self.get("search", &Self::query_params(request)).await?
            }
            (ApiFlavor::QueryString, true) => {
                self.get("live-search", &Self::query_params(request)).await?
            }
        };

        let mut page = into_search_page(parse(&bytes)?, request)?;

        if self.settings.flavor == ApiFlavor::QueryString && !request.live && page.facets.is_empty()
        {
            match self.fetch_filters().await {
                Ok(facets) => page.facets = facets,
                Err(err) => scholar_warn!("Could not load filters: {}", err),
            }
        }
        Ok(page)
    }

    async fn harvest(&self, category: &str) -> Result<HarvestOutcome, BackendError> {
        let bytes = match self.settings.flavor {
            ApiFlavor::PostBody => {
                self.post_json("harvest-incremental", &HarvestBody { category })
                    .await?
            }
            ApiFlavor::QueryString => {
                self.get("harvest-now", &[("category", category.to_string())])
                    .await?
            }
        };
        let raw: RawHarvestResponse = parse(&bytes)?;
        if raw.success == Some(false) {
            return Err(application_error(raw.error));
        }
        Ok(HarvestOutcome {
            new_records: raw.new_records.unwrap_or(0),
        })
    }

    async fn health(&self) -> Result<HealthReport, BackendError> {
        let bytes = self.get("health", &[]).await?;
        let raw: RawHealthResponse = parse(&bytes)?;
        Ok(HealthReport {
            total_records: raw.data.total_records,
            theses: raw.data.theses,
            articles: raw.data.articles,
            research: raw.data.research,
            last_harvest: raw.harvest.last_harvest,
            includes_elis: raw.repositories.includes_elis,
        })
    }
}

fn into_search_page(
    raw: RawSearchResponse,
    request: &SearchRequest,
) -> Result<SearchPage, BackendError> {
    if raw.success == Some(false) {
        return Err(application_error(raw.error));
    }
    let results = raw.results.ok_or_else(|| {
        BackendError::new(FailureKind::MalformedResponse, "response has no results array")
    })?;
    Ok(SearchPage {
        total: raw.total.unwrap_or(results.len() as u64),
        page: raw.page.unwrap_or(request.page),
        facets: raw.facets.map(normalize_facets).unwrap_or_default(),
        results,
    })
}

fn known_filter_param(name: &str) -> Option<&'static str> {
    match name {
        "year" => Some("year"),
        "institution" => Some("institution"),
        "author" => Some("author"),
        "type" => Some("type"),
        "keyword" => Some("keyword"),
        _ => None,
    }
}

fn application_error(message: Option<String>) -> BackendError {
    BackendError::new(
        FailureKind::Application,
        message.unwrap_or_else(|| "request was not successful".to_string()),
    )
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(bytes)
        .map_err(|err| BackendError::new(FailureKind::MalformedResponse, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return BackendError::new(FailureKind::InvalidUrl, err.to_string());
    }
    BackendError::new(FailureKind::Network, err.to_string())
}
