use std::fmt::Write as _;
use std::time::Duration;

use exn::ResultExt;
use isahc::prelude::*;
use isahc::{HttpClient, Request};

use super::{Error, Geocoder, Lookup, Place};

/// The public OpenStreetMap Nominatim instance.
pub const OPENSTREETMAP: &str = "https://nominatim.openstreetmap.org";

const DEFAULT_LIMIT: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_USER_AGENT: &str = concat!("zerotrash/", env!("CARGO_PKG_VERSION"));

/// Geocoder speaking the Nominatim `/search` API.
///
/// Also works against Nominatim-compatible services such as geocode.maps.co,
/// which additionally require [`with_api_key`](Self::with_api_key).
///
/// The HTTP client is created once and shared by clones, so consecutive
/// lookups reuse pooled connections.
#[derive(Clone)]
pub struct Backend {
    client: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    limit: usize,
    timeout: Duration,
    user_agent: String,
}

impl Backend {
    /// Create a backend for the service rooted at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> exn::Result<Self, Error> {
        let client = HttpClient::new().or_raise(|| Error("create HTTP client".into()))?;
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        Ok(Self {
            client,
            endpoint,
            api_key: None,
            limit: DEFAULT_LIMIT,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        })
    }

    /// Backend for [`OPENSTREETMAP`].
    pub fn openstreetmap() -> exn::Result<Self, Error> {
        Self::new(OPENSTREETMAP)
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Maximum number of places returned per search.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn search_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}/search?format=json&q={}&limit={}",
            self.endpoint,
            percent_encode(query),
            self.limit
        );
        if let Some(key) = &self.api_key {
            let _ = write!(url, "&api_key={}", percent_encode(key));
        }
        url
    }

    async fn forward_geocode(&self, query: String) -> exn::Result<Vec<Place>, Error> {
        let url = self.search_url(&query);

        let request = Request::get(&url)
            .timeout(self.timeout)
            .header("User-Agent", self.user_agent.as_str())
            .body(())
            .or_raise(|| Error("build geocoding request".into()))?;

        let mut response = self
            .client
            .send_async(request)
            .await
            .or_raise(|| Error(format!("send geocoding request to {}", self.endpoint)))?;

        if !response.status().is_success() {
            exn::bail!(Error(format!(
                "{} returned status {}",
                self.endpoint,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .or_raise(|| Error("read geocoding response".into()))?;
        let places = parse_search_results(&body, self.limit)?;
        tracing::debug!(query = %query, count = places.len(), "geocoding results");
        Ok(places)
    }
}

impl Geocoder for Backend {
    fn search(&self, query: String) -> Lookup<'_> {
        Box::pin(self.forward_geocode(query))
    }
}

#[derive(serde::Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl SearchResult {
    fn into_place(self) -> Option<Place> {
        let (Ok(latitude), Ok(longitude)) = (self.lat.parse::<f64>(), self.lon.parse::<f64>())
        else {
            tracing::warn!(
                label = %self.display_name,
                lat = %self.lat,
                lon = %self.lon,
                "skipping result with invalid coordinates"
            );
            return None;
        };
        Some(Place {
            label: self.display_name,
            latitude,
            longitude,
        })
    }
}

/// Decode a `/search?format=json` body, keeping service order.
///
/// Results with unparseable coordinates are dropped; an undecodable body is
/// an error.
fn parse_search_results(body: &str, limit: usize) -> exn::Result<Vec<Place>, Error> {
    let results: Vec<SearchResult> =
        serde_json::from_str(body).or_raise(|| Error("decode geocoding response".into()))?;
    Ok(results
        .into_iter()
        .filter_map(SearchResult::into_place)
        .take(limit)
        .collect())
}

/// Percent-encode a string for use in a URL query parameter.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 2);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}
