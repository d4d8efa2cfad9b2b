pub mod nominatim;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// A geocoded place: a display label and its coordinates.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Place {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    #[must_use]
    pub fn new(label: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            label: label.into(),
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.label, self.latitude, self.longitude)
    }
}

/// Errors returned by [`Geocoder`] implementations.
#[derive(Debug)]
pub struct Error(String);

impl Error {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// The pending result of a [`Geocoder::search`] call.
pub type Lookup<'a> = Pin<Box<dyn Future<Output = exn::Result<Vec<Place>, Error>> + Send + 'a>>;

/// A geocoding provider that resolves free text to candidate places.
pub trait Geocoder: Send + Sync + 'static {
    /// Forward geocode: resolve a query string to a list of places, in the
    /// order the service ranks them. Zero matches is `Ok(vec![])`.
    fn search(&self, query: String) -> Lookup<'_>;
}
