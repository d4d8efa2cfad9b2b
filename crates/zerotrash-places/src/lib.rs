//! Place search for the zerotrash reporting flow.
//!
//! [`SearchBox`] turns free text typed into a location field into a list of
//! candidate [`Place`]s from a [`Geocoder`], throttled by a quiet period and
//! guarded against out-of-order responses.

pub mod geocoding;
pub mod search_box;

pub use geocoding::{Geocoder, Place};
pub use search_box::{Options, SearchBox};
