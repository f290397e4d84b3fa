//! # Trellis Core
//!
//! Request snapshots, locations and multi-valued source maps for the
//! Trellis argument parser.
//!
//! This crate models the value-source side of request parsing: an
//! immutable [`RequestSnapshot`] of one HTTP request, the [`Location`]
//! tags arguments pull their values from, and the ordered [`MultiMap`]
//! every location resolves to.
//!
//! ## Example
//!
//! ```rust
//! use trellis_core::{Location, RequestSnapshot};
//!
//! let req = RequestSnapshot::builder()
//!     .uri("/todos?done=true")
//!     .header("x-fields", "id,name")
//!     .build();
//!
//! let args = req.values_for(&Location::Args);
//! assert_eq!(args.get("done").unwrap().as_str(), Some("true"));
//!
//! // Merging locations is a multi-valued union, resolved in order.
//! let merged = req.values_for_all(&[Location::Args, Location::Headers]);
//! assert!(merged.contains_key("x-fields"));
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod location;
mod multimap;
mod request;
mod value;

pub use location::Location;
pub use multimap::MultiMap;
pub use request::{RequestBuilder, RequestSnapshot};
pub use value::{RawValue, UploadedFile};
