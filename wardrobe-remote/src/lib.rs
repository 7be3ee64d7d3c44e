//! # wardrobe-remote
//!
//! Boundaries to the remote systems the catalog depends on, and their HTTP
//! implementations.
//!
//! - [`RemoteCatalog`] / [`BlobStore`]: authoritative item table and photo
//!   bucket, implemented by [`RestCatalog`]
//! - [`Classifier`]: photo tagging, implemented by [`VisionClassifier`]
//! - [`Stylist`]: outfit picks, implemented by [`VisionStylist`]

pub mod client;
pub mod error;
pub mod rest;
pub mod stylist;
pub mod vision;

pub use client::{BlobStore, Classifier, RemoteCatalog, Stylist};
pub use error::RemoteError;
pub use rest::RestCatalog;
pub use stylist::VisionStylist;
pub use vision::VisionClassifier;
