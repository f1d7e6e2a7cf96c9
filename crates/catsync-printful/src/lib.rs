pub mod client;
pub mod error;
mod retry;
pub mod source;
pub mod types;

pub use client::{PrintfulClient, PrintfulClientConfig, ProductPage, MAX_PAGES};
pub use error::SourceError;
pub use source::CatalogSource;
pub use types::{
    CatalogDescription, Listing, Quarantine, SourceCategory, SourceProduct, SourceProductDetail,
    SourceVariant, SyncProduct, VariantFile, VariantProduct,
};
