//! The read-only view of the catalog that the sync engine depends on.

use std::future::Future;

use catsync_core::{ExternalId, Locale};

use crate::client::PrintfulClient;
use crate::error::SourceError;
use crate::types::{
    CatalogDescription, Listing, SourceCategory, SourceProduct, SourceProductDetail,
};

/// Catalog reads used by the reconcilers.
///
/// [`PrintfulClient`] is the production implementation; tests substitute
/// canned snapshots.
pub trait CatalogSource: Send + Sync {
    fn fetch_categories(
        &self,
    ) -> impl Future<Output = Result<Listing<SourceCategory>, SourceError>> + Send;

    /// Full product listing. Never returns a partial list; malformed entries
    /// are reported in the listing's quarantine.
    fn fetch_product_list(
        &self,
        page_size: u32,
    ) -> impl Future<Output = Result<Listing<SourceProduct>, SourceError>> + Send;

    fn fetch_product_detail(
        &self,
        product_id: &ExternalId,
        locale: Option<Locale>,
    ) -> impl Future<Output = Result<SourceProductDetail, SourceError>> + Send;

    /// Best-effort enrichment; `None` on any failure.
    fn fetch_catalog_description(
        &self,
        catalog_product_id: &ExternalId,
    ) -> impl Future<Output = Option<CatalogDescription>> + Send;
}

impl CatalogSource for PrintfulClient {
    async fn fetch_categories(&self) -> Result<Listing<SourceCategory>, SourceError> {
        PrintfulClient::fetch_categories(self).await
    }

    async fn fetch_product_list(
        &self,
        page_size: u32,
    ) -> Result<Listing<SourceProduct>, SourceError> {
        PrintfulClient::fetch_product_list(self, page_size).await
    }

    async fn fetch_product_detail(
        &self,
        product_id: &ExternalId,
        locale: Option<Locale>,
    ) -> Result<SourceProductDetail, SourceError> {
        PrintfulClient::fetch_product_detail(self, product_id, locale).await
    }

    async fn fetch_catalog_description(
        &self,
        catalog_product_id: &ExternalId,
    ) -> Option<CatalogDescription> {
        PrintfulClient::fetch_catalog_description(self, catalog_product_id).await
    }
}
