//! Offset pagination over `GET /store/products`.

use crate::error::SourceError;
use crate::types::{parse_listing, Envelope, Listing, Paging, SourceProduct};

use super::PrintfulClient;

/// Hard ceiling on pages fetched in one listing, guarding against an API that
/// keeps reporting a larger total than it serves.
pub const MAX_PAGES: usize = 500;

/// One page of the store product listing.
#[derive(Debug)]
pub struct ProductPage {
    pub products: Listing<SourceProduct>,
    /// Raw number of entries the API returned, including quarantined ones.
    /// Drives the offset.
    pub returned: u64,
    pub paging: Option<Paging>,
}

impl PrintfulClient {
    /// Fetches a single page of store products.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] from the request.
    pub async fn fetch_product_page(
        &self,
        offset: u64,
        limit: u32,
    ) -> Result<ProductPage, SourceError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let url = self.endpoint(
            "store/products",
            &[("offset", offset.as_str()), ("limit", limit.as_str())],
        )?;
        let context = format!("store products (offset {offset})");
        let envelope: Envelope<Vec<serde_json::Value>> =
            self.get_json(&url, None, &context).await?;

        let returned = envelope.result.len() as u64;
        Ok(ProductPage {
            products: parse_listing(envelope.result, "store products"),
            returned,
            paging: envelope.paging,
        })
    }

    /// Fetches every store product by walking offset pages.
    ///
    /// Stops once the collected count reaches `paging.total`, or, when the API
    /// omits paging metadata, on the first short page.
    ///
    /// All-or-nothing: any page failure discards what was collected and
    /// returns the error. A partial list would make every missing product look
    /// like an orphan to the pruning step. Malformed entries do not fail the
    /// listing; they are carried in [`Listing::quarantine`].
    ///
    /// # Errors
    ///
    /// Propagates page errors. Returns [`SourceError::PaginationLimit`] past
    /// [`MAX_PAGES`] and [`SourceError::PaginationStalled`] when a page comes
    /// back empty before `total` is reached.
    pub async fn fetch_product_list(
        &self,
        page_size: u32,
    ) -> Result<Listing<SourceProduct>, SourceError> {
        let page_size = page_size.max(1);
        let mut products: Listing<SourceProduct> = Listing::default();
        let mut offset = 0u64;
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(SourceError::PaginationLimit {
                    max_pages: MAX_PAGES,
                });
            }

            let page = self.fetch_product_page(offset, page_size).await?;
            offset += page.returned;
            products.append(page.products);

            tracing::debug!(
                page = page_count,
                offset,
                total = page.paging.map(|p| p.total),
                "fetched store product page"
            );

            match page.paging {
                Some(paging) if offset >= paging.total => break,
                Some(paging) if page.returned == 0 => {
                    return Err(SourceError::PaginationStalled {
                        collected: offset,
                        total: paging.total,
                    });
                }
                Some(_) => {}
                None if page.returned < u64::from(page_size) => break,
                None => {}
            }
        }

        Ok(products)
    }
}
