//! Printful API response types.
//!
//! Every response is wrapped in `{"code": 200, "result": ..., "paging": ...}`;
//! [`Envelope`] captures that generically.
//!
//! ### Identifiers
//! Ids arrive as JSON numbers. They are canonicalized into
//! [`ExternalId`] at this boundary. `parent_id` uses `0` for root categories
//! and `main_category_id` may be `0` or absent; both normalize to `None`.
//!
//! ### Prices
//! `retail_price` is a decimal string (`"24.50"`). It is kept as a string
//! here and parsed by the consumer so one bad price fails one variant, not
//! the whole product page.
//!
//! ### Malformed items
//! List results are first decoded as raw JSON values and converted item by
//! item via [`parse_listing`]. Items that do not match the schema are logged
//! and dropped instead of failing the whole response, and their ids are kept
//! in a [`Quarantine`] so that nothing downstream mistakes them for deleted
//! upstream records.

use std::collections::HashSet;

use catsync_core::ids::deserialize_optional_external_id;
use catsync_core::ExternalId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Top-level envelope for all Printful responses.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    pub result: T,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// Offset pagination metadata returned by list endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Paging {
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

/// `GET /categories` result.
#[derive(Debug, Deserialize)]
pub struct CategoriesResult {
    #[serde(default)]
    pub categories: Vec<serde_json::Value>,
}

/// A category in the catalog tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceCategory {
    pub id: ExternalId,
    /// `None` for root categories (the API sends `0`).
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub parent_id: Option<ExternalId>,
    pub title: String,
    #[serde(default)]
    pub catalog_position: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Summary row from `GET /store/products`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceProduct {
    pub id: ExternalId,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// `GET /store/products/{id}` result.
///
/// Either half may be missing on a broken product; the reconciler treats a
/// missing `sync_product` as an item failure.
#[derive(Debug, Clone, Default)]
pub struct SourceProductDetail {
    pub sync_product: Option<SyncProduct>,
    pub sync_variants: Vec<SourceVariant>,
    /// Variants the API returned but that failed schema validation.
    pub quarantined_variants: Quarantine,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawProductDetail {
    #[serde(default)]
    pub sync_product: Option<serde_json::Value>,
    #[serde(default)]
    pub sync_variants: Vec<serde_json::Value>,
}

impl RawProductDetail {
    pub(crate) fn parse(self, product_id: &ExternalId) -> SourceProductDetail {
        let sync_product = self.sync_product.and_then(|value| {
            serde_json::from_value::<SyncProduct>(value)
                .map_err(|e| {
                    tracing::warn!(
                        product_id = %product_id,
                        error = %e,
                        "quarantined malformed sync_product"
                    );
                })
                .ok()
        });
        let context = format!("sync_variants of product {product_id}");
        let variants = parse_listing(self.sync_variants, &context);
        SourceProductDetail {
            sync_product,
            sync_variants: variants.items,
            quarantined_variants: variants.quarantine,
        }
    }
}

/// Core product object inside a [`SourceProductDetail`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncProduct {
    pub id: ExternalId,
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A purchasable variant of a store product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceVariant {
    pub id: ExternalId,
    pub name: String,
    pub retail_price: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// `"active"` for sellable variants; anything else (or absent) is inactive.
    #[serde(default)]
    pub availability_status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub main_category_id: Option<ExternalId>,
    #[serde(default)]
    pub product: Option<VariantProduct>,
    #[serde(default)]
    pub files: Vec<VariantFile>,
}

impl SourceVariant {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.availability_status.as_deref() == Some("active")
    }

    /// Catalog-level product id this variant was made from.
    #[must_use]
    pub fn catalog_product_id(&self) -> Option<&ExternalId> {
        self.product.as_ref().and_then(|p| p.product_id.as_ref())
    }
}

/// Catalog product reference embedded in a [`SourceVariant`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VariantProduct {
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub variant_id: Option<ExternalId>,
    #[serde(default, deserialize_with = "deserialize_optional_external_id")]
    pub product_id: Option<ExternalId>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A print file or rendered mockup attached to a variant.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VariantFile {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub is_temporary: bool,
}

/// Long-form description fields from `GET /catalog/products/{id}`.
///
/// Some responses nest the product under `product`; the nested
/// `description` is used when the top-level one is absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CatalogDescription {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_text: Option<String>,
    #[serde(default)]
    pub description_html: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CatalogProductResult {
    #[serde(flatten)]
    pub fields: CatalogDescription,
    #[serde(default)]
    pub product: Option<CatalogDescription>,
}

impl CatalogProductResult {
    pub(crate) fn into_description(self) -> CatalogDescription {
        let mut fields = self.fields;
        if let Some(nested) = self.product {
            fields.description = fields.description.or(nested.description);
            fields.description_text = fields.description_text.or(nested.description_text);
            fields.description_html = fields.description_html.or(nested.description_html);
        }
        fields
    }
}

/// Entries of a list response that were dropped as malformed.
///
/// The entries still exist upstream, so pruning must never treat their ids
/// as gone. An entry whose id could not be read at all makes every absence
/// unprovable; see [`Quarantine::blocks_pruning`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quarantine {
    pub ids: HashSet<ExternalId>,
    /// Malformed entries without a readable id.
    pub unidentified: usize,
}

impl Quarantine {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.unidentified == 0
    }

    #[must_use]
    pub fn contains(&self, id: &ExternalId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn blocks_pruning(&self) -> bool {
        self.unidentified > 0
    }

    fn record(&mut self, raw_id: Option<&serde_json::Value>) {
        match raw_id.and_then(|v| serde_json::from_value::<ExternalId>(v.clone()).ok()) {
            Some(id) => {
                self.ids.insert(id);
            }
            None => self.unidentified += 1,
        }
    }

    fn absorb(&mut self, other: Quarantine) {
        self.ids.extend(other.ids);
        self.unidentified += other.unidentified;
    }
}

/// A list response split into valid items and quarantined entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub quarantine: Quarantine,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            quarantine: Quarantine::default(),
        }
    }
}

impl<T> Listing<T> {
    /// A listing in which every entry parsed.
    #[must_use]
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            quarantine: Quarantine::default(),
        }
    }

    pub(crate) fn append(&mut self, other: Listing<T>) {
        self.items.extend(other.items);
        self.quarantine.absorb(other.quarantine);
    }
}

/// Converts raw JSON items into `T`. Items that do not match the schema are
/// logged and their ids quarantined.
pub(crate) fn parse_listing<T: DeserializeOwned>(
    values: Vec<serde_json::Value>,
    context: &str,
) -> Listing<T> {
    let mut listing = Listing::default();
    for value in values {
        let id = value.get("id").cloned();
        match serde_json::from_value::<T>(value) {
            Ok(item) => listing.items.push(item),
            Err(e) => {
                tracing::warn!(
                    context,
                    id = ?id,
                    error = %e,
                    "quarantined malformed catalog item"
                );
                listing.quarantine.record(id.as_ref());
            }
        }
    }
    listing
}
