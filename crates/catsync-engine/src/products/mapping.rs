//! Pure mapping from source payloads to product and variant records.

use std::collections::HashSet;
use std::str::FromStr;

use catsync_core::{ExternalId, ItemId, Locale};
use catsync_directus::{ProductRecord, VariantRecord};
use catsync_printful::{SourceProduct, SourceVariant, SyncProduct};
use rust_decimal::Decimal;

use crate::error::ItemError;

/// Thumbnail first, then every non-temporary `preview` file across all
/// variants, de-duplicated with first-seen order kept.
#[must_use]
pub fn mockup_images(thumbnail: Option<&str>, variants: &[SourceVariant]) -> Vec<String> {
    let previews = variants
        .iter()
        .flat_map(|v| v.files.iter())
        .filter(|f| f.kind.as_deref() == Some("preview") && !f.is_temporary)
        .filter_map(|f| f.preview_url.as_deref());

    let mut seen = HashSet::new();
    thumbnail
        .into_iter()
        .chain(previews)
        .filter(|url| !url.trim().is_empty())
        .filter(|url| seen.insert(*url))
        .map(str::to_owned)
        .collect()
}

/// Parses a retail price such as `"24.50"`.
///
/// # Errors
///
/// [`ItemError::InvalidPrice`] for anything that is not a non-negative
/// decimal.
pub fn parse_price(raw: &str) -> Result<Decimal, ItemError> {
    Decimal::from_str(raw.trim())
        .ok()
        .filter(|price| !price.is_sign_negative())
        .ok_or_else(|| ItemError::InvalidPrice {
            value: raw.to_owned(),
        })
}

/// Lowest retail price across variants with a valid price; zero when none
/// parse.
#[must_use]
pub fn product_price(variants: &[SourceVariant]) -> Decimal {
    variants
        .iter()
        .filter_map(|v| parse_price(&v.retail_price).ok())
        .min()
        .unwrap_or(Decimal::ZERO)
}

/// Locale description columns of a product record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleDescriptions {
    pub cs: Option<String>,
    pub sk: Option<String>,
    pub en: Option<String>,
    pub de: Option<String>,
}

impl LocaleDescriptions {
    pub fn set(&mut self, locale: Locale, value: Option<String>) {
        match locale {
            Locale::Cs => self.cs = value,
            Locale::Sk => self.sk = value,
            Locale::En => self.en = value,
            Locale::De => self.de = value,
        }
    }
}

/// Everything resolved for one product before it is written.
pub struct ProductInputs<'a> {
    pub summary: &'a SourceProduct,
    pub product: &'a SyncProduct,
    pub variants: &'a [SourceVariant],
    pub description: String,
    pub locales: LocaleDescriptions,
    pub main_category: Option<ItemId>,
}

/// Freshly computed product record, before field ownership rules apply.
#[must_use]
pub fn product_record(inputs: ProductInputs<'_>) -> ProductRecord {
    let thumbnail = inputs
        .product
        .thumbnail_url
        .clone()
        .or_else(|| inputs.summary.thumbnail_url.clone());
    let mockups = mockup_images(thumbnail.as_deref(), inputs.variants);

    ProductRecord {
        printful_id: inputs.summary.id.clone(),
        external_id: inputs
            .product
            .external_id
            .clone()
            .or_else(|| inputs.summary.external_id.clone()),
        name: inputs.product.name.clone(),
        description: inputs.description,
        design_info: None,
        product_info: None,
        price: product_price(inputs.variants),
        thumbnail_url: thumbnail,
        mockup_images: mockups,
        main_category: inputs.main_category,
        description_cs: inputs.locales.cs,
        description_sk: inputs.locales.sk,
        description_en: inputs.locales.en,
        description_de: inputs.locales.de,
        date_created: None,
        date_updated: None,
    }
}

/// Variant record owned by `product`.
///
/// # Errors
///
/// [`ItemError::InvalidPrice`] when the retail price does not parse.
pub fn variant_record(product: &ItemId, variant: &SourceVariant) -> Result<VariantRecord, ItemError> {
    Ok(VariantRecord {
        product: product.clone(),
        name: variant.name.clone(),
        sku: variant.sku.clone(),
        price: parse_price(&variant.retail_price)?,
        is_active: variant.is_active(),
        printful_variant_id: variant.id.clone(),
        size: variant.size.clone(),
        color: variant.color.clone(),
    })
}

/// Category id declared by the first variant.
#[must_use]
pub fn declared_category(variants: &[SourceVariant]) -> Option<&ExternalId> {
    variants.first().and_then(|v| v.main_category_id.as_ref())
}
