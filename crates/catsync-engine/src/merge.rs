//! Ownership rules for fields shared between sync and human editors.
//!
//! Curated fields are seeded by sync and then owned by editors: once the
//! stored value is non-empty it is kept (HTML-stripped) and the freshly
//! computed value is discarded.

use catsync_directus::{ProductRecord, TargetProduct};

use crate::description::strip_html;
use crate::slug::normalize_for_compare;

fn curated(existing: Option<&str>) -> Option<String> {
    existing
        .map(strip_html)
        .filter(|value| !value.is_empty())
}

fn keep_existing(existing: Option<&str>, fresh: Option<String>) -> Option<String> {
    curated(existing).or(fresh)
}

/// Applies the field ownership rules to a freshly computed record.
///
/// Preserved when already set: `main_category`, `design_info`,
/// `product_info`, `description` and the four `description_*` locale fields.
/// Everything else comes from `fresh`.
#[must_use]
pub fn merge_product(existing: &TargetProduct, fresh: ProductRecord) -> ProductRecord {
    ProductRecord {
        main_category: existing.main_category.clone().or(fresh.main_category),
        design_info: keep_existing(existing.design_info.as_deref(), fresh.design_info),
        product_info: keep_existing(existing.product_info.as_deref(), fresh.product_info),
        description: curated(existing.description.as_deref()).unwrap_or(fresh.description),
        description_cs: keep_existing(existing.description_cs.as_deref(), fresh.description_cs),
        description_sk: keep_existing(existing.description_sk.as_deref(), fresh.description_sk),
        description_en: keep_existing(existing.description_en.as_deref(), fresh.description_en),
        description_de: keep_existing(existing.description_de.as_deref(), fresh.description_de),
        ..fresh
    }
}

/// `true` when writing `merged` would change any diffed field of `existing`.
///
/// `external_id`, `design_info` and `product_info` are carried on update but
/// do not on their own trigger one.
#[must_use]
pub fn product_differs(existing: &TargetProduct, merged: &ProductRecord) -> bool {
    let optional = |a: Option<&str>, b: Option<&str>| normalize_for_compare(a) != normalize_for_compare(b);

    existing.name.as_deref() != Some(merged.name.as_str())
        || existing.description.as_deref() != Some(merged.description.as_str())
        || existing.price != Some(merged.price)
        || optional(existing.thumbnail_url.as_deref(), merged.thumbnail_url.as_deref())
        || existing.main_category != merged.main_category
        || canonical_json(&existing.mockup_images) != canonical_json(&merged.mockup_images)
        || optional(existing.description_cs.as_deref(), merged.description_cs.as_deref())
        || optional(existing.description_sk.as_deref(), merged.description_sk.as_deref())
        || optional(existing.description_en.as_deref(), merged.description_en.as_deref())
        || optional(existing.description_de.as_deref(), merged.description_de.as_deref())
}

fn canonical_json(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_default()
}
