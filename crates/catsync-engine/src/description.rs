//! Product description resolution.

use std::sync::LazyLock;

use catsync_printful::{CatalogDescription, SourceProductDetail};
use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Removes HTML tags and decodes the five standard entities. `&amp;` is
/// decoded last so `&amp;lt;` becomes the literal text `&lt;`.
#[must_use]
pub fn strip_html(value: &str) -> String {
    TAG_RE
        .replace_all(value, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_owned()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Picks the first available description, in priority order:
///
/// 1. catalog `description`
/// 2. catalog `description_text`
/// 3. catalog `description_html`, HTML-stripped
/// 4. the first variant's product description
/// 5. the store product's own description
/// 6. `placeholder`
#[must_use]
pub fn resolve_description(
    catalog: Option<&CatalogDescription>,
    detail: &SourceProductDetail,
    placeholder: &str,
) -> String {
    if let Some(catalog) = catalog {
        if let Some(text) = non_blank(catalog.description.as_deref()) {
            return text.to_owned();
        }
        if let Some(text) = non_blank(catalog.description_text.as_deref()) {
            return text.to_owned();
        }
        if let Some(html) = non_blank(catalog.description_html.as_deref()) {
            let stripped = strip_html(html);
            if !stripped.is_empty() {
                return stripped;
            }
        }
    }

    localized_description(detail).unwrap_or_else(|| placeholder.to_owned())
}

/// Description carried by the store product itself: the first variant's
/// product description, then `sync_product.description`. Used both for the
/// default locale fallback and for localized detail fetches.
#[must_use]
pub fn localized_description(detail: &SourceProductDetail) -> Option<String> {
    let from_variant = detail
        .sync_variants
        .first()
        .and_then(|v| v.product.as_ref())
        .and_then(|p| non_blank(p.description.as_deref()));
    let from_product = detail
        .sync_product
        .as_ref()
        .and_then(|p| non_blank(p.description.as_deref()));
    from_variant.or(from_product).map(str::to_owned)
}
