//! End-to-end reconciliation against an in-memory store and a canned catalog.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use catsync_core::{ExternalId, Locale, StaticDictionary};
use catsync_directus::{Collection, MemoryStore, Operation};
use catsync_engine::{
    CategoryReconciler, ProductReconciler, SyncEngine, SyncError, SyncPhase, SyncSettings,
};
use catsync_printful::{
    CatalogDescription, CatalogSource, Listing, SourceCategory, SourceError, SourceProduct,
    SourceProductDetail, SourceVariant, SyncProduct, VariantFile, VariantProduct,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeCatalog {
    categories: Vec<SourceCategory>,
    categories_down: bool,
    products: Listing<SourceProduct>,
    details: HashMap<(String, Option<Locale>), SourceProductDetail>,
    catalog: HashMap<String, CatalogDescription>,
    /// Product ids whose detail fetch hangs well past any test timeout.
    hanging_details: HashSet<String>,
    hanging_catalog: bool,
}

impl FakeCatalog {
    fn with_product(mut self, summary: SourceProduct, detail: SourceProductDetail) -> Self {
        self.details
            .insert((summary.id.as_str().to_owned(), None), detail);
        self.products.items.push(summary);
        self
    }

    fn with_translation(mut self, product_id: &str, locale: Locale, detail: SourceProductDetail) -> Self {
        self.details
            .insert((product_id.to_owned(), Some(locale)), detail);
        self
    }
}

impl CatalogSource for FakeCatalog {
    async fn fetch_categories(&self) -> Result<Listing<SourceCategory>, SourceError> {
        if self.categories_down {
            return Err(SourceError::UnexpectedStatus {
                status: 503,
                url: "https://api.printful.test/categories".to_owned(),
            });
        }
        Ok(Listing::complete(self.categories.clone()))
    }

    async fn fetch_product_list(
        &self,
        _page_size: u32,
    ) -> Result<Listing<SourceProduct>, SourceError> {
        Ok(self.products.clone())
    }

    async fn fetch_product_detail(
        &self,
        product_id: &ExternalId,
        locale: Option<Locale>,
    ) -> Result<SourceProductDetail, SourceError> {
        if self.hanging_details.contains(product_id.as_str()) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.details
            .get(&(product_id.as_str().to_owned(), locale))
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                url: format!("https://api.printful.test/store/products/{product_id}"),
            })
    }

    async fn fetch_catalog_description(
        &self,
        catalog_product_id: &ExternalId,
    ) -> Option<CatalogDescription> {
        if self.hanging_catalog {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.catalog.get(catalog_product_id.as_str()).cloned()
    }
}

fn eid(raw: &str) -> ExternalId {
    ExternalId::parse(raw).expect("valid external id")
}

fn category(id: &str, parent: Option<&str>, title: &str) -> SourceCategory {
    SourceCategory {
        id: eid(id),
        parent_id: parent.map(eid),
        title: title.to_owned(),
        catalog_position: 1,
        size: None,
        image_url: None,
    }
}

fn summary(id: &str, name: &str) -> SourceProduct {
    SourceProduct {
        id: eid(id),
        external_id: Some(format!("ext-{id}")),
        name: name.to_owned(),
        thumbnail_url: Some(format!("https://files.test/{id}/thumb.png")),
    }
}

fn variant(id: &str, price: &str, category: Option<&str>) -> SourceVariant {
    SourceVariant {
        id: eid(id),
        name: format!("Variant {id}"),
        retail_price: price.to_owned(),
        sku: Some(format!("SKU-{id}")),
        size: Some("M".to_owned()),
        color: Some("Black".to_owned()),
        availability_status: Some("active".to_owned()),
        main_category_id: category.map(eid),
        product: Some(VariantProduct {
            variant_id: None,
            product_id: Some(eid("71")),
            image: None,
            name: None,
            description: None,
        }),
        files: vec![VariantFile {
            kind: Some("preview".to_owned()),
            preview_url: Some(format!("https://files.test/v{id}/front.png")),
            is_temporary: false,
        }],
    }
}

fn detail(id: &str, name: &str, variants: Vec<SourceVariant>) -> SourceProductDetail {
    SourceProductDetail {
        sync_product: Some(SyncProduct {
            id: eid(id),
            external_id: Some(format!("ext-{id}")),
            name: name.to_owned(),
            thumbnail_url: Some(format!("https://files.test/{id}/thumb.png")),
            description: None,
        }),
        sync_variants: variants,
        ..SourceProductDetail::default()
    }
}

fn settings() -> SyncSettings {
    SyncSettings {
        product_delay_ms: 0,
        ..SyncSettings::default()
    }
}

fn rows_where(store: &MemoryStore, collection: Collection, field: &str, value: &Value) -> Vec<Value> {
    store
        .rows(collection)
        .into_iter()
        .filter(|row| row.get(field) == Some(value))
        .collect()
}

fn tee_catalog() -> FakeCatalog {
    FakeCatalog {
        categories: vec![category("5", None, "Men's Wear")],
        ..FakeCatalog::default()
    }
    .with_product(
        summary("100", "Classic Tee"),
        detail(
            "100",
            "Classic Tee",
            vec![variant("1001", "24.50", Some("5")), variant("1002", "26.00", Some("5"))],
        ),
    )
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_category_is_created_with_slug_and_null_parent() {
    let store = MemoryStore::new();
    let source = Listing::complete(vec![
        category("5", None, "Men's Wear"),
        category("6", Some("5"), "T-Shirts"),
    ]);

    let stats = CategoryReconciler::new(&store).reconcile(&source).await.unwrap();

    assert_eq!(stats.created, 2);
    let rows = store.rows(Collection::Categories);
    let mens = &rows_where(&store, Collection::Categories, "printful_id", &json!(5))[0];
    assert_eq!(mens["slug"], "mens-wear");
    assert_eq!(mens["name"], "Men's Wear");
    assert!(mens["parent_id"].is_null());
    let shirts = &rows_where(&store, Collection::Categories, "printful_id", &json!(6))[0];
    assert_eq!(shirts["parent_id"], json!(5));
    assert_eq!(shirts["slug"], "t-shirts");
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn existing_category_with_drifted_name_is_updated_in_place() {
    let store = MemoryStore::new();
    let id = store.insert_raw(
        Collection::Categories,
        json!({"printful_id": 5, "name": "Mens", "slug": "mens", "category_position": 1, "description": "Curated"}),
    );

    let stats = CategoryReconciler::new(&store)
        .reconcile(&Listing::complete(vec![category("5", None, "Men's Wear")]))
        .await
        .unwrap();

    assert_eq!((stats.created, stats.updated), (0, 1));
    let rows = store.rows(Collection::Categories);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"].to_string(), id.as_str());
    assert_eq!(rows[0]["slug"], "mens-wear");
    assert_eq!(rows[0]["description"], "Curated");
}

#[tokio::test]
async fn concurrent_category_runs_create_each_category_once() {
    let store = MemoryStore::new().with_unique(Collection::Categories, "printful_id");
    let source = Listing::complete(vec![category("5", None, "Men's Wear")]);

    let first = CategoryReconciler::new(&store);
    let second = CategoryReconciler::new(&store);
    let (a, b) = tokio::join!(first.reconcile(&source), second.reconcile(&source));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(store.rows(Collection::Categories).len(), 1);
    assert_eq!(a.created + b.created, 1);
    assert_eq!(a.skipped + b.skipped, 1);
    assert_eq!(a.failed + b.failed, 0);
}

#[tokio::test]
async fn category_pruning_is_opt_in() {
    let store = MemoryStore::new();
    store.insert_raw(Collection::Categories, json!({"printful_id": 9, "name": "Retired"}));
    let source = Listing::complete(vec![category("5", None, "Men's Wear")]);

    CategoryReconciler::new(&store).reconcile(&source).await.unwrap();
    assert_eq!(store.rows(Collection::Categories).len(), 2);

    let stats = CategoryReconciler::new(&store)
        .with_pruning(true)
        .reconcile(&source)
        .await
        .unwrap();
    assert_eq!(stats.deleted, 1);
    assert!(rows_where(&store, Collection::Categories, "printful_id", &json!(9)).is_empty());
}

#[tokio::test]
async fn category_pruning_keeps_quarantined_categories() {
    let store = MemoryStore::new();
    store.insert_raw(Collection::Categories, json!({"printful_id": 5, "name": "Men's Wear"}));
    store.insert_raw(Collection::Categories, json!({"printful_id": 9, "name": "Bags"}));
    let mut source = Listing::complete(vec![category("5", None, "Men's Wear")]);
    source.quarantine.ids.insert(eid("9"));

    let stats = CategoryReconciler::new(&store)
        .with_pruning(true)
        .reconcile(&source)
        .await
        .unwrap();

    assert_eq!(stats.deleted, 0);
    assert_eq!(rows_where(&store, Collection::Categories, "printful_id", &json!(9)).len(), 1);
}

#[tokio::test]
async fn cleanup_keeps_the_oldest_duplicate() {
    let store = MemoryStore::new();
    let oldest = store.insert_raw(Collection::Categories, json!({"printful_id": 5, "name": "A"}));
    store.insert_raw(Collection::Categories, json!({"printful_id": 5, "name": "B"}));
    store.insert_raw(Collection::Categories, json!({"printful_id": "5", "name": "C"}));
    store.insert_raw(Collection::Categories, json!({"printful_id": 6, "name": "Solo"}));

    let stats = CategoryReconciler::new(&store).cleanup_duplicates().await.unwrap();

    assert_eq!((stats.groups, stats.deleted, stats.failed), (1, 2, 0));
    let remaining = store.rows(Collection::Categories);
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0]["id"].to_string(), oldest.as_str());
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[tokio::test]
async fn product_without_any_description_gets_the_placeholder() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.failed), (1, 0));
    let product = &store.rows(Collection::Products)[0];
    assert_eq!(product["printful_id"], "100");
    assert_eq!(product["description"], "Product description coming soon.");
    assert_eq!(product["description_en"], "Product description coming soon.");
    assert_eq!(product["price"], "24.50");
    assert_eq!(
        product["mockup_images"],
        json!([
            "https://files.test/100/thumb.png",
            "https://files.test/v1001/front.png",
            "https://files.test/v1002/front.png"
        ])
    );
    assert!(product["date_created"].is_string());
}

#[tokio::test]
async fn catalog_description_wins_over_placeholder() {
    let store = MemoryStore::new();
    let mut catalog = tee_catalog();
    catalog.catalog.insert(
        "71".to_owned(),
        CatalogDescription {
            description: None,
            description_text: None,
            description_html: Some("<p>Soft &amp; light</p>".to_owned()),
        },
    );
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    let product = &store.rows(Collection::Products)[0];
    assert_eq!(product["description"], "Soft & light");
}

#[tokio::test]
async fn curated_locale_text_survives_while_default_locale_is_filled() {
    let store = MemoryStore::new();
    store.insert_raw(
        Collection::Products,
        json!({
            "printful_id": "100",
            "name": "Classic Tee",
            "description": "Product description coming soon.",
            "description_cs": "Ručně psaný popis",
            "description_en": null
        }),
    );
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.updated), (0, 1));
    let rows = store.rows(Collection::Products);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["description_cs"], "Ručně psaný popis");
    assert_eq!(rows[0]["description_en"], "Product description coming soon.");
    assert!(rows[0]["date_updated"].is_string());
}

#[tokio::test]
async fn edited_default_locale_text_is_not_overwritten() {
    let store = MemoryStore::new();
    store.insert_raw(
        Collection::Products,
        json!({"printful_id": "100", "name": "Classic Tee", "description_en": "<b>Editor copy</b>"}),
    );
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!(store.rows(Collection::Products)[0]["description_en"], "Editor copy");
}

#[tokio::test]
async fn translation_locales_fill_their_columns() {
    let store = MemoryStore::new();
    let mut localized = detail("100", "Klasické tričko", vec![variant("1001", "24.50", None)]);
    if let Some(product) = localized.sync_product.as_mut() {
        product.description = Some("Pohodlné tričko".to_owned());
    }
    let catalog = tee_catalog().with_translation("100", Locale::Cs, localized);
    let dictionary = StaticDictionary::builtin();
    let settings = SyncSettings {
        translation_locales: vec![Locale::Cs, Locale::De],
        ..settings()
    };

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!(stats.failed, 0);
    let product = &store.rows(Collection::Products)[0];
    assert_eq!(product["description_cs"], "Pohodlné tričko");
    assert!(product["description_de"].is_null());
}

#[tokio::test]
async fn product_links_to_its_declared_category() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let report = SyncEngine::new(&catalog, &store, &dictionary, &settings)
        .run_sync()
        .await
        .unwrap();

    assert_eq!(report.categories.created, 1);
    let category_id = store.rows(Collection::Categories)[0]["id"].clone();
    assert_eq!(store.rows(Collection::Products)[0]["main_category"], category_id);
}

#[tokio::test]
async fn variants_are_created_under_their_product() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!(stats.variants.created, 2);
    let product_id = store.rows(Collection::Products)[0]["id"].clone();
    let variants = store.rows(Collection::Variants);
    assert_eq!(variants.len(), 2);
    assert!(variants.iter().all(|v| v["product"] == product_id));
    let first = &rows_where(&store, Collection::Variants, "printful_variant_id", &json!("1001"))[0];
    assert_eq!(first["price"], "24.50");
    assert_eq!(first["is_active"], true);
    assert_eq!(first["sku"], "SKU-1001");
}

#[tokio::test]
async fn stale_variants_are_pruned_only_when_enabled() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;
    let product_id = store.rows(Collection::Products)[0]["id"].clone();
    store.insert_raw(
        Collection::Variants,
        json!({"product": product_id, "printful_variant_id": "1999", "name": "Gone"}),
    );

    ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;
    assert_eq!(store.rows(Collection::Variants).len(), 3);

    let pruning = SyncSettings {
        prune_stale_variants: true,
        ..settings
    };
    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &pruning)
        .reconcile(&catalog.products)
        .await;
    assert_eq!(stats.variants.deleted, 1);
    assert!(rows_where(&store, Collection::Variants, "printful_variant_id", &json!("1999")).is_empty());
}

#[tokio::test]
async fn orphaned_and_unkeyed_products_are_pruned() {
    let store = MemoryStore::new();
    store.insert_raw(Collection::Products, json!({"printful_id": "999", "name": "Discontinued"}));
    store.insert_raw(Collection::Products, json!({"printful_id": null, "name": "Hand made"}));
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.deleted), (1, 2));
    let remaining = store.rows(Collection::Products);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["printful_id"], "100");
}

#[tokio::test]
async fn quarantined_products_are_never_pruned() {
    let store = MemoryStore::new();
    store.insert_raw(
        Collection::Products,
        json!({"printful_id": "200", "name": "Hoodie", "description": "Curated copy"}),
    );
    let mut catalog = tee_catalog();
    catalog.products.quarantine.ids.insert(eid("200"));
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.deleted, stats.failed), (1, 0, 0));
    let kept = rows_where(&store, Collection::Products, "printful_id", &json!("200"));
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0]["description"], "Curated copy");
}

#[tokio::test]
async fn malformed_entry_without_id_disables_product_pruning() {
    let store = MemoryStore::new();
    store.insert_raw(Collection::Products, json!({"printful_id": "999", "name": "Discontinued"}));
    let mut catalog = tee_catalog();
    catalog.products.quarantine.unidentified = 1;
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.deleted), (1, 0));
    assert_eq!(rows_where(&store, Collection::Products, "printful_id", &json!("999")).len(), 1);
}

#[tokio::test]
async fn quarantined_variants_survive_stale_pruning() {
    let store = MemoryStore::new();
    let mut catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;
    let product_id = store.rows(Collection::Products)[0]["id"].clone();
    store.insert_raw(
        Collection::Variants,
        json!({"product": product_id, "printful_variant_id": "1003", "name": "Tee / XL"}),
    );
    if let Some(detail) = catalog.details.get_mut(&("100".to_owned(), None)) {
        detail.quarantined_variants.ids.insert(eid("1003"));
    }

    let pruning = SyncSettings {
        prune_stale_variants: true,
        ..settings
    };
    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &pruning)
        .reconcile(&catalog.products)
        .await;

    assert_eq!(stats.variants.deleted, 0);
    assert_eq!(store.rows(Collection::Variants).len(), 3);
}

#[tokio::test]
async fn malformed_stored_product_blocks_creating_a_duplicate() {
    let store = MemoryStore::new();
    store.insert_raw(
        Collection::Products,
        json!({"printful_id": "100", "name": "Classic Tee", "price": "n/a", "description": "Curated"}),
    );
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    let reconciler = ProductReconciler::new(&catalog, &store, &dictionary, &settings);

    for _ in 0..2 {
        let stats = reconciler.reconcile(&catalog.products).await;
        assert_eq!((stats.created, stats.failed, stats.deleted), (0, 1, 0));
        let rows = rows_where(&store, Collection::Products, "printful_id", &json!("100"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["description"], "Curated");
    }
    assert!(store.rows(Collection::Variants).is_empty());
}

#[tokio::test]
async fn concurrent_product_runs_create_each_record_once() {
    let store = MemoryStore::new()
        .with_unique(Collection::Products, "printful_id")
        .with_unique(Collection::Variants, "printful_variant_id");
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let first = ProductReconciler::new(&catalog, &store, &dictionary, &settings);
    let second = ProductReconciler::new(&catalog, &store, &dictionary, &settings);
    let (a, b) = tokio::join!(
        first.reconcile(&catalog.products),
        second.reconcile(&catalog.products)
    );

    assert_eq!(store.rows(Collection::Products).len(), 1);
    assert_eq!(a.created + b.created, 1);
    assert_eq!(a.failed + b.failed, 0);
    let product_id = store.rows(Collection::Products)[0]["id"].clone();
    for variant_id in ["1001", "1002"] {
        let rows = rows_where(&store, Collection::Variants, "printful_variant_id", &json!(variant_id));
        assert_eq!(rows.len(), 1, "variant {variant_id} duplicated");
        assert_eq!(rows[0]["product"], product_id);
    }
    assert_eq!(a.variants.created + b.variants.created, 2);
    assert_eq!(a.variants.failed + b.variants.failed, 0);
}

#[tokio::test]
async fn hanging_detail_fetch_fails_that_product_only() {
    let store = MemoryStore::new();
    let mut catalog = tee_catalog().with_product(
        summary("101", "Hoodie"),
        detail("101", "Hoodie", vec![variant("2001", "45.00", None)]),
    );
    catalog.hanging_details.insert("100".to_owned());
    let dictionary = StaticDictionary::builtin();
    let settings = SyncSettings {
        detail_timeout_secs: 1,
        ..settings()
    };

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.failed), (1, 1));
    let rows = store.rows(Collection::Products);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["printful_id"], "101");
}

#[tokio::test]
async fn hanging_catalog_lookup_falls_back_to_placeholder() {
    let store = MemoryStore::new();
    let mut catalog = tee_catalog();
    catalog.catalog.insert(
        "71".to_owned(),
        CatalogDescription {
            description: Some("Heavyweight cotton.".to_owned()),
            ..CatalogDescription::default()
        },
    );
    catalog.hanging_catalog = true;
    let dictionary = StaticDictionary::builtin();
    let settings = SyncSettings {
        catalog_timeout_secs: 1,
        ..settings()
    };

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.failed), (1, 0));
    let product = &store.rows(Collection::Products)[0];
    assert_eq!(product["description"], "Product description coming soon.");
}

#[tokio::test]
async fn empty_product_listing_prunes_nothing() {
    let store = MemoryStore::new();
    store.insert_raw(Collection::Products, json!({"printful_id": "999", "name": "Discontinued"}));
    let catalog = FakeCatalog::default();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = SyncEngine::new(&catalog, &store, &dictionary, &settings)
        .run_products()
        .await
        .unwrap();

    assert_eq!(stats.deleted, 0);
    assert_eq!(store.rows(Collection::Products).len(), 1);
}

#[tokio::test]
async fn one_broken_product_does_not_stop_the_rest() {
    let store = MemoryStore::new();
    let mut catalog = tee_catalog()
        .with_product(
            summary("101", "Hoodie"),
            detail("101", "Hoodie", vec![variant("2001", "45.00", None)]),
        )
        .with_product(
            summary("102", "Cap"),
            detail("102", "Cap", vec![variant("3001", "15.00", None)]),
        );
    // Detail for 101 disappears between listing and fetch.
    catalog.details.remove(&("101".to_owned(), None));
    store.fail_on_match(Collection::Products, Operation::Create, "printful_id", "102");
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.failed), (1, 2));
    let rows = store.rows(Collection::Products);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["printful_id"], "100");
}

#[tokio::test]
async fn variant_with_unparseable_price_fails_alone() {
    let store = MemoryStore::new();
    let catalog = FakeCatalog::default().with_product(
        summary("100", "Classic Tee"),
        detail(
            "100",
            "Classic Tee",
            vec![variant("1001", "not-a-price", None), variant("1002", "26.00", None)],
        ),
    );
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let stats = ProductReconciler::new(&catalog, &store, &dictionary, &settings)
        .reconcile(&catalog.products)
        .await;

    assert_eq!((stats.created, stats.failed), (1, 0));
    assert_eq!((stats.variants.created, stats.variants.failed), (1, 1));
    assert_eq!(store.rows(Collection::Products)[0]["price"], "26.00");
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_run_writes_nothing() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    let engine = SyncEngine::new(&catalog, &store, &dictionary, &settings);

    let first = engine.run_sync().await.unwrap();
    assert_eq!(first.products.created, 1);
    let writes = store.write_count();

    let second = engine.run_sync().await.unwrap();
    assert_eq!(store.write_count(), writes);
    assert_eq!((second.categories.created, second.categories.updated), (0, 0));
    assert_eq!((second.products.created, second.products.updated), (0, 0));
    assert_eq!((second.products.variants.created, second.products.variants.updated), (0, 0));
    assert_eq!(second.products.skipped, 1);
}

#[tokio::test]
async fn unreachable_source_categories_abort_before_products() {
    let store = MemoryStore::new();
    let catalog = FakeCatalog {
        categories_down: true,
        ..tee_catalog()
    };
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    let (tx, rx) = watch::channel(SyncPhase::Idle);

    let err = SyncEngine::new(&catalog, &store, &dictionary, &settings)
        .with_phase_sender(&tx)
        .run_sync()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Phase {
            phase: SyncPhase::FetchingCategories,
            ..
        }
    ));
    assert_eq!(*rx.borrow(), SyncPhase::Failed);
    assert!(store.rows(Collection::Products).is_empty());
}

#[tokio::test]
async fn unreachable_store_fails_the_probe() {
    let store = MemoryStore::new();
    store.fail_on(Collection::Categories, Operation::Read);
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();

    let err = SyncEngine::new(&catalog, &store, &dictionary, &settings)
        .run_sync()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Phase {
            phase: SyncPhase::Probing,
            ..
        }
    ));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn successful_run_publishes_done() {
    let store = MemoryStore::new();
    let catalog = tee_catalog();
    let dictionary = StaticDictionary::builtin();
    let settings = settings();
    let (tx, rx) = watch::channel(SyncPhase::Idle);

    let report = SyncEngine::new(&catalog, &store, &dictionary, &settings)
        .with_phase_sender(&tx)
        .run_sync()
        .await
        .unwrap();

    assert_eq!(*rx.borrow(), SyncPhase::Done);
    assert!(report.finished_at >= report.started_at);
    assert_eq!(report.products.variants.created, 2);
    assert_eq!(
        store
            .rows(Collection::Products)
            .first()
            .and_then(|p| p["price"].as_str())
            .map(|p| p.parse::<Decimal>().unwrap()),
        Some(Decimal::new(2450, 2))
    );
}
