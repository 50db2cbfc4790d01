//! Pricing version comparison and cloning.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgConnection;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::db;
use crate::error::{AppError, Result};
use crate::models::{
    ApplicationModule, IntegrationType, PricingRule, PricingVersion, SaasProduct, SkuDefinition,
    TextSnippet, TravelZone,
};

// ==================== Compare ====================

/// Catalog row that can be matched across versions by its code
pub trait Comparable: Serialize + Clone {
    /// Serialized field names compared between versions
    const FIELDS: &'static [&'static str];

    fn key(&self) -> &str;
}

impl Comparable for SkuDefinition {
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "Description",
        "Category",
        "FixedPrice",
        "RequiresQuantity",
        "RequiresTravelZone",
        "RequiresConfiguration",
        "IsActive",
        "SortOrder",
        "EarmarkedStatus",
        "EstimatedHours",
        "AcceptanceCriteria",
    ];

    fn key(&self) -> &str {
        &self.sku_code
    }
}

impl Comparable for SaasProduct {
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "Description",
        "Category",
        "PricingModel",
        "Tier1Min",
        "Tier1Max",
        "Tier1Price",
        "Tier2Min",
        "Tier2Max",
        "Tier2Price",
        "Tier3Min",
        "Tier3Max",
        "Tier3Price",
        "IsActive",
        "IsRequired",
        "SortOrder",
    ];

    fn key(&self) -> &str {
        &self.product_code
    }
}

impl Comparable for TravelZone {
    const FIELDS: &'static [&'static str] = &[
        "Name",
        "Description",
        "MileageRate",
        "DailyRate",
        "AirfareRate",
        "HotelRate",
        "MealsRate",
        "RentalCarRate",
        "ParkingRate",
        "IsActive",
        "SortOrder",
    ];

    fn key(&self) -> &str {
        &self.zone_code
    }
}

impl Comparable for TextSnippet {
    const FIELDS: &'static [&'static str] =
        &["SnippetLabel", "Content", "Category", "IsActive", "SortOrder"];

    fn key(&self) -> &str {
        &self.snippet_key
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Modified<T> {
    pub key: String,
    pub old: T,
    pub new: T,
    pub changed_fields: Vec<&'static str>,
}

/// Rows of one kind split by how they changed, ordered by code
#[derive(Debug, Clone)]
pub struct Diff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub modified: Vec<Modified<T>>,
    pub unchanged: Vec<T>,
}

impl<T> Diff<T> {
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

fn fields_of<T: Serialize>(row: &T) -> Value {
    serde_json::to_value(row).unwrap_or(Value::Null)
}

/// Match rows of two versions by code and compare `T::FIELDS`
pub fn diff<T: Comparable>(old: &[T], new: &[T]) -> Diff<T> {
    let old: BTreeMap<&str, &T> = old.iter().map(|r| (r.key(), r)).collect();
    let new: BTreeMap<&str, &T> = new.iter().map(|r| (r.key(), r)).collect();

    let mut result = Diff {
        added: Vec::new(),
        removed: Vec::new(),
        modified: Vec::new(),
        unchanged: Vec::new(),
    };

    for (key, row) in &new {
        if !old.contains_key(key) {
            result.added.push((*row).clone());
        }
    }

    for (key, before) in &old {
        let Some(after) = new.get(key) else {
            result.removed.push((*before).clone());
            continue;
        };

        let (a, b) = (fields_of(*before), fields_of(*after));
        let changed_fields: Vec<&'static str> = T::FIELDS
            .iter()
            .copied()
            .filter(|f| a.get(f) != b.get(f))
            .collect();

        if changed_fields.is_empty() {
            result.unchanged.push((*after).clone());
        } else {
            result.modified.push(Modified {
                key: key.to_string(),
                old: (*before).clone(),
                new: (*after).clone(),
                changed_fields,
            });
        }
    }

    result
}

#[derive(Debug, Serialize)]
pub struct VersionComparison {
    pub version1: PricingVersion,
    pub version2: PricingVersion,
    pub skus_added: Vec<SkuDefinition>,
    pub skus_removed: Vec<SkuDefinition>,
    pub skus_modified: Vec<Modified<SkuDefinition>>,
    pub skus_unchanged: Vec<SkuDefinition>,
    pub saas_added: Vec<SaasProduct>,
    pub saas_removed: Vec<SaasProduct>,
    pub saas_modified: Vec<Modified<SaasProduct>>,
    pub saas_unchanged: Vec<SaasProduct>,
    pub zones_added: Vec<TravelZone>,
    pub zones_removed: Vec<TravelZone>,
    pub zones_modified: Vec<Modified<TravelZone>>,
    pub zones_unchanged: Vec<TravelZone>,
    pub snippets_added: Vec<TextSnippet>,
    pub snippets_removed: Vec<TextSnippet>,
    pub snippets_modified: Vec<Modified<TextSnippet>>,
    pub snippets_unchanged: Vec<TextSnippet>,
    pub total_changes: usize,
    pub has_differences: bool,
}

impl VersionComparison {
    pub fn new(
        version1: PricingVersion,
        version2: PricingVersion,
        skus: Diff<SkuDefinition>,
        saas: Diff<SaasProduct>,
        zones: Diff<TravelZone>,
        snippets: Diff<TextSnippet>,
    ) -> Self {
        let total_changes = skus.change_count()
            + saas.change_count()
            + zones.change_count()
            + snippets.change_count();
        Self {
            version1,
            version2,
            skus_added: skus.added,
            skus_removed: skus.removed,
            skus_modified: skus.modified,
            skus_unchanged: skus.unchanged,
            saas_added: saas.added,
            saas_removed: saas.removed,
            saas_modified: saas.modified,
            saas_unchanged: saas.unchanged,
            zones_added: zones.added,
            zones_removed: zones.removed,
            zones_modified: zones.modified,
            zones_unchanged: zones.unchanged,
            snippets_added: snippets.added,
            snippets_removed: snippets.removed,
            snippets_modified: snippets.modified,
            snippets_unchanged: snippets.unchanged,
            total_changes,
            has_differences: total_changes > 0,
        }
    }
}

pub async fn compare(conn: &mut PgConnection, id1: Uuid, id2: Uuid) -> Result<VersionComparison> {
    let version1 = db::find_pricing_version(&mut *conn, id1)
        .await?
        .ok_or_else(|| AppError::not_found("Version 1 not found"))?;
    let version2 = db::find_pricing_version(&mut *conn, id2)
        .await?
        .ok_or_else(|| AppError::not_found("Version 2 not found"))?;

    let skus = diff(
        &db::version_skus(&mut *conn, id1, false).await?,
        &db::version_skus(&mut *conn, id2, false).await?,
    );
    let saas = diff(
        &db::version_products(&mut *conn, id1, false).await?,
        &db::version_products(&mut *conn, id2, false).await?,
    );
    let zones = diff(
        &db::version_zones(&mut *conn, id1).await?,
        &db::version_zones(&mut *conn, id2).await?,
    );
    let snippets = diff(
        &db::version_snippets(&mut *conn, id1).await?,
        &db::version_snippets(&mut *conn, id2).await?,
    );

    Ok(VersionComparison::new(version1, version2, skus, saas, zones, snippets))
}

// ==================== Clone ====================

/// Every row owned by a version
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    pub products: Vec<SaasProduct>,
    pub skus: Vec<SkuDefinition>,
    pub zones: Vec<TravelZone>,
    pub integration_types: Vec<IntegrationType>,
    pub modules: Vec<ApplicationModule>,
    pub rules: Vec<PricingRule>,
    pub snippets: Vec<TextSnippet>,
}

impl VersionCatalog {
    /// Copy of the catalog under a new version: fresh ids and timestamps,
    /// with module product links pointing at the copied products.
    pub fn rehome(&self, version_id: Uuid) -> VersionCatalog {
        let now = Utc::now();
        let mut product_ids = HashMap::new();

        let products = self
            .products
            .iter()
            .map(|p| {
                let id = Uuid::new_v4();
                product_ids.insert(p.id, id);
                SaasProduct {
                    id,
                    pricing_version_id: version_id,
                    created_at: now,
                    updated_at: now,
                    ..p.clone()
                }
            })
            .collect();

        let skus = self
            .skus
            .iter()
            .map(|s| SkuDefinition {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                created_at: now,
                updated_at: now,
                ..s.clone()
            })
            .collect();

        let zones = self
            .zones
            .iter()
            .map(|z| TravelZone {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                created_at: now,
                updated_at: now,
                ..z.clone()
            })
            .collect();

        let integration_types = self
            .integration_types
            .iter()
            .map(|t| IntegrationType {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                ..t.clone()
            })
            .collect();

        let modules = self
            .modules
            .iter()
            .map(|m| ApplicationModule {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                saas_product_id: m.saas_product_id.and_then(|old| product_ids.get(&old).copied()),
                ..m.clone()
            })
            .collect();

        let rules = self
            .rules
            .iter()
            .map(|r| PricingRule {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                ..r.clone()
            })
            .collect();

        let snippets = self
            .snippets
            .iter()
            .map(|t| TextSnippet {
                id: Uuid::new_v4(),
                pricing_version_id: version_id,
                created_at: now,
                updated_at: now,
                ..t.clone()
            })
            .collect();

        VersionCatalog {
            products,
            skus,
            zones,
            integration_types,
            modules,
            rules,
            snippets,
        }
    }
}

async fn load_catalog(conn: &mut PgConnection, version_id: Uuid) -> Result<VersionCatalog> {
    Ok(VersionCatalog {
        products: db::version_products(&mut *conn, version_id, false).await?,
        skus: db::version_skus(&mut *conn, version_id, false).await?,
        zones: db::version_zones(&mut *conn, version_id).await?,
        integration_types: db::version_integration_types(&mut *conn, version_id, false).await?,
        modules: db::version_modules(&mut *conn, version_id, false).await?,
        rules: db::version_rules(&mut *conn, version_id, false).await?,
        snippets: db::version_snippets(&mut *conn, version_id).await?,
    })
}

/// Insert every row of a catalog; products go first so module links resolve
pub async fn insert_catalog(conn: &mut PgConnection, catalog: &VersionCatalog) -> Result<()> {
    for p in &catalog.products {
        db::insert_saas_product(&mut *conn, p).await?;
    }
    for s in &catalog.skus {
        db::insert_sku_definition(&mut *conn, s).await?;
    }
    for z in &catalog.zones {
        db::insert_travel_zone(&mut *conn, z).await?;
    }
    for t in &catalog.integration_types {
        db::insert_integration_type(&mut *conn, t).await?;
    }
    for m in &catalog.modules {
        db::insert_module(&mut *conn, m).await?;
    }
    for r in &catalog.rules {
        db::insert_rule(&mut *conn, r).await?;
    }
    for t in &catalog.snippets {
        db::insert_text_snippet(&mut *conn, t).await?;
    }
    Ok(())
}

/// Deep-copy a version's catalog under a new version number.
///
/// Run inside a transaction; the clone is neither current nor locked.
pub async fn clone_version(
    conn: &mut PgConnection,
    source_id: Uuid,
    new_number: &str,
    new_description: Option<String>,
) -> Result<PricingVersion> {
    let source = db::find_pricing_version(&mut *conn, source_id)
        .await?
        .ok_or_else(|| AppError::not_found("Source pricing version not found"))?;

    if db::version_number_exists(&mut *conn, new_number).await? {
        return Err(AppError::bad_request(format!(
            "Version number {} already exists",
            new_number
        )));
    }

    let now = Utc::now();
    let version = db::insert_pricing_version(
        &mut *conn,
        &PricingVersion {
            id: Uuid::new_v4(),
            version_number: new_number.to_string(),
            description: Some(
                new_description
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| format!("Cloned from {}", source.version_number)),
            ),
            effective_date: source.effective_date,
            expiration_date: source.expiration_date,
            created_by: source.created_by.clone(),
            created_at: now,
            updated_at: now,
            is_current: false,
            is_locked: false,
        },
    )
    .await?;

    let copy = load_catalog(&mut *conn, source.id).await?.rehome(version.id);
    insert_catalog(&mut *conn, &copy).await?;

    tracing::info!(
        "Cloned pricing version {} to {}: {} products, {} SKUs, {} zones, {} snippets",
        source.version_number,
        version.version_number,
        copy.products.len(),
        copy.skus.len(),
        copy.zones.len(),
        copy.snippets.len()
    );

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_diff_classifies_rows() {
        let old = vec![
            fixtures::sku("KEEP", Some(dec!(100))),
            fixtures::sku("CHANGE", Some(dec!(100))),
            fixtures::sku("DROP", Some(dec!(100))),
        ];
        let mut changed = fixtures::sku("CHANGE", Some(dec!(125)));
        changed.name = "Renamed".into();
        let new = vec![
            fixtures::sku("KEEP", Some(dec!(100))),
            changed,
            fixtures::sku("NEW", None),
        ];

        let d = diff(&old, &new);
        assert_eq!(d.added.len(), 1);
        assert_eq!(d.added[0].sku_code, "NEW");
        assert_eq!(d.removed[0].sku_code, "DROP");
        assert_eq!(d.unchanged[0].sku_code, "KEEP");
        assert_eq!(d.modified.len(), 1);
        assert_eq!(d.modified[0].key, "CHANGE");
        assert_eq!(d.modified[0].changed_fields, vec!["Name", "FixedPrice"]);
        assert_eq!(d.change_count(), 3);
    }

    #[test]
    fn test_diff_ignores_ids_and_timestamps() {
        // separate fixtures get different ids; only listed fields count
        let d = diff(&[fixtures::zone("A")], &[fixtures::zone("A")]);
        assert_eq!(d.change_count(), 0);
        assert_eq!(d.unchanged.len(), 1);
    }

    #[test]
    fn test_comparison_totals() {
        let v1 = fixtures::pricing_version("2025.1");
        let v2 = fixtures::pricing_version("2025.2");
        let saas = diff(&[fixtures::product("A")], &[]);
        let snippets = diff(
            &[fixtures::snippet("PAYMENT_TERMS", "Net 30.")],
            &[fixtures::snippet("PAYMENT_TERMS", "Net 45.")],
        );
        let comparison = VersionComparison::new(
            v1,
            v2,
            diff::<SkuDefinition>(&[], &[]),
            saas,
            diff::<TravelZone>(&[], &[]),
            snippets,
        );
        assert_eq!(comparison.total_changes, 2);
        assert!(comparison.has_differences);

        let json = serde_json::to_value(&comparison).unwrap();
        assert_eq!(json["saas_removed"][0]["ProductCode"], "A");
        assert_eq!(json["version2"]["VersionNumber"], "2025.2");
        assert_eq!(json["snippets_modified"][0]["changed_fields"], json!(["Content"]));
    }

    #[test]
    fn test_rehome_relinks_module_products() {
        let product = fixtures::product("CHECK-SCANNING");
        let source = VersionCatalog {
            modules: vec![
                fixtures::module("CHECK", "Check", Some(product.id), None),
                fixtures::module("ONLINE", "Online", None, None),
            ],
            products: vec![product.clone()],
            skus: vec![fixtures::sku("SETUP", Some(dec!(10)))],
            rules: vec![fixtures::rule("COMPLEXITY_FACTOR", json!({}))],
            snippets: vec![fixtures::snippet("PAYMENT_TERMS", "Net 30.")],
            ..Default::default()
        };

        let target = Uuid::new_v4();
        let copy = source.rehome(target);

        assert_eq!(copy.products.len(), 1);
        assert_ne!(copy.products[0].id, product.id);
        assert_eq!(copy.products[0].pricing_version_id, target);
        assert_eq!(copy.products[0].product_code, "CHECK-SCANNING");
        assert_eq!(copy.modules[0].saas_product_id, Some(copy.products[0].id));
        assert_eq!(copy.modules[1].saas_product_id, None);
        assert_eq!(copy.skus[0].pricing_version_id, target);
        assert_eq!(copy.rules[0].pricing_version_id, target);
        assert_eq!(copy.snippets[0].pricing_version_id, target);
        assert_ne!(copy.snippets[0].id, source.snippets[0].id);
        assert_eq!(copy.snippets[0].content, "Net 30.");
    }
}
