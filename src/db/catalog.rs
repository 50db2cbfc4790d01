//! Catalog queries: pricing versions and everything they own, plus the
//! global referrer and mature-integration lists.
//!
//! Functions are generic over `PgExecutor` so handlers can run them against
//! the pool or inside a transaction.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    ApplicationModule, IntegrationType, MatureIntegration, PricingRule, PricingVersion, Referrer,
    SaasProduct, SkuDefinition, TextSnippet, TravelZone,
};

// ==================== Pricing versions ====================

/// Filters for the version list
#[derive(Debug, Default)]
pub struct VersionFilter {
    pub is_locked: Option<bool>,
    pub is_current: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list_pricing_versions<'e>(
    db: impl PgExecutor<'e>,
    filter: &VersionFilter,
) -> Result<Vec<PricingVersion>> {
    let versions = sqlx::query_as::<_, PricingVersion>(
        r#"
        SELECT *
        FROM pricing_versions
        WHERE ($1::bool IS NULL OR is_locked = $1)
          AND ($2::bool IS NULL OR is_current = $2)
        ORDER BY created_at DESC
        OFFSET $3
        LIMIT $4
        "#,
    )
    .bind(filter.is_locked)
    .bind(filter.is_current)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;

    Ok(versions)
}

pub async fn find_pricing_version<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<PricingVersion>> {
    let version =
        sqlx::query_as::<_, PricingVersion>("SELECT * FROM pricing_versions WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(version)
}

pub async fn get_pricing_version<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<PricingVersion> {
    find_pricing_version(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Pricing version not found"))
}

pub async fn find_current_pricing_version<'e>(
    db: impl PgExecutor<'e>,
) -> Result<Option<PricingVersion>> {
    let version = sqlx::query_as::<_, PricingVersion>(
        "SELECT * FROM pricing_versions WHERE is_current = true LIMIT 1",
    )
    .fetch_optional(db)
    .await?;
    Ok(version)
}

pub async fn version_number_exists<'e>(db: impl PgExecutor<'e>, number: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pricing_versions WHERE version_number = $1)",
    )
    .bind(number)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Clear IsCurrent on every version except `keep`
pub async fn unset_current_versions<'e>(db: impl PgExecutor<'e>, keep: Option<Uuid>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE pricing_versions
        SET is_current = false, updated_at = now()
        WHERE is_current = true
          AND ($1::uuid IS NULL OR id <> $1)
        "#,
    )
    .bind(keep)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn insert_pricing_version<'e>(
    db: impl PgExecutor<'e>,
    v: &PricingVersion,
) -> Result<PricingVersion> {
    let row = sqlx::query_as::<_, PricingVersion>(
        r#"
        INSERT INTO pricing_versions (
            id, version_number, description, effective_date, expiration_date,
            created_by, created_at, updated_at, is_current, is_locked
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(v.id)
    .bind(&v.version_number)
    .bind(&v.description)
    .bind(v.effective_date)
    .bind(v.expiration_date)
    .bind(&v.created_by)
    .bind(v.created_at)
    .bind(v.updated_at)
    .bind(v.is_current)
    .bind(v.is_locked)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_pricing_version<'e>(
    db: impl PgExecutor<'e>,
    v: &PricingVersion,
) -> Result<PricingVersion> {
    let row = sqlx::query_as::<_, PricingVersion>(
        r#"
        UPDATE pricing_versions
        SET description = $2,
            expiration_date = $3,
            is_current = $4,
            is_locked = $5,
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(v.id)
    .bind(&v.description)
    .bind(v.expiration_date)
    .bind(v.is_current)
    .bind(v.is_locked)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Versions still referenced by catalog rows or quotes
pub const VERSION_IN_USE: &str = "Cannot delete pricing version with existing dependencies";

fn version_delete_error(e: sqlx::Error) -> AppError {
    AppError::from(e).on_conflict(VERSION_IN_USE)
}

pub async fn delete_pricing_version<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM pricing_versions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(version_delete_error)?;
    Ok(())
}

// ==================== SaaS products ====================

#[derive(Debug, Default)]
pub struct ProductFilter {
    pub pricing_version_id: Option<Uuid>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub is_required: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list_saas_products<'e>(
    db: impl PgExecutor<'e>,
    filter: &ProductFilter,
) -> Result<Vec<SaasProduct>> {
    let products = sqlx::query_as::<_, SaasProduct>(
        r#"
        SELECT *
        FROM saas_products
        WHERE ($1::uuid IS NULL OR pricing_version_id = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::bool IS NULL OR is_active = $3)
          AND ($4::bool IS NULL OR is_required = $4)
        ORDER BY sort_order, name
        OFFSET $5
        LIMIT $6
        "#,
    )
    .bind(filter.pricing_version_id)
    .bind(&filter.category)
    .bind(filter.is_active)
    .bind(filter.is_required)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;
    Ok(products)
}

/// Products of a version; `active_only` restricts to IsActive rows
pub async fn version_products<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    active_only: bool,
) -> Result<Vec<SaasProduct>> {
    let products = sqlx::query_as::<_, SaasProduct>(
        r#"
        SELECT *
        FROM saas_products
        WHERE pricing_version_id = $1 AND (is_active OR NOT $2)
        ORDER BY sort_order, name
        "#,
    )
    .bind(version_id)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(products)
}

pub async fn get_saas_product<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<SaasProduct> {
    sqlx::query_as::<_, SaasProduct>("SELECT * FROM saas_products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("SaaS product not found"))
}

pub async fn find_saas_product<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<SaasProduct>> {
    let product = sqlx::query_as::<_, SaasProduct>("SELECT * FROM saas_products WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(product)
}

pub async fn product_code_exists<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    code: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM saas_products
            WHERE pricing_version_id = $1 AND product_code = $2
        )
        "#,
    )
    .bind(version_id)
    .bind(code)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Insert a product row as given (the caller picks id and version)
pub async fn insert_saas_product<'e>(db: impl PgExecutor<'e>, p: &SaasProduct) -> Result<SaasProduct> {
    let row = sqlx::query_as::<_, SaasProduct>(
        r#"
        INSERT INTO saas_products (
            id, pricing_version_id, product_code, name, description, category,
            pricing_model, tier1_min, tier1_max, tier1_price, tier2_min, tier2_max,
            tier2_price, tier3_min, tier3_max, tier3_price, is_active, is_required,
            sort_order, product_type, required_parameters, selection_rules,
            pricing_formula, related_setup_skus, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
        RETURNING *
        "#,
    )
    .bind(p.id)
    .bind(p.pricing_version_id)
    .bind(&p.product_code)
    .bind(&p.name)
    .bind(&p.description)
    .bind(&p.category)
    .bind(&p.pricing_model)
    .bind(p.tier1_min)
    .bind(p.tier1_max)
    .bind(p.tier1_price)
    .bind(p.tier2_min)
    .bind(p.tier2_max)
    .bind(p.tier2_price)
    .bind(p.tier3_min)
    .bind(p.tier3_max)
    .bind(p.tier3_price)
    .bind(p.is_active)
    .bind(p.is_required)
    .bind(p.sort_order)
    .bind(&p.product_type)
    .bind(&p.required_parameters)
    .bind(&p.selection_rules)
    .bind(&p.pricing_formula)
    .bind(&p.related_setup_skus)
    .bind(p.created_at)
    .bind(p.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_saas_product<'e>(db: impl PgExecutor<'e>, p: &SaasProduct) -> Result<SaasProduct> {
    let row = sqlx::query_as::<_, SaasProduct>(
        r#"
        UPDATE saas_products
        SET name = $2, description = $3, category = $4, pricing_model = $5,
            tier1_min = $6, tier1_max = $7, tier1_price = $8,
            tier2_min = $9, tier2_max = $10, tier2_price = $11,
            tier3_min = $12, tier3_max = $13, tier3_price = $14,
            is_active = $15, is_required = $16, sort_order = $17, product_type = $18,
            required_parameters = $19, selection_rules = $20, pricing_formula = $21,
            related_setup_skus = $22, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(p.id)
    .bind(&p.name)
    .bind(&p.description)
    .bind(&p.category)
    .bind(&p.pricing_model)
    .bind(p.tier1_min)
    .bind(p.tier1_max)
    .bind(p.tier1_price)
    .bind(p.tier2_min)
    .bind(p.tier2_max)
    .bind(p.tier2_price)
    .bind(p.tier3_min)
    .bind(p.tier3_max)
    .bind(p.tier3_price)
    .bind(p.is_active)
    .bind(p.is_required)
    .bind(p.sort_order)
    .bind(&p.product_type)
    .bind(&p.required_parameters)
    .bind(&p.selection_rules)
    .bind(&p.pricing_formula)
    .bind(&p.related_setup_skus)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_saas_product<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM saas_products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| AppError::from(e).on_conflict("Cannot delete SaaS product with existing dependencies"))?;
    Ok(())
}

// ==================== SKU definitions ====================

#[derive(Debug, Default)]
pub struct SkuFilter {
    pub pricing_version_id: Option<Uuid>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list_sku_definitions<'e>(
    db: impl PgExecutor<'e>,
    filter: &SkuFilter,
) -> Result<Vec<SkuDefinition>> {
    let skus = sqlx::query_as::<_, SkuDefinition>(
        r#"
        SELECT *
        FROM sku_definitions
        WHERE ($1::uuid IS NULL OR pricing_version_id = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::bool IS NULL OR is_active = $3)
        ORDER BY sort_order, name
        OFFSET $4
        LIMIT $5
        "#,
    )
    .bind(filter.pricing_version_id)
    .bind(&filter.category)
    .bind(filter.is_active)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;
    Ok(skus)
}

pub async fn version_skus<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    active_only: bool,
) -> Result<Vec<SkuDefinition>> {
    let skus = sqlx::query_as::<_, SkuDefinition>(
        r#"
        SELECT *
        FROM sku_definitions
        WHERE pricing_version_id = $1 AND (is_active OR NOT $2)
        ORDER BY sort_order, name
        "#,
    )
    .bind(version_id)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(skus)
}

pub async fn get_sku_definition<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<SkuDefinition> {
    sqlx::query_as::<_, SkuDefinition>("SELECT * FROM sku_definitions WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("SKU definition not found"))
}

pub async fn find_sku_definition<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<SkuDefinition>> {
    let sku = sqlx::query_as::<_, SkuDefinition>("SELECT * FROM sku_definitions WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(sku)
}

pub async fn sku_code_exists<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    code: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM sku_definitions
            WHERE pricing_version_id = $1 AND sku_code = $2
        )
        "#,
    )
    .bind(version_id)
    .bind(code)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn insert_sku_definition<'e>(
    db: impl PgExecutor<'e>,
    s: &SkuDefinition,
) -> Result<SkuDefinition> {
    let row = sqlx::query_as::<_, SkuDefinition>(
        r#"
        INSERT INTO sku_definitions (
            id, pricing_version_id, sku_code, name, description, category,
            fixed_price, requires_quantity, requires_travel_zone,
            requires_configuration, is_active, sort_order, earmarked_status,
            estimated_hours, acceptance_criteria, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *
        "#,
    )
    .bind(s.id)
    .bind(s.pricing_version_id)
    .bind(&s.sku_code)
    .bind(&s.name)
    .bind(&s.description)
    .bind(&s.category)
    .bind(s.fixed_price)
    .bind(s.requires_quantity)
    .bind(s.requires_travel_zone)
    .bind(s.requires_configuration)
    .bind(s.is_active)
    .bind(s.sort_order)
    .bind(s.earmarked_status)
    .bind(s.estimated_hours)
    .bind(&s.acceptance_criteria)
    .bind(s.created_at)
    .bind(s.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_sku_definition<'e>(
    db: impl PgExecutor<'e>,
    s: &SkuDefinition,
) -> Result<SkuDefinition> {
    let row = sqlx::query_as::<_, SkuDefinition>(
        r#"
        UPDATE sku_definitions
        SET name = $2, description = $3, category = $4, fixed_price = $5,
            requires_quantity = $6, requires_travel_zone = $7,
            requires_configuration = $8, is_active = $9, sort_order = $10,
            earmarked_status = $11, estimated_hours = $12,
            acceptance_criteria = $13, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(s.id)
    .bind(&s.name)
    .bind(&s.description)
    .bind(&s.category)
    .bind(s.fixed_price)
    .bind(s.requires_quantity)
    .bind(s.requires_travel_zone)
    .bind(s.requires_configuration)
    .bind(s.is_active)
    .bind(s.sort_order)
    .bind(s.earmarked_status)
    .bind(s.estimated_hours)
    .bind(&s.acceptance_criteria)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Delete a SKU; SKUs used by quote setup packages are refused
pub async fn delete_sku_definition<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM sku_definitions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| {
            AppError::from(e).on_conflict("Cannot delete SKU definition with existing dependencies")
        })?;
    Ok(())
}

// ==================== Travel zones ====================

#[derive(Debug, Default)]
pub struct ZoneFilter {
    pub pricing_version_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list_travel_zones<'e>(
    db: impl PgExecutor<'e>,
    filter: &ZoneFilter,
) -> Result<Vec<TravelZone>> {
    let zones = sqlx::query_as::<_, TravelZone>(
        r#"
        SELECT *
        FROM travel_zones
        WHERE ($1::uuid IS NULL OR pricing_version_id = $1)
          AND ($2::bool IS NULL OR is_active = $2)
        ORDER BY sort_order, name
        OFFSET $3
        LIMIT $4
        "#,
    )
    .bind(filter.pricing_version_id)
    .bind(filter.is_active)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;
    Ok(zones)
}

pub async fn version_zones<'e>(db: impl PgExecutor<'e>, version_id: Uuid) -> Result<Vec<TravelZone>> {
    let zones = sqlx::query_as::<_, TravelZone>(
        "SELECT * FROM travel_zones WHERE pricing_version_id = $1 ORDER BY sort_order, name",
    )
    .bind(version_id)
    .fetch_all(db)
    .await?;
    Ok(zones)
}

pub async fn get_travel_zone<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<TravelZone> {
    find_travel_zone(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Travel zone not found"))
}

pub async fn find_travel_zone<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<TravelZone>> {
    let zone = sqlx::query_as::<_, TravelZone>("SELECT * FROM travel_zones WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(zone)
}

pub async fn zone_code_exists<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    code: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM travel_zones
            WHERE pricing_version_id = $1 AND zone_code = $2
        )
        "#,
    )
    .bind(version_id)
    .bind(code)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn insert_travel_zone<'e>(db: impl PgExecutor<'e>, z: &TravelZone) -> Result<TravelZone> {
    let row = sqlx::query_as::<_, TravelZone>(
        r#"
        INSERT INTO travel_zones (
            id, pricing_version_id, zone_code, name, description, mileage_rate,
            daily_rate, airfare_rate, hotel_rate, meals_rate, rental_car_rate,
            parking_rate, is_active, sort_order, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING *
        "#,
    )
    .bind(z.id)
    .bind(z.pricing_version_id)
    .bind(&z.zone_code)
    .bind(&z.name)
    .bind(&z.description)
    .bind(z.mileage_rate)
    .bind(z.daily_rate)
    .bind(z.airfare_rate)
    .bind(z.hotel_rate)
    .bind(z.meals_rate)
    .bind(z.rental_car_rate)
    .bind(z.parking_rate)
    .bind(z.is_active)
    .bind(z.sort_order)
    .bind(z.created_at)
    .bind(z.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_travel_zone<'e>(db: impl PgExecutor<'e>, z: &TravelZone) -> Result<TravelZone> {
    let row = sqlx::query_as::<_, TravelZone>(
        r#"
        UPDATE travel_zones
        SET name = $2, description = $3, mileage_rate = $4, daily_rate = $5,
            airfare_rate = $6, hotel_rate = $7, meals_rate = $8,
            rental_car_rate = $9, parking_rate = $10, is_active = $11,
            sort_order = $12, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(z.id)
    .bind(&z.name)
    .bind(&z.description)
    .bind(z.mileage_rate)
    .bind(z.daily_rate)
    .bind(z.airfare_rate)
    .bind(z.hotel_rate)
    .bind(z.meals_rate)
    .bind(z.rental_car_rate)
    .bind(z.parking_rate)
    .bind(z.is_active)
    .bind(z.sort_order)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_travel_zone<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM travel_zones WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| AppError::from(e).on_conflict("Cannot delete travel zone with existing dependencies"))?;
    Ok(())
}

// ==================== Text snippets ====================

#[derive(Debug, Default)]
pub struct SnippetFilter {
    pub pricing_version_id: Option<Uuid>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub async fn list_text_snippets<'e>(
    db: impl PgExecutor<'e>,
    filter: &SnippetFilter,
) -> Result<Vec<TextSnippet>> {
    let snippets = sqlx::query_as::<_, TextSnippet>(
        r#"
        SELECT *
        FROM text_snippets
        WHERE ($1::uuid IS NULL OR pricing_version_id = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::bool IS NULL OR is_active = $3)
        ORDER BY category, sort_order, snippet_label
        OFFSET $4
        LIMIT $5
        "#,
    )
    .bind(filter.pricing_version_id)
    .bind(&filter.category)
    .bind(filter.is_active)
    .bind(filter.skip)
    .bind(filter.limit)
    .fetch_all(db)
    .await?;
    Ok(snippets)
}

pub async fn version_snippets<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
) -> Result<Vec<TextSnippet>> {
    let snippets = sqlx::query_as::<_, TextSnippet>(
        "SELECT * FROM text_snippets WHERE pricing_version_id = $1 ORDER BY category, sort_order, snippet_label",
    )
    .bind(version_id)
    .fetch_all(db)
    .await?;
    Ok(snippets)
}

pub async fn get_text_snippet<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<TextSnippet> {
    sqlx::query_as::<_, TextSnippet>("SELECT * FROM text_snippets WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Text snippet not found"))
}

pub async fn snippet_key_exists<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    key: &str,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM text_snippets
            WHERE pricing_version_id = $1 AND snippet_key = $2
        )
        "#,
    )
    .bind(version_id)
    .bind(key)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn insert_text_snippet<'e>(db: impl PgExecutor<'e>, t: &TextSnippet) -> Result<TextSnippet> {
    let row = sqlx::query_as::<_, TextSnippet>(
        r#"
        INSERT INTO text_snippets (
            id, pricing_version_id, snippet_key, snippet_label, content,
            category, sort_order, is_active, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(t.id)
    .bind(t.pricing_version_id)
    .bind(&t.snippet_key)
    .bind(&t.snippet_label)
    .bind(&t.content)
    .bind(&t.category)
    .bind(t.sort_order)
    .bind(t.is_active)
    .bind(t.created_at)
    .bind(t.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_text_snippet<'e>(db: impl PgExecutor<'e>, t: &TextSnippet) -> Result<TextSnippet> {
    let row = sqlx::query_as::<_, TextSnippet>(
        r#"
        UPDATE text_snippets
        SET snippet_label = $2, content = $3, category = $4, sort_order = $5,
            is_active = $6, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(t.id)
    .bind(&t.snippet_label)
    .bind(&t.content)
    .bind(&t.category)
    .bind(t.sort_order)
    .bind(t.is_active)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_text_snippet<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM text_snippets WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| AppError::from(e).on_conflict("Cannot delete text snippet with existing dependencies"))?;
    Ok(())
}

// ==================== Referrers ====================

pub async fn list_referrers<'e>(
    db: impl PgExecutor<'e>,
    is_active: Option<bool>,
) -> Result<Vec<Referrer>> {
    let referrers = sqlx::query_as::<_, Referrer>(
        r#"
        SELECT *
        FROM referrers
        WHERE ($1::bool IS NULL OR is_active = $1)
        ORDER BY referrer_name
        "#,
    )
    .bind(is_active)
    .fetch_all(db)
    .await?;
    Ok(referrers)
}

pub async fn get_referrer<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Referrer> {
    sqlx::query_as::<_, Referrer>("SELECT * FROM referrers WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Referrer not found"))
}

pub async fn find_referrer<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Referrer>> {
    let referrer = sqlx::query_as::<_, Referrer>("SELECT * FROM referrers WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(referrer)
}

pub async fn referrer_name_exists<'e>(
    db: impl PgExecutor<'e>,
    name: &str,
    except: Option<Uuid>,
) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM referrers
            WHERE referrer_name = $1 AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(except)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn insert_referrer<'e>(db: impl PgExecutor<'e>, r: &Referrer) -> Result<Referrer> {
    let row = sqlx::query_as::<_, Referrer>(
        r#"
        INSERT INTO referrers (id, referrer_name, standard_rate, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(r.id)
    .bind(&r.referrer_name)
    .bind(r.standard_rate)
    .bind(r.is_active)
    .bind(r.created_at)
    .bind(r.updated_at)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_referrer<'e>(db: impl PgExecutor<'e>, r: &Referrer) -> Result<Referrer> {
    let row = sqlx::query_as::<_, Referrer>(
        r#"
        UPDATE referrers
        SET referrer_name = $2, standard_rate = $3, is_active = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(r.id)
    .bind(&r.referrer_name)
    .bind(r.standard_rate)
    .bind(r.is_active)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_referrer<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM referrers WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .map_err(|e| AppError::from(e).on_conflict("Cannot delete referrer with existing dependencies"))?;
    Ok(())
}

// ==================== Configuration tables ====================

pub async fn active_mature_integrations<'e>(
    db: impl PgExecutor<'e>,
) -> Result<Vec<MatureIntegration>> {
    let rows = sqlx::query_as::<_, MatureIntegration>(
        "SELECT * FROM mature_integrations WHERE is_active ORDER BY system_name",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn version_integration_types<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    active_only: bool,
) -> Result<Vec<IntegrationType>> {
    let rows = sqlx::query_as::<_, IntegrationType>(
        r#"
        SELECT *
        FROM integration_types
        WHERE pricing_version_id = $1 AND (is_active OR NOT $2)
        ORDER BY sort_order
        "#,
    )
    .bind(version_id)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_integration_type<'e>(
    db: impl PgExecutor<'e>,
    t: &IntegrationType,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO integration_types (
            id, pricing_version_id, type_code, type_name, description, monthly_cost,
            mature_setup_sku, custom_setup_sku, required_parameters, is_active, sort_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(t.id)
    .bind(t.pricing_version_id)
    .bind(&t.type_code)
    .bind(&t.type_name)
    .bind(&t.description)
    .bind(t.monthly_cost)
    .bind(&t.mature_setup_sku)
    .bind(&t.custom_setup_sku)
    .bind(&t.required_parameters)
    .bind(t.is_active)
    .bind(t.sort_order)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn version_modules<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    active_only: bool,
) -> Result<Vec<ApplicationModule>> {
    let rows = sqlx::query_as::<_, ApplicationModule>(
        r#"
        SELECT *
        FROM application_modules
        WHERE pricing_version_id = $1 AND (is_active OR NOT $2)
        ORDER BY sort_order
        "#,
    )
    .bind(version_id)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_module<'e>(db: impl PgExecutor<'e>, m: &ApplicationModule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO application_modules (
            id, pricing_version_id, module_code, module_name, description,
            saas_product_id, sub_parameters, selection_rules, is_active, sort_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(m.id)
    .bind(m.pricing_version_id)
    .bind(&m.module_code)
    .bind(&m.module_name)
    .bind(&m.description)
    .bind(m.saas_product_id)
    .bind(&m.sub_parameters)
    .bind(&m.selection_rules)
    .bind(m.is_active)
    .bind(m.sort_order)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn version_rules<'e>(
    db: impl PgExecutor<'e>,
    version_id: Uuid,
    active_only: bool,
) -> Result<Vec<PricingRule>> {
    let rows = sqlx::query_as::<_, PricingRule>(
        r#"
        SELECT *
        FROM pricing_rules
        WHERE pricing_version_id = $1 AND (is_active OR NOT $2)
        ORDER BY sort_order
        "#,
    )
    .bind(version_id)
    .bind(active_only)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_rule<'e>(db: impl PgExecutor<'e>, r: &PricingRule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pricing_rules (
            id, pricing_version_id, rule_code, rule_name, description, rule_type,
            configuration, is_active, sort_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(r.id)
    .bind(r.pricing_version_id)
    .bind(&r.rule_code)
    .bind(&r.rule_name)
    .bind(&r.description)
    .bind(&r.rule_type)
    .bind(&r.configuration)
    .bind(r.is_active)
    .bind(r.sort_order)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn insert_mature_integration<'e>(
    db: impl PgExecutor<'e>,
    m: &MatureIntegration,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO mature_integrations (
            id, integration_code, system_name, vendor, comments, is_active, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (integration_code) DO NOTHING
        "#,
    )
    .bind(m.id)
    .bind(&m.integration_code)
    .bind(&m.system_name)
    .bind(&m.vendor)
    .bind(&m.comments)
    .bind(m.is_active)
    .bind(m.created_at)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::{violation, Violation};

    #[test]
    fn test_referenced_version_delete_is_a_bad_request() {
        let err = version_delete_error(violation(Violation::ForeignKey));
        assert!(matches!(&err, AppError::BadRequest(msg) if msg == VERSION_IN_USE));

        let err = version_delete_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::Database(_)));
    }
}
