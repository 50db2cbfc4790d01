//! Quote, quote-version and line-item queries.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Quote, QuoteSaasLine, QuoteSetupLine, QuoteVersion, QuoteVersionDetail};

// ==================== Quotes ====================

pub async fn list_quotes<'e>(
    db: impl PgExecutor<'e>,
    status: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Quote>> {
    let quotes = sqlx::query_as::<_, Quote>(
        r#"
        SELECT *
        FROM quotes
        WHERE ($1::text IS NULL OR status = $1)
        ORDER BY updated_at DESC
        OFFSET $2
        LIMIT $3
        "#,
    )
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(quotes)
}

pub async fn get_quote<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Quote> {
    sqlx::query_as::<_, Quote>("SELECT * FROM quotes WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("Quote not found"))
}

/// Highest quote number issued with the given prefix, e.g. `Q-2025-`.
/// Sequences are compared numerically, so `Q-2025-10000` follows `Q-2025-9999`.
pub async fn last_quote_number<'e>(db: impl PgExecutor<'e>, prefix: &str) -> Result<Option<String>> {
    let number: Option<String> = sqlx::query_scalar(
        r#"
        SELECT quote_number
        FROM quotes
        WHERE starts_with(quote_number, $1)
          AND substring(quote_number FROM length($1) + 1) ~ '^[0-9]+$'
        ORDER BY length(quote_number) DESC, quote_number DESC
        LIMIT 1
        "#,
    )
    .bind(prefix)
    .fetch_optional(db)
    .await?;
    Ok(number)
}

pub async fn insert_quote<'e>(db: impl PgExecutor<'e>, q: &Quote) -> Result<Quote> {
    let row = sqlx::query_as::<_, Quote>(
        r#"
        INSERT INTO quotes (
            id, quote_number, client_name, client_organization, created_by,
            created_at, updated_at, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(q.id)
    .bind(&q.quote_number)
    .bind(&q.client_name)
    .bind(&q.client_organization)
    .bind(&q.created_by)
    .bind(q.created_at)
    .bind(q.updated_at)
    .bind(&q.status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_quote<'e>(db: impl PgExecutor<'e>, q: &Quote) -> Result<Quote> {
    let row = sqlx::query_as::<_, Quote>(
        r#"
        UPDATE quotes
        SET client_name = $2, client_organization = $3, status = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(q.id)
    .bind(&q.client_name)
    .bind(&q.client_organization)
    .bind(&q.status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn touch_quote<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE quotes SET updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Delete a quote; versions and lines cascade
pub async fn delete_quote<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM quotes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

// ==================== Versions ====================

pub async fn quote_versions<'e>(db: impl PgExecutor<'e>, quote_id: Uuid) -> Result<Vec<QuoteVersion>> {
    let versions = sqlx::query_as::<_, QuoteVersion>(
        "SELECT * FROM quote_versions WHERE quote_id = $1 ORDER BY version_number DESC",
    )
    .bind(quote_id)
    .fetch_all(db)
    .await?;
    Ok(versions)
}

pub async fn get_quote_version<'e>(
    db: impl PgExecutor<'e>,
    quote_id: Uuid,
    number: i32,
) -> Result<QuoteVersion> {
    sqlx::query_as::<_, QuoteVersion>(
        "SELECT * FROM quote_versions WHERE quote_id = $1 AND version_number = $2",
    )
    .bind(quote_id)
    .bind(number)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found("Quote version not found"))
}

pub async fn next_version_number<'e>(db: impl PgExecutor<'e>, quote_id: Uuid) -> Result<i32> {
    let next: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM quote_versions WHERE quote_id = $1",
    )
    .bind(quote_id)
    .fetch_one(db)
    .await?;
    Ok(next)
}

pub async fn insert_quote_version<'e>(
    db: impl PgExecutor<'e>,
    v: &QuoteVersion,
) -> Result<QuoteVersion> {
    let row = sqlx::query_as::<_, QuoteVersion>(
        r#"
        INSERT INTO quote_versions (
            id, quote_id, version_number, version_description, pricing_version_id,
            client_data, projection_years, escalation_model, multi_year_freeze_years,
            level_loading_enabled, teller_payments_enabled, discount_config,
            referrer_id, referral_rate_override, milestone_style,
            initial_payment_percentage, project_duration_months, travel_zone_id,
            travel_config, total_saas_monthly, total_saas_annual_year1,
            total_setup_packages, total_travel, total_contracted_amount,
            created_by, created_at, version_status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
        RETURNING *
        "#,
    )
    .bind(v.id)
    .bind(v.quote_id)
    .bind(v.version_number)
    .bind(&v.version_description)
    .bind(v.pricing_version_id)
    .bind(&v.client_data)
    .bind(v.projection_years)
    .bind(&v.escalation_model)
    .bind(v.multi_year_freeze_years)
    .bind(v.level_loading_enabled)
    .bind(v.teller_payments_enabled)
    .bind(&v.discount_config)
    .bind(v.referrer_id)
    .bind(v.referral_rate_override)
    .bind(&v.milestone_style)
    .bind(v.initial_payment_percentage)
    .bind(v.project_duration_months)
    .bind(v.travel_zone_id)
    .bind(&v.travel_config)
    .bind(v.total_saas_monthly)
    .bind(v.total_saas_annual_year1)
    .bind(v.total_setup_packages)
    .bind(v.total_travel)
    .bind(v.total_contracted_amount)
    .bind(&v.created_by)
    .bind(v.created_at)
    .bind(&v.version_status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update_quote_version<'e>(
    db: impl PgExecutor<'e>,
    v: &QuoteVersion,
) -> Result<QuoteVersion> {
    let row = sqlx::query_as::<_, QuoteVersion>(
        r#"
        UPDATE quote_versions
        SET version_description = $2, client_data = $3, projection_years = $4,
            escalation_model = $5, multi_year_freeze_years = $6,
            level_loading_enabled = $7, teller_payments_enabled = $8,
            discount_config = $9, referrer_id = $10, referral_rate_override = $11,
            milestone_style = $12, initial_payment_percentage = $13,
            project_duration_months = $14, travel_zone_id = $15, travel_config = $16,
            total_saas_monthly = $17, total_saas_annual_year1 = $18,
            total_setup_packages = $19, total_travel = $20,
            total_contracted_amount = $21, version_status = $22
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(v.id)
    .bind(&v.version_description)
    .bind(&v.client_data)
    .bind(v.projection_years)
    .bind(&v.escalation_model)
    .bind(v.multi_year_freeze_years)
    .bind(v.level_loading_enabled)
    .bind(v.teller_payments_enabled)
    .bind(&v.discount_config)
    .bind(v.referrer_id)
    .bind(v.referral_rate_override)
    .bind(&v.milestone_style)
    .bind(v.initial_payment_percentage)
    .bind(v.project_duration_months)
    .bind(v.travel_zone_id)
    .bind(&v.travel_config)
    .bind(v.total_saas_monthly)
    .bind(v.total_saas_annual_year1)
    .bind(v.total_setup_packages)
    .bind(v.total_travel)
    .bind(v.total_contracted_amount)
    .bind(&v.version_status)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn delete_quote_version<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM quote_versions WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

// ==================== Line items ====================

pub async fn saas_lines<'e>(db: impl PgExecutor<'e>, version_id: Uuid) -> Result<Vec<QuoteSaasLine>> {
    let lines = sqlx::query_as::<_, QuoteSaasLine>(
        "SELECT * FROM quote_version_saas_products WHERE quote_version_id = $1 ORDER BY id",
    )
    .bind(version_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

pub async fn setup_lines<'e>(db: impl PgExecutor<'e>, version_id: Uuid) -> Result<Vec<QuoteSetupLine>> {
    let lines = sqlx::query_as::<_, QuoteSetupLine>(
        r#"
        SELECT *
        FROM quote_version_setup_packages
        WHERE quote_version_id = $1
        ORDER BY sequence_order NULLS LAST, id
        "#,
    )
    .bind(version_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

/// Replace every line item of a version
pub async fn replace_lines(
    conn: &mut PgConnection,
    version_id: Uuid,
    saas: &[QuoteSaasLine],
    setup: &[QuoteSetupLine],
) -> Result<()> {
    sqlx::query("DELETE FROM quote_version_saas_products WHERE quote_version_id = $1")
        .bind(version_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM quote_version_setup_packages WHERE quote_version_id = $1")
        .bind(version_id)
        .execute(&mut *conn)
        .await?;

    for line in saas {
        sqlx::query(
            r#"
            INSERT INTO quote_version_saas_products (
                id, quote_version_id, saas_product_id, quantity,
                calculated_monthly_price, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id)
        .bind(version_id)
        .bind(line.saas_product_id)
        .bind(line.quantity)
        .bind(line.calculated_monthly_price)
        .bind(&line.notes)
        .execute(&mut *conn)
        .await?;
    }

    for line in setup {
        sqlx::query(
            r#"
            INSERT INTO quote_version_setup_packages (
                id, quote_version_id, sku_definition_id, quantity,
                calculated_price, custom_scope_notes, sequence_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(line.id)
        .bind(version_id)
        .bind(line.sku_definition_id)
        .bind(line.quantity)
        .bind(line.calculated_price)
        .bind(&line.custom_scope_notes)
        .bind(line.sequence_order)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Load a version's line items alongside it
pub async fn version_detail(conn: &mut PgConnection, version: QuoteVersion) -> Result<QuoteVersionDetail> {
    let saas_products = saas_lines(&mut *conn, version.id).await?;
    let setup_packages = setup_lines(&mut *conn, version.id).await?;
    Ok(QuoteVersionDetail {
        version,
        saas_products,
        setup_packages,
    })
}
