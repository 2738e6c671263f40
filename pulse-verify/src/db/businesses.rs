//! Business directory queries

use pulse_common::{Business, Error, Result};
use sqlx::SqlitePool;

use super::retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

const COLUMNS: &str = "id, name, address, city, category, license_number, company_number, \
                       phone, website, created_at, updated_at";

/// Business by directory id
pub async fn get_business(pool: &SqlitePool, id: &str) -> Result<Option<Business>> {
    let business = sqlx::query_as::<_, Business>(&format!(
        "SELECT {} FROM businesses WHERE id = ?",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(business)
}

/// Business by directory id, falling back to municipal license number
///
/// The verify route accepts either; an exact id match wins.
pub async fn find_by_id_or_license(pool: &SqlitePool, key: &str) -> Result<Option<Business>> {
    let business = sqlx::query_as::<_, Business>(&format!(
        "SELECT {} FROM businesses
         WHERE id = ? OR license_number = ?
         ORDER BY CASE WHEN id = ? THEN 0 ELSE 1 END, id
         LIMIT 1",
        COLUMNS
    ))
    .bind(key)
    .bind(key)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(business)
}

/// One page of businesses ordered by name, optionally filtered by city
pub async fn list_businesses(
    pool: &SqlitePool,
    city: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Business>> {
    let businesses = match city {
        Some(city) => {
            sqlx::query_as::<_, Business>(&format!(
                "SELECT {} FROM businesses WHERE city = ? ORDER BY name, id LIMIT ? OFFSET ?",
                COLUMNS
            ))
            .bind(city)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Business>(&format!(
                "SELECT {} FROM businesses ORDER BY name, id LIMIT ? OFFSET ?",
                COLUMNS
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(businesses)
}

pub async fn count_businesses(pool: &SqlitePool, city: Option<&str>) -> Result<i64> {
    let count: i64 = match city {
        Some(city) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM businesses WHERE city = ?")
                .bind(city)
                .fetch_one(pool)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM businesses")
                .fetch_one(pool)
                .await?
        }
    };

    Ok(count)
}

/// Insert or replace a directory entry
pub async fn upsert_business(pool: &SqlitePool, business: &Business) -> Result<()> {
    retry_on_lock("upsert_business", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO businesses (
                id, name, address, city, category, license_number, company_number,
                phone, website, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                city = excluded.city,
                category = excluded.category,
                license_number = excluded.license_number,
                company_number = excluded.company_number,
                phone = excluded.phone,
                website = excluded.website,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&business.id)
        .bind(&business.name)
        .bind(&business.address)
        .bind(&business.city)
        .bind(&business.category)
        .bind(&business.license_number)
        .bind(&business.company_number)
        .bind(&business.phone)
        .bind(&business.website)
        .bind(business.created_at)
        .bind(business.updated_at)
        .execute(pool)
        .await?;

        Ok::<(), Error>(())
    })
    .await
}
