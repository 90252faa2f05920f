use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantAddress {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cuisines: Vec<String>,
    pub address: Json<RestaurantAddress>,
    pub phone: Option<String>,
    pub delivery_fee: f64,
    pub min_order: f64,
    pub rating: f64,
    pub review_count: i32,
    pub is_open: bool,
    pub active: bool,
    pub created_at: OffsetDateTime,
}

const RESTAURANT_COLUMNS: &str = "id, owner_id, name, description, cuisines, address, phone, \
    delivery_fee, min_order, rating, review_count, is_open, active, created_at";

pub struct NewRestaurant {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cuisines: Vec<String>,
    pub address: RestaurantAddress,
    pub phone: Option<String>,
    pub delivery_fee: f64,
    pub min_order: f64,
}

#[derive(Debug, Default)]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cuisines: Option<Vec<String>>,
    pub address: Option<RestaurantAddress>,
    pub phone: Option<String>,
    pub delivery_fee: Option<f64>,
    pub min_order: Option<f64>,
    pub is_open: Option<bool>,
}

impl Restaurant {
    /// Public listing: approved restaurants only, filtered by free-text
    /// substring, cuisine membership and minimum rating, best-rated first.
    pub async fn search(
        db: &PgPool,
        search: &str,
        cuisine: &str,
        min_rating: f64,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Restaurant>> {
        let rows = sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            SELECT {RESTAURANT_COLUMNS} FROM restaurants
            WHERE active = TRUE
              AND ($1 = '' OR name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%')
              AND ($2 = '' OR $2 = ANY(cuisines))
              AND rating >= $3
            ORDER BY rating DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(search)
        .bind(cuisine)
        .bind(min_rating)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_search(
        db: &PgPool,
        search: &str,
        cuisine: &str,
        min_rating: f64,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM restaurants
            WHERE active = TRUE
              AND ($1 = '' OR name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%')
              AND ($2 = '' OR $2 = ANY(cuisines))
              AND rating >= $3
            "#,
        )
        .bind(search)
        .bind(cuisine)
        .bind(min_rating)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Restaurant>> {
        let row = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Restaurant>> {
        let rows = sqlx::query_as::<_, Restaurant>(&format!(
            "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// New restaurants start unapproved and wait for an admin flip.
    pub async fn create(db: &PgPool, new: NewRestaurant) -> anyhow::Result<Restaurant> {
        let row = sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            INSERT INTO restaurants (owner_id, name, description, cuisines, address, phone,
                                     delivery_fee, min_order, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(new.owner_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.cuisines)
        .bind(Json(new.address))
        .bind(new.phone)
        .bind(new.delivery_fee)
        .bind(new.min_order)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(db: &PgPool, id: Uuid, patch: RestaurantPatch) -> anyhow::Result<Restaurant> {
        let row = sqlx::query_as::<_, Restaurant>(&format!(
            r#"
            UPDATE restaurants SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                cuisines = COALESCE($4, cuisines),
                address = COALESCE($5, address),
                phone = COALESCE($6, phone),
                delivery_fee = COALESCE($7, delivery_fee),
                min_order = COALESCE($8, min_order),
                is_open = COALESCE($9, is_open)
            WHERE id = $1
            RETURNING {RESTAURANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.cuisines)
        .bind(patch.address.map(Json))
        .bind(patch.phone)
        .bind(patch.delivery_fee)
        .bind(patch.min_order)
        .bind(patch.is_open)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> anyhow::Result<Option<Restaurant>> {
        let row = sqlx::query_as::<_, Restaurant>(&format!(
            "UPDATE restaurants SET active = $2 WHERE id = $1 RETURNING {RESTAURANT_COLUMNS}"
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }
}
