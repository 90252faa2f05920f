use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "menu_category", rename_all = "lowercase")]
pub enum MenuCategory {
    Appetizer,
    Main,
    Dessert,
    Beverage,
    Combo,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: MenuCategory,
    pub price: f64,
    pub vegetarian: bool,
    pub vegan: bool,
    pub spicy_level: i16,
    pub available: bool,
    pub created_at: OffsetDateTime,
}

const MENU_COLUMNS: &str = "id, restaurant_id, name, description, category, price, \
    vegetarian, vegan, spicy_level, available, created_at";

pub struct NewMenuItem {
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: MenuCategory,
    pub price: f64,
    pub vegetarian: bool,
    pub vegan: bool,
    pub spicy_level: i16,
}

#[derive(Debug, Default)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<MenuCategory>,
    pub price: Option<f64>,
    pub vegetarian: Option<bool>,
    pub vegan: Option<bool>,
    pub spicy_level: Option<i16>,
    pub available: Option<bool>,
}

impl MenuItem {
    pub async fn list_for_restaurant(
        db: &PgPool,
        restaurant_id: Uuid,
        category: Option<MenuCategory>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {MENU_COLUMNS} FROM menu_items
            WHERE restaurant_id = $1 AND ($2::menu_category IS NULL OR category = $2)
            ORDER BY category, name
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(restaurant_id)
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_for_restaurant(
        db: &PgPool,
        restaurant_id: Uuid,
        category: Option<MenuCategory>,
    ) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM menu_items
            WHERE restaurant_id = $1 AND ($2::menu_category IS NULL OR category = $2)
            "#,
        )
        .bind(restaurant_id)
        .bind(category)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<MenuItem>> {
        let row = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, new: NewMenuItem) -> anyhow::Result<MenuItem> {
        let row = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            INSERT INTO menu_items (restaurant_id, name, description, category, price,
                                    vegetarian, vegan, spicy_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(new.restaurant_id)
        .bind(new.name)
        .bind(new.description)
        .bind(new.category)
        .bind(new.price)
        .bind(new.vegetarian)
        .bind(new.vegan)
        .bind(new.spicy_level)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(db: &PgPool, id: Uuid, patch: MenuItemPatch) -> anyhow::Result<MenuItem> {
        let row = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            UPDATE menu_items SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                price = COALESCE($5, price),
                vegetarian = COALESCE($6, vegetarian),
                vegan = COALESCE($7, vegan),
                spicy_level = COALESCE($8, spicy_level),
                available = COALESCE($9, available)
            WHERE id = $1
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.category)
        .bind(patch.price)
        .bind(patch.vegetarian)
        .bind(patch.vegan)
        .bind(patch.spicy_level)
        .bind(patch.available)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Free-text search over name/description, optionally scoped to one
    /// restaurant. Capped at 20 rows.
    pub async fn search(
        db: &PgPool,
        query: &str,
        restaurant_id: Option<Uuid>,
    ) -> anyhow::Result<Vec<MenuItem>> {
        let rows = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {MENU_COLUMNS} FROM menu_items
            WHERE ($1 = '' OR name ILIKE '%' || $1 || '%' OR description ILIKE '%' || $1 || '%')
              AND ($2::uuid IS NULL OR restaurant_id = $2)
            ORDER BY name
            LIMIT 20
            "#
        ))
        .bind(query)
        .bind(restaurant_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
