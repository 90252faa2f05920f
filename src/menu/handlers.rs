use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo::Role},
    authz::{require_owner_or_admin, require_role},
    error::ApiError,
    menu::{
        dto::{CreateMenuItemRequest, MenuListQuery, MenuSearchQuery, UpdateMenuItemRequest},
        repo::{MenuItem, MenuItemPatch, NewMenuItem},
    },
    response::{ApiResponse, Paginated},
    restaurants::repo::Restaurant,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants/:id/menu", get(list_for_restaurant))
        .route("/menu-items", post(create))
        .route("/menu-items/search", get(search))
        .route(
            "/menu-items/:id",
            get(get_by_id).put(update).delete(remove),
        )
}

fn spicy_level_valid(level: i16) -> bool {
    (0..=3).contains(&level)
}

/// Loads the menu item's restaurant so ownership can be checked.
async fn owning_restaurant(state: &AppState, item: &MenuItem) -> Result<Restaurant, ApiError> {
    Restaurant::find_by_id(&state.db, item.restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))
}

#[instrument(skip(state))]
pub async fn list_for_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
    Query(q): Query<MenuListQuery>,
) -> Result<Json<Paginated<MenuItem>>, ApiError> {
    let (limit, offset) = q.page().limit_offset();
    let rows =
        MenuItem::list_for_restaurant(&state.db, restaurant_id, q.category, limit, offset).await?;
    let total = MenuItem::count_for_restaurant(&state.db, restaurant_id, q.category).await?;
    Ok(Json(Paginated::new(rows, total, q.page().page(), limit)))
}

#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MenuItem>>, ApiError> {
    let item = MenuItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Menu item not found".into()))?;
    Ok(Json(ApiResponse::data(item)))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<MenuSearchQuery>,
) -> Result<Json<ApiResponse<Vec<MenuItem>>>, ApiError> {
    let rows = MenuItem::search(&state.db, &q.q, q.restaurant_id).await?;
    Ok(Json(ApiResponse::data(rows)))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MenuItem>>), ApiError> {
    require_role(&actor, Role::Restaurant)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Menu item name is required".into()));
    }
    if payload.price < 0.0 {
        return Err(ApiError::Validation("Price must not be negative".into()));
    }
    if !spicy_level_valid(payload.spicy_level) {
        return Err(ApiError::Validation(
            "Spicy level must be between 0 and 3".into(),
        ));
    }

    let restaurant = Restaurant::find_by_id(&state.db, payload.restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to add items to this restaurant",
    )?;

    let item = MenuItem::create(
        &state.db,
        NewMenuItem {
            restaurant_id: payload.restaurant_id,
            name: payload.name,
            description: payload.description,
            category: payload.category,
            price: payload.price,
            vegetarian: payload.vegetarian,
            vegan: payload.vegan,
            spicy_level: payload.spicy_level,
        },
    )
    .await?;

    info!(item_id = %item.id, restaurant_id = %item.restaurant_id, "menu item created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Menu item created successfully", item)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemRequest>,
) -> Result<Json<ApiResponse<MenuItem>>, ApiError> {
    let item = MenuItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Menu item not found".into()))?;
    let restaurant = owning_restaurant(&state, &item).await?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to update this menu item",
    )?;

    if let Some(price) = payload.price {
        if price < 0.0 {
            return Err(ApiError::Validation("Price must not be negative".into()));
        }
    }
    if let Some(level) = payload.spicy_level {
        if !spicy_level_valid(level) {
            return Err(ApiError::Validation(
                "Spicy level must be between 0 and 3".into(),
            ));
        }
    }

    let updated = MenuItem::update(
        &state.db,
        id,
        MenuItemPatch {
            name: payload.name,
            description: payload.description,
            category: payload.category,
            price: payload.price,
            vegetarian: payload.vegetarian,
            vegan: payload.vegan,
            spicy_level: payload.spicy_level,
            available: payload.available,
        },
    )
    .await?;

    Ok(Json(ApiResponse::message(
        "Menu item updated successfully",
        updated,
    )))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let item = MenuItem::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Menu item not found".into()))?;
    let restaurant = owning_restaurant(&state, &item).await?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to delete this menu item",
    )?;

    MenuItem::delete(&state.db, id).await?;
    info!(item_id = %id, actor = %actor.id, "menu item deleted");
    Ok(Json(json!({
        "status": "success",
        "message": "Menu item deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spicy_level_bounds() {
        assert!(spicy_level_valid(0));
        assert!(spicy_level_valid(3));
        assert!(!spicy_level_valid(4));
        assert!(!spicy_level_valid(-1));
    }
}
