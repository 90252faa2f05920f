use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::AuthUser,
        repo::{Role, User},
    },
    authz::{require_owner_or_admin, require_role},
    error::ApiError,
    response::{ApiResponse, Paginated},
    restaurants::{
        dto::{ApproveRequest, CreateRestaurantRequest, RestaurantQuery, UpdateRestaurantRequest},
        repo::{NewRestaurant, Restaurant, RestaurantPatch},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants", get(list).post(create))
        .route("/restaurants/owner/my-restaurants", get(my_restaurants))
        .route(
            "/restaurants/:id",
            get(get_by_id).put(update).delete(remove),
        )
        .route("/restaurants/:id/approve", patch(approve))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<RestaurantQuery>,
) -> Result<Json<Paginated<Restaurant>>, ApiError> {
    let (limit, offset) = q.page().limit_offset();
    let rows =
        Restaurant::search(&state.db, &q.search, &q.cuisine, q.min_rating, limit, offset).await?;
    let total = Restaurant::count_search(&state.db, &q.search, &q.cuisine, q.min_rating).await?;
    Ok(Json(Paginated::new(rows, total, q.page().page(), limit)))
}

#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Restaurant>>, ApiError> {
    let restaurant = Restaurant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    Ok(Json(ApiResponse::data(restaurant)))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<CreateRestaurantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Restaurant>>), ApiError> {
    require_role(&actor, Role::Restaurant)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("Restaurant name is required".into()));
    }

    let restaurant = Restaurant::create(
        &state.db,
        NewRestaurant {
            owner_id: actor.id,
            name: payload.name,
            description: payload.description,
            cuisines: payload.cuisines,
            address: payload.address,
            phone: payload.phone,
            delivery_fee: payload.delivery_fee,
            min_order: payload.min_order,
        },
    )
    .await?;

    info!(restaurant_id = %restaurant.id, owner_id = %actor.id, "restaurant created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message(
            "Restaurant created successfully. Awaiting admin approval.",
            restaurant,
        )),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRestaurantRequest>,
) -> Result<Json<ApiResponse<Restaurant>>, ApiError> {
    let restaurant = Restaurant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to update this restaurant",
    )?;

    let updated = Restaurant::update(
        &state.db,
        id,
        RestaurantPatch {
            name: payload.name,
            description: payload.description,
            cuisines: payload.cuisines,
            address: payload.address,
            phone: payload.phone,
            delivery_fee: payload.delivery_fee,
            min_order: payload.min_order,
            is_open: payload.is_open,
        },
    )
    .await?;

    Ok(Json(ApiResponse::message(
        "Restaurant updated successfully",
        updated,
    )))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let restaurant = Restaurant::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to delete this restaurant",
    )?;

    Restaurant::delete(&state.db, id).await?;
    info!(restaurant_id = %id, actor = %actor.id, "restaurant deleted");
    Ok(Json(json!({
        "status": "success",
        "message": "Restaurant deleted successfully"
    })))
}

#[instrument(skip(state))]
pub async fn my_restaurants(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<ApiResponse<Vec<Restaurant>>>, ApiError> {
    require_role(&actor, Role::Restaurant)?;
    let rows = Restaurant::list_by_owner(&state.db, actor.id).await?;
    Ok(Json(ApiResponse::data(rows)))
}

#[instrument(skip(state, payload))]
pub async fn approve(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<ApiResponse<Restaurant>>, ApiError> {
    if actor.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "Forbidden - insufficient permissions".into(),
        ));
    }

    let restaurant = Restaurant::set_active(&state.db, id, payload.active)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;

    if payload.active {
        // Approval email to the owner is best-effort.
        let notifier = state.notifier.clone();
        let db = state.db.clone();
        let approved = restaurant.clone();
        tokio::spawn(async move {
            match User::find_by_id(&db, approved.owner_id).await {
                Ok(Some(owner)) => {
                    if let Err(e) = notifier.restaurant_approved(&owner, &approved).await {
                        warn!(error = %e, restaurant_id = %approved.id, "approval email failed");
                    }
                }
                Ok(None) => warn!(restaurant_id = %approved.id, "approved restaurant has no owner"),
                Err(e) => warn!(error = %e, "owner lookup failed for approval email"),
            }
        });
    }

    let message = if payload.active {
        "Restaurant approved"
    } else {
        "Restaurant rejected"
    };
    info!(restaurant_id = %id, active = payload.active, "restaurant approval updated");
    Ok(Json(ApiResponse::message(message, restaurant)))
}
