use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::AuthUser,
        repo::{Role, User},
    },
    authz::{require_owner_or_admin, require_role},
    error::ApiError,
    orders::{
        dto::{
            build_line_items, AssignDeliveryRequest, CreateOrderRequest, OrderListQuery,
            OrderTotals, UpdateStatusRequest,
        },
        repo::{NewOrder, Order},
        status::{OrderStatus, PaymentMethod, PaymentStatus},
    },
    realtime::RoomEvent,
    response::{ApiResponse, Paginated},
    restaurants::repo::Restaurant,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create).get(list_mine))
        .route("/orders/restaurant/:restaurant_id", get(restaurant_orders))
        .route("/orders/:id", get(get_by_id))
        .route("/orders/:id/cancel", post(cancel))
        .route("/orders/:id/status", put(update_status))
        .route("/orders/:id/assign-delivery", put(assign_delivery))
        .route("/orders/:id/complete", put(complete))
}

async fn load_order(state: &AppState, id: Uuid) -> Result<Order, ApiError> {
    Order::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".into()))
}

/// Post-transition side effects: a room broadcast for live trackers and a
/// customer notification. Both run detached — the transition is already
/// durable and must not be failed retroactively.
fn after_transition(state: &AppState, order: &Order) {
    let hub = state.rooms.clone();
    let room = order.id.to_string();
    let event = RoomEvent::OrderStatusChanged {
        order_id: room.clone(),
        status: order.status.to_string(),
        timestamp: OffsetDateTime::now_utc(),
    };
    tokio::spawn(async move {
        hub.publish(&room, event).await;
    });

    let db = state.db.clone();
    let notifier = state.notifier.clone();
    let order = order.clone();
    tokio::spawn(async move {
        let customer = match User::find_by_id(&db, order.customer_id).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(order_id = %order.id, "order customer missing, skipping notification");
                return;
            }
            Err(e) => {
                warn!(error = %e, order_id = %order.id, "customer lookup failed");
                return;
            }
        };
        let result = match order.status {
            OrderStatus::Delivered => notifier.order_delivered(&customer, &order).await,
            OrderStatus::Cancelled => notifier.order_cancelled(&customer, &order).await,
            status => notifier.status_update(&customer, &order, status).await,
        };
        if let Err(e) = result {
            warn!(error = %e, order_id = %order.id, "status notification failed");
        }
    });
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ApiError> {
    if payload.items.is_empty() {
        return Err(ApiError::Validation(
            "Order must contain at least one item".into(),
        ));
    }

    let restaurant = Restaurant::find_by_id(&state.db, payload.restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;

    let items = build_line_items(payload.items)?;
    let totals = OrderTotals::compute(&items, restaurant.delivery_fee, 0.0);

    let order = Order::create(
        &state.db,
        NewOrder {
            customer_id: actor.id,
            restaurant_id: restaurant.id,
            items,
            delivery_address: payload.delivery_address,
            phone_number: payload.phone_number,
            notes: payload.notes,
            payment_method: payload.payment_method.unwrap_or(PaymentMethod::Stripe),
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            tax: totals.tax,
            discount: totals.discount,
            total: totals.total,
        },
    )
    .await?;

    // Confirmation for the customer and a heads-up for the kitchen, both
    // best-effort once the order row exists.
    {
        let db = state.db.clone();
        let notifier = state.notifier.clone();
        let order = order.clone();
        let restaurant = restaurant.clone();
        tokio::spawn(async move {
            let customer = match User::find_by_id(&db, order.customer_id).await {
                Ok(Some(u)) => u,
                _ => {
                    warn!(order_id = %order.id, "customer lookup failed for confirmation");
                    return;
                }
            };
            if let Err(e) = notifier
                .order_confirmation(&customer, &order, &restaurant)
                .await
            {
                warn!(error = %e, order_id = %order.id, "order confirmation failed");
            }
            match User::find_by_id(&db, restaurant.owner_id).await {
                Ok(Some(owner)) => {
                    if let Err(e) = notifier
                        .new_order_to_restaurant(&owner, &customer, &order, &restaurant)
                        .await
                    {
                        warn!(error = %e, order_id = %order.id, "restaurant notification failed");
                    }
                }
                _ => warn!(restaurant_id = %restaurant.id, "owner lookup failed for new order"),
            }
        });
    }

    info!(order_id = %order.id, customer_id = %actor.id, "order placed");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Order placed successfully", order)),
    ))
}

#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = load_order(&state, id).await?;
    let restaurant = Restaurant::find_by_id(&state.db, order.restaurant_id).await?;

    let is_restaurant_owner = restaurant
        .as_ref()
        .is_some_and(|r| r.owner_id == actor.id);
    let is_assigned_courier = order.delivery_person_id == Some(actor.id);
    if order.customer_id != actor.id
        && !is_restaurant_owner
        && !is_assigned_courier
        && actor.role != Role::Admin
    {
        return Err(ApiError::Forbidden(
            "Not authorized to view this order".into(),
        ));
    }

    Ok(Json(ApiResponse::data(order)))
}

#[instrument(skip(state))]
pub async fn list_mine(
    State(state): State<AppState>,
    actor: AuthUser,
    Query(q): Query<OrderListQuery>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let (limit, offset) = q.page().limit_offset();
    let orders = Order::list_for_customer(&state.db, actor.id, q.status, limit, offset).await?;
    let total = Order::count_for_customer(&state.db, actor.id, q.status).await?;
    Ok(Json(Paginated::new(orders, total, q.page().page(), limit)))
}

#[instrument(skip(state))]
pub async fn restaurant_orders(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(restaurant_id): Path<Uuid>,
    Query(q): Query<OrderListQuery>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let restaurant = Restaurant::find_by_id(&state.db, restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to view these orders",
    )?;

    let (limit, offset) = q.page().limit_offset();
    let orders =
        Order::list_for_restaurant(&state.db, restaurant_id, q.status, limit, offset).await?;
    let total = Order::count_for_restaurant(&state.db, restaurant_id, q.status).await?;
    Ok(Json(Paginated::new(orders, total, q.page().page(), limit)))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = load_order(&state, id).await?;
    let restaurant = Restaurant::find_by_id(&state.db, order.restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;
    require_owner_or_admin(
        &actor,
        restaurant.owner_id,
        "Not authorized to update this order",
    )?;

    let next = payload.status;
    // Admins may override the transition table; everyone else walks it.
    if actor.role != Role::Admin {
        if !order.status.can_transition_to(next) {
            return Err(ApiError::BusinessRule(format!(
                "Cannot change order status from {} to {}",
                order.status, next
            )));
        }
        if next == OrderStatus::Delivered && order.payment_status != PaymentStatus::Completed {
            return Err(ApiError::BusinessRule(
                "Order payment must be completed before delivery".into(),
            ));
        }
    }

    let updated = Order::set_status(&state.db, id, next).await?;
    after_transition(&state, &updated);

    info!(order_id = %id, status = %next, "order status updated");
    Ok(Json(ApiResponse::message(
        format!("Order status updated to {next}"),
        updated,
    )))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = load_order(&state, id).await?;
    require_owner_or_admin(&actor, order.customer_id, "Not authorized to cancel this order")?;

    if !order.status.can_cancel() {
        return Err(ApiError::BusinessRule(
            "Cannot cancel order in current status".into(),
        ));
    }

    let cancelled = Order::set_status(&state.db, id, OrderStatus::Cancelled).await?;
    after_transition(&state, &cancelled);

    info!(order_id = %id, "order cancelled");
    Ok(Json(ApiResponse::message(
        "Order cancelled successfully",
        cancelled,
    )))
}

#[instrument(skip(state, payload))]
pub async fn assign_delivery(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignDeliveryRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    require_role(&actor, Role::Delivery)?;
    let order = load_order(&state, id).await?;
    if order.status.is_terminal() {
        return Err(ApiError::BusinessRule(
            "Cannot assign delivery for a completed or cancelled order".into(),
        ));
    }

    let updated = Order::assign_delivery(&state.db, id, payload.delivery_person_id).await?;
    after_transition(&state, &updated);

    info!(order_id = %id, delivery_person_id = %payload.delivery_person_id, "delivery assigned");
    Ok(Json(ApiResponse::message("Delivery person assigned", updated)))
}

#[instrument(skip(state))]
pub async fn complete(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    require_role(&actor, Role::Delivery)?;
    let order = load_order(&state, id).await?;

    if actor.role != Role::Admin {
        if order.status != OrderStatus::OutForDelivery {
            return Err(ApiError::BusinessRule(
                "Order is not out for delivery".into(),
            ));
        }
        if order.payment_status != PaymentStatus::Completed {
            return Err(ApiError::BusinessRule(
                "Order payment must be completed before delivery".into(),
            ));
        }
    }

    let delivered = Order::set_status(&state.db, id, OrderStatus::Delivered).await?;
    after_transition(&state, &delivered);

    info!(order_id = %id, "order completed");
    Ok(Json(ApiResponse::message("Order completed", delivered)))
}
