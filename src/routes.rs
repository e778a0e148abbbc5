use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{require_admin, AdminContext};
use crate::commands::{admin, menu, orders};
use crate::error::AppError;
use crate::models::{
    CreateMenuItem, CreateOrder, LoginRequest, Menu, OrderFilter, UpdateAvailability,
    UpdateMenuItem, UpdateOrderStatus, UpdatePaymentStatus,
};
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `{ success: true, message?, count?, data? }`
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    fn data(data: T) -> Self {
        Envelope {
            success: true,
            message: None,
            count: None,
            data: Some(data),
        }
    }

    fn message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    fn created(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

type ApiResult = Result<Response, AppError>;

// ===== MENU =====

async fn get_menu(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(Envelope::data(menu::get_menu(&state.db)?).into_response())
}

async fn get_category_items(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> ApiResult {
    Ok(Envelope::data(menu::get_category_items(&state.db, &category_id)?).into_response())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_menu(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    let results = menu::search_menu(&state.db, query.q.as_deref())?;
    let count = results.len();
    Ok(Envelope::data(results).count(count).into_response())
}

async fn add_menu_item(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateMenuItem>,
) -> ApiResult {
    let created = menu::add_menu_item(&state.db, payload)?;
    Ok(Envelope::data(created)
        .message("Menu item added successfully")
        .created())
}

async fn update_menu_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    ApiJson(changes): ApiJson<UpdateMenuItem>,
) -> ApiResult {
    let item = menu::update_menu_item(&state.db, &item_id, changes)?;
    Ok(Envelope::data(item)
        .message("Menu item updated successfully")
        .into_response())
}

async fn update_item_availability(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    ApiJson(body): ApiJson<UpdateAvailability>,
) -> ApiResult {
    let result = menu::update_item_availability(&state.db, &item_id, body.available)?;
    Ok(Envelope::data(result)
        .message("Item availability updated")
        .into_response())
}

async fn delete_menu_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> ApiResult {
    let deleted = menu::delete_menu_item(&state.db, &item_id)?;
    Ok(Envelope::data(deleted)
        .message("Menu item deleted successfully")
        .into_response())
}

async fn seed_menu(
    State(state): State<Arc<AppState>>,
    ApiJson(document): ApiJson<Menu>,
) -> ApiResult {
    let seeded = menu::seed_menu(&state.db, document)?;
    Ok(Envelope::data(seeded)
        .message("Menu seeded successfully")
        .created())
}

// ===== ORDERS =====

async fn create_order(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateOrder>,
) -> ApiResult {
    let order = orders::create_order(&state.db, payload)?;
    Ok(Envelope::data(order)
        .message("Order placed successfully")
        .created())
}

async fn get_all_orders(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<OrderFilter>,
) -> ApiResult {
    let orders = orders::get_all_orders(&state.db, filter.status.as_deref())?;
    let count = orders.len();
    Ok(Envelope::data(orders).count(count).into_response())
}

async fn get_order(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    Ok(Envelope::data(orders::get_order(&state.db, &id)?).into_response())
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateOrderStatus>,
) -> ApiResult {
    let order = orders::update_order_status(&state.db, &id, body.status.as_deref())?;
    Ok(Envelope::data(order)
        .message("Order status updated")
        .into_response())
}

async fn update_payment_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdatePaymentStatus>,
) -> ApiResult {
    let order = orders::update_payment_status(&state.db, &id, body.payment_status.as_deref())?;
    Ok(Envelope::data(order)
        .message("Payment status updated")
        .into_response())
}

// ===== ADMIN =====

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(credentials): ApiJson<LoginRequest>,
) -> ApiResult {
    let session = admin::login(&state, credentials)?;
    Ok(Envelope::data(session)
        .message("Admin login successful")
        .into_response())
}

async fn me(Extension(context): Extension<AdminContext>) -> ApiResult {
    Ok(Envelope::data(admin::me(&context)).into_response())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<AdminContext>,
) -> ApiResult {
    admin::logout(&state, &context)?;
    Ok(Envelope::<()> {
        success: true,
        message: Some("Logged out"),
        count: None,
        data: None,
    }
    .into_response())
}

// ===== ROUTER =====

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Anytime Stop API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "menu": "/api/menu",
            "orders": "/api/orders",
            "admin": "/api/admin"
        }
    }))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
        .into_response()
}

fn menu_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let admin = Router::new()
        .route("/item", post(add_menu_item))
        .route(
            "/item/{item_id}",
            patch(update_menu_item).delete(delete_menu_item),
        )
        .route("/item/{item_id}/availability", patch(update_item_availability))
        .route("/seed", post(seed_menu))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(get_menu))
        .route("/category/{category_id}", get(get_category_items))
        .route("/search", get(search_menu))
        .merge(admin)
}

/// Placing an order is public; everything else on the collection is admin only.
fn order_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let auth = from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route(
            "/",
            post(create_order).merge(get(get_all_orders).route_layer(auth.clone())),
        )
        .route("/{id}", get(get_order).route_layer(auth.clone()))
        .route(
            "/{id}/status",
            patch(update_order_status).route_layer(auth.clone()),
        )
        .route(
            "/{id}/payment",
            patch(update_payment_status).route_layer(auth),
        )
}

fn admin_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new().route("/login", post(login)).merge(protected)
}

/// All API routes bound to `state`. Transport layers (CORS, tracing, body
/// limits) are added by the caller.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .nest("/api/menu", menu_routes(&state))
        .nest("/api/orders", order_routes(&state))
        .nest("/api/admin", admin_routes(&state))
        .fallback(not_found)
        .with_state(state)
}
