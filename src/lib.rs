pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::api::handlers::{admin, auth, groups, health, items, users};
use crate::api::middleware::{auth as guard, request_id::request_id_middleware};
use crate::config::AppConfig;
use crate::services::item_service::ItemService;
use crate::services::storage::ObjectStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::items::list_items,
        api::handlers::items::create_item,
        api::handlers::items::show_item,
        api::handlers::items::update_item,
        api::handlers::items::delete_item,
        api::handlers::groups::list_groups,
        api::handlers::groups::create_group,
        api::handlers::groups::show_group,
        api::handlers::admin::dashboard,
        api::handlers::admin::update_settings,
        api::handlers::admin::update_user,
        api::handlers::admin::update_group,
        api::handlers::users::get_profile,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::flash::FlashKind,
            api::flash::FlashMessage,
            api::handlers::auth::RegisterForm,
            api::handlers::auth::LoginForm,
            api::handlers::auth::RegisterView,
            api::handlers::items::ItemIndexView,
            api::handlers::items::ItemFormView,
            services::item_service::ItemView,
            api::handlers::groups::GroupForm,
            api::handlers::groups::GroupIndexView,
            api::handlers::groups::GroupShowView,
            api::handlers::admin::ItemSizeForm,
            api::handlers::admin::AdminUserForm,
            api::handlers::admin::AdminGroupForm,
            api::handlers::admin::AdminDashboardView,
            api::handlers::admin::AdminUserView,
            api::handlers::admin::AdminGroupView,
            api::handlers::users::UserProfileView,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "items", description = "Item upload and management"),
        (name = "groups", description = "Group catalog"),
        (name = "admin", description = "Moderation and limits"),
        (name = "users", description = "User profile"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn ObjectStore>,
    pub items: Arc<ItemService>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn ObjectStore>, config: AppConfig) -> Self {
        let items = Arc::new(ItemService::new(db.clone(), storage.clone(), config.clone()));
        Self {
            db,
            storage,
            items,
            config,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let owner = || from_fn_with_state(state.clone(), guard::require_item_owner);

    // Pending accounts may browse groups and their profile but not items.
    let active = Router::new()
        .route("/home", get(items::list_items).post(items::create_item))
        .route("/home/new", get(items::new_item))
        .route(
            "/home/:id",
            get(items::show_item)
                .put(items::update_item.layer(owner()))
                .delete(items::delete_item.layer(owner())),
        )
        .route("/home/:id/edit", get(items::edit_item.layer(owner())))
        .route_layer(from_fn(guard::require_active));

    let members = Router::new()
        .merge(active)
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/new", get(groups::new_group))
        .route("/groups/:id", get(groups::show_group))
        .route(
            "/user/:id",
            get(users::get_profile.layer(from_fn(guard::require_self))),
        )
        .route_layer(from_fn(guard::require_login));

    let moderation = Router::new()
        .route("/admin", get(admin::dashboard).post(admin::update_settings))
        .route("/admin/:id", get(admin::show_user).put(admin::update_user))
        .route(
            "/admin/groups/:id",
            get(admin::show_group).put(admin::update_group),
        )
        .route_layer(from_fn(guard::require_admin));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(auth::landing))
        .route("/register", get(auth::register_form).post(auth::register))
        .route(
            "/login",
            get(auth::login_form.layer(from_fn(guard::require_logged_out))).post(auth::login),
        )
        .route("/logout", get(auth::logout))
        .route("/health", get(health::health_check))
        .merge(members)
        .merge(moderation)
        .layer(from_fn_with_state(state.clone(), guard::session_loader))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .with_state(state)
}
