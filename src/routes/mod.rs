pub mod admin;
pub mod articles;
pub mod auth;
pub mod health;
pub mod i18n;
pub mod lost_found;
pub mod notifications;
pub mod pets;
pub mod store;
pub mod subscriptions;
pub mod tags;
pub mod validation;

pub use health::health_check;
pub use validation::{bad_json, require_text, timestamp_to_rfc3339};

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::functions::{create_subscription, method_not_allowed, record_scan, submit_report};
use crate::AppState;

/// Build the application router (without transport layers)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Serverless-style functions
        .route(
            "/functions/create-subscription",
            post(create_subscription).fallback(method_not_allowed),
        )
        .route(
            "/functions/submit-report",
            post(submit_report).fallback(method_not_allowed),
        )
        .route(
            "/functions/record-scan",
            post(record_scan).fallback(method_not_allowed),
        )
        // Auth and account
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/auth/session", get(auth::session))
        .route("/api/me", get(auth::me))
        .route(
            "/api/me/preferences",
            get(auth::get_preferences).put(auth::update_preferences),
        )
        // Pets
        .route("/api/pets", get(pets::list_pets).post(pets::create_pet))
        .route("/api/pets/quota", get(pets::pet_quota))
        .route(
            "/api/pets/:id",
            get(pets::get_pet)
                .put(pets::update_pet)
                .delete(pets::delete_pet),
        )
        .route("/api/pets/:id/scans", get(pets::list_pet_scans))
        .route("/api/pets/:id/reports", get(pets::list_pet_reports))
        // NFC tags
        .route("/api/tags", get(tags::list_my_tags))
        .route("/api/tags/:code", get(tags::lookup_tag))
        .route(
            "/api/tags/:code/link",
            put(tags::link_tag).delete(tags::unlink_tag),
        )
        // Notifications
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:id/read",
            put(notifications::mark_read),
        )
        // Lost & found
        .route(
            "/api/lost-found",
            get(lost_found::list_posts).post(lost_found::create_post),
        )
        .route(
            "/api/lost-found/:id",
            get(lost_found::get_post)
                .put(lost_found::update_post)
                .delete(lost_found::delete_post),
        )
        .route(
            "/api/lost-found/:id/interactions",
            get(lost_found::list_interactions).post(lost_found::create_interaction),
        )
        // Subscriptions
        .route(
            "/api/subscriptions",
            get(subscriptions::list_my_subscriptions),
        )
        // Articles
        .route("/api/articles", get(articles::list_published))
        .route("/api/articles/:slug", get(articles::get_by_slug))
        // Store
        .route("/api/store/products", get(store::list_products))
        .route("/api/store/products/:id", get(store::get_product))
        .route(
            "/api/store/orders",
            get(store::list_my_orders).post(store::place_order),
        )
        // Translations
        .route("/api/i18n", get(i18n::list_locales))
        .route("/api/i18n/:locale", get(i18n::get_catalog))
        // Admin back-office
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route(
            "/api/admin/notifications",
            get(notifications::list_admin_notifications),
        )
        .route(
            "/api/admin/notifications/:id/read",
            put(notifications::mark_admin_read),
        )
        .route(
            "/api/admin/tags",
            get(tags::list_tags).post(tags::register_tags),
        )
        .route(
            "/api/admin/subscriptions",
            get(subscriptions::list_subscriptions),
        )
        .route(
            "/api/admin/subscriptions/:id/approve",
            put(subscriptions::approve_subscription),
        )
        .route(
            "/api/admin/subscriptions/:id/reject",
            put(subscriptions::reject_subscription),
        )
        .route(
            "/api/admin/articles",
            get(articles::list_all).post(articles::create_article),
        )
        .route(
            "/api/admin/articles/:id",
            put(articles::update_article).delete(articles::delete_article),
        )
        .route("/api/admin/products", post(store::create_product))
        .route(
            "/api/admin/products/:id",
            put(store::update_product).delete(store::delete_product),
        )
        .route("/api/admin/orders", get(store::list_orders))
        .route(
            "/api/admin/orders/:id/status",
            put(store::update_order_status),
        )
        .with_state(state)
}
