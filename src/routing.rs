//! Application router configuration with protected and unprotected route definitions.

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::{services::ServeDir, timeout::TimeoutLayer};

use crate::{
    AppState,
    admin::{export_user_transactions, get_admin_page, update_user_role_endpoint},
    auth::{
        admin_guard, admin_guard_hx, auth_guard, auth_guard_hx, get_log_in_page, get_log_out,
        get_register_page, post_log_in, register_user,
    },
    budget::{delete_budget_endpoint, get_budgets_page, upsert_budget_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_page,
        get_category_options, get_edit_category_page, rename_category_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_edit_transaction_page,
        get_new_transaction_page, get_transactions_page, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Requests that take longer than `request_timeout` are answered with 408 Request Timeout.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::NEW_TRANSACTION_VIEW, get(get_new_transaction_page))
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::CATEGORIES_VIEW, get(get_categories_page))
        .route(endpoints::EDIT_CATEGORY_VIEW, get(get_edit_category_page))
        .route(endpoints::BUDGETS_VIEW, get(get_budgets_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::TRANSACTION,
                put(update_transaction_endpoint).delete(delete_transaction_endpoint),
            )
            .route(endpoints::CATEGORIES_API, post(create_category_endpoint))
            .route(endpoints::CATEGORY_OPTIONS, get(get_category_options))
            .route(
                endpoints::CATEGORY,
                put(rename_category_endpoint).delete(delete_category_endpoint),
            )
            .route(endpoints::BUDGETS_API, post(upsert_budget_endpoint))
            .route(endpoints::BUDGET, delete(delete_budget_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    let admin_routes = Router::new()
        .route(endpoints::ADMIN_VIEW, get(get_admin_page))
        .route(
            endpoints::EXPORT_USER_TRANSACTIONS,
            get(export_user_transactions),
        )
        .layer(middleware::from_fn(admin_guard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
        .merge(
            Router::new()
                .route(endpoints::USER_ROLE, put(update_user_role_endpoint))
                .layer(middleware::from_fn(admin_guard_hx))
                .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
        );

    protected_routes
        .merge(admin_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use std::{sync::Arc, time::Duration};

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState,
        auth::SQLiteIdentityProvider,
        endpoints::{self, format_endpoint},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let provider =
            SQLiteIdentityProvider::new(Connection::open_in_memory().unwrap(), 4).unwrap();
        let mut state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "foobar",
            "Etc/UTC",
            Arc::new(provider),
        )
        .unwrap();
        state.password_hash_cost = 4;

        let app = build_router(state, Duration::from_secs(5));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn protected_pages_redirect_to_log_in() {
        let server = get_test_server();

        for page in [
            endpoints::ROOT,
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::CATEGORIES_VIEW,
            endpoints::BUDGETS_VIEW,
            endpoints::ADMIN_VIEW,
        ] {
            let response = server.get(page).await;

            response.assert_status(StatusCode::SEE_OTHER);
            let location = response.header("location");
            let location = location.to_str().unwrap();
            assert!(
                location.starts_with(endpoints::LOG_IN_VIEW),
                "{page} redirected to {location}"
            );
        }
    }

    #[tokio::test]
    async fn protected_api_routes_send_hx_redirect() {
        let server = get_test_server();

        let response = server
            .delete(&format_endpoint(endpoints::TRANSACTION, 1))
            .await;

        assert!(
            response
                .header("hx-redirect")
                .to_str()
                .unwrap()
                .starts_with(endpoints::LOG_IN_VIEW)
        );
    }

    #[tokio::test]
    async fn log_in_page_is_public() {
        let server = get_test_server();

        server.get(endpoints::LOG_IN_VIEW).await.assert_status_ok();
        server.get(endpoints::REGISTER_VIEW).await.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server
            .get("/no/such/page")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
