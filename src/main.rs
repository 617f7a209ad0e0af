mod database;
mod error;
mod handlers;
mod middleware;
mod models;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use database::{create_database_pool, Database};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    let app = create_router(db);

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("opshq server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}

fn create_router(db: Database) -> Router {
    // No token needed: login/registration plus the onboarding link a new team
    // member opens before they have an account.
    let public = Router::new()
        .route(
            "/api/health",
            get(|| async { axum::Json(serde_json::json!({ "ok": true })) }),
        )
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/onboarding/:token", get(handlers::team::onboarding_lookup));

    let protected = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/dashboard", get(handlers::dashboard::summary))
        // Clients
        .route(
            "/api/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/api/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route("/api/clients/:id/status", put(handlers::clients::update_client_status))
        // Projects
        .route(
            "/api/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(handlers::projects::get_project)
                .put(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        // Invoices
        .route(
            "/api/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/api/invoices/:id/payments", post(handlers::invoices::record_payment))
        .route("/api/invoices/:id/send", post(handlers::invoices::send_invoice))
        .route("/api/invoices/:id/cancel", post(handlers::invoices::cancel_invoice))
        // Proposals
        .route(
            "/api/proposals",
            get(handlers::proposals::list_proposals).post(handlers::proposals::create_proposal),
        )
        .route(
            "/api/proposals/:id",
            get(handlers::proposals::get_proposal)
                .put(handlers::proposals::update_proposal)
                .delete(handlers::proposals::delete_proposal),
        )
        .route("/api/proposals/:id/send", post(handlers::proposals::send_proposal))
        .route("/api/proposals/:id/accept", post(handlers::proposals::accept_proposal))
        .route("/api/proposals/:id/reject", post(handlers::proposals::reject_proposal))
        // Team
        .route(
            "/api/team-members",
            get(handlers::team::list_members).post(handlers::team::create_member),
        )
        .route(
            "/api/team-members/:id",
            get(handlers::team::get_member)
                .put(handlers::team::update_member)
                .delete(handlers::team::delete_member),
        )
        .route("/api/team-members/:id/status", put(handlers::team::update_member_status))
        .route(
            "/api/team-members/:id/onboarding-token",
            post(handlers::team::rotate_onboarding_token),
        )
        .route(
            "/api/job-roles",
            get(handlers::team::list_job_roles).post(handlers::team::create_job_role),
        )
        .route(
            "/api/job-roles/:id",
            put(handlers::team::update_job_role).delete(handlers::team::delete_job_role),
        )
        // Payroll
        .route("/api/salary-payments", get(handlers::payroll::list_salary_payments))
        .route(
            "/api/salary-payments/generate",
            post(handlers::payroll::generate_salary_payments),
        )
        .route("/api/salary-payments/:id/pay", post(handlers::payroll::mark_salary_paid))
        .route(
            "/api/salary-payments/:id",
            put(handlers::payroll::update_salary_payment)
                .delete(handlers::payroll::delete_salary_payment),
        )
        // Leave
        .route(
            "/api/leave-types",
            get(handlers::leave::list_leave_types).post(handlers::leave::create_leave_type),
        )
        .route("/api/leave-policies/:leave_type_id", put(handlers::leave::update_leave_policy))
        .route("/api/leave-balances", get(handlers::leave::list_balances))
        .route(
            "/api/leave-requests",
            get(handlers::leave::list_requests).post(handlers::leave::create_request),
        )
        .route(
            "/api/leave-requests/check-availability",
            get(handlers::leave::check_availability),
        )
        .route("/api/leave-requests/:id", delete(handlers::leave::delete_request))
        .route("/api/leave-requests/:id/approve", post(handlers::leave::approve_request))
        .route("/api/leave-requests/:id/reject", post(handlers::leave::reject_request))
        .route("/api/leave-requests/:id/cancel", post(handlers::leave::cancel_request))
        // Expenses
        .route(
            "/api/expenses",
            get(handlers::expenses::list_expenses).post(handlers::expenses::create_expense),
        )
        .route(
            "/api/expenses/:id",
            put(handlers::expenses::update_expense).delete(handlers::expenses::delete_expense),
        )
        .route("/api/expenses/:id/approve", post(handlers::expenses::approve_expense))
        .route("/api/expenses/:id/deny", post(handlers::expenses::deny_expense))
        .route("/api/expenses/:id/receipt", post(handlers::expenses::upload_receipt))
        .route(
            "/api/expense-categories",
            get(handlers::expenses::list_categories).post(handlers::expenses::create_category),
        )
        .route(
            "/api/expense-categories/:id",
            put(handlers::expenses::update_category).delete(handlers::expenses::delete_category),
        )
        // Services catalog
        .route(
            "/api/services",
            get(handlers::services::list_services).post(handlers::services::create_service),
        )
        .route(
            "/api/services/:id",
            put(handlers::services::update_service).delete(handlers::services::delete_service),
        )
        // Reports
        .route("/api/reports/profit-loss", get(handlers::reports::profit_loss))
        .route("/api/reports/gst-summary", get(handlers::reports::gst_summary))
        .route("/api/reports/invoice-aging", get(handlers::reports::invoice_aging))
        .route("/api/reports/:report/export/csv", get(handlers::reports::export_csv))
        // Settings
        .route(
            "/api/settings/company",
            get(handlers::settings::get_company).put(handlers::settings::update_company),
        )
        .route("/api/settings/company/logo", post(handlers::settings::upload_logo))
        .route(
            "/api/settings/api-keys",
            get(handlers::settings::get_api_keys).put(handlers::settings::update_api_keys),
        )
        .route(
            "/api/settings/slack",
            get(handlers::settings::get_slack).put(handlers::settings::update_slack),
        )
        .route(
            "/api/settings/payment-gateway",
            get(handlers::settings::get_payment_gateway)
                .put(handlers::settings::update_payment_gateway),
        )
        .route_layer(from_fn_with_state(db.clone(), middleware::require_auth));

    public
        .merge(protected)
        .nest_service("/static", ServeDir::new("static"))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // 10MB
        )
        .with_state(db)
}
