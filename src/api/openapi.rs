//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, categories, dashboard, health, loans, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblioteca API",
        version = "1.0.0",
        description = "Library management REST API: books, authors, categories and loans"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::refresh,
        auth::register,
        auth::me,
        // Users
        users::list_users,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::adjust_stock,
        // Loans
        loans::list_loans,
        loans::active_loans,
        loans::loan_history,
        loans::get_loan,
        loans::create_loan,
        loans::return_loan,
        // Dashboard
        dashboard::get_dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::RefreshRequest,
            crate::models::user::AuthTokens,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::AccountType,
            crate::models::user::CreateUser,
            // Catalog
            crate::models::author::Author,
            crate::models::author::AuthorInput,
            crate::models::category::Category,
            crate::models::category::CategoryInput,
            crate::models::category::CategoryWithBooks,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookInput,
            crate::models::book::BookOrdering,
            crate::models::book::StockAdjustment,
            // Loans
            crate::models::loan::CreateLoan,
            crate::models::loan::LoanDetails,
            crate::models::loan::LoanFilter,
            // Dashboard
            crate::models::dashboard::Dashboard,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User administration"),
        (name = "authors", description = "Author management"),
        (name = "categories", description = "Category management"),
        (name = "books", description = "Catalog and stock"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "dashboard", description = "Home summary")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Bearer JWT scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
