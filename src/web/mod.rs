//! Server-rendered pages

pub mod pages;
pub mod session;

use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tera::{Context, Tera};

use crate::{error::AppError, AppState};

/// Template engine with every page template compiled in
pub fn templates() -> Result<Tera, tera::Error> {
    let mut engine = Tera::default();
    engine.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        ("login.html", include_str!("../../templates/login.html")),
        ("home.html", include_str!("../../templates/home.html")),
        ("books.html", include_str!("../../templates/books.html")),
        ("book_form.html", include_str!("../../templates/book_form.html")),
        ("loans.html", include_str!("../../templates/loans.html")),
    ])?;
    Ok(engine)
}

pub(crate) fn render<T: Serialize>(engine: &Tera, name: &str, data: &T) -> Result<Html<String>, AppError> {
    let context = Context::from_serialize(data)
        .map_err(|e| AppError::Internal(format!("Template context for {}: {}", name, e)))?;
    engine
        .render(name, &context)
        .map(Html)
        .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", name, e)))
}

/// Page routes, mounted at the root
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/logout", post(pages::logout))
        .route("/books", get(pages::books))
        .route("/books/new", get(pages::new_book_page).post(pages::create_book))
        .route("/loans", get(pages::loans).post(pages::borrow))
        .route("/loans/:id/return", post(pages::return_loan))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        let engine = templates().unwrap();
        let names: Vec<&str> = engine.get_template_names().collect();
        for name in ["login.html", "home.html", "books.html", "book_form.html", "loans.html"] {
            assert!(names.contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn login_page_renders_flash() {
        #[derive(Serialize)]
        struct Page {
            flash: Option<session::Flash>,
            user: Option<String>,
        }

        let engine = templates().unwrap();
        let html = render(
            &engine,
            "login.html",
            &Page {
                flash: Some(session::Flash::error("Invalid <username>")),
                user: None,
            },
        )
        .unwrap();
        assert!(html.0.contains("Invalid &lt;username&gt;"));
    }
}
