//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Catalog (?categoria, ?busca, ?ver)
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check
//!
//! # Products
//! GET  /produto/{id}             - Product detail (?imagem, ?cor)
//! GET  /produto/{id}/rapida      - Quick view fragment
//!
//! # Quote cart
//! GET  /orcamento                - Cart page with contact form
//! POST /orcamento/adicionar      - Add one unit (redirects to `voltar`)
//! POST /orcamento/remover        - Remove a line
//! POST /orcamento/limpar         - Empty the cart
//! POST /orcamento/alternar       - Open/close the sidebar
//! GET  /orcamento/contagem       - Cart count badge (fragment)
//! POST /orcamento/enviar         - Send quote (303 to WhatsApp)
//! ```

pub mod cart;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{cart_rate_limiter, quote_rate_limiter};
use crate::state::AppState;

/// Resolve a form's return target to a local path.
///
/// Anything that is not a same-origin absolute path (including
/// protocol-relative `//host` URLs) returns to the catalog.
#[must_use]
pub fn safe_return(target: Option<&str>) -> String {
    match target {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/rapida", get(products::quick_view))
}

/// Create the quote cart routes router.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/adicionar", post(cart::add))
        .route("/remover", post(cart::remove))
        .route("/limpar", post(cart::clear))
        .route("/alternar", post(cart::toggle))
        .layer(cart_rate_limiter());

    let send = Router::new()
        .route("/enviar", post(cart::send))
        .layer(quote_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/contagem", get(cart::count))
        .merge(mutations)
        .merge(send)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/produto", product_routes())
        .nest("/orcamento", cart_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_config;
    use crate::middleware::create_session_layer;

    fn app() -> Router {
        let config = test_config();
        let state = AppState::new(config.clone()).unwrap();
        routes()
            .layer(create_session_layer(&config))
            .with_state(state)
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_safe_return() {
        assert_eq!(safe_return(Some("/?categoria=Canetas")), "/?categoria=Canetas");
        assert_eq!(safe_return(Some("/produto/CAN-001")), "/produto/CAN-001");
        assert_eq!(safe_return(Some("//evil.example")), "/");
        assert_eq!(safe_return(Some("https://evil.example")), "/");
        assert_eq!(safe_return(Some("/\\evil.example")), "/");
        assert_eq!(safe_return(None), "/");
    }

    #[tokio::test]
    async fn test_cart_count_starts_at_zero() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/orcamento/contagem")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains('0'));
    }

    #[tokio::test]
    async fn test_toggle_redirects_to_return_target() {
        let response = app()
            .oneshot(post_form("/orcamento/alternar", "voltar=%2F%3Fbusca%3Dcaneta"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/?busca=caneta");
    }

    #[tokio::test]
    async fn test_clear_rejects_foreign_return_target() {
        let response = app()
            .oneshot(post_form("/orcamento/limpar", "voltar=https%3A%2F%2Fevil.example"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_send_with_empty_cart_is_rejected() {
        let response = app()
            .oneshot(post_form(
                "/orcamento/enviar",
                "nome=Maria&documento=123&endereco=Rua+A&cep=64000-000",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("O orçamento está vazio"));
    }
}
