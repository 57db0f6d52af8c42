//! Quote cart route handlers.
//!
//! The cart lives in the visitor's session as part of the catalog state.
//! Mutations are plain form posts that redirect back to the page they came
//! from (`voltar`), so the sidebar, the product page and the quick view all
//! share these handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rocha_brindes_core::{CatalogStore, ImageCdn, ImageOptions, ProductId, QuoteContact, quote};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::models::{load_store, save_store};
use crate::routes::safe_return;
use crate::state::AppState;

/// Cart line thumbnail size.
const LINE_IMAGE_SIZE: u32 = 80;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub count: u32,
    /// Whether the sidebar is expanded.
    pub open: bool,
}

impl CartView {
    #[must_use]
    pub fn new(store: &CatalogStore, cdn: &ImageCdn) -> Self {
        Self {
            items: store
                .cart()
                .items()
                .iter()
                .map(|line| CartLineView {
                    id: line.product.id.to_string(),
                    name: line.product.name.clone(),
                    image: line
                        .product
                        .card_image()
                        .map(|src| cdn.url(src, ImageOptions::sized(LINE_IMAGE_SIZE, LINE_IMAGE_SIZE))),
                    quantity: line.quantity,
                })
                .collect(),
            count: store.cart_count(),
            open: store.is_cart_open(),
        }
    }
}

/// Form posted by "add", "remove" and the cart toggles.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub id: String,
    pub voltar: Option<String>,
}

/// Form posted by buttons that only need a return target.
#[derive(Debug, Deserialize)]
pub struct ReturnForm {
    pub voltar: Option<String>,
}

/// Quote contact form.
#[derive(Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub documento: String,
    #[serde(default)]
    pub endereco: String,
    #[serde(default)]
    pub cep: String,
    #[serde(default)]
    pub observacoes: String,
    pub voltar: Option<String>,
}

impl ContactForm {
    fn contact(&self) -> QuoteContact {
        QuoteContact {
            name: self.nome.clone(),
            document: self.documento.clone(),
            address: self.endereco.clone(),
            cep: self.cep.clone(),
            observations: self.observacoes.clone(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub contact: QuoteContact,
    pub quote_error: Option<String>,
    pub back: String,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display the cart page with the contact form.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let store = load_store(&session).await;

    CartShowTemplate {
        cart: CartView::new(&store, state.cdn()),
        contact: QuoteContact::default(),
        quote_error: None,
        back: "/orcamento".to_string(),
    }
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let product = state.firestore().product(&form.id).await?;

    let mut store = load_store(&session).await;
    store.add_to_cart(product);
    save_store(&session, &store).await?;

    add_breadcrumb("cart", "Added to quote", Some(&[("product_id", form.id.as_str())]));
    Ok(Redirect::to(&safe_return(form.voltar.as_deref())))
}

/// Remove a product line from the cart.
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<ProductForm>) -> Result<Redirect> {
    let mut store = load_store(&session).await;
    if store.remove_from_cart(&ProductId::new(form.id.as_str())).is_some() {
        save_store(&session, &store).await?;
    }

    Ok(Redirect::to(&safe_return(form.voltar.as_deref())))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session, Form(form): Form<ReturnForm>) -> Result<Redirect> {
    let mut store = load_store(&session).await;
    store.clear_cart();
    save_store(&session, &store).await?;

    Ok(Redirect::to(&safe_return(form.voltar.as_deref())))
}

/// Open or close the cart sidebar.
#[instrument(skip(session))]
pub async fn toggle(session: Session, Form(form): Form<ReturnForm>) -> Result<Redirect> {
    let mut store = load_store(&session).await;
    store.toggle_cart();
    save_store(&session, &store).await?;

    Ok(Redirect::to(&safe_return(form.voltar.as_deref())))
}

/// Cart count badge fragment.
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_store(&session).await.cart_count(),
    }
}

/// Send the quote: redirect to the WhatsApp deep link and empty the cart.
///
/// The cart is cleared as soon as the link is built; nothing confirms the
/// visitor actually sent the message. Validation failures re-render the
/// cart page with the entered fields and a 422.
#[instrument(skip(state, session, form))]
pub async fn send(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let mut store = load_store(&session).await;
    let contact = form.contact();

    let link = match quote::checkout_link(store.cart(), &contact, &state.config().whatsapp_number)
    {
        Ok(link) => link,
        Err(e) => {
            tracing::debug!(error = %e, "Quote rejected");
            let page = CartShowTemplate {
                cart: CartView::new(&store, state.cdn()),
                contact,
                quote_error: Some(capitalize(&e.to_string())),
                back: safe_return(form.voltar.as_deref()),
            };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let items = store.cart_count().to_string();
    store.clear_cart();
    store.set_cart_open(false);
    save_store(&session, &store).await?;

    tracing::info!(items = %items, "Quote handed off to WhatsApp");
    add_breadcrumb("cart", "Quote sent", Some(&[("items", items.as_str())]));
    Ok(Redirect::to(&link).into_response())
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::header;
    use rocha_brindes_core::Product;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_cart_view_reflects_store() {
        let mut store = CatalogStore::new();
        let mut pen = Product::new("CAN-001", "Caneta");
        pen.image_url = "https://img/caneta.png".to_string();
        store.add_to_cart(pen.clone());
        store.add_to_cart(pen);
        store.add_to_cart(Product::new("CHA-002", "Chaveiro"));
        store.toggle_cart();

        let view = CartView::new(&store, &ImageCdn::default());
        assert_eq!(view.count, 3);
        assert!(view.open);
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].quantity, 2);
        assert!(view.items[0].image.is_some());
        assert!(view.items[1].image.is_none());
    }

    #[test]
    fn test_contact_form_maps_fields() {
        let form = ContactForm {
            nome: "Maria".to_string(),
            documento: "123".to_string(),
            endereco: "Rua A".to_string(),
            cep: "64000-000".to_string(),
            observacoes: String::new(),
            voltar: None,
        };
        let contact = form.contact();
        assert_eq!(contact.name, "Maria");
        assert_eq!(contact.cep, "64000-000");
        assert!(contact.validate().is_ok());
    }

    #[tokio::test]
    async fn test_send_hands_off_to_whatsapp_and_empties_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut store = CatalogStore::new();
        store.add_to_cart(Product::new("CAN-001", "Caneta"));
        store.add_to_cart(Product::new("CAN-001", "Caneta"));
        store.add_to_cart(Product::new("CHA-002", "Chaveiro"));
        store.toggle_cart();
        save_store(&session, &store).await.unwrap();

        let form = ContactForm {
            nome: "Maria".to_string(),
            documento: "123.456.789-00".to_string(),
            endereco: "Rua A, 10".to_string(),
            cep: "64000-000".to_string(),
            observacoes: "Entrega em maio".to_string(),
            voltar: None,
        };
        let state = AppState::new(test_config()).unwrap();
        let response = send(State(state), session.clone(), Form(form)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://wa.me/5589994333316?text="));
        assert!(location.contains("CAN-001"));
        assert!(location.contains("CHA-002"));

        let store = load_store(&session).await;
        assert_eq!(store.cart_count(), 0);
        assert!(!store.is_cart_open());
    }

    #[tokio::test]
    async fn test_send_with_empty_cart_rerenders_form() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let form = ContactForm {
            nome: "Maria".to_string(),
            documento: "123".to_string(),
            endereco: "Rua A".to_string(),
            cep: "64000-000".to_string(),
            observacoes: String::new(),
            voltar: None,
        };
        let state = AppState::new(test_config()).unwrap();
        let response = send(State(state), session, Form(form)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("o orçamento está vazio"), "O orçamento está vazio");
        assert_eq!(capitalize(""), "");
    }
}
