//! Product route handlers.
//!
//! The detail page and the quick-view fragment share one view. Gallery and
//! color selection are plain links carrying `imagem` / `cor` in the query,
//! so the page works without scripts.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rocha_brindes_core::{ImageCdn, ImageOptions, Product};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::state::AppState;

/// Card size on the catalog grid.
const CARD_SIZE: u32 = 400;
/// Main image size on the detail page.
const DETAIL_SIZE: u32 = 800;
/// Gallery thumbnail size.
const THUMB_SIZE: u32 = 96;

/// Grid card data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    /// "1 cor" / "3 cores", when the product has variations.
    pub colors_label: Option<String>,
    /// First three color names, shown as chips.
    pub colors: Vec<String>,
    pub featured: bool,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, cdn: &ImageCdn) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            image: product
                .card_image()
                .map(|src| cdn.url(src, ImageOptions::sized(CARD_SIZE, CARD_SIZE))),
            colors_label: product.colors_label(),
            colors: product
                .variations
                .iter()
                .take(3)
                .map(|v| v.color.clone())
                .collect(),
            featured: product.featured,
        }
    }
}

/// A gallery thumbnail linking to its full-size view.
#[derive(Clone)]
pub struct GalleryImageView {
    pub thumb: String,
    pub href: String,
    pub selected: bool,
}

/// A color option button.
#[derive(Clone)]
pub struct ColorView {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

/// Product detail data for templates.
#[derive(Clone)]
pub struct ProductDetailView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<String>,
    pub main_image: Option<String>,
    pub gallery: Vec<GalleryImageView>,
    pub colors: Vec<ColorView>,
}

/// Image and color selection.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    /// Gallery index.
    pub imagem: Option<usize>,
    /// Selected color name.
    pub cor: Option<String>,
}

impl ProductDetailView {
    /// Build the view with the image picked by `selection`.
    ///
    /// A selected color with its own image wins over the gallery index; an
    /// out-of-range index falls back to the first image.
    #[must_use]
    pub fn new(product: &Product, cdn: &ImageCdn, selection: &SelectionQuery) -> Self {
        let images = product.images();
        let base = format!("/produto/{}", product.id);

        let color_image = selection.cor.as_deref().and_then(|color| {
            product
                .variations
                .iter()
                .find(|v| v.color == color)
                .and_then(|v| v.image_url.as_deref())
        });
        let current = color_image
            .and_then(|url| images.iter().position(|i| *i == url))
            .or_else(|| selection.imagem.filter(|i| *i < images.len()))
            .unwrap_or(0);

        let main_image = images
            .get(current)
            .map(|src| cdn.url(src, ImageOptions::sized(DETAIL_SIZE, DETAIL_SIZE)));

        let gallery = if images.len() > 1 {
            images
                .iter()
                .enumerate()
                .map(|(i, src)| GalleryImageView {
                    thumb: cdn.url(src, ImageOptions::sized(THUMB_SIZE, THUMB_SIZE)),
                    href: format!("{base}?imagem={i}"),
                    selected: i == current,
                })
                .collect()
        } else {
            Vec::new()
        };

        let colors = product
            .variations
            .iter()
            .map(|v| ColorView {
                name: v.color.clone(),
                href: format!("{base}?cor={}", url_query_value(&v.color)),
                selected: selection.cor.as_deref() == Some(v.color.as_str()),
            })
            .collect();

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product
                .description
                .clone()
                .filter(|d| !d.trim().is_empty()),
            categories: product.categories.clone(),
            main_image,
            gallery,
            colors,
        }
    }
}

/// Encode a single query value.
fn url_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductDetailView,
    pub cart_count: u32,
}

/// Quick view fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/quick_view.html")]
pub struct QuickViewTemplate {
    pub product: ProductDetailView,
    /// Where the add-to-quote form returns to.
    pub back: String,
    pub close_href: String,
}

/// Display a product detail page.
///
/// An unknown id renders the "Produto não encontrado" page with a 404.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: tower_sessions::Session,
    Path(id): Path<String>,
    Query(selection): Query<SelectionQuery>,
) -> Result<impl IntoResponse> {
    let product = state.firestore().product(&id).await?;
    let cart_count = crate::models::load_store(&session).await.cart_count();

    Ok(ProductShowTemplate {
        product: ProductDetailView::new(&product, state.cdn(), &selection),
        cart_count,
    })
}

/// Display the quick-view fragment for a product.
#[instrument(skip(state))]
pub async fn quick_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(selection): Query<SelectionQuery>,
) -> Result<impl IntoResponse> {
    let product = state.firestore().product(&id).await?;

    Ok(QuickViewTemplate {
        product: ProductDetailView::new(&product, state.cdn(), &selection),
        back: format!("/produto/{}", product.id),
        close_href: "/".to_string(),
    })
}
