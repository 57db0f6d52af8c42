//! Catalog home page.
//!
//! The query string (`categoria`, `busca`, `ver`) is the source of truth
//! for the current selection; it is mirrored into the visitor's catalog
//! state so the cart sidebar and quick view can return to the same view.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use rocha_brindes_core::{
    Category, CategoryFilter, ImageCdn, ImageOptions, LayoutConfig, Product, ProductId,
    QuoteContact, catalog::popular_categories, catalog::ALL_CATEGORIES,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::models::{load_store, save_store};
use crate::routes::cart::CartView;
use crate::routes::products::{ProductCardView, ProductDetailView, SelectionQuery};
use crate::state::AppState;

const BANNER_WIDTH: u32 = 1248;
const BANNER_HEIGHT: u32 = 390;
const PROMOTION_SIZE: u32 = 600;
const CATEGORY_IMAGE_SIZE: u32 = 160;
const LOGO_HEIGHT: u32 = 64;

/// Shown over an empty grid when the catalog cannot be loaded.
const CATALOG_UNAVAILABLE: &str = "Não foi possível carregar o catálogo. Tente novamente.";

/// Home query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub categoria: Option<String>,
    pub busca: Option<String>,
    /// Product open in the quick view.
    pub ver: Option<String>,
}

/// A category link in the sidebar.
#[derive(Clone)]
pub struct CategoryLinkView {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

/// A card in the popular categories strip.
#[derive(Clone)]
pub struct PopularCategoryView {
    pub name: String,
    pub href: String,
    pub image: Option<String>,
}

/// Homepage assets from the layout config, already resized.
#[derive(Clone, Default)]
pub struct LayoutView {
    pub logo: Option<String>,
    pub banner: Option<String>,
    pub promotions: Vec<String>,
    pub popup: Option<String>,
}

impl LayoutView {
    fn new(layout: &LayoutConfig, cdn: &ImageCdn) -> Self {
        let width_only = |width| ImageOptions {
            width: Some(width),
            ..ImageOptions::default()
        };
        Self {
            logo: layout.logo.as_deref().map(|src| {
                cdn.url(
                    src,
                    ImageOptions {
                        height: Some(LOGO_HEIGHT),
                        ..ImageOptions::default()
                    },
                )
            }),
            banner: layout
                .banners
                .first()
                .map(|src| cdn.url(src, ImageOptions::sized(BANNER_WIDTH, BANNER_HEIGHT))),
            promotions: layout
                .promotions
                .iter()
                .map(|src| cdn.url(src, width_only(PROMOTION_SIZE)))
                .collect(),
            popup: layout
                .popups
                .first()
                .map(|src| cdn.url(src, width_only(PROMOTION_SIZE))),
        }
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: LayoutView,
    pub categories: Vec<CategoryLinkView>,
    pub popular: Vec<PopularCategoryView>,
    pub search: String,
    /// Selected category, empty for all.
    pub category: String,
    pub products: Vec<ProductCardView>,
    pub error: Option<String>,
    pub quick_view: Option<ProductDetailView>,
    pub cart: CartView,
    pub contact: QuoteContact,
    pub quote_error: Option<String>,
    /// This page's own URL, used as the return target of every form.
    pub back: String,
    /// URL that closes the quick view.
    pub close_href: String,
    pub show_popup: bool,
}

impl HomeTemplate {
    /// Link that opens the quick view for `id` without losing the selection.
    fn quick_view_href(&self, id: &str) -> String {
        home_href(&CategoryFilter::parse(Some(&self.category)), &self.search, Some(id))
    }
}

/// Build a home URL for a selection.
#[must_use]
pub fn home_href(category: &CategoryFilter, search: &str, open: Option<&str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let CategoryFilter::Named(name) = category {
        query.append_pair("categoria", name);
    }
    if !search.is_empty() {
        query.append_pair("busca", search);
    }
    if let Some(id) = open {
        query.append_pair("ver", id);
    }
    let query = query.finish();
    if query.is_empty() {
        "/".to_string()
    } else {
        format!("/?{query}")
    }
}

fn category_links(categories: &[Category], selected: &CategoryFilter, search: &str) -> Vec<CategoryLinkView> {
    std::iter::once(CategoryLinkView {
        name: ALL_CATEGORIES.to_string(),
        href: home_href(&CategoryFilter::All, search, None),
        selected: selected.is_all(),
    })
    .chain(categories.iter().map(|c| {
        let filter = CategoryFilter::Named(c.name.clone());
        CategoryLinkView {
            name: c.name.clone(),
            href: home_href(&filter, search, None),
            selected: *selected == filter,
        }
    }))
    .collect()
}

fn popular_views(categories: &[Category], cdn: &ImageCdn) -> Vec<PopularCategoryView> {
    popular_categories(categories)
        .into_iter()
        .map(|c| PopularCategoryView {
            name: c.name.clone(),
            href: home_href(&CategoryFilter::Named(c.name.clone()), "", None),
            image: c
                .image_path
                .as_deref()
                .map(|src| cdn.url(src, ImageOptions::sized(CATEGORY_IMAGE_SIZE, CATEGORY_IMAGE_SIZE))),
        })
        .collect()
}

/// Display the catalog home page.
///
/// Products and categories are loaded together; if either fails the page
/// still renders, with an inline error over an empty grid. A failed layout
/// read only drops the banners.
#[instrument(skip(state, session))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<HomeQuery>,
) -> Result<impl IntoResponse> {
    let firestore = state.firestore();
    let cdn = state.cdn();

    let mut store = load_store(&session).await;
    store.set_category(CategoryFilter::parse(query.categoria.as_deref()));
    store.set_search(query.busca.clone().unwrap_or_default());
    match query.ver.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => store.open_modal(ProductId::new(id)),
        None => store.close_modal(),
    }

    let (catalog, layout) = tokio::join!(
        async {
            tokio::try_join!(
                firestore.products(state.config().catalog_product_limit),
                firestore.categories()
            )
        },
        firestore.layout()
    );

    let (products, categories, error) = match catalog {
        Ok((products, categories)) => (products, categories, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load catalog");
            (
                Arc::new(Vec::new()),
                Arc::new(Vec::new()),
                Some(CATALOG_UNAVAILABLE.to_string()),
            )
        }
    };
    let layout = layout.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load layout config");
        LayoutConfig::default()
    });

    let quick_view = match store.modal() {
        Some(id) => find_product(&state, &products, id)
            .await
            .map(|p| ProductDetailView::new(&p, cdn, &SelectionQuery::default())),
        None => None,
    };

    save_store(&session, &store).await?;

    let selected = store.category().clone();
    let search = store.search().to_string();
    let back = home_href(&selected, &search, store.modal().map(ProductId::as_str));
    let filtered = query.categoria.is_some() || query.busca.is_some() || query.ver.is_some();

    Ok(HomeTemplate {
        layout: LayoutView::new(&layout, cdn),
        categories: category_links(&categories, &selected, &search),
        popular: popular_views(&categories, cdn),
        products: store
            .visible(&products)
            .into_iter()
            .map(|p| ProductCardView::new(p, cdn))
            .collect(),
        error,
        quick_view,
        cart: CartView::new(&store, cdn),
        contact: QuoteContact::default(),
        quote_error: None,
        close_href: home_href(&selected, &search, None),
        category: if selected.is_all() {
            String::new()
        } else {
            selected.as_str().to_string()
        },
        search,
        back,
        show_popup: !filtered && !store.is_cart_open(),
    })
}

/// Look up the quick-view product in the loaded list, then in the backend.
async fn find_product(state: &AppState, loaded: &[Product], id: &ProductId) -> Option<Product> {
    if let Some(product) = loaded.iter().find(|p| &p.id == id) {
        return Some(product.clone());
    }
    match state.firestore().product(id.as_str()).await {
        Ok(product) => Some(product),
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Quick view product unavailable");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_home_href() {
        assert_eq!(home_href(&CategoryFilter::All, "", None), "/");
        assert_eq!(
            home_href(&CategoryFilter::Named("Canetas".to_string()), "azul", None),
            "/?categoria=Canetas&busca=azul"
        );
        assert_eq!(
            home_href(&CategoryFilter::All, "", Some("CAN 01")),
            "/?ver=CAN+01"
        );
    }

    #[test]
    fn test_category_links_start_with_all() {
        let categories = vec![
            Category::new("Canetas", true, None),
            Category::new("Copos e Canecas", false, None),
        ];
        let links = category_links(
            &categories,
            &CategoryFilter::Named("Canetas".to_string()),
            "azul",
        );
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].name, "Todos");
        assert_eq!(links[0].href, "/?busca=azul");
        assert!(!links[0].selected);
        assert!(links[1].selected);
        assert_eq!(links[2].href, "/?categoria=Copos+e+Canecas&busca=azul");
    }

    #[test]
    fn test_popular_views_only_popular() {
        let categories = vec![
            Category::new("Canetas", true, Some("https://img/canetas.png".to_string())),
            Category::new("Copos", false, None),
        ];
        let popular = popular_views(&categories, &ImageCdn::default());
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].name, "Canetas");
        assert!(popular[0].image.is_some());
    }

    #[test]
    fn test_layout_view_uses_first_banner() {
        let layout = LayoutConfig {
            logo: None,
            banners: vec!["https://img/b1.png".to_string(), "https://img/b2.png".to_string()],
            promotions: vec!["https://img/p1.png".to_string()],
            popups: Vec::new(),
        };
        let view = LayoutView::new(&layout, &ImageCdn::default());
        assert!(view.banner.unwrap().contains("b1.png"));
        assert_eq!(view.promotions.len(), 1);
        assert!(view.logo.is_none());
        assert!(view.popup.is_none());
    }
}
