//! Dashboard route handler.

use askama::Template;
use axum::{
    Router,
    extract::State,
    response::Html,
    routing::get,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    filters,
    middleware::auth::RequireAdminAuth,
    models::CurrentAdmin,
    routes::{PageContext, render},
    state::AppState,
};

/// Admin user view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            email: admin.email().to_string(),
        }
    }
}

/// Catalog counts shown on the dashboard. `None` when the read failed.
#[derive(Debug, Clone, Default)]
pub struct DashboardMetrics {
    pub products: Option<usize>,
    pub featured: Option<usize>,
    pub categories: Option<usize>,
    pub popular_categories: Option<usize>,
    pub banners: Option<usize>,
    pub promotions: Option<usize>,
    pub popups: Option<usize>,
    pub has_logo: bool,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub metrics: DashboardMetrics,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Dashboard page handler.
#[instrument(skip(admin, state, session))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Html<String> {
    let firestore = state.firestore();
    let (products, categories, layout) = tokio::join!(
        firestore.products(None),
        firestore.categories(),
        firestore.layout()
    );

    let mut metrics = DashboardMetrics::default();

    match products {
        Ok(products) => {
            metrics.products = Some(products.len());
            metrics.featured = Some(products.iter().filter(|p| p.featured).count());
        }
        Err(e) => tracing::error!("Failed to fetch products: {e}"),
    }
    match categories {
        Ok(categories) => {
            metrics.categories = Some(categories.len());
            metrics.popular_categories = Some(categories.iter().filter(|c| c.popular).count());
        }
        Err(e) => tracing::error!("Failed to fetch categories: {e}"),
    }
    match layout {
        Ok(layout) => {
            metrics.banners = Some(layout.banners.len());
            metrics.promotions = Some(layout.promotions.len());
            metrics.popups = Some(layout.popups.len());
            metrics.has_logo = layout.logo.is_some();
        }
        Err(e) => tracing::error!("Failed to fetch layout config: {e}"),
    }

    render(&DashboardTemplate {
        page: PageContext::new(&state, &session, &admin, "/").await,
        metrics,
    })
}
