//! Category route handlers for admin.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Multipart, Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use rocha_brindes_core::storage::category_image_path;
use rocha_brindes_core::validation::validate_category_name;
use rocha_brindes_core::{Category, CategoryId, ImageOptions};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::AppError,
    filters,
    middleware::auth::RequireAdminAuth,
    models::CurrentAdmin,
    routes::{PageContext, finish_write, forms::MultipartForm, render, upload_millis},
    services::images::{self, MAX_WIDTH, WEBP_CONTENT_TYPE},
    state::AppState,
};

const PREVIEW_SIZE: u32 = 96;

/// Category row for the list.
#[derive(Debug, Clone)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub popular: bool,
    pub product_count: u32,
    pub image: Option<String>,
    pub delete_href: String,
    pub popular_href: String,
    pub image_href: String,
}

impl CategoryView {
    fn new(category: &Category, state: &AppState) -> Self {
        let base = state
            .config()
            .path(&format!("/categorias/{}", urlencoding::encode(category.id.as_str())));
        Self {
            id: category.id.to_string(),
            name: category.name.clone(),
            popular: category.popular,
            product_count: category.product_count,
            image: category
                .image_path
                .as_deref()
                .map(|src| state.cdn().url(src, ImageOptions::sized(PREVIEW_SIZE, PREVIEW_SIZE))),
            delete_href: format!("{base}/excluir"),
            popular_href: format!("{base}/popular"),
            image_href: format!("{base}/imagem"),
        }
    }
}

/// Category list template.
#[derive(Template)]
#[template(path = "categories/index.html")]
pub struct CategoriesTemplate {
    pub page: PageContext,
    pub categories: Vec<CategoryView>,
    pub action: String,
    pub error: Option<String>,
}

/// Popular toggle form.
#[derive(Debug, Deserialize)]
pub struct PopularForm {
    pub popular: bool,
}

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categorias", get(list).post(create))
        .route("/categorias/{id}/excluir", post(delete))
        .route("/categorias/{id}/popular", post(set_popular))
        .route("/categorias/{id}/imagem", post(replace_image))
}

/// Category list with the create form.
///
/// GET /categorias
#[instrument(skip(admin, state, session))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Html<String> {
    let (categories, error) = match state.firestore().categories().await {
        Ok(categories) => (
            categories.iter().map(|c| CategoryView::new(c, &state)).collect(),
            None,
        ),
        Err(e) => {
            tracing::error!("Failed to fetch categories: {e}");
            (
                Vec::new(),
                Some("Não foi possível carregar as categorias.".to_string()),
            )
        }
    };

    render(&CategoriesTemplate {
        page: PageContext::new(&state, &session, &admin, "/categorias").await,
        categories,
        action: state.config().path("/categorias"),
        error,
    })
}

/// Resize and store a category image, returning its download URL.
async fn upload_category_image(
    state: &AppState,
    admin: &CurrentAdmin,
    id: &CategoryId,
    bytes: Vec<u8>,
) -> Result<String, AppError> {
    let processed = images::optimize_upload(bytes, MAX_WIDTH).await?;
    let path = category_image_path(id, upload_millis());
    let url = state
        .storage()
        .upload(&path, processed.bytes, WEBP_CONTENT_TYPE, admin.id_token())
        .await?;
    tracing::info!(path = %path, "Uploaded category image");
    Ok(url)
}

async fn create_category(
    state: &AppState,
    admin: &CurrentAdmin,
    form: MultipartForm,
) -> Result<String, AppError> {
    let name = form.text("nome").unwrap_or_default().to_string();
    validate_category_name(&name)?;
    let popular = form.checked("popular");

    let mut category = Category::new(name, popular, None);
    let existing = state.firestore().categories().await?;
    if existing.iter().any(|c| c.id == category.id) {
        return Err(AppError::BadRequest(format!(
            "Já existe uma categoria com o nome {}",
            category.name
        )));
    }

    if let Some(file) = form.into_files("imagem").into_iter().next() {
        category.image_path =
            Some(upload_category_image(state, admin, &category.id, file.bytes).await?);
    }

    state.firestore().save_category(&category, admin.id_token()).await?;
    state.invalidate_caches().await;
    tracing::info!(category_id = %category.id, "Created category");
    Ok(format!("Categoria {} criada.", category.name))
}

/// Create a category.
///
/// POST /categorias
#[instrument(skip(admin, state, session, multipart))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Redirect {
    let outcome = match MultipartForm::read(multipart).await {
        Ok(form) => create_category(&state, &admin, form).await,
        Err(e) => Err(e),
    };
    finish_write(
        &session,
        &state.config().path("/categorias"),
        "Failed to create category",
        outcome,
    )
    .await
}

/// Delete a category. Products keep the name in their category lists.
///
/// POST /categorias/{id}/excluir
#[instrument(skip(admin, state, session))]
async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    let id = CategoryId::new(id);
    let outcome = match state.firestore().delete_category(&id, admin.id_token()).await {
        Ok(()) => {
            state.invalidate_caches().await;
            tracing::info!(category_id = %id, "Deleted category");
            Ok("Categoria excluída.".to_string())
        }
        Err(e) => Err(e.into()),
    };
    finish_write(
        &session,
        &state.config().path("/categorias"),
        "Failed to delete category",
        outcome,
    )
    .await
}

/// Set the popular flag.
///
/// POST /categorias/{id}/popular
#[instrument(skip(admin, state, session))]
async fn set_popular(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<PopularForm>,
) -> Redirect {
    let id = CategoryId::new(id);
    let outcome = match state
        .firestore()
        .set_category_popular(&id, form.popular, admin.id_token())
        .await
    {
        Ok(()) => {
            state.invalidate_caches().await;
            Ok(if form.popular {
                "Categoria marcada como popular.".to_string()
            } else {
                "Categoria removida das populares.".to_string()
            })
        }
        Err(e) => Err(e.into()),
    };
    finish_write(
        &session,
        &state.config().path("/categorias"),
        "Failed to update category",
        outcome,
    )
    .await
}

async fn store_category_image(
    state: &AppState,
    admin: &CurrentAdmin,
    id: &CategoryId,
    form: MultipartForm,
) -> Result<String, AppError> {
    let file = form
        .into_files("imagem")
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("Selecione uma imagem.".to_string()))?;
    let url = upload_category_image(state, admin, id, file.bytes).await?;
    state
        .firestore()
        .set_category_image(id, &url, admin.id_token())
        .await?;
    state.invalidate_caches().await;
    Ok("Imagem da categoria atualizada.".to_string())
}

/// Replace a category's image.
///
/// POST /categorias/{id}/imagem
#[instrument(skip(admin, state, session, multipart))]
async fn replace_image(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Redirect {
    let id = CategoryId::new(id);
    let outcome = match MultipartForm::read(multipart).await {
        Ok(form) => store_category_image(&state, &admin, &id, form).await,
        Err(e) => Err(e),
    };
    finish_write(
        &session,
        &state.config().path("/categorias"),
        "Failed to replace category image",
        outcome,
    )
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_category_view_links() {
        let state = AppState::new(test_config()).unwrap();
        let category = Category::new("Copos e Canecas", true, Some("https://img/c.webp".into()));
        let view = CategoryView::new(&category, &state);

        assert_eq!(view.id, "copos-e-canecas");
        assert_eq!(view.popular_href, "/admin/categorias/copos-e-canecas/popular");
        assert_eq!(view.delete_href, "/admin/categorias/copos-e-canecas/excluir");
        assert!(view.image.unwrap().contains("w=96"));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected_before_any_request() {
        let state = AppState::new(test_config()).unwrap();
        let admin = crate::routes::tests::admin();
        let form = MultipartForm::from_parts(&[("nome", "   ")], Vec::new());

        let err = create_category(&state, &admin, form).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.user_message(), "Informe o nome da categoria");
    }
}
