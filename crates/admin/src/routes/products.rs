//! Product route handlers for admin.
//!
//! Create and edit share one multipart form. Images come from two places:
//! references already in storage (current gallery, picker checkboxes) and
//! new uploads, which are resized, thumbnailed and stored before the
//! document is written. Nothing rolls an upload back if the write fails.

use askama::Template;
use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use rocha_brindes_backend::{BackendError, ProductCursor};
use rocha_brindes_core::storage::{product_image_path, product_thumb_path};
use rocha_brindes_core::validation::validate_product;
use rocha_brindes_core::{ImageOptions, Product, ProductId, ValidationError, Variation};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    error::AppError,
    filters,
    middleware::auth::RequireAdminAuth,
    models::CurrentAdmin,
    routes::{
        PageContext, finish_write,
        forms::{MultipartForm, UploadedFile},
        render,
        storage::{FolderQuery, PickerView, load_picker},
        upload_millis,
    },
    services::images::{self, WEBP_CONTENT_TYPE},
    state::AppState,
};

/// Products per list page.
const PAGE_SIZE: u32 = 50;

const ROW_THUMB_SIZE: u32 = 64;

// =============================================================================
// List
// =============================================================================

/// List pagination.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Cursor of the last product on the previous page.
    pub apos: Option<String>,
}

/// Product row for the list table.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: String,
    pub name: String,
    pub thumb: Option<String>,
    pub categories: String,
    pub featured: bool,
    pub created: String,
    pub edit_href: String,
    pub delete_href: String,
}

impl ProductRowView {
    fn new(product: &Product, state: &AppState) -> Self {
        let config = state.config();
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            thumb: product
                .card_image()
                .map(|src| state.cdn().url(src, ImageOptions::sized(ROW_THUMB_SIZE, ROW_THUMB_SIZE))),
            categories: product.categories.join(", "),
            featured: product.featured,
            created: product
                .created_at
                .map(|t| t.format("%d/%m/%Y %H:%M").to_string())
                .unwrap_or_default(),
            edit_href: config.path(&format!("/produtos/{}/editar", encode_id(&product.id))),
            delete_href: config.path(&format!("/produtos/{}/excluir", encode_id(&product.id))),
        }
    }
}

/// Product list template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductListTemplate {
    pub page: PageContext,
    pub products: Vec<ProductRowView>,
    pub next_href: Option<String>,
    /// Link back to the first page, when not on it.
    pub first_href: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Form
// =============================================================================

/// Product form values, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub featured: bool,
    /// One color per line, optionally `Cor | url-da-imagem`.
    pub variations: String,
    /// Existing references kept or picked, in gallery order.
    pub selected_images: Vec<String>,
    /// Storage subfolder under `produtos/` for new uploads.
    pub subfolder: String,
}

impl ProductFields {
    fn from_product(product: &Product) -> Self {
        let mut selected_images: Vec<String> = Vec::new();
        for url in std::iter::once(&product.image_url).chain(&product.gallery) {
            if !url.is_empty() && !selected_images.contains(url) {
                selected_images.push(url.clone());
            }
        }
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            categories: product.categories.clone(),
            featured: product.featured,
            variations: format_variations(&product.variations),
            selected_images,
            subfolder: String::new(),
        }
    }

    fn from_form(form: &MultipartForm) -> Self {
        let mut selected_images: Vec<String> = Vec::new();
        for url in form.all("imagens_selecionadas") {
            if !selected_images.iter().any(|u| u == url) {
                selected_images.push(url.to_string());
            }
        }
        Self {
            id: form.text("codigo").unwrap_or_default().to_string(),
            name: form.text("nome").unwrap_or_default().to_string(),
            description: form.text("descricao").unwrap_or_default().to_string(),
            categories: form.all("categorias").into_iter().map(String::from).collect(),
            featured: form.checked("destaque"),
            variations: form.text("variacoes").unwrap_or_default().to_string(),
            selected_images,
            subfolder: form.text("pasta").unwrap_or_default().to_string(),
        }
    }

    /// The product these fields describe, with `gallery` as its images.
    fn to_product(&self, id: ProductId, gallery: Vec<String>) -> Product {
        let mut product = Product::new(id, self.name.clone());
        product.description = Some(self.description.clone()).filter(|d| !d.is_empty());
        product.categories = self.categories.clone();
        product.featured = self.featured;
        product.variations = parse_variations(&self.variations);
        product.image_url = gallery.first().cloned().unwrap_or_default();
        product.gallery = gallery;
        product
    }
}

/// Parse the variations textarea: one color per line, with an optional
/// image reference after a `|`.
#[must_use]
pub fn parse_variations(text: &str) -> Vec<Variation> {
    text.lines()
        .filter_map(|line| {
            let (color, image) = line.split_once('|').unwrap_or((line, ""));
            let color = color.trim();
            if color.is_empty() {
                return None;
            }
            let mut variation = Variation::named(color);
            variation.image_url = Some(image.trim().to_string()).filter(|u| !u.is_empty());
            Some(variation)
        })
        .collect()
}

/// Inverse of [`parse_variations`].
#[must_use]
pub fn format_variations(variations: &[Variation]) -> String {
    variations
        .iter()
        .map(|v| match &v.image_url {
            Some(url) => format!("{} | {url}", v.color),
            None => v.color.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Copy stored thumbnails onto rebuilt variations. The textarea only
/// carries color and image, so a variation whose color and image are
/// unchanged keeps its thumbnail.
pub fn keep_variation_thumbs(variations: &mut [Variation], previous: &[Variation]) {
    for variation in variations.iter_mut().filter(|v| v.thumb_url.is_none()) {
        variation.thumb_url = previous
            .iter()
            .find(|p| p.color == variation.color && p.image_url == variation.image_url)
            .and_then(|p| p.thumb_url.clone());
    }
}

/// A category checkbox.
#[derive(Debug, Clone)]
pub struct CategoryOptionView {
    pub name: String,
    pub checked: bool,
}

/// Product form template (new and edit).
#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub fields: ProductFields,
    pub categories: Vec<CategoryOptionView>,
    pub picker: PickerView,
    pub is_new: bool,
    pub action: String,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    /// Whether a picker file is already part of the gallery.
    fn is_selected(&self, url: &str) -> bool {
        self.fields.selected_images.iter().any(|u| u == url)
    }
}

/// Path segment for a product id.
fn encode_id(id: &ProductId) -> String {
    urlencoding::encode(id.as_str()).into_owned()
}

/// Category checkboxes: every known category, then any name the product
/// carries that no longer has a category document.
async fn category_options(state: &AppState, selected: &[String]) -> Vec<CategoryOptionView> {
    let known: Vec<String> = match state.firestore().categories().await {
        Ok(categories) => categories.iter().map(|c| c.name.clone()).collect(),
        Err(e) => {
            tracing::error!("Failed to fetch categories: {e}");
            Vec::new()
        }
    };

    let orphans: Vec<String> = selected
        .iter()
        .filter(|name| !known.contains(*name))
        .cloned()
        .collect();

    known
        .into_iter()
        .chain(orphans)
        .map(|name| CategoryOptionView {
            checked: selected.contains(&name),
            name,
        })
        .collect()
}

/// Where the form lives and where it posts.
struct FormTarget {
    /// Path below the base, e.g. `/produtos/novo`.
    path: String,
    is_new: bool,
}

impl FormTarget {
    fn new() -> Self {
        Self {
            path: "/produtos/novo".to_string(),
            is_new: true,
        }
    }

    fn edit(id: &ProductId) -> Self {
        Self {
            path: format!("/produtos/{}/editar", encode_id(id)),
            is_new: false,
        }
    }
}

async fn form_page(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    target: &FormTarget,
    fields: ProductFields,
    folder: &str,
    error: Option<String>,
) -> Html<String> {
    let action = state.config().path(&target.path);
    let (categories, picker) = tokio::join!(
        category_options(state, &fields.categories),
        load_picker(state, admin, folder, &action)
    );

    render(&ProductFormTemplate {
        page: PageContext::new(state, session, admin, &target.path).await,
        fields,
        categories,
        picker,
        is_new: target.is_new,
        action,
        error,
    })
}

// =============================================================================
// Saving
// =============================================================================

/// `foto.JPG` -> `foto.webp`; uploads are always re-encoded.
fn webp_name(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let stem = stem.trim();
    format!("{}.webp", if stem.is_empty() { "imagem" } else { stem })
}

/// Resize, thumbnail and store one upload. Returns `(image, thumbnail)`.
async fn upload_product_file(
    state: &AppState,
    token: &str,
    subfolder: Option<&str>,
    file: UploadedFile,
) -> Result<(String, String), AppError> {
    let processed = images::optimize_product_upload(file.bytes).await?;
    let millis = upload_millis();
    let name = webp_name(&file.file_name);
    let image_path = product_image_path(subfolder, &name, millis);
    let thumb_path = product_thumb_path(&name, millis);

    let storage = state.storage();
    let (image, thumb) = tokio::try_join!(
        storage.upload(&image_path, processed.full.bytes, WEBP_CONTENT_TYPE, token),
        storage.upload(&thumb_path, processed.thumb.bytes, WEBP_CONTENT_TYPE, token)
    )?;

    tracing::info!(path = %image_path, "Uploaded product image");
    Ok((image, thumb))
}

/// Validate, upload and write a product.
///
/// `existing` is the stored version when editing; its `createdAt` is kept
/// and so is its thumbnail while the primary image stays the same.
async fn save_product(
    state: &AppState,
    admin: &CurrentAdmin,
    form: MultipartForm,
    id: ProductId,
    existing: Option<&Product>,
) -> Result<Product, AppError> {
    let fields = ProductFields::from_form(&form);
    let files = form.into_files("imagens");

    let mut product = fields.to_product(id, fields.selected_images.clone());
    match validate_product(&product) {
        Err(ValidationError::MissingImage) if !files.is_empty() => {}
        other => other?,
    }

    if existing.is_none() {
        match state.firestore().product(product.id.as_str()).await {
            Ok(_) => {
                return Err(AppError::BadRequest(format!(
                    "Já existe um produto com o código {}",
                    product.id
                )));
            }
            Err(BackendError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let token = admin.id_token();
    let subfolder = Some(fields.subfolder.as_str()).filter(|s| !s.is_empty());
    let mut first_upload: Option<(String, String)> = None;
    for file in files {
        let (image, thumb) = upload_product_file(state, token, subfolder, file).await?;
        product.gallery.push(image.clone());
        first_upload.get_or_insert((image, thumb));
    }

    product.image_url = product.gallery.first().cloned().unwrap_or_default();
    product.thumb_url = match (&first_upload, existing) {
        (Some((image, thumb)), _) if *image == product.image_url => Some(thumb.clone()),
        (_, Some(previous)) if previous.image_url == product.image_url => previous.thumb_url.clone(),
        _ => None,
    };
    if let Some(previous) = existing {
        keep_variation_thumbs(&mut product.variations, &previous.variations);
    }
    product.created_at = existing
        .and_then(|p| p.created_at)
        .or_else(|| Some(Utc::now()));

    state.firestore().save_product(&product, token).await?;
    state.invalidate_caches().await;
    Ok(product)
}

// =============================================================================
// Router and handlers
// =============================================================================

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/produtos", get(list))
        .route("/produtos/novo", get(new_form).post(create))
        .route("/produtos/{id}/editar", get(edit_form).post(update))
        .route("/produtos/{id}/excluir", post(delete))
}

/// Product list, newest first.
///
/// GET /produtos
#[instrument(skip(admin, state, session))]
async fn list(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let cursor = query.apos.as_deref().and_then(ProductCursor::parse);
    let list_path = state.config().path("/produtos");

    let (products, next_href, error) =
        match state.firestore().product_page(PAGE_SIZE, cursor.as_ref()).await {
            Ok(page) => (
                page.products
                    .iter()
                    .map(|p| ProductRowView::new(p, &state))
                    .collect(),
                page.next.map(|next| {
                    format!("{list_path}?apos={}", urlencoding::encode(&next.encode()))
                }),
                None,
            ),
            Err(e) => {
                tracing::error!("Failed to fetch products: {e}");
                (
                    Vec::new(),
                    None,
                    Some("Não foi possível carregar os produtos.".to_string()),
                )
            }
        };

    render(&ProductListTemplate {
        page: PageContext::new(&state, &session, &admin, "/produtos").await,
        products,
        next_href,
        first_href: cursor.map(|_| list_path),
        error,
    })
}

/// New product form.
///
/// GET /produtos/novo
#[instrument(skip(admin, state, session))]
async fn new_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(folder): Query<FolderQuery>,
) -> Html<String> {
    form_page(
        &state,
        &session,
        &admin,
        &FormTarget::new(),
        ProductFields::default(),
        &folder.folder(),
        None,
    )
    .await
}

/// Create a product.
///
/// POST /produtos/novo
#[instrument(skip(admin, state, session, multipart))]
async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Response {
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return rejected(&state, &session, &admin, &FormTarget::new(), None, e).await,
    };
    let id = ProductId::new(form.text("codigo").unwrap_or_default());
    let fields = ProductFields::from_form(&form);

    match save_product(&state, &admin, form, id, None).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Created product");
            finish_write(
                &session,
                &state.config().path("/produtos"),
                "Failed to create product",
                Ok(format!("Produto {} cadastrado.", product.name)),
            )
            .await
            .into_response()
        }
        Err(e) => rejected(&state, &session, &admin, &FormTarget::new(), Some(fields), e).await,
    }
}

/// Edit form for an existing product.
///
/// GET /produtos/{id}/editar
#[instrument(skip(admin, state, session))]
async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Query(folder): Query<FolderQuery>,
) -> Result<Html<String>, AppError> {
    let product = state.firestore().product(&id).await?;

    Ok(form_page(
        &state,
        &session,
        &admin,
        &FormTarget::edit(&product.id),
        ProductFields::from_product(&product),
        &folder.folder(),
        None,
    )
    .await)
}

/// Replace a product. The id in the path wins over the form.
///
/// POST /produtos/{id}/editar
#[instrument(skip(admin, state, session, multipart))]
async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let id = ProductId::new(id);
    let target = FormTarget::edit(&id);

    let existing = match state.firestore().product(id.as_str()).await {
        Ok(product) => product,
        Err(e) => {
            return finish_write(
                &session,
                &state.config().path("/produtos"),
                "Failed to load product for update",
                Err(e.into()),
            )
            .await
            .into_response();
        }
    };
    let form = match MultipartForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return rejected(&state, &session, &admin, &target, None, e).await,
    };
    let mut fields = ProductFields::from_form(&form);
    fields.id = id.to_string();

    match save_product(&state, &admin, form, id, Some(&existing)).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Updated product");
            finish_write(
                &session,
                &state.config().path("/produtos"),
                "Failed to update product",
                Ok(format!("Produto {} atualizado.", product.name)),
            )
            .await
            .into_response()
        }
        Err(e) => rejected(&state, &session, &admin, &target, Some(fields), e).await,
    }
}

/// Re-render the form with what was typed and the error on top.
async fn rejected(
    state: &AppState,
    session: &Session,
    admin: &CurrentAdmin,
    target: &FormTarget,
    fields: Option<ProductFields>,
    error: AppError,
) -> Response {
    error.report("Failed to save product");
    let status = if error.is_server_error() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    let folder = FolderQuery::default().folder();
    let page = form_page(
        state,
        session,
        admin,
        target,
        fields.unwrap_or_default(),
        &folder,
        Some(error.user_message()),
    )
    .await;
    (status, page).into_response()
}

/// Delete a product document. Its images stay in storage.
///
/// POST /produtos/{id}/excluir
#[instrument(skip(admin, state, session))]
async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Redirect {
    let id = ProductId::new(id);
    let outcome = match state.firestore().delete_product(&id, admin.id_token()).await {
        Ok(()) => {
            state.invalidate_caches().await;
            tracing::info!(product_id = %id, "Deleted product");
            Ok(format!("Produto {id} excluído."))
        }
        Err(e) => Err(e.into()),
    };

    finish_write(
        &session,
        &state.config().path("/produtos"),
        "Failed to delete product",
        outcome,
    )
    .await
}
