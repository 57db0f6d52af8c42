//! Homepage layout route handlers for admin.
//!
//! Every change reads the current layout document, edits it and writes the
//! whole singleton back. Two operators editing at once: the last write wins.

use askama::Template;
use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use rocha_brindes_core::storage::{layout_asset_path, logo_path};
use rocha_brindes_core::{ImageOptions, LayoutConfig, LayoutKind};
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

const PREVIEW_WIDTH: u32 = 320;
const PREVIEW_HEIGHT: u32 = 180;

/// One stored asset with its remove action.
#[derive(Debug, Clone)]
pub struct AssetView {
    pub url: String,
    pub preview: String,
    pub remove_href: String,
}

/// One multi-file slot (banners, promotions, popups).
#[derive(Debug, Clone)]
pub struct SectionView {
    pub title: &'static str,
    pub upload_href: String,
    pub assets: Vec<AssetView>,
}

/// Layout screen template.
#[derive(Template)]
#[template(path = "layout/index.html")]
pub struct LayoutTemplate {
    pub page: PageContext,
    pub logo: Option<AssetView>,
    pub logo_href: String,
    pub sections: Vec<SectionView>,
    pub error: Option<String>,
}

fn preview(state: &AppState, url: &str) -> String {
    state
        .cdn()
        .url(url, ImageOptions::sized(PREVIEW_WIDTH, PREVIEW_HEIGHT))
}

fn sections(state: &AppState, layout: &LayoutConfig) -> Vec<SectionView> {
    let config = state.config();
    LayoutKind::ALL
        .into_iter()
        .map(|kind| {
            let upload_href = config.path(&format!("/layout/{}", kind.as_str()));
            SectionView {
                title: kind.title(),
                assets: layout
                    .assets(kind)
                    .iter()
                    .enumerate()
                    .map(|(index, url)| AssetView {
                        preview: preview(state, url),
                        url: url.clone(),
                        remove_href: format!("{upload_href}/{index}/remover"),
                    })
                    .collect(),
                upload_href,
            }
        })
        .collect()
}

/// Build the layout router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/layout", get(show))
        .route("/layout/logo", post(upload_logo))
        .route("/layout/logo/remover", post(remove_logo))
        .route("/layout/{kind}", post(add_assets))
        .route("/layout/{kind}/{index}/remover", post(remove_asset))
}

/// Layout screen.
///
/// GET /layout
#[instrument(skip(admin, state, session))]
async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Html<String> {
    let (layout, error) = match state.firestore().layout().await {
        Ok(layout) => (layout, None),
        Err(e) => {
            tracing::error!("Failed to fetch layout config: {e}");
            (
                LayoutConfig::default(),
                Some("Não foi possível carregar o layout.".to_string()),
            )
        }
    };
    let logo_href = state.config().path("/layout/logo");

    render(&LayoutTemplate {
        page: PageContext::new(&state, &session, &admin, "/layout").await,
        logo: layout.logo.as_deref().map(|url| AssetView {
            preview: preview(&state, url),
            url: url.to_string(),
            remove_href: format!("{logo_href}/remover"),
        }),
        sections: sections(&state, &layout),
        logo_href,
        error,
    })
}

/// Read, edit and write back the layout document.
async fn update_layout(
    state: &AppState,
    admin: &CurrentAdmin,
    edit: impl FnOnce(&mut LayoutConfig) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let mut layout = state.firestore().layout().await?;
    edit(&mut layout)?;
    state.firestore().save_layout(&layout, admin.id_token()).await?;
    state.invalidate_caches().await;
    Ok(())
}

async fn upload_asset(
    state: &AppState,
    admin: &CurrentAdmin,
    path: &str,
    bytes: Vec<u8>,
) -> Result<String, AppError> {
    let processed = images::optimize_upload(bytes, MAX_WIDTH).await?;
    let url = state
        .storage()
        .upload(path, processed.bytes, WEBP_CONTENT_TYPE, admin.id_token())
        .await?;
    tracing::info!(path = %path, "Uploaded layout asset");
    Ok(url)
}

async fn replace_logo(
    state: &AppState,
    admin: &CurrentAdmin,
    form: MultipartForm,
) -> Result<String, AppError> {
    let file = form
        .into_files("arquivo")
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("Selecione uma imagem.".to_string()))?;
    let url = upload_asset(state, admin, &logo_path(upload_millis()), file.bytes).await?;
    update_layout(state, admin, |layout| {
        layout.logo = Some(url);
        Ok(())
    })
    .await?;
    Ok("Logo atualizado.".to_string())
}

/// Upload a new logo.
///
/// POST /layout/logo
#[instrument(skip(admin, state, session, multipart))]
async fn upload_logo(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Redirect {
    let outcome = match MultipartForm::read(multipart).await {
        Ok(form) => replace_logo(&state, &admin, form).await,
        Err(e) => Err(e),
    };
    finish_write(
        &session,
        &state.config().path("/layout"),
        "Failed to upload logo",
        outcome,
    )
    .await
}

/// Clear the logo reference. The file stays in storage.
///
/// POST /layout/logo/remover
#[instrument(skip(admin, state, session))]
async fn remove_logo(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Redirect {
    let outcome = update_layout(&state, &admin, |layout| {
        layout.logo = None;
        Ok(())
    })
    .await
    .map(|()| "Logo removido.".to_string());
    finish_write(
        &session,
        &state.config().path("/layout"),
        "Failed to remove logo",
        outcome,
    )
    .await
}

fn parse_kind(segment: &str) -> Result<LayoutKind, AppError> {
    LayoutKind::parse(segment).ok_or_else(|| AppError::NotFound(format!("layout slot {segment}")))
}

async fn append_assets(
    state: &AppState,
    admin: &CurrentAdmin,
    kind: LayoutKind,
    form: MultipartForm,
) -> Result<String, AppError> {
    let files = form.into_files("arquivos");
    if files.is_empty() {
        return Err(AppError::BadRequest("Selecione ao menos uma imagem.".to_string()));
    }

    let millis = upload_millis();
    let count = files.len();
    let mut urls = Vec::with_capacity(count);
    for (index, file) in files.into_iter().enumerate() {
        let path = layout_asset_path(kind, millis, index);
        urls.push(upload_asset(state, admin, &path, file.bytes).await?);
    }

    update_layout(state, admin, |layout| {
        layout.append(kind, urls);
        Ok(())
    })
    .await?;
    Ok(format!("{count} imagem(ns) adicionada(s) em {}.", kind.title()))
}

/// Add images to a slot.
///
/// POST /layout/{kind}
#[instrument(skip(admin, state, session, multipart))]
async fn add_assets(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&kind)?;
    let outcome = match MultipartForm::read(multipart).await {
        Ok(form) => append_assets(&state, &admin, kind, form).await,
        Err(e) => Err(e),
    };
    Ok(finish_write(
        &session,
        &state.config().path("/layout"),
        "Failed to add layout assets",
        outcome,
    )
    .await)
}

/// Remove one entry from a slot by position.
///
/// POST /layout/{kind}/{index}/remover
#[instrument(skip(admin, state, session))]
async fn remove_asset(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path((kind, index)): Path<(String, usize)>,
) -> Result<Redirect, AppError> {
    let kind = parse_kind(&kind)?;
    let outcome = update_layout(&state, &admin, |layout| {
        layout
            .remove(kind, index)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{} #{index}", kind.as_str())))
    })
    .await
    .map(|()| "Imagem removida.".to_string());
    Ok(finish_write(
        &session,
        &state.config().path("/layout"),
        "Failed to remove layout asset",
        outcome,
    )
    .await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("banners").unwrap(), LayoutKind::Banners);
        assert!(matches!(parse_kind("logo"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_sections_cover_every_slot_in_order() {
        let state = AppState::new(test_config()).unwrap();
        let layout = LayoutConfig {
            promotions: vec!["https://img/p0.webp".into(), "https://img/p1.webp".into()],
            ..LayoutConfig::default()
        };

        let sections = sections(&state, &layout);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "Banners (Hero)");
        assert!(sections[0].assets.is_empty());
        assert_eq!(sections[1].upload_href, "/admin/layout/promotions");
        assert_eq!(
            sections[1].assets[1].remove_href,
            "/admin/layout/promotions/1/remover"
        );
    }
}
