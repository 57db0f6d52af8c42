//! Storage browser.
//!
//! Lists what has already been uploaded, folder by folder. The same
//! listing is embedded in the product form as an image picker.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use rocha_brindes_core::storage::{PRODUCTS_PREFIX, base_name};
use rocha_brindes_core::{ImageCdn, ImageOptions};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    filters,
    middleware::auth::RequireAdminAuth,
    models::CurrentAdmin,
    routes::{PageContext, render},
    state::AppState,
};

const PREVIEW_SIZE: u32 = 160;

/// Folder selection.
#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    /// Folder to list. Absent means the products folder; empty means the
    /// bucket root.
    pub pasta: Option<String>,
}

impl FolderQuery {
    #[must_use]
    pub fn folder(&self) -> String {
        self.pasta
            .as_deref()
            .map_or(PRODUCTS_PREFIX, |p| p.trim_matches('/'))
            .to_string()
    }
}

/// A subfolder link.
#[derive(Debug, Clone)]
pub struct FolderView {
    pub name: String,
    pub href: String,
}

/// A stored file with a small preview.
#[derive(Debug, Clone)]
pub struct FileView {
    pub name: String,
    pub url: String,
    pub preview: String,
}

/// One folder's listing, ready for the browser or the picker.
#[derive(Debug, Clone, Default)]
pub struct PickerView {
    pub folder: String,
    pub parent: Option<FolderView>,
    pub folders: Vec<FolderView>,
    pub files: Vec<FileView>,
    pub error: Option<String>,
}

fn folder_href(link: &str, folder: &str) -> String {
    format!("{link}?pasta={}", urlencoding::encode(folder))
}

/// The folder above `folder`; `None` at the bucket root.
fn parent_folder(folder: &str) -> Option<&str> {
    if folder.is_empty() {
        return None;
    }
    Some(folder.rsplit_once('/').map_or("", |(parent, _)| parent))
}

/// List `folder` for display. Folder links point at `link?pasta=...`.
///
/// A failed listing is logged and shown inline; the rest of the page still
/// works.
pub async fn load_picker(
    state: &AppState,
    admin: &CurrentAdmin,
    folder: &str,
    link: &str,
) -> PickerView {
    let mut view = PickerView {
        folder: folder.to_string(),
        parent: parent_folder(folder).map(|parent| FolderView {
            name: if parent.is_empty() { "/".to_string() } else { parent.to_string() },
            href: folder_href(link, parent),
        }),
        ..PickerView::default()
    };

    match state.storage().list(folder, Some(admin.id_token())).await {
        Ok(listing) => {
            view.folders = listing
                .folders
                .iter()
                .map(|path| {
                    let path = path.trim_end_matches('/');
                    FolderView {
                        name: base_name(path).to_string(),
                        href: folder_href(link, path),
                    }
                })
                .collect();
            view.files = listing
                .files
                .into_iter()
                .map(|file| file_view(state.cdn(), file.name, file.url))
                .collect();
        }
        Err(e) => {
            tracing::error!(folder = %folder, error = %e, "Failed to list storage folder");
            view.error = Some("Não foi possível listar os arquivos desta pasta.".to_string());
        }
    }

    view
}

fn file_view(cdn: &ImageCdn, name: String, url: String) -> FileView {
    FileView {
        preview: cdn.url(&url, ImageOptions::sized(PREVIEW_SIZE, PREVIEW_SIZE)),
        name,
        url,
    }
}

/// Storage browser template.
#[derive(Template)]
#[template(path = "storage/index.html")]
pub struct StorageTemplate {
    pub page: PageContext,
    pub picker: PickerView,
}

/// Build the storage router.
pub fn router() -> Router<AppState> {
    Router::new().route("/armazenamento", get(browse))
}

/// Browse a storage folder.
///
/// GET /armazenamento?pasta=
#[instrument(skip(admin, state, session))]
async fn browse(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<FolderQuery>,
) -> Html<String> {
    let link = state.config().path("/armazenamento");
    let picker = load_picker(&state, &admin, &query.folder(), &link).await;

    render(&StorageTemplate {
        page: PageContext::new(&state, &session, &admin, "/armazenamento").await,
        picker,
    })
}
