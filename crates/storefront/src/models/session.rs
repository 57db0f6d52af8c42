//! Visitor catalog state kept in the session.
//!
//! The whole [`CatalogStore`] is stored under one key and rewritten after
//! every action. A missing or unreadable entry starts a fresh store.

use rocha_brindes_core::CatalogStore;
use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// Key for the visitor's catalog state.
    pub const STORE: &str = "catalog_store";
}

/// Read the visitor's catalog state, or an empty one.
pub async fn load_store(session: &Session) -> CatalogStore {
    match session.get::<CatalogStore>(keys::STORE).await {
        Ok(Some(store)) => store,
        Ok(None) => CatalogStore::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable catalog state");
            CatalogStore::new()
        }
    }
}

/// Persist the visitor's catalog state.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn save_store(
    session: &Session,
    store: &CatalogStore,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::STORE, store).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rocha_brindes_core::Product;
    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_store_round_trips_through_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert_eq!(load_store(&session).await, CatalogStore::new());

        let mut store = CatalogStore::new();
        store.add_to_cart(Product::new("CAN-001", "Caneta"));
        store.add_to_cart(Product::new("CAN-001", "Caneta"));
        save_store(&session, &store).await.unwrap();

        let loaded = load_store(&session).await;
        assert_eq!(loaded.cart_count(), 2);
    }
}
