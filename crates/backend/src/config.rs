//! Firebase project configuration.
//!
//! Both binaries read the same three variables:
//! - `FIREBASE_API_KEY` - Web API key of the project
//! - `FIREBASE_PROJECT_ID` - Project ID (e.g., rocha-brindes)
//! - `FIREBASE_STORAGE_BUCKET` - Storage bucket (e.g., rocha-brindes.firebasestorage.app)

use secrecy::SecretString;

/// Connection settings for a Firebase project.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    /// Web API key, sent as the `key` query parameter.
    pub api_key: SecretString,
    /// Project ID used in Firestore document paths.
    pub project_id: String,
    /// Cloud Storage bucket name.
    pub storage_bucket: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .finish()
    }
}

impl FirebaseConfig {
    /// Root of the Firestore documents API for the default database.
    #[must_use]
    pub fn firestore_base(&self) -> String {
        format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    /// Full resource name of a document, as used in cursors and references.
    #[must_use]
    pub fn document_name(&self, collection: &str, id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{collection}/{id}",
            self.project_id
        )
    }

    /// Root of the Storage objects API for the bucket.
    #[must_use]
    pub fn storage_base(&self) -> String {
        format!(
            "https://firebasestorage.googleapis.com/v0/b/{}/o",
            self.storage_bucket
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: SecretString::from("AIzaSy-super-secret-key"),
            project_id: "rocha-brindes".to_string(),
            storage_bucket: "rocha-brindes.firebasestorage.app".to_string(),
        }
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let debug_output = format!("{:?}", config());
        assert!(debug_output.contains("rocha-brindes.firebasestorage.app"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_endpoints() {
        let config = config();
        assert_eq!(
            config.firestore_base(),
            "https://firestore.googleapis.com/v1/projects/rocha-brindes/databases/(default)/documents"
        );
        assert_eq!(
            config.document_name("produtos", "CAN-001"),
            "projects/rocha-brindes/databases/(default)/documents/produtos/CAN-001"
        );
        assert_eq!(
            config.storage_base(),
            "https://firebasestorage.googleapis.com/v0/b/rocha-brindes.firebasestorage.app/o"
        );
    }
}
