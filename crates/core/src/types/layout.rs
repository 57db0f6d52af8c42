//! Homepage layout configuration.

use serde::{Deserialize, Serialize};

/// The singleton record controlling homepage logo, banner, promotion and
/// popup assets.
///
/// A missing document reads as [`LayoutConfig::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub banners: Vec<String>,
    #[serde(default)]
    pub promotions: Vec<String>,
    #[serde(default)]
    pub popups: Vec<String>,
}

/// The list-valued asset slots of the layout config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Banners,
    Promotions,
    Popups,
}

impl LayoutKind {
    pub const ALL: [Self; 3] = [Self::Banners, Self::Promotions, Self::Popups];

    /// Path segment used in URLs and storage prefixes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Banners => "banners",
            Self::Promotions => "promotions",
            Self::Popups => "popups",
        }
    }

    /// Heading shown on the admin layout screen.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Banners => "Banners (Hero)",
            Self::Promotions => "Promoções em Destaque",
            Self::Popups => "Popups",
        }
    }

    /// Parse a path segment.
    #[must_use]
    pub fn parse(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == segment)
    }
}

impl LayoutConfig {
    /// Assets of one slot.
    #[must_use]
    pub fn assets(&self, kind: LayoutKind) -> &[String] {
        match kind {
            LayoutKind::Banners => &self.banners,
            LayoutKind::Promotions => &self.promotions,
            LayoutKind::Popups => &self.popups,
        }
    }

    fn assets_mut(&mut self, kind: LayoutKind) -> &mut Vec<String> {
        match kind {
            LayoutKind::Banners => &mut self.banners,
            LayoutKind::Promotions => &mut self.promotions,
            LayoutKind::Popups => &mut self.popups,
        }
    }

    /// Append references to a slot, keeping existing entries first.
    pub fn append(&mut self, kind: LayoutKind, urls: impl IntoIterator<Item = String>) {
        self.assets_mut(kind).extend(urls);
    }

    /// Remove the entry at `index`, returning it if the index was valid.
    pub fn remove(&mut self, kind: LayoutKind, index: usize) -> Option<String> {
        let list = self.assets_mut(kind);
        (index < list.len()).then(|| list.remove(index))
    }
}
