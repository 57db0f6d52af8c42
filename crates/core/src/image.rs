//! Image CDN URL building.
//!
//! Display images are never resized by this application. Instead, each
//! stored image reference is wrapped in a URL for a third-party resizing CDN
//! that fetches the original and returns a WebP of the requested size.

use url::Url;

/// Default resizing CDN.
pub const DEFAULT_CDN: &str = "https://images.weserv.nl";

/// Quality used when none is requested.
const DEFAULT_QUALITY: u8 = 75;

/// Requested output for a CDN image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl ImageOptions {
    /// Fixed-size output at the default quality.
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            quality: DEFAULT_QUALITY,
        }
    }

    #[must_use]
    pub const fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }
}

/// Builder for resizing-CDN URLs.
#[derive(Debug, Clone)]
pub struct ImageCdn {
    base: Url,
}

impl Default for ImageCdn {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_CDN).expect("DEFAULT_CDN is a valid URL"),
        }
    }
}

impl ImageCdn {
    /// Use the CDN at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute URL.
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
        })
    }

    /// Wrap `source` in a CDN URL producing a WebP with `options`.
    ///
    /// Empty references and in-browser `blob:` / `data:` URLs are returned
    /// unchanged since the CDN cannot fetch them.
    #[must_use]
    pub fn url(&self, source: &str, options: ImageOptions) -> String {
        if source.is_empty() || source.starts_with("blob:") || source.starts_with("data:") {
            return source.to_string();
        }

        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("url", source)
                .append_pair("output", "webp")
                .append_pair("q", &options.quality.to_string())
                .append_pair("fit", "cover")
                .append_pair("il", "")
                .append_pair("n", "-1");
            if let Some(width) = options.width {
                query.append_pair("w", &width.to_string());
            }
            if let Some(height) = options.height {
                query.append_pair("h", &height.to_string());
            }
        }
        url.into()
    }
}
