pub mod config;
pub mod core;
pub mod download;
pub mod error;
pub mod progress;
pub mod scrape;
pub mod utils;

#[cfg(feature = "apple")]
pub mod apple;
#[cfg(feature = "netease")]
pub mod netease;
#[cfg(feature = "qq")]
pub mod qq;
#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "apple")]
pub use apple::AppleExtractor;
#[cfg(feature = "netease")]
pub use netease::NeteaseExtractor;
#[cfg(feature = "qq")]
pub use qq::QqExtractor;

pub use crate::core::{
    ExtractContext, ExtractionResult, ExtractionStatus, Extractor, Platform, PlaylistInfo, Song,
};
use crate::error::{Result, TrackliftError};
pub use crate::progress::{MemoryProgressStore, ProgressRecord, ProgressReporter, ProgressStore};

use crate::progress::ProgressUpdate;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Dispatch an extraction request to the right platform extractor. Progress
/// for `request_id` is written to the injected store while the extraction
/// runs. Only input problems surface as errors; upstream failures degrade to
/// mock data inside the extractor.
pub async fn extract_playlist(
    platform: Platform,
    url: &str,
    request_id: Option<String>,
    user_token: Option<String>,
    store: Arc<dyn ProgressStore>,
) -> Result<ExtractionResult> {
    if url.is_empty() {
        return Err(TrackliftError::MissingRequestFields);
    }

    tracing::info!(platform = platform.display_name(), url, "received extraction request");

    let reporter = ProgressReporter::new(store, request_id);
    reporter.update(ProgressUpdate::initializing());

    let ctx = ExtractContext {
        progress: reporter,
        user_token,
    };
    platform.extractor().extract(url, &ctx).await
}

/// Find the platform whose extractor recognizes the URL.
pub fn detect_platform(url: &str) -> Option<Platform> {
    Platform::iter().find(|platform| platform.extractor().matches(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_platform() {
        assert_eq!(
            detect_platform("https://music.163.com/playlist?id=1"),
            Some(Platform::Netease)
        );
        assert_eq!(
            detect_platform("https://y.qq.com/n/ryqq/playlist/1"),
            Some(Platform::Qq)
        );
        assert_eq!(
            detect_platform("https://music.apple.com/us/playlist/a/pl.x"),
            Some(Platform::Apple)
        );
        assert_eq!(detect_platform("https://example.com/playlist/1"), None);
    }
}
