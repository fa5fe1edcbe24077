//! Frame discovery for the active tab.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ScrapeResult;
use crate::types::{Frame, FrameId, TabId};

/// Browser-side frame querying.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// The id of the currently active tab.
    async fn active_tab(&self) -> ScrapeResult<TabId>;

    /// Every frame of the tab, in no particular order.
    async fn all_frames(&self, tab_id: TabId) -> ScrapeResult<Vec<Frame>>;
}

/// The active tab together with its content-bearing frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frames {
    pub tab_id: TabId,
    pub frames: Vec<Frame>,
}

impl Frames {
    /// URL of the top-level frame, if present.
    pub fn top_level_url(&self) -> Option<&str> {
        self.frames
            .iter()
            .find(|f| f.is_top_level())
            .map(|f| f.url.as_str())
    }
}

/// Drop frames whose URL equals their parent's, then order by frame id.
///
/// Such frames are iframes without a URL of their own; they carry no puzzle data but would
/// otherwise look like valid puzzle frames whenever their parent does.
pub fn filter_frames(all: Vec<Frame>) -> Vec<Frame> {
    let urls: HashMap<FrameId, String> = all
        .iter()
        .map(|f| (f.frame_id, f.url.clone()))
        .collect();

    let mut frames: Vec<Frame> = all
        .into_iter()
        .filter(|f| f.is_top_level() || urls.get(&f.parent_frame_id) != Some(&f.url))
        .collect();
    // Frame id order follows the on-page order of the frames.
    frames.sort_by_key(|f| f.frame_id);
    frames
}

/// Discover the frames of the active tab. Browser API failures are fatal to the run.
pub async fn enumerate_frames(source: &dyn FrameSource) -> ScrapeResult<Frames> {
    let tab_id = source.active_tab().await?;
    let all = source.all_frames(tab_id).await?;
    let total = all.len();
    let frames = filter_frames(all);
    tracing::debug!(tab_id, total, kept = frames.len(), "Enumerated frames");
    Ok(Frames { tab_id, frames })
}
