//! Per-call bounding-box cache.
//!
//! An assembly often instances the same part several times. The cache makes
//! sure each physical part is fetched at most once per engine call. It is
//! created at the start of a call and dropped at its end.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::analysis::assembly::PartKey;
use crate::analysis::geometry::BoundingBox;
use crate::analysis::source::PartGeometrySource;

/// Outcome of resolving one part's bounding box.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxFetch {
    /// The bounding box is available.
    Ready(BoundingBox),
    /// The fetch failed; instances of this part are skipped.
    Skipped {
        /// Why the fetch failed.
        reason: String,
    },
}

impl BoxFetch {
    /// The bounding box, if the fetch succeeded.
    #[must_use]
    pub const fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            Self::Ready(bbox) => Some(*bbox),
            Self::Skipped { .. } => None,
        }
    }
}

/// Memoises bounding boxes by [`PartKey`] for one engine call.
///
/// Failures are memoised too, so a broken part is not re-requested for each
/// of its instances.
pub struct BoundingBoxCache<'a, G: ?Sized> {
    parts: &'a G,
    workspace_id: &'a str,
    entries: HashMap<PartKey, BoxFetch>,
    fetches: usize,
}

impl<'a, G> BoundingBoxCache<'a, G>
where
    G: PartGeometrySource + ?Sized,
{
    /// Creates an empty cache reading from `parts` in `workspace_id`.
    pub fn new(parts: &'a G, workspace_id: &'a str) -> Self {
        Self {
            parts,
            workspace_id,
            entries: HashMap::new(),
            fetches: 0,
        }
    }

    /// Resolves the bounding box for `key`, fetching it on first use.
    pub async fn resolve(&mut self, key: &PartKey) -> BoxFetch {
        if let Some(hit) = self.entries.get(key) {
            return hit.clone();
        }

        self.fetches += 1;
        let outcome = match self
            .parts
            .get_part_bounding_box(
                &key.document_id,
                self.workspace_id,
                &key.element_id,
                &key.part_id,
            )
            .await
        {
            Ok(bbox) => {
                if bbox.is_inverted() {
                    warn!(part_id = %key.part_id, ?bbox, "Bounding box has low > high");
                }
                debug!(part_id = %key.part_id, "Fetched bounding box");
                BoxFetch::Ready(bbox)
            }
            Err(e) => {
                warn!(part_id = %key.part_id, error = %e, "Could not get bounding box for part");
                BoxFetch::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        self.entries.insert(key.clone(), outcome.clone());
        outcome
    }

    /// Number of fetches issued so far.
    #[must_use]
    pub const fn fetches(&self) -> usize {
        self.fetches
    }
}
