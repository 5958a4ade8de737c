use crate::watcher::SourceType;
use qmlsync_store::ids::SourceId;
use std::collections::{HashMap, HashSet};

/// Per-file sets get this many slots per scanned directory or qmltypes
/// path. A starting capacity only; the sets grow as needed.
pub(crate) const RESERVE_FACTOR: usize = 30;

/// Role-tagged source ids collected during one update pass.
///
/// The `not_updated*` sets hold ids that were checked and found unchanged;
/// they win over any "updated" mention when the package is finalised. The
/// `watched_*` sets are the new watch set, and every watched id is also
/// filed under the directory (or explicit qmltypes file) that produced it.
#[derive(Debug, Default)]
pub struct SourceIdsData {
    pub not_updated_file_status: HashSet<SourceId>,
    pub not_updated: HashSet<SourceId>,
    pub watched_directories: HashSet<SourceId>,
    pub watched_qmldirs: HashSet<SourceId>,
    pub watched_qml: HashSet<SourceId>,
    pub watched_qmltypes: HashSet<SourceId>,
    owned: HashMap<SourceId, Vec<(SourceType, SourceId)>>,
}

impl SourceIdsData {
    pub fn with_capacity(roots: usize) -> Self {
        let files = roots * RESERVE_FACTOR;
        Self {
            not_updated_file_status: HashSet::with_capacity(files),
            not_updated: HashSet::with_capacity(files),
            watched_directories: HashSet::with_capacity(roots),
            watched_qmldirs: HashSet::with_capacity(roots),
            watched_qml: HashSet::with_capacity(files),
            watched_qmltypes: HashSet::with_capacity(files),
            owned: HashMap::with_capacity(roots),
        }
    }

    /// Mark `owner` as recomputed by this pass, even if it ends up owning
    /// nothing.
    pub fn recompute(&mut self, owner: SourceId) {
        self.owned.entry(owner).or_default();
    }

    pub fn watch(&mut self, source_type: SourceType, source_id: SourceId, owner: SourceId) {
        let set = match source_type {
            SourceType::Directory => &mut self.watched_directories,
            SourceType::QmlDir => &mut self.watched_qmldirs,
            SourceType::Qml => &mut self.watched_qml,
            SourceType::QmlTypes => &mut self.watched_qmltypes,
        };
        set.insert(source_id);
        self.owned.entry(owner).or_default().push((source_type, source_id));
    }

    pub fn is_watched(&self, source_id: SourceId) -> bool {
        self.watched_directories.contains(&source_id)
            || self.watched_qmldirs.contains(&source_id)
            || self.watched_qml.contains(&source_id)
            || self.watched_qmltypes.contains(&source_id)
    }

    /// Whether the pass looked at `source_id` and decided to keep it.
    pub fn is_kept(&self, source_id: SourceId) -> bool {
        self.is_watched(source_id) || self.not_updated.contains(&source_id)
    }

    pub(crate) fn into_owned(self) -> HashMap<SourceId, Vec<(SourceType, SourceId)>> {
        self.owned
    }
}
