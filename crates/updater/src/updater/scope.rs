use crate::watcher::{IdPaths, ProjectChunkId, SourceType};
use qmlsync_store::ids::{ProjectPartId, SourceId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

type Owned = HashMap<SourceId, Vec<(SourceType, SourceId)>>;

/// What one project part was last updated with.
#[derive(Debug, Default)]
pub(crate) struct Scope {
    pub directories: Vec<PathBuf>,
    pub qmltypes_paths: Vec<PathBuf>,
    pub watch_set: WatchSet,
}

/// Watched ids of one scope, grouped by the directory or explicit qmltypes
/// file that produced them.
#[derive(Debug, Default)]
pub(crate) struct WatchSet {
    by_owner: Owned,
}

impl WatchSet {
    pub fn replace_all(&mut self, owned: Owned) {
        self.by_owner = owned.into_iter().filter(|(_, entries)| !entries.is_empty()).collect();
    }

    /// Replace the entries of every owner in `owned`, leaving the others.
    pub fn replace_owners(&mut self, owned: Owned) {
        for (owner, entries) in owned {
            if entries.is_empty() {
                self.by_owner.remove(&owner);
            } else {
                self.by_owner.insert(owner, entries);
            }
        }
    }

    pub fn owner_of(&self, source_id: SourceId) -> Option<SourceId> {
        self.by_owner
            .iter()
            .find(|(_, entries)| entries.iter().any(|(_, id)| *id == source_id))
            .map(|(owner, _)| *owner)
    }

    pub fn id_paths(&self, project_part_id: ProjectPartId) -> Vec<IdPaths> {
        let mut chunks: BTreeMap<SourceType, BTreeSet<SourceId>> = BTreeMap::new();
        for (source_type, source_id) in self.by_owner.values().flatten() {
            chunks.entry(*source_type).or_default().insert(*source_id);
        }
        chunks
            .into_iter()
            .map(|(source_type, ids)| IdPaths {
                id: ProjectChunkId { project_part_id, source_type },
                source_ids: ids.into_iter().collect(),
            })
            .collect()
    }
}
