//! JSON snapshot loading.
//!
//! A snapshot is the serialized form of one collected directory: the object
//! population plus the typed edges between pairs, with edge kinds referenced
//! by name. Kind names not already registered (collector extensions) are
//! registered on the fly with the default probability.

use std::collections::HashMap;
use std::path::Path;

use foothold_core::{EdgeBitmap, EdgeRegistry, Object, ObjectId, ObjectType, Sid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::ObjectStore;

/// One object as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub guid: Uuid,
    pub name: String,
    pub object_type: ObjectType,
    #[serde(default)]
    pub sid: Option<Sid>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

/// One directed edge as it appears on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: Uuid,
    pub target: Uuid,
    pub kinds: Vec<String>,
}

/// A collected directory snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl Snapshot {
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Build the store, interning edge kinds into `registry`.
    ///
    /// Edges naming an endpoint that is not in the snapshot are skipped with
    /// a warning; a duplicated object guid is an error.
    pub fn into_store(self, registry: &mut EdgeRegistry) -> Result<ObjectStore> {
        let mut store = ObjectStore::new();
        let mut ids: HashMap<Uuid, ObjectId> = HashMap::with_capacity(self.objects.len());

        for record in self.objects {
            if ids.contains_key(&record.guid) {
                return Err(StoreError::DuplicateGuid { guid: record.guid });
            }
            let guid = record.guid;
            let id = store.insert(Object {
                guid: record.guid,
                name: record.name,
                object_type: record.object_type,
                sid: record.sid,
                attributes: record.attributes,
            });
            ids.insert(guid, id);
        }

        let mut skipped = 0usize;
        for edge in &self.edges {
            let (Some(&source), Some(&target)) = (ids.get(&edge.source), ids.get(&edge.target))
            else {
                skipped += 1;
                continue;
            };
            let mut bitmap = EdgeBitmap::blank();
            for kind_name in &edge.kinds {
                bitmap.set(registry.register(kind_name)?);
            }
            store.add_edge(source, target, bitmap);
        }
        if skipped > 0 {
            tracing::warn!(skipped, "Snapshot edges referenced unknown objects");
        }

        tracing::debug!(
            objects = store.len(),
            edges = store.edge_count(),
            kinds = registry.len(),
            "Snapshot loaded"
        );
        Ok(store)
    }
}
