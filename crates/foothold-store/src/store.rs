//! In-memory object population with directional edge adjacency.
//!
//! Objects live in a dense arena; [`ObjectId`] handles index it directly.
//! Edges are kept per ordered pair as a single [`EdgeBitmap`] (the union of
//! all kinds between the pair) with a mirrored reverse index, so both
//! traversal directions are O(1) to reach. The store is quiescent for the
//! duration of an analysis call; the engine only reads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use foothold_core::{Direction, EdgeBitmap, Object, ObjectId};
use uuid::Uuid;

/// The engine's read-only view of one directory snapshot.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Vec<Object>,
    by_guid: HashMap<Uuid, ObjectId>,
    outgoing: Vec<HashMap<ObjectId, EdgeBitmap>>,
    incoming: Vec<HashMap<ObjectId, EdgeBitmap>>,
    edge_count: usize,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its dense handle. The caller guarantees guid
    /// uniqueness (snapshot loading enforces it).
    pub fn insert(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.by_guid.insert(object.guid, id);
        self.objects.push(object);
        self.outgoing.push(HashMap::new());
        self.incoming.push(HashMap::new());
        id
    }

    /// Record `kinds` on the ordered pair `(source, target)`, unioning into
    /// any existing label.
    pub fn add_edge(&mut self, source: ObjectId, target: ObjectId, kinds: EdgeBitmap) {
        match self.outgoing[source.index()].entry(target) {
            Entry::Vacant(slot) => {
                slot.insert(kinds);
                self.edge_count += 1;
            }
            Entry::Occupied(mut slot) => {
                let merged = slot.get().union(kinds);
                slot.insert(merged);
            }
        }
        let mirror = self.incoming[target.index()].entry(source).or_default();
        *mirror = mirror.union(kinds);
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id.index()]
    }

    pub fn by_guid(&self, guid: &Uuid) -> Option<ObjectId> {
        self.by_guid.get(guid).copied()
    }

    /// Iterate the whole population as `(id, object)` pairs.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectId(i as u32), o))
    }

    /// Incident edges of `id` in the requested direction: for [`Direction::In`]
    /// the far endpoint is the edge's source, for [`Direction::Out`] its target.
    pub fn edges(
        &self,
        id: ObjectId,
        direction: Direction,
    ) -> impl Iterator<Item = (ObjectId, EdgeBitmap)> + '_ {
        let adjacency = match direction {
            Direction::In => &self.incoming[id.index()],
            Direction::Out => &self.outgoing[id.index()],
        };
        adjacency.iter().map(|(&other, &bitmap)| (other, bitmap))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
