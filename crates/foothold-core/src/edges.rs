//! The typed-edge model: edge kinds, fixed-width edge bitmaps, and the
//! registry of per-kind probability callbacks.
//!
//! An edge between two objects is labeled with an [`EdgeBitmap`]: the set of
//! control relations (membership, ACL grant, delegation, ...) that hold
//! between the pair. Kinds are interned into an [`EdgeRegistry`] at startup;
//! each kind may carry a probability callback estimating how exploitable the
//! relation is for a concrete ordered pair of objects.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Object, Probability, MAX_PROBABILITY};

/// Which way edges are walked during analysis: `In` explores predecessors
/// ("who can reach this"), `Out` explores successors ("what does this reach").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    In,
    Out,
}

const BITMAP_WORDS: usize = 4;

/// Maximum number of registrable edge kinds (the bitmap width).
pub const EDGE_KIND_CAPACITY: usize = BITMAP_WORDS * 64;

/// An interned edge kind: an index into the owning [`EdgeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKind(u8);

impl EdgeKind {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of edge kinds, packed into a fixed-width bitmap.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeBitmap([u64; BITMAP_WORDS]);

impl EdgeBitmap {
    pub const fn blank() -> Self {
        Self([0; BITMAP_WORDS])
    }

    pub fn single(kind: EdgeKind) -> Self {
        Self::blank().with(kind)
    }

    pub fn set(&mut self, kind: EdgeKind) {
        self.0[kind.index() / 64] |= 1 << (kind.index() % 64);
    }

    #[must_use]
    pub fn with(mut self, kind: EdgeKind) -> Self {
        self.set(kind);
        self
    }

    pub fn is_set(&self, kind: EdgeKind) -> bool {
        self.0[kind.index() / 64] & (1 << (kind.index() % 64)) != 0
    }

    #[must_use]
    pub fn intersect(&self, other: Self) -> Self {
        let mut out = [0u64; BITMAP_WORDS];
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.0[i] & other.0[i];
        }
        Self(out)
    }

    #[must_use]
    pub fn union(&self, other: Self) -> Self {
        let mut out = [0u64; BITMAP_WORDS];
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.0[i] | other.0[i];
        }
        Self(out)
    }

    pub fn is_blank(&self) -> bool {
        self.0 == [0; BITMAP_WORDS]
    }

    pub fn count(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate the kinds present in this bitmap, lowest index first.
    pub fn kinds(&self) -> impl Iterator<Item = EdgeKind> + '_ {
        (0..EDGE_KIND_CAPACITY)
            .map(|i| EdgeKind(i as u8))
            .filter(move |&k| self.is_set(k))
    }

    /// The largest per-kind probability this bitmap confers on the ordered
    /// pair `(source, target)`.
    ///
    /// Kinds whose callback returns 0 contribute nothing; a result of 0
    /// means "no usable edge" even when `count() > 0` (pure-deny ACLs).
    pub fn max_probability(
        &self,
        registry: &EdgeRegistry,
        source: &Object,
        target: &Object,
    ) -> Probability {
        self.kinds()
            .map(|kind| registry.probability(kind, source, target))
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Debug for EdgeBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds().map(EdgeKind::index)).finish()
    }
}

type ProbabilityFn = Box<dyn Fn(&Object, &Object) -> Probability + Send + Sync>;

struct RegisteredKind {
    name: String,
    probability: Option<ProbabilityFn>,
}

/// The universe of edge kinds for one deployment.
///
/// Kinds are registered once at startup (built-ins plus whatever the snapshot
/// declares); registration is idempotent by name.
#[derive(Default)]
pub struct EdgeRegistry {
    kinds: Vec<RegisteredKind>,
    by_name: HashMap<String, EdgeKind>,
}

impl EdgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind with the default (always 100) probability.
    pub fn register(&mut self, name: &str) -> Result<EdgeKind, CoreError> {
        self.insert(name, None)
    }

    /// Register a kind with a probability callback evaluated per ordered
    /// `(source, target)` pair.
    pub fn register_with<F>(&mut self, name: &str, probability: F) -> Result<EdgeKind, CoreError>
    where
        F: Fn(&Object, &Object) -> Probability + Send + Sync + 'static,
    {
        self.insert(name, Some(Box::new(probability)))
    }

    fn insert(&mut self, name: &str, probability: Option<ProbabilityFn>) -> Result<EdgeKind, CoreError> {
        if let Some(&kind) = self.by_name.get(name) {
            return Ok(kind);
        }
        if self.kinds.len() >= EDGE_KIND_CAPACITY {
            return Err(CoreError::EdgeKindCapacity {
                name: name.to_string(),
                capacity: EDGE_KIND_CAPACITY,
            });
        }
        let kind = EdgeKind(self.kinds.len() as u8);
        self.kinds.push(RegisteredKind {
            name: name.to_string(),
            probability,
        });
        self.by_name.insert(name.to_string(), kind);
        Ok(kind)
    }

    pub fn kind(&self, name: &str) -> Option<EdgeKind> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, kind: EdgeKind) -> &str {
        &self.kinds[kind.index()].name
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// A bitmap with every registered kind set.
    pub fn universe(&self) -> EdgeBitmap {
        let mut bitmap = EdgeBitmap::blank();
        for i in 0..self.kinds.len() {
            bitmap.set(EdgeKind(i as u8));
        }
        bitmap
    }

    /// The probability that `kind` is exploitable from `source` to `target`.
    pub fn probability(&self, kind: EdgeKind, source: &Object, target: &Object) -> Probability {
        match &self.kinds[kind.index()].probability {
            Some(f) => f(source, target).min(MAX_PROBABILITY),
            None => MAX_PROBABILITY,
        }
    }
}

impl fmt::Debug for EdgeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeRegistry")
            .field("kinds", &self.kinds.iter().map(|k| &k.name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectType;

    fn sample_objects() -> (Object, Object) {
        (
            Object::new("alice", ObjectType::User),
            Object::new("Domain Admins", ObjectType::Group),
        )
    }

    #[test]
    fn test_bitmap_set_and_query() {
        let mut registry = EdgeRegistry::new();
        let member = registry.register("MemberOfGroup").unwrap();
        let dacl = registry.register("WriteDacl").unwrap();
        let owner = registry.register("WriteOwner").unwrap();

        let bitmap = EdgeBitmap::single(member).with(dacl);
        assert!(bitmap.is_set(member));
        assert!(bitmap.is_set(dacl));
        assert!(!bitmap.is_set(owner));
        assert_eq!(bitmap.count(), 2);
        assert!(!bitmap.is_blank());
        assert!(EdgeBitmap::blank().is_blank());
    }

    #[test]
    fn test_bitmap_intersect_union() {
        let mut registry = EdgeRegistry::new();
        let a = registry.register("A").unwrap();
        let b = registry.register("B").unwrap();
        let c = registry.register("C").unwrap();

        let left = EdgeBitmap::single(a).with(b);
        let right = EdgeBitmap::single(b).with(c);

        assert_eq!(left.intersect(right), EdgeBitmap::single(b));
        assert_eq!(left.union(right), EdgeBitmap::single(a).with(b).with(c));
        assert!(left.intersect(EdgeBitmap::blank()).is_blank());
    }

    #[test]
    fn test_bitmap_kind_iteration_beyond_first_word() {
        let mut registry = EdgeRegistry::new();
        let mut last = None;
        for i in 0..70 {
            last = Some(registry.register(&format!("kind{i}")).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.index(), 69);

        let bitmap = EdgeBitmap::single(last);
        assert!(bitmap.is_set(last));
        assert_eq!(bitmap.kinds().collect::<Vec<_>>(), vec![last]);
    }

    #[test]
    fn test_registry_idempotent_by_name() {
        let mut registry = EdgeRegistry::new();
        let first = registry.register("MemberOfGroup").unwrap();
        let second = registry.register("MemberOfGroup").unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.name(first), "MemberOfGroup");
        assert_eq!(registry.kind("MemberOfGroup"), Some(first));
        assert_eq!(registry.kind("Nope"), None);
    }

    #[test]
    fn test_registry_capacity_guard() {
        let mut registry = EdgeRegistry::new();
        for i in 0..EDGE_KIND_CAPACITY {
            registry.register(&format!("kind{i}")).unwrap();
        }
        let err = registry.register("one-too-many").unwrap_err();
        assert!(matches!(err, CoreError::EdgeKindCapacity { .. }));
    }

    #[test]
    fn test_universe_covers_registered_kinds() {
        let mut registry = EdgeRegistry::new();
        registry.register("A").unwrap();
        registry.register("B").unwrap();
        assert_eq!(registry.universe().count(), 2);
    }

    #[test]
    fn test_max_probability_takes_largest_callback() {
        let mut registry = EdgeRegistry::new();
        let weak = registry.register_with("Weak", |_, _| 20).unwrap();
        let strong = registry.register("Strong").unwrap();
        let deny = registry.register_with("Deny", |_, _| 0).unwrap();

        let (alice, admins) = sample_objects();

        let bitmap = EdgeBitmap::single(weak).with(strong);
        assert_eq!(bitmap.max_probability(&registry, &alice, &admins), 100);

        assert_eq!(
            EdgeBitmap::single(weak).max_probability(&registry, &alice, &admins),
            20
        );

        // A non-empty bitmap of pure-deny kinds is "no usable edge".
        let denied = EdgeBitmap::single(deny);
        assert_eq!(denied.count(), 1);
        assert_eq!(denied.max_probability(&registry, &alice, &admins), 0);
    }

    #[test]
    fn test_probability_callback_sees_pair_order() {
        let mut registry = EdgeRegistry::new();
        let kind = registry
            .register_with("OnlyUsersPwn", |source, _| {
                if source.object_type == ObjectType::User {
                    80
                } else {
                    0
                }
            })
            .unwrap();

        let (alice, admins) = sample_objects();
        assert_eq!(registry.probability(kind, &alice, &admins), 80);
        assert_eq!(registry.probability(kind, &admins, &alice), 0);
    }
}
