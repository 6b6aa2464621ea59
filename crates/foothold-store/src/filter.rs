//! Node filters: predicates over single objects.
//!
//! The engine consumes filters as opaque [`NodeFilter`] trait objects; this
//! module also carries [`FilterSpec`], the declarative serde form requests
//! use, which compiles down to boxed predicates. This is deliberately not a
//! query language, just structured combinators.

use foothold_core::{Object, ObjectType, Sid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Predicate over a single object.
pub trait NodeFilter: Send + Sync {
    fn evaluate(&self, object: &Object) -> bool;
}

pub type BoxedFilter = Box<dyn NodeFilter>;

/// Any plain closure is usable as a filter (handy in tests and embedders).
impl<F> NodeFilter for F
where
    F: Fn(&Object) -> bool + Send + Sync,
{
    fn evaluate(&self, object: &Object) -> bool {
        self(object)
    }
}

/// Declarative filter shape carried in analysis requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSpec {
    /// Every sub-filter must match.
    All(Vec<FilterSpec>),
    /// At least one sub-filter must match.
    Any(Vec<FilterSpec>),
    /// The sub-filter must not match.
    Not(Box<FilterSpec>),
    /// Exact (case-insensitive) name match.
    Name { name: String },
    /// Object guid is one of the listed guids.
    Guids { guids: Vec<Uuid> },
    /// Object type matches.
    Type { object_type: ObjectType },
    /// SID equality.
    Sid { sid: Sid },
    /// Attribute present with exactly this JSON value.
    AttrEq {
        attr: String,
        value: serde_json::Value,
    },
    /// Integer attribute present and `>= min`.
    AttrAtLeast { attr: String, min: i64 },
}

impl FilterSpec {
    /// Compile into an engine-consumable predicate.
    pub fn compile(&self) -> BoxedFilter {
        match self.clone() {
            FilterSpec::All(specs) => {
                let filters: Vec<BoxedFilter> = specs.iter().map(FilterSpec::compile).collect();
                Box::new(move |o: &Object| filters.iter().all(|f| f.evaluate(o)))
            }
            FilterSpec::Any(specs) => {
                let filters: Vec<BoxedFilter> = specs.iter().map(FilterSpec::compile).collect();
                Box::new(move |o: &Object| filters.iter().any(|f| f.evaluate(o)))
            }
            FilterSpec::Not(spec) => {
                let inner = spec.compile();
                Box::new(move |o: &Object| !inner.evaluate(o))
            }
            FilterSpec::Name { name } => {
                Box::new(move |o: &Object| o.name.eq_ignore_ascii_case(&name))
            }
            FilterSpec::Guids { guids } => Box::new(move |o: &Object| guids.contains(&o.guid)),
            FilterSpec::Type { object_type } => {
                Box::new(move |o: &Object| o.object_type == object_type)
            }
            FilterSpec::Sid { sid } => Box::new(move |o: &Object| o.sid() == Some(&sid)),
            FilterSpec::AttrEq { attr, value } => {
                Box::new(move |o: &Object| o.attributes.get(&attr) == Some(&value))
            }
            FilterSpec::AttrAtLeast { attr, min } => {
                Box::new(move |o: &Object| o.attr_int(&attr).is_some_and(|v| v >= min))
            }
        }
    }
}
