//! Lab entities: specimens, blocks, slides, and batches.
//!
//! Specimens, blocks and slides live in per-replication arena tables and
//! are referenced by index handles; block → specimen and slide → block are
//! lookup relations, never ownership, so the object graph stays acyclic.
//! The store token is the [`Entity`] enum. Specimen attributes and stage
//! timestamps accumulate in the replication's `specimen_data` map, which
//! outlives the specimen's flow through the lab.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Specimen priority class; smaller is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Urgent = -3,
    Priority = -2,
    Cancer = -1,
    Routine = 0,
}

impl Priority {
    /// The integer level used for queue and event ordering.
    #[inline]
    pub fn level(self) -> i32 {
        self as i32
    }
}

/// Where a specimen came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Internal,
    External,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "Internal",
            Self::External => "External",
        }
    }
}

/// Block sizes produced at cut-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    SmallSurgical,
    LargeSurgical,
    Mega,
}

impl BlockType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmallSurgical => "small surgical",
            Self::LargeSurgical => "large surgical",
            Self::Mega => "mega",
        }
    }
}

/// Slide kinds produced at microtomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideType {
    Serials,
    Levels,
    Larges,
    Megas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecimenId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlideId(pub usize);

/// A tissue specimen.
#[derive(Debug)]
pub struct Specimen {
    pub name: String,
    pub prio: Priority,
    pub source: Source,
    pub cancer: bool,
    pub blocks: Vec<BlockId>,
}

/// A wax block (or cassette to be turned into a wax block).
#[derive(Debug)]
pub struct Block {
    pub name: String,
    pub specimen: SpecimenId,
    pub block_type: BlockType,
    pub slides: Vec<SlideId>,
    /// Recorded at microtomy; collation stalls without it.
    pub num_slides: Option<u32>,
}

/// A glass slide.
#[derive(Debug)]
pub struct Slide {
    pub name: String,
    pub block: BlockId,
    pub slide_type: SlideType,
}

/// A transient container moving same-type entities through delivery as one
/// unit. Batch priority is ROUTINE.
#[derive(Debug)]
pub struct Batch {
    pub name: String,
    pub items: Vec<Entity>,
}

/// The token that flows through stores.
#[derive(Debug)]
pub enum Entity {
    Specimen(SpecimenId),
    Block(BlockId),
    Slide(SlideId),
    Batch(Batch),
}

/// A reported specimen attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Per-specimen attribute map, keyed by attribute name.
pub type AttrMap = BTreeMap<String, AttrValue>;
