//! Kintree Core - Family records and relationship semantics
//!
//! This crate holds the data contracts shared by every other Kintree
//! crate: members, families and the typed relationship edges between
//! members, as handed to us by whatever persistence layer owns them.
//!
//! Nothing here builds a tree. The core only knows how to read records,
//! and how a single relationship edge should be interpreted:
//!
//! - `father`/`mother` make member1 the parent of member2
//! - `son`/`daughter` make member1 the child of member2
//! - `spouse` pairs both members
//! - `brother`/`sister` carry no structural weight
//!
//! # Example
//!
//! ```
//! use kintree_core::{Association, RelationshipKind};
//!
//! let kind: RelationshipKind = "son".parse().unwrap();
//! assert_eq!(
//!     kind.canonicalize("ravi", "mohan"),
//!     Association::Parent { parent: "mohan", child: "ravi" }
//! );
//! ```

pub mod error;
pub mod record;
pub mod relationship;
pub mod sample;
pub mod snapshot;

pub use error::{CoreError, Result};
pub use record::{Family, FamilyId, Gender, Member, MemberId, RelationshipEdge};
pub use relationship::{Association, RelationshipKind};
pub use sample::sample_snapshot;
pub use snapshot::{Snapshot, SnapshotSource};
