//! Foundation types for Shelf, the library circulation core.
//!
//! This crate provides the identity, monetary, and temporal types used
//! throughout Shelf. Every other Shelf crate depends on `shelf-types`.
//!
//! # Key Types
//!
//! - [`CopyId`]: Identifier of one physical book copy (UUID v7)
//! - [`RecordId`]: Identifier of one checkout record (UUID v7)
//! - [`UserId`]: Login name of a reader, supplied by the authentication layer
//! - [`BranchId`]: Short code of a library branch
//! - [`BookId`]: ISBN of a book title
//! - [`Money`]: Integer-cent monetary amount
//! - [`Timestamp`]: Timezone-aware instant used for every checkout date
//! - [`Clock`]: Source of the current [`Timestamp`]

pub mod error;
pub mod identity;
pub mod money;
pub mod temporal;

pub use error::TypeError;
pub use identity::{BookId, BranchId, CopyId, RecordId, UserId};
pub use money::Money;
pub use temporal::{parse_timestamp, Clock, FixedClock, SystemClock, Timestamp};
