//! Circulation desk for Shelf.
//!
//! Every borrow, reservation, and return goes through a [`CirculationDesk`].
//! The desk resolves a copy's status for one reader at one instant, enforces
//! the per-reader checkout limit, and serializes transitions per copy and per
//! reader before writing to the ledger.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use shelf_circulation::{CirculationConfig, CirculationDesk, CopyStatus};
//! use shelf_ledger::{InMemoryLedger, NewCopy};
//! use shelf_types::{parse_timestamp, BookId, BranchId, UserId};
//!
//! let desk = CirculationDesk::new(Arc::new(InMemoryLedger::new()), CirculationConfig::default());
//! let copy = desk
//!     .register_copy(NewCopy {
//!         book: BookId::isbn("978-0-13-468599-1").unwrap(),
//!         branch: BranchId::new("central").unwrap(),
//!         copy_number: 1,
//!         position: "A1".into(),
//!     })
//!     .unwrap();
//!
//! let ana = UserId::new("ana").unwrap();
//! let now = parse_timestamp("2024-03-01T10:00:00+01:00").unwrap();
//! desk.borrow(copy.id, &ana, now).unwrap();
//! assert_eq!(desk.status(copy.id, &ana, now).unwrap(), CopyStatus::BorrowedMine);
//! ```

pub mod config;
pub mod desk;
pub mod error;
pub mod locks;
pub mod state;

pub use config::CirculationConfig;
pub use desk::CirculationDesk;
pub use error::{CirculationError, CirculationResult};
pub use locks::{LockTable, TransitionGuard};
pub use state::{Assessment, CopyState, CopyStatus};
