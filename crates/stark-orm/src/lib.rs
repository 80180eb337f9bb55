//! # stark-orm
//!
//! Entity metadata, predicates and the storage abstraction the admin works
//! against.
//!
//! This crate provides:
//! - `Entity` trait describing a record type through `EntityMeta`
//! - `Q` objects for complex filter expressions
//! - `QuerySet` for chainable, backend-neutral queries
//! - `Storage` trait, object-safe and async
//! - `MemoryStorage`, an in-process implementation
//!
//! ## Quick Start
//!
//! ```ignore
//! use stark_orm::{MemoryStorage, Q, QuerySet, Storage};
//!
//! async fn example(storage: &MemoryStorage<User>) -> stark_orm::Result<()> {
//!     let qs = QuerySet::new()
//!         .filter(Q::contains("name", "ann").or(Q::contains("email", "ann")))
//!         .order_by("-id");
//!
//!     let total = storage.count(&qs).await?;
//!     let first_page = storage.fetch(&qs, 0, 10).await?;
//!     let user = storage.get(1).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Complex Filters with Q Objects
//!
//! ```ignore
//! use stark_orm::Q;
//!
//! // AND conditions
//! let filter = Q::eq("status", "active").and(Q::gt("age", 18));
//!
//! // OR conditions
//! let filter = Q::eq("role", "admin").or(Q::eq("role", "moderator"));
//!
//! // NOT conditions
//! let filter = Q::eq("deleted", true).not();
//! ```

mod error;
mod memory;
mod model;
pub mod query;
mod queryset;
mod storage;

pub use error::{Result, StorageError};
pub use memory::MemoryStorage;
pub use model::{Entity, EntityMeta, FieldKind, FieldMeta, PK_FIELD};
pub use query::Q;
pub use queryset::{OrderBy, OrderDirection, QuerySet};
pub use storage::{BoxFuture, Storage};
