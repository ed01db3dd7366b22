//! L5 — statement and CRUD builders (spec.md §2 module table, §4.4
//! "Statement builder"). Each builder is a chain of `self`-consuming
//! methods gated by [`chain::ChainGuard`] and terminated by `build()`,
//! which yields the wire message ready for [`crate::session::Session`].

pub mod chain;
pub mod delete;
pub mod expr;
pub mod find;
pub mod insert;
pub mod sql;
pub mod update;

pub use delete::Delete;
pub use find::Find;
pub use insert::Insert;
pub use sql::Sql;
pub use update::Update;
