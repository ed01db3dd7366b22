//! L1 — frame transport (spec.md §4.1).

pub mod frame;
pub mod stream;
