//! L2 — message codec (spec.md §4.5).

pub mod codec;
pub mod messages;
