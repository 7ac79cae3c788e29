//! Plan list query assembly: filter resolution and page window clamping.

pub mod filter;
pub mod pagination;

pub use filter::build_plan_filter;
pub use pagination::{clamp_window, PageRequest};
