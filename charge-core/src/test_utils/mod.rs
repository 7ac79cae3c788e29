pub mod helpers;
pub mod memory;
