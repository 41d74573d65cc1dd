pub mod core;
pub mod state;

// Re-export key components
pub use core::RangeEngine;
pub use state::SymbolState;
