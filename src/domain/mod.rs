// Domain types and value objects
pub mod candle;
pub mod label;

// Re-export commonly used types
pub use candle::{Candle, DateFilter, candles_in_span, closed_candles};
pub use label::{alpha_label, next_unused_label};
