// Loading candles and persisting range/profile snapshots
pub mod candle_file;
pub mod store;

// Re-export commonly used types
pub use candle_file::{load_candles, parse_candles};
pub use store::{ProfileStore, SymbolSnapshot};
