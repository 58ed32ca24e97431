//! Domain types for breakscan

pub mod bar;
pub mod ids;

pub use bar::{Bar, TickerFrame};
pub use ids::{DatasetHash, Ticker};
