//! Realized profit/loss of a user's token trades on Odin.
//!
//! [`pln::PlnCalculator`] pages through the user's activity feed, keeps the
//! BUY/SELL trades of one token and prices them with the average-cost method.

pub mod config;
pub mod external;
pub mod logging;
pub mod models;
pub mod pln;
pub use config::Config;
pub use pln::PlnCalculator;
