pub mod error;
pub mod pln;
pub mod trade;
pub use error::PlnError;
pub use pln::{FormattedFigures, FormattedPln, PlnResult, TotalPln};
pub use trade::{Action, ActivityPage, Trade, TradeTime};
