//! Shared seams and types
//!
//! The repository and clock traits the engine is written against, plus the
//! account type they exchange.

pub mod clock;
pub mod traits;
pub mod types;

pub use clock::{ManualClock, SystemClock};
pub use traits::{CasinoRepository, Clock};
pub use types::UserAccount;
