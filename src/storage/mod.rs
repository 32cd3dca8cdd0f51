//! Embedded stores consumed by the evaluator.

mod dark_horse;

pub use dark_horse::{DarkHorseRecord, DarkHorseStore};
