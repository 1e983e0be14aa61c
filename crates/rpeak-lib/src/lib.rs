pub mod conditioning;
pub mod detectors;
pub mod error;
pub mod io;
pub mod signal;

pub use detectors::*;
pub use error::{DetectError, Result};
pub use signal::*;
