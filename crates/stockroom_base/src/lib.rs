// stockroom_base provides the foundational error handling, tracing setup and
// platform abstraction used across all crates. Keeping these in one leaf crate
// ensures consistent error handling and prevents circular dependencies.

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, StockroomError, StockroomResult};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};
