//! Regcheck --- Validate hardware register maps and keep HDL address constants and generated
//! headers in sync with them.

// Export full API at crate root
pub use api::*;

mod analysis;
mod api;
mod codegen;
mod error;
mod frontend;
mod model;
mod reconcile;
mod util;
