//! Re-exports the traits needed to access a memory chip.

pub use crate::{Read as _, Write as _};
