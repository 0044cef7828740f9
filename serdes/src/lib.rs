mod error;
mod macros;
mod serdes;

pub use error::{SerdeError, SerdeResult};
pub use serdes::WireSerde;
pub use serdes_derive::WireSerde;
