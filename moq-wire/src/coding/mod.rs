//! Encoding primitives and buffered stream I/O.

mod decode;
mod encode;
mod reader;
mod stream;
mod writer;

pub use decode::*;
pub use encode::*;
pub use reader::*;
pub use stream::*;
pub use writer::*;
