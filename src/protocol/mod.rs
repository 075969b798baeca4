//! Shell wire protocol.
//!
//! Pure, synchronous parsers over raw byte buffers. The session loop calls
//! them in order: option skipper, line framer, tokenizer.

pub mod args;
pub mod line;
pub mod telnet;

pub use args::tokenize;
pub use line::{frame_line, LineResult};
pub use telnet::{skip_option, TelnetOption};
