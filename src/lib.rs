pub mod bitstreams;
pub mod config;
pub mod error;
pub mod huffman;
pub mod section;

pub use config::CodecConfig;
pub use error::{CodecError, Result};
pub use section::{read_section, write_section, SectionSummary};
