use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HuffmanError>;

#[derive(Error, Debug)]
pub enum HuffmanError {
    #[error("cannot open {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry ran out of slots for distinct symbols.
    #[error("symbols are too many (capacity {capacity})")]
    Capacity { capacity: usize },

    #[error("codebook has no EOF record")]
    MissingEof,

    #[error("codebook has more than one EOF record")]
    DuplicateEof,

    #[error("codebook code {code} collides with another code")]
    CodeConflict { code: String },

    #[error("bit {bit_offset} leads outside the code tree")]
    InvalidCode { bit_offset: u64 },

    /// The bitstream ended before a leaf (or the EOF leaf) was reached.
    #[error("encoded stream truncated after {bits_read} bits")]
    StreamTruncated { bits_read: u64 },

    #[error("symbol {bytes:02x?} was not seen while gathering statistics")]
    UnknownSymbol { bytes: Vec<u8> },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HuffmanError {
    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HuffmanError::Resource {
            path: path.into(),
            source,
        }
    }

    /// True for conditions that mean the compressed input is corrupt rather than
    /// unreadable.
    pub fn is_corrupt_input(&self) -> bool {
        matches!(
            self,
            HuffmanError::MissingEof
                | HuffmanError::DuplicateEof
                | HuffmanError::CodeConflict { .. }
                | HuffmanError::InvalidCode { .. }
                | HuffmanError::StreamTruncated { .. }
        )
    }
}
