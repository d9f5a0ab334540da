//! # mbyte_huffman
//!
//! Static Huffman compression for byte streams that mix ASCII with UTF-8 or
//! Big5 text. Multibyte characters are coded as single symbols, so CJK text
//! compresses per character rather than per byte.
//!
//! Encoding is two-pass over an in-memory copy of the input and produces two
//! artifacts: a textual codebook and the packed bitstream. Decoding rebuilds
//! the tree from the codebook alone.
//!
//! ## Quick Start
//!
//! ```rust
//! use mbyte_huffman::HuffmanCodec;
//!
//! let codec = HuffmanCodec::default();
//! let text = "Huffman \u{7de8}\u{78bc} test".as_bytes();
//!
//! let (codebook, encoded) = codec.encode_bytes(text)?;
//! let decoded = codec.decode_bytes(&codebook, &encoded)?;
//! assert_eq!(decoded, text);
//! # Ok::<(), mbyte_huffman::HuffmanError>(())
//! ```

pub mod codebook;
pub mod config;
pub mod error;
pub mod huffman_codec;
pub mod hufftree;
pub mod registry;
pub mod segmenter;
pub mod symbol;

// Internal modules - not part of public API
mod bit_io;
mod min_heap;

pub use codebook::{Codebook, CodebookEntry};
pub use config::CodecConfig;
pub use error::{HuffmanError, Result};
pub use huffman_codec::{DecodeSummary, EncodeSummary, HuffmanCodec};
pub use hufftree::{DecodeTree, DecodedSymbol, HuffmanTree};
pub use registry::SymbolRegistry;
pub use segmenter::Segmenter;
pub use symbol::{Code, Symbol, SymbolBytes};
