use std::cmp::Ordering;
use std::fmt;

use bitvec::prelude::*;

/// A variable-length code, most significant (first emitted) bit first.
pub type Code = BitVec<u8, Msb0>;

pub const MAX_SYMBOL_LEN: usize = 4;

/// The 1 to 4 raw bytes that make up one symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolBytes {
    buf: [u8; MAX_SYMBOL_LEN],
    len: u8,
}

impl SymbolBytes {
    /// Returns `None` for an empty slice or one longer than four bytes.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > MAX_SYMBOL_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_SYMBOL_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(SymbolBytes {
            buf,
            len: bytes.len() as u8,
        })
    }

    pub fn single(byte: u8) -> Self {
        SymbolBytes {
            buf: [byte, 0, 0, 0],
            len: 1,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for SymbolBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolBytes({:02x?})", self.as_slice())
    }
}

/// Shorter symbols sort first, then by byte content.
impl Ord for SymbolBytes {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len
            .cmp(&other.len)
            .then_with(|| self.as_slice().cmp(other.as_slice()))
    }
}

impl PartialOrd for SymbolBytes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Data(SymbolBytes),
    /// Synthetic end-of-payload marker, never produced from input bytes.
    Eof,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub count: u64,
    pub code: Code,
}

impl Symbol {
    pub fn data(bytes: SymbolBytes) -> Self {
        Symbol {
            kind: SymbolKind::Data(bytes),
            count: 0,
            code: Code::new(),
        }
    }

    pub fn eof() -> Self {
        Symbol {
            kind: SymbolKind::Eof,
            count: 1,
            code: Code::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == SymbolKind::Eof
    }

    pub fn bytes(&self) -> Option<&SymbolBytes> {
        match &self.kind {
            SymbolKind::Data(bytes) => Some(bytes),
            SymbolKind::Eof => None,
        }
    }

    /// `count / total`, or 0 for an empty total.
    pub fn probability(&self, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.count as f64 / total as f64
        }
    }

    /// `-log2(p)`, with 0 standing in for an impossible symbol.
    pub fn self_information(&self, total: u64) -> f64 {
        let p = self.probability(total);
        if p > 0.0 {
            -p.log2()
        } else {
            0.0
        }
    }
}
