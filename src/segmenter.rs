//! Splits a byte buffer into symbols.
//!
//! A symbol is one ASCII byte, a 2-4 byte sequence that has the shape of UTF-8,
//! a 2 byte Big5 sequence, or failing all of those, a single opaque byte. Only
//! the bit patterns are checked; overlong UTF-8 and unassigned Big5 code points
//! are accepted like any other sequence of the right shape.

use crate::symbol::SymbolBytes;

/// Expected UTF-8 sequence length for a lead byte, 0 when it cannot lead one.
fn utf8_len(lead: u8) -> usize {
    match lead {
        b if b & 0x80 == 0x00 => 1,
        b if b & 0xe0 == 0xc0 => 2,
        b if b & 0xf0 == 0xe0 => 3,
        b if b & 0xf8 == 0xf0 => 4,
        _ => 0,
    }
}

fn is_utf8_continuation(b: u8) -> bool {
    b & 0xc0 == 0x80
}

fn is_big5_lead(b: u8) -> bool {
    (0x81..=0xfe).contains(&b)
}

fn is_big5_trail(b: u8) -> bool {
    (0x40..=0x7e).contains(&b) || (0xa1..=0xfe).contains(&b)
}

/// Length of the symbol at the start of `data`. Returns 0 only for empty input.
pub fn symbol_len(data: &[u8]) -> usize {
    let Some(&lead) = data.first() else {
        return 0;
    };
    if lead <= 0x7f {
        return 1;
    }

    let expected = utf8_len(lead);
    if expected > 1
        && data.len() >= expected
        && data[1..expected].iter().all(|&b| is_utf8_continuation(b))
    {
        return expected;
    }

    if is_big5_lead(lead) && data.len() >= 2 && is_big5_trail(data[1]) {
        return 2;
    }

    1
}

/// Iterator over the symbols of a buffer. Running it twice over the same
/// buffer yields the same sequence.
#[derive(Debug, Clone)]
pub struct Segmenter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Segmenter { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = SymbolBytes;

    fn next(&mut self) -> Option<SymbolBytes> {
        let rest = &self.data[self.pos..];
        let len = symbol_len(rest);
        if len == 0 {
            return None;
        }
        self.pos += len;
        SymbolBytes::new(&rest[..len])
    }
}
