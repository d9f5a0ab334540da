//! Textual symbol-to-code table shared by the encoder and decoder.
//!
//! One record per line:
//!
//! ```text
//! "<escaped symbol>",<count>,<probability>,<code>,<self-information>
//! ```
//!
//! The symbol is quote-wrapped with inner quotes doubled; a lone carriage
//! return, newline or tab is written as `\r`, `\n` or `\t`. The end of payload
//! marker is written as a record whose symbol is `EOF`. No real symbol can
//! collide with it since every 3 byte symbol starts with a non-ASCII byte.
//! Fields are read from the right because the symbol itself may contain commas.

use std::io::{self, BufRead, Write};

use bitvec::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{HuffmanError, Result};
use crate::hufftree::{DecodeTree, DecodedSymbol};
use crate::registry::SymbolRegistry;
use crate::symbol::{Code, SymbolBytes, MAX_SYMBOL_LEN};

const EOF_TOKEN: &[u8] = b"EOF";
const QUOTED_EOF_TOKEN: &[u8] = b"\"EOF\"";

#[derive(Debug, Clone, PartialEq)]
pub struct CodebookEntry {
    pub symbol: DecodedSymbol,
    pub count: u64,
    pub probability: f64,
    pub code: Code,
    pub self_information: f64,
}

/// A record that could not be parsed. These are skipped, not fatal.
#[derive(Error, Debug, PartialEq)]
enum RecordError {
    #[error("expected 5 comma separated fields, found {0}")]
    TooFewFields(usize),
    #[error("symbol field is not quoted")]
    Unquoted,
    #[error("symbol is empty or longer than 4 bytes")]
    BadSymbolLength,
    #[error("code must be a non-empty string of 0 and 1")]
    BadCode,
    #[error("unparsable {0} field")]
    BadNumber(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct Codebook {
    entries: Vec<CodebookEntry>,
    skipped: usize,
}

impl Codebook {
    /// Snapshot of a registry whose codes have been assigned. The EOF record
    /// comes first, the rest are sorted by count, then length, then bytes.
    pub fn from_registry(registry: &SymbolRegistry) -> Self {
        let total = registry.total();
        let mut entries = Vec::new();

        if let Some(code) = registry.eof_code() {
            entries.push(CodebookEntry {
                symbol: DecodedSymbol::Eof,
                count: 0,
                probability: 0.0,
                code: code.clone(),
                self_information: 0.0,
            });
        }

        let mut symbols: Vec<(&SymbolBytes, _)> = registry
            .entries()
            .iter()
            .filter(|s| s.count > 0)
            .filter_map(|s| s.bytes().map(|b| (b, s)))
            .collect();
        symbols.sort_by(|(ba, a), (bb, b)| {
            a.count.cmp(&b.count).then_with(|| ba.cmp(bb))
        });

        entries.extend(symbols.into_iter().map(|(bytes, s)| CodebookEntry {
            symbol: DecodedSymbol::Data(bytes.as_slice().to_vec()),
            count: s.count,
            probability: s.probability(total),
            code: s.code.clone(),
            self_information: s.self_information(total),
        }));

        Codebook {
            entries,
            skipped: 0,
        }
    }

    pub fn entries(&self) -> &[CodebookEntry] {
        &self.entries
    }

    /// Records dropped while parsing.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn eof(&self) -> Option<&CodebookEntry> {
        self.entries.iter().find(|e| e.symbol == DecodedSymbol::Eof)
    }

    pub fn write_to<W: Write>(&self, mut out: W, precision: usize) -> io::Result<()> {
        let mut line = Vec::with_capacity(64);
        for entry in &self.entries {
            line.clear();
            write_record(&mut line, entry, precision);
            out.write_all(&line)?;
        }
        out.flush()
    }

    pub fn to_bytes(&self, precision: usize) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            write_record(&mut out, entry, precision);
        }
        out
    }

    /// Parses codebook text, skipping malformed records. Fails only when no
    /// EOF record survives.
    pub fn read_from<R: BufRead>(input: R) -> Result<Self> {
        let mut codebook = Codebook::default();
        for (lineno, line) in input.split(b'\n').enumerate() {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok(entry) => codebook.entries.push(entry),
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping codebook record");
                    codebook.skipped += 1;
                }
            }
        }

        if codebook.eof().is_none() {
            return Err(HuffmanError::MissingEof);
        }
        debug!(
            records = codebook.entries.len(),
            skipped = codebook.skipped,
            "parsed codebook"
        );
        Ok(codebook)
    }

    pub fn parse(text: &[u8]) -> Result<Self> {
        Self::read_from(text)
    }

    /// Rebuilds the decoding tree from the records alone.
    pub fn decode_tree(&self) -> Result<DecodeTree> {
        let mut tree = DecodeTree::new();
        for entry in &self.entries {
            tree.insert(&entry.code, entry.symbol.clone())?;
        }
        if !tree.has_eof() {
            return Err(HuffmanError::MissingEof);
        }
        Ok(tree)
    }
}

fn write_record(out: &mut Vec<u8>, entry: &CodebookEntry, precision: usize) {
    match &entry.symbol {
        DecodedSymbol::Eof => out.extend_from_slice(QUOTED_EOF_TOKEN),
        DecodedSymbol::Data(bytes) => escape_symbol(bytes, out),
    }
    let code: String = entry.code.iter().map(|b| if *b { '1' } else { '0' }).collect();
    out.extend_from_slice(
        format!(
            ",{},{:.*},{},{:.*}\n",
            entry.count,
            precision,
            entry.probability,
            code,
            precision,
            entry.self_information
        )
        .as_bytes(),
    );
}

/// Appends the quoted, escaped form of a symbol's bytes.
pub fn escape_symbol(bytes: &[u8], out: &mut Vec<u8>) {
    match bytes {
        b"\r" => out.extend_from_slice(b"\"\\r\""),
        b"\n" => out.extend_from_slice(b"\"\\n\""),
        b"\t" => out.extend_from_slice(b"\"\\t\""),
        _ => {
            out.push(b'"');
            for &b in bytes {
                if b == b'"' {
                    out.push(b'"');
                }
                out.push(b);
            }
            out.push(b'"');
        }
    }
}

fn unescape_symbol(field: &[u8]) -> std::result::Result<DecodedSymbol, RecordError> {
    if field == EOF_TOKEN || field == QUOTED_EOF_TOKEN {
        return Ok(DecodedSymbol::Eof);
    }
    let inner = match field {
        [b'"', inner @ .., b'"'] => inner,
        _ => return Err(RecordError::Unquoted),
    };

    let bytes = match inner {
        b"\\r" => vec![b'\r'],
        b"\\n" => vec![b'\n'],
        b"\\t" => vec![b'\t'],
        _ => {
            let mut bytes = Vec::with_capacity(inner.len());
            let mut i = 0;
            while i < inner.len() {
                bytes.push(inner[i]);
                if inner[i] == b'"' && inner.get(i + 1) == Some(&b'"') {
                    i += 1;
                }
                i += 1;
            }
            bytes
        }
    };

    if bytes.is_empty() || bytes.len() > MAX_SYMBOL_LEN {
        return Err(RecordError::BadSymbolLength);
    }
    Ok(DecodedSymbol::Data(bytes))
}

fn parse_number<T: std::str::FromStr>(
    field: &[u8],
    name: &'static str,
) -> std::result::Result<T, RecordError> {
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or(RecordError::BadNumber(name))
}

fn parse_code(field: &[u8]) -> std::result::Result<Code, RecordError> {
    if field.is_empty() {
        return Err(RecordError::BadCode);
    }
    let mut code = BitVec::with_capacity(field.len());
    for &c in field {
        match c {
            b'0' => code.push(false),
            b'1' => code.push(true),
            _ => return Err(RecordError::BadCode),
        }
    }
    Ok(code)
}

fn parse_record(line: &[u8]) -> std::result::Result<CodebookEntry, RecordError> {
    let fields: Vec<&[u8]> = line.rsplitn(5, |&b| b == b',').collect();
    let [info, code, probability, count, symbol] = fields.as_slice() else {
        return Err(RecordError::TooFewFields(fields.len()));
    };

    Ok(CodebookEntry {
        symbol: unescape_symbol(symbol)?,
        count: parse_number(count, "count")?,
        probability: parse_number(probability, "probability")?,
        code: parse_code(code)?,
        self_information: parse_number(info, "self-information")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hufftree::HuffmanTree;

    fn codebook_for(input: &[u8]) -> Codebook {
        let mut registry = SymbolRegistry::from_input(input, 3000).unwrap();
        let tree = HuffmanTree::build(&registry).unwrap();
        tree.assign_codes(&mut registry);
        Codebook::from_registry(&registry)
    }

    fn escaped(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        escape_symbol(bytes, &mut out);
        out
    }

    #[test]
    fn test_aaab_text() {
        let text = codebook_for(b"AAAB").to_bytes(15);
        let expected = "\"EOF\",0,0.000000000000000,01,0.000000000000000\n\
                        \"B\",1,0.250000000000000,00,2.000000000000000\n\
                        \"A\",3,0.750000000000000,1,0.415037499278844\n";
        assert_eq!(String::from_utf8(text).unwrap(), expected);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(escaped(b"\r"), b"\"\\r\"");
        assert_eq!(escaped(b"\n"), b"\"\\n\"");
        assert_eq!(escaped(b"\t"), b"\"\\t\"");
        assert_eq!(escaped(b"\""), b"\"\"\"\"");
        assert_eq!(escaped(b","), b"\",\"");
        assert_eq!(escaped(b"\\"), b"\"\\\"");
    }

    #[test]
    fn test_every_single_byte_survives_a_record() {
        for byte in 0..=255u8 {
            let entry = CodebookEntry {
                symbol: DecodedSymbol::Data(vec![byte]),
                count: 7,
                probability: 0.5,
                code: bitvec![u8, Msb0; 1, 0, 1],
                self_information: 1.0,
            };
            let mut line = Vec::new();
            write_record(&mut line, &entry, 15);
            assert_eq!(line.last(), Some(&b'\n'));
            line.pop();
            let parsed = parse_record(&line).unwrap();
            assert_eq!(parsed.symbol, DecodedSymbol::Data(vec![byte]), "byte {byte:#04x}");
            assert_eq!(parsed.code, entry.code);
            assert_eq!(parsed.count, 7);
        }
    }

    #[test]
    fn test_multibyte_with_quote_and_comma_bytes() {
        // Big5 pairs whose trail bytes are ASCII punctuation-range
        for symbol in [vec![0xa4u8, 0x40], vec![0xa5, 0x5c], vec![0xe4, 0xb8, 0xad]] {
            let mut line = escaped(&symbol);
            line.extend_from_slice(b",1,0.1,0110,3.3");
            assert_eq!(parse_record(&line).unwrap().symbol, DecodedSymbol::Data(symbol));
        }
    }

    #[test]
    fn test_bare_and_quoted_eof() {
        let bare = parse_record(b"EOF,0,0,10,0").unwrap();
        let quoted = parse_record(b"\"EOF\",0,0,10,0").unwrap();
        assert_eq!(bare.symbol, DecodedSymbol::Eof);
        assert_eq!(quoted.symbol, DecodedSymbol::Eof);
    }

    #[test]
    fn test_malformed_records() {
        assert_eq!(
            parse_record(b"\"a\",1,0.5,01").unwrap_err(),
            RecordError::TooFewFields(4)
        );
        assert_eq!(
            parse_record(b"a,1,0.5,01,1").unwrap_err(),
            RecordError::Unquoted
        );
        assert_eq!(
            parse_record(b"\"a\",1,0.5,012,1").unwrap_err(),
            RecordError::BadCode
        );
        assert_eq!(
            parse_record(b"\"a\",1,0.5,,1").unwrap_err(),
            RecordError::BadCode
        );
        assert_eq!(
            parse_record(b"\"a\",x,0.5,01,1").unwrap_err(),
            RecordError::BadNumber("count")
        );
        assert_eq!(
            parse_record(b"\"\",1,0.5,01,1").unwrap_err(),
            RecordError::BadSymbolLength
        );
    }

    #[test]
    fn test_read_skips_bad_lines_and_handles_crlf() {
        let text = b"\"EOF\",0,0,1,0\r\ngarbage\r\n\r\n\",\",3,0.75,0,0.4\r\n";
        let codebook = Codebook::parse(text).unwrap();
        assert_eq!(codebook.entries().len(), 2);
        assert_eq!(codebook.skipped(), 1);
        assert_eq!(codebook.entries()[1].symbol, DecodedSymbol::Data(b",".to_vec()));
    }

    #[test]
    fn test_missing_eof_is_fatal() {
        let err = Codebook::parse(b"\"a\",1,1.0,0,0\n").unwrap_err();
        assert!(matches!(err, HuffmanError::MissingEof));
        let err = Codebook::parse(b"").unwrap_err();
        assert!(matches!(err, HuffmanError::MissingEof));
    }

    #[test]
    fn test_parsed_codebook_rebuilds_encoder_codes() {
        let original = codebook_for("tab\there \"quoted\", \u{4e2d}\r\n".as_bytes());
        let parsed = Codebook::parse(&original.to_bytes(15)).unwrap();
        assert_eq!(parsed.skipped(), 0);
        assert_eq!(parsed.entries().len(), original.entries().len());
        for (a, b) in original.entries().iter().zip(parsed.entries()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.code, b.code);
            assert_eq!(a.count, b.count);
        }
        parsed.decode_tree().unwrap();
    }

    #[test]
    fn test_sorted_by_count_then_length_then_bytes() {
        let codebook = codebook_for("ba\u{e9}\u{e9}bb".as_bytes());
        let symbols: Vec<_> = codebook
            .entries()
            .iter()
            .map(|e| e.symbol.clone())
            .collect();
        assert_eq!(
            symbols,
            vec![
                DecodedSymbol::Eof,
                DecodedSymbol::Data(b"a".to_vec()),
                DecodedSymbol::Data("\u{e9}".as_bytes().to_vec()),
                DecodedSymbol::Data(b"b".to_vec()),
            ]
        );
    }
}
