use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::bit_io::{BitReader, BitWriter};
use crate::codebook::Codebook;
use crate::config::CodecConfig;
use crate::error::{HuffmanError, Result};
use crate::hufftree::{DecodeTree, DecodedSymbol, HuffmanTree};
use crate::registry::SymbolRegistry;
use crate::segmenter::Segmenter;

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSummary {
    pub input_bytes: u64,
    pub symbols: u64,
    pub distinct_symbols: usize,
    pub encoded_bits: u64,
    pub encoded_bytes: u64,
    pub max_code_len: usize,
    /// Shannon entropy of the symbol distribution, bits per symbol.
    pub entropy: f64,
    /// Mean code length weighted by count, bits per symbol.
    pub average_code_len: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    pub symbols: u64,
    pub output_bytes: u64,
    pub bits_read: u64,
}

/// Static Huffman encoder and decoder for mixed ASCII / UTF-8 / Big5 input.
///
/// Encoding produces two artifacts, the codebook text and the packed bits;
/// decoding needs both and nothing else.
#[derive(Debug, Clone, Default)]
pub struct HuffmanCodec {
    config: CodecConfig,
}

impl HuffmanCodec {
    pub fn new(config: CodecConfig) -> Self {
        HuffmanCodec { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Reads all of `input`, then writes its codebook and encoded bits.
    ///
    /// Nothing is written unless the statistics pass succeeds, so a
    /// capacity failure leaves both sinks empty.
    pub fn encode<R, C, E>(&self, mut input: R, codebook: C, encoded: E) -> Result<EncodeSummary>
    where
        R: Read,
        C: Write,
        E: Write,
    {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        self.encode_slice(&data, codebook, encoded)
    }

    pub fn encode_slice<C: Write, E: Write>(
        &self,
        data: &[u8],
        codebook: C,
        encoded: E,
    ) -> Result<EncodeSummary> {
        let mut registry = SymbolRegistry::from_input(data, self.config.symbol_capacity)?;
        let tree = HuffmanTree::build(&registry)?;
        let max_code_len = tree.assign_codes(&mut registry);

        Codebook::from_registry(&registry)
            .write_to(codebook, self.config.probability_precision)?;

        let mut writer = BitWriter::new(encoded);
        let mut symbols = 0u64;
        for symbol in Segmenter::new(data) {
            let code = registry
                .code_for(&symbol)
                .ok_or_else(|| HuffmanError::UnknownSymbol {
                    bytes: symbol.as_slice().to_vec(),
                })?;
            writer.write_code(code)?;
            symbols += 1;
        }
        let eof = registry.eof_code().ok_or(HuffmanError::MissingEof)?;
        writer.write_code(eof)?;
        let encoded_bits = writer.bit_count();
        let (_, encoded_bytes) = writer.finish()?;

        debug_assert_eq!(symbols, registry.total());
        let summary = EncodeSummary {
            input_bytes: data.len() as u64,
            symbols,
            distinct_symbols: registry.distinct(),
            encoded_bits,
            encoded_bytes,
            max_code_len,
            entropy: entropy(&registry),
            average_code_len: average_code_len(&registry),
        };
        info!(
            input_bytes = summary.input_bytes,
            encoded_bytes = summary.encoded_bytes,
            symbols = summary.symbols,
            distinct = summary.distinct_symbols,
            max_code_len = summary.max_code_len,
            "encoded input"
        );
        Ok(summary)
    }

    /// Returns `(codebook, encoded)` for `data`.
    pub fn encode_bytes(&self, data: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut codebook = Vec::new();
        let mut encoded = Vec::new();
        self.encode_slice(data, &mut codebook, &mut encoded)?;
        Ok((codebook, encoded))
    }

    /// Rebuilds the tree from `codebook`, then decodes `encoded` into `output`
    /// until the EOF code. Output already written before an error is kept.
    pub fn decode<C, E, W>(&self, codebook: C, encoded: E, output: W) -> Result<DecodeSummary>
    where
        C: BufRead,
        E: Read,
        W: Write,
    {
        let codebook = Codebook::read_from(codebook)?;
        let tree = codebook.decode_tree()?;
        debug!(records = codebook.entries().len(), "rebuilt decoding tree");
        Self::decode_with_tree(&tree, encoded, output)
    }

    fn decode_with_tree<E: Read, W: Write>(
        tree: &DecodeTree,
        encoded: E,
        mut output: W,
    ) -> Result<DecodeSummary> {
        let mut reader = BitReader::new(encoded);
        let mut node = DecodeTree::ROOT;
        let mut symbols = 0u64;
        let mut output_bytes = 0u64;

        loop {
            let bit = reader.read_bit()?;
            node = tree
                .step(node, bit)
                .ok_or_else(|| HuffmanError::InvalidCode {
                    bit_offset: reader.bits_read() - 1,
                })?;
            match tree.leaf(node) {
                None => continue,
                Some(DecodedSymbol::Eof) => break,
                Some(DecodedSymbol::Data(bytes)) => {
                    output.write_all(bytes)?;
                    symbols += 1;
                    output_bytes += bytes.len() as u64;
                    node = DecodeTree::ROOT;
                }
            }
        }
        output.flush()?;

        let summary = DecodeSummary {
            symbols,
            output_bytes,
            bits_read: reader.bits_read(),
        };
        info!(
            symbols = summary.symbols,
            output_bytes = summary.output_bytes,
            bits_read = summary.bits_read,
            "decoded stream"
        );
        Ok(summary)
    }

    pub fn decode_bytes(&self, codebook: &[u8], encoded: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.decode(codebook, encoded, &mut output)?;
        Ok(output)
    }

    /// Opens `input` and creates `codebook` and `encoded`, then encodes.
    pub fn encode_files(
        &self,
        input: &Path,
        codebook: &Path,
        encoded: &Path,
    ) -> Result<EncodeSummary> {
        let input_file = File::open(input).map_err(|e| HuffmanError::resource(input, e))?;
        let codebook_file =
            File::create(codebook).map_err(|e| HuffmanError::resource(codebook, e))?;
        let encoded_file = File::create(encoded).map_err(|e| HuffmanError::resource(encoded, e))?;
        self.encode(
            BufReader::new(input_file),
            BufWriter::new(codebook_file),
            BufWriter::new(encoded_file),
        )
    }

    /// Opens `codebook` and `encoded`, creates `output`, then decodes.
    pub fn decode_files(
        &self,
        output: &Path,
        codebook: &Path,
        encoded: &Path,
    ) -> Result<DecodeSummary> {
        let codebook_file =
            File::open(codebook).map_err(|e| HuffmanError::resource(codebook, e))?;
        let encoded_file = File::open(encoded).map_err(|e| HuffmanError::resource(encoded, e))?;
        let output_file = File::create(output).map_err(|e| HuffmanError::resource(output, e))?;
        self.decode(
            BufReader::new(codebook_file),
            BufReader::new(encoded_file),
            BufWriter::new(output_file),
        )
    }
}

fn entropy(registry: &SymbolRegistry) -> f64 {
    let total = registry.total();
    registry
        .entries()
        .iter()
        .filter(|s| !s.is_eof())
        .map(|s| s.probability(total) * s.self_information(total))
        .sum()
}

fn average_code_len(registry: &SymbolRegistry) -> f64 {
    let total = registry.total();
    if total == 0 {
        return 0.0;
    }
    let bits: u64 = registry
        .entries()
        .iter()
        .filter(|s| !s.is_eof())
        .map(|s| s.count * s.code.len() as u64)
        .sum();
    bits as f64 / total as f64
}
