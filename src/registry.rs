use std::collections::HashMap;

use tracing::debug;

use crate::error::{HuffmanError, Result};
use crate::segmenter::Segmenter;
use crate::symbol::{Code, Symbol, SymbolBytes};

/// ASCII bytes live at fixed indices `0..ASCII_SLOTS`.
pub const ASCII_SLOTS: usize = 128;

/// Counts of every distinct symbol seen in the input.
///
/// Entries keep their registration order: the ASCII slots first, then other
/// symbols in order of first appearance, then the EOF sentinel once
/// [`SymbolRegistry::seal`] has run. That order is the tie-break used when the
/// tree is built, so it must not change between runs.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    entries: Vec<Symbol>,
    index: HashMap<SymbolBytes, usize>,
    capacity: usize,
    total: u64,
    eof: Option<usize>,
}

impl SymbolRegistry {
    pub fn new(capacity: usize) -> Self {
        let entries = (0..ASCII_SLOTS as u8)
            .map(|b| Symbol::data(SymbolBytes::single(b)))
            .collect();
        SymbolRegistry {
            entries,
            index: HashMap::new(),
            capacity,
            total: 0,
            eof: None,
        }
    }

    /// Runs the statistics pass over `data` and appends the EOF sentinel.
    pub fn from_input(data: &[u8], capacity: usize) -> Result<Self> {
        let mut registry = SymbolRegistry::new(capacity);
        for symbol in Segmenter::new(data) {
            registry.observe(symbol)?;
        }
        registry.seal()?;
        debug!(
            symbols = registry.total,
            distinct = registry.distinct(),
            "gathered symbol statistics"
        );
        Ok(registry)
    }

    pub fn observe(&mut self, bytes: SymbolBytes) -> Result<()> {
        let slot = match self.lookup(&bytes) {
            Some(slot) => slot,
            None => {
                if self.entries.len() >= self.capacity {
                    return Err(HuffmanError::Capacity {
                        capacity: self.capacity,
                    });
                }
                self.entries.push(Symbol::data(bytes));
                self.index.insert(bytes, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        self.entries[slot].count += 1;
        self.total += 1;
        Ok(())
    }

    /// Appends the EOF sentinel with count 1. Calling it again is a no-op.
    pub fn seal(&mut self) -> Result<()> {
        if self.eof.is_some() {
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(HuffmanError::Capacity {
                capacity: self.capacity,
            });
        }
        self.entries.push(Symbol::eof());
        self.eof = Some(self.entries.len() - 1);
        Ok(())
    }

    pub fn lookup(&self, bytes: &SymbolBytes) -> Option<usize> {
        match bytes.as_slice() {
            [b] if (*b as usize) < ASCII_SLOTS => Some(*b as usize),
            _ => self.index.get(bytes).copied(),
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Symbol> {
        self.entries.get(slot)
    }

    pub fn entries(&self) -> &[Symbol] {
        &self.entries
    }

    /// Slots with a nonzero count, in registration order. Includes EOF once sealed.
    pub fn live_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.count > 0)
            .map(|(i, _)| i)
    }

    pub fn eof_slot(&self) -> Option<usize> {
        self.eof
    }

    pub fn eof_code(&self) -> Option<&Code> {
        self.eof.map(|slot| &self.entries[slot].code)
    }

    pub fn code_for(&self, bytes: &SymbolBytes) -> Option<&Code> {
        self.lookup(bytes)
            .map(|slot| &self.entries[slot].code)
            .filter(|code| !code.is_empty())
    }

    pub(crate) fn set_code(&mut self, slot: usize, code: Code) {
        self.entries[slot].code = code;
    }

    /// Number of input symbols observed, not counting EOF.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Distinct symbols with a nonzero count, not counting EOF.
    pub fn distinct(&self) -> usize {
        self.entries
            .iter()
            .filter(|s| s.count > 0 && !s.is_eof())
            .count()
    }
}
