// Capability mask decoding and per-call source filtering
// Masks arrive as arbitrary-width integers or named flags and are decoded
// once per call into an immutable bitset; eligibility is an explicit
// set-membership test against the registry's bit table
//
// Numan Thabit 2026 Aug

use crate::errors::SwapError;
use crate::registry::{LiquiditySource, SourceRegistry, GLOBAL_KILL_BIT};

/// Immutable per-call disable bitset, little-endian 64-bit words. A source
/// is eligible iff none of its capability bits is set here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityMask {
    words: Vec<u64>,
}

impl CapabilityMask {
    /// The empty mask: everything enabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a caller-supplied mask string. `0x`-prefixed hex strings may
    /// be arbitrarily wide; bare decimal is accepted up to 128 bits.
    pub fn parse(input: &str) -> Result<Self, SwapError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::none());
        }
        if let Some(hex_digits) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
            return Self::from_hex(hex_digits);
        }
        let value: u128 = input.parse().map_err(|_| {
            SwapError::invalid_request(
                "disable mask must be 0x-prefixed hex or a decimal integer up to 128 bits",
            )
        })?;
        Ok(Self::from_u128(value))
    }

    pub fn from_u128(value: u128) -> Self {
        let mut mask = Self::none();
        if value == 0 {
            return mask;
        }
        mask.words = vec![value as u64, (value >> 64) as u64];
        mask.shrink();
        mask
    }

    fn from_hex(digits: &str) -> Result<Self, SwapError> {
        let padded;
        let digits = if digits.len() % 2 == 1 {
            padded = format!("0{digits}");
            &padded
        } else {
            digits
        };
        let bytes = hex::decode(digits)
            .map_err(|err| SwapError::invalid_request(format!("bad hex mask: {err}")))?;
        let mut mask = Self::none();
        // bytes are big-endian; byte j from the end is bits 8j..8j+8
        for (j, byte) in bytes.iter().rev().enumerate() {
            if *byte == 0 {
                continue;
            }
            let word = j / 8;
            if mask.words.len() <= word {
                mask.words.resize(word + 1, 0);
            }
            mask.words[word] |= (*byte as u64) << (8 * (j % 8));
        }
        Ok(mask)
    }

    /// Assemble a mask from named flags: `all`, `<family>_all`, or a
    /// registered source id.
    pub fn from_flags<S: AsRef<str>>(
        flags: &[S],
        registry: &SourceRegistry,
    ) -> Result<Self, SwapError> {
        let mut mask = Self::none();
        for flag in flags {
            let flag = flag.as_ref();
            mask.set(resolve_flag(flag, registry)?);
        }
        Ok(mask)
    }

    /// Union with another mask; used when a caller supplies both an integer
    /// mask and named flags.
    pub fn union(mut self, other: &CapabilityMask) -> Self {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, bits) in self.words.iter_mut().zip(other.words.iter()) {
            *word |= bits;
        }
        self
    }

    pub fn set(&mut self, bit: u32) {
        let word = (bit / 64) as usize;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (bit % 64);
    }

    pub fn bit(&self, bit: u32) -> bool {
        let word = (bit / 64) as usize;
        match self.words.get(word) {
            Some(bits) => bits & (1u64 << (bit % 64)) != 0,
            None => false,
        }
    }

    pub fn is_none_set(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Eligibility test: none of the source's bits (global, family, source
    /// tier) may be set.
    pub fn allows(&self, source: &LiquiditySource) -> bool {
        source.capability_bits().iter().all(|bit| !self.bit(*bit))
    }

    /// Filter the canonical source list, preserving order and canonical
    /// indices. Pure transformation, no failure modes.
    pub fn filter<'a>(
        &self,
        sources: &'a [LiquiditySource],
    ) -> Vec<(usize, &'a LiquiditySource)> {
        sources
            .iter()
            .enumerate()
            .filter(|(_, source)| self.allows(source))
            .collect()
    }

    fn shrink(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

fn resolve_flag(flag: &str, registry: &SourceRegistry) -> Result<u32, SwapError> {
    if flag == "all" {
        return Ok(GLOBAL_KILL_BIT);
    }
    if let Some(family_name) = flag.strip_suffix("_all") {
        if let Some(family) = crate::registry::SourceFamily::all()
            .into_iter()
            .find(|f| f.as_str() == family_name)
        {
            return Ok(family.bit());
        }
    }
    registry
        .sources()
        .iter()
        .find(|s| s.id.as_str() == flag)
        .map(|s| s.disable_bit)
        .ok_or_else(|| SwapError::invalid_request(format!("unknown disable flag `{flag}`")))
}
