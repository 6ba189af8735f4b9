//! Table-driven variable-length codes with escape extension.
//!
//! Tables are described the way JPEG describes Huffman tables: a histogram of
//! code lengths (how many codes of length 1..=16) plus the symbols in code
//! order. Canonical codes are derived from that description, so encoder and
//! decoder only need to agree on the two arrays.
//!
//! A table may reserve one escape code. Values that are not in the table are
//! written as the escape code followed by a fixed-width literal; the width is
//! set per use with [`SymbolEncoder::set_escape`] / [`SymbolDecoder::set_escape`].
//! Two more reserved symbols carry the frame markers.

use crate::bitstream::BitStreamReader;
use crate::error::CodecError;
use crate::result::Result;

/// Longest code a table may contain.
pub const MAX_CODE_LENGTH: usize = 16;

/// Escape width used before a coder is bound to a channel.
pub const DEFAULT_ESCAPE: EscapeCode = EscapeCode {
    width: 8,
    mask: 0xFF,
};

/// A code word together with its length in bits. A length of zero means
/// "no code", which the plane coders treat as a broken stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Codeword {
    pub bits: u64,
    pub length: u32,
}

impl Codeword {
    pub const NONE: Codeword = Codeword { bits: 0, length: 0 };

    pub const fn new(bits: u64, length: u32) -> Self {
        Self { bits, length }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends a `width` bit literal behind this code.
    fn extended(self, literal: u32, width: u32) -> Self {
        Self {
            bits: (self.bits << width) | u64::from(literal),
            length: self.length + width,
        }
    }
}

/// Width and mask of the fixed-length literal that follows an escape code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeCode {
    pub width: u32,
    pub mask: u32,
}

impl EscapeCode {
    /// Escape literal wide enough for every value below `count`, i.e. the
    /// smallest `k` with `2^k >= count`. Counts below one fall back to
    /// [`DEFAULT_ESCAPE`].
    pub fn for_count(count: usize) -> Self {
        if count < 1 {
            return DEFAULT_ESCAPE;
        }
        let width = usize::BITS - (count - 1).leading_zeros();
        let mask = if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        };
        Self { width, mask }
    }
}

/// Symbols a table can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VlcSymbol {
    Value(u32),
    Escape,
    EndOfPlane,
    EndOfImage,
}

/// Encoder half of an entropy coder.
pub trait SymbolEncoder {
    /// Code for `symbol`; [`Codeword::NONE`] if the symbol cannot be represented.
    fn encode(&mut self, symbol: u32) -> Codeword;

    /// The code produced by the last call to `encode`.
    fn code_word(&self) -> Codeword;

    fn set_escape(&mut self, width: u32, mask: u32);

    /// Code reserved for a frame marker, [`VlcSymbol::EndOfPlane`] or
    /// [`VlcSymbol::EndOfImage`]. `None` if the coder has no such code.
    fn marker_code(&self, marker: VlcSymbol) -> Option<Codeword>;
}

/// Outcome of reading one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Value(u32),
    /// A reserved marker code; carries the code word so callers can tell markers apart.
    Marker(Codeword),
    /// The bits match no code of the table.
    Invalid,
    /// The stream ended inside a code.
    EndOfStream,
}

/// Decoder half of an entropy coder.
pub trait SymbolDecoder {
    fn decode(&mut self, reader: &mut dyn BitStreamReader) -> Decoded;

    /// Bits taken from the stream by the last call to `decode`.
    fn bits_consumed(&self) -> u32;

    /// Whether the last call to `decode` produced a marker.
    fn marker_flag(&self) -> bool;

    fn set_escape(&mut self, width: u32, mask: u32);

    /// Code this decoder reports as [`Decoded::Marker`] for `marker`.
    fn marker_code(&self, marker: VlcSymbol) -> Option<Codeword>;
}

/// Code-length histogram plus symbols in canonical code order.
#[derive(Debug, Clone)]
pub struct VlcTable {
    code_lengths: [u8; MAX_CODE_LENGTH],
    symbols: Vec<VlcSymbol>,
    codes: Vec<Codeword>,
}

impl VlcTable {
    pub fn new(code_lengths: [u8; MAX_CODE_LENGTH], symbols: Vec<VlcSymbol>) -> Result<Self> {
        let total: usize = code_lengths.iter().map(|&n| n as usize).sum();
        if total != symbols.len() {
            return Err(CodecError::InvalidCodeTable(format!(
                "{} code lengths for {} symbols",
                total,
                symbols.len()
            )));
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbols[..i].contains(symbol) {
                return Err(CodecError::InvalidCodeTable(format!(
                    "symbol {:?} appears twice",
                    symbol
                )));
            }
        }

        let codes = derive_codes(&code_lengths)?;
        Ok(Self {
            code_lengths,
            symbols,
            codes,
        })
    }

    /// Run lengths 0..=13, an escape for longer runs and both frame markers.
    /// The all-ones 7 bit pattern is left unassigned.
    pub fn run_length() -> Result<Self> {
        use VlcSymbol::*;
        Self::new(
            [0, 1, 3, 3, 3, 4, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![
                Value(0),
                Value(1),
                Value(2),
                EndOfPlane,
                Value(3),
                Value(4),
                Escape,
                Value(5),
                Value(6),
                Value(7),
                Value(8),
                Value(9),
                Value(10),
                Value(11),
                Value(12),
                Value(13),
                EndOfImage,
            ],
        )
    }

    /// Quantizer indices 0..=7 with an escape for larger codebooks.
    pub fn index() -> Result<Self> {
        use VlcSymbol::*;
        Self::new(
            [0, 0, 6, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![
                Value(0),
                Value(1),
                Value(2),
                Value(3),
                Value(4),
                Value(5),
                Value(6),
                Value(7),
                Escape,
            ],
        )
    }

    /// Zig-zag mapped intra differentials 0..=8 with an escape.
    pub fn intra() -> Result<Self> {
        use VlcSymbol::*;
        Self::new(
            [0, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            vec![
                Value(0),
                Value(1),
                Value(2),
                Value(3),
                Value(4),
                Value(5),
                Value(6),
                Value(7),
                Value(8),
                Escape,
            ],
        )
    }

    /// Code word of `symbol`, if the table carries it.
    pub fn code_of(&self, symbol: VlcSymbol) -> Option<Codeword> {
        self.symbols
            .iter()
            .position(|s| *s == symbol)
            .map(|i| self.codes[i])
    }

    pub fn encoder(&self) -> VlcEncoder {
        VlcEncoder::new(self)
    }

    pub fn decoder(&self) -> VlcDecoder {
        VlcDecoder::new(self)
    }
}

/// Derive canonical codes from code length counts (JPEG Figure C.1 and C.2).
fn derive_codes(code_lengths: &[u8; MAX_CODE_LENGTH]) -> Result<Vec<Codeword>> {
    let mut sizes = Vec::new();
    for (len, &count) in code_lengths.iter().enumerate() {
        for _ in 0..count {
            sizes.push((len + 1) as u32);
        }
    }

    let mut codes = Vec::with_capacity(sizes.len());
    let mut code: u64 = 0;
    let mut si = sizes.first().copied().unwrap_or(0);

    for &size in &sizes {
        while si < size {
            code <<= 1;
            si += 1;
        }
        if code >= (1u64 << size) {
            return Err(CodecError::InvalidCodeTable(
                "code lengths oversubscribe the code space".to_string(),
            ));
        }
        codes.push(Codeword::new(code, size));
        code += 1;
    }

    Ok(codes)
}

/// Symbol to code lookup for one table.
#[derive(Debug, Clone)]
pub struct VlcEncoder {
    values: Vec<Option<Codeword>>,
    escape: Option<Codeword>,
    end_of_plane: Option<Codeword>,
    end_of_image: Option<Codeword>,
    escape_code: EscapeCode,
    last: Codeword,
}

impl VlcEncoder {
    pub fn new(table: &VlcTable) -> Self {
        let mut encoder = Self {
            values: Vec::new(),
            escape: None,
            end_of_plane: None,
            end_of_image: None,
            escape_code: DEFAULT_ESCAPE,
            last: Codeword::NONE,
        };

        for (symbol, &code) in table.symbols.iter().zip(table.codes.iter()) {
            match *symbol {
                VlcSymbol::Value(v) => {
                    let v = v as usize;
                    if encoder.values.len() <= v {
                        encoder.values.resize(v + 1, None);
                    }
                    encoder.values[v] = Some(code);
                }
                VlcSymbol::Escape => encoder.escape = Some(code),
                VlcSymbol::EndOfPlane => encoder.end_of_plane = Some(code),
                VlcSymbol::EndOfImage => encoder.end_of_image = Some(code),
            }
        }

        encoder
    }

}

impl SymbolEncoder for VlcEncoder {
    fn encode(&mut self, symbol: u32) -> Codeword {
        let direct = self.values.get(symbol as usize).copied().flatten();
        self.last = match (direct, self.escape) {
            (Some(code), _) => code,
            (None, Some(escape)) if symbol <= self.escape_code.mask => {
                escape.extended(symbol, self.escape_code.width)
            }
            _ => Codeword::NONE,
        };
        self.last
    }

    fn code_word(&self) -> Codeword {
        self.last
    }

    fn set_escape(&mut self, width: u32, mask: u32) {
        self.escape_code = EscapeCode { width, mask };
    }

    fn marker_code(&self, marker: VlcSymbol) -> Option<Codeword> {
        match marker {
            VlcSymbol::EndOfPlane => self.end_of_plane,
            VlcSymbol::EndOfImage => self.end_of_image,
            _ => None,
        }
    }
}

/// Bit-serial canonical decoder (JPEG Figure F.16).
#[derive(Debug, Clone)]
pub struct VlcDecoder {
    /// Largest code of each length, `None` when the length is unused.
    max_code: [Option<u64>; MAX_CODE_LENGTH + 1],
    min_code: [u64; MAX_CODE_LENGTH + 1],
    /// Index of the first symbol of each length.
    first_symbol: [usize; MAX_CODE_LENGTH + 1],
    symbols: Vec<VlcSymbol>,
    codes: Vec<Codeword>,
    escape_code: EscapeCode,
    consumed: u32,
    marker: bool,
}

impl VlcDecoder {
    pub fn new(table: &VlcTable) -> Self {
        let mut max_code = [None; MAX_CODE_LENGTH + 1];
        let mut min_code = [0; MAX_CODE_LENGTH + 1];
        let mut first_symbol = [0; MAX_CODE_LENGTH + 1];

        let mut k = 0;
        for length in 1..=MAX_CODE_LENGTH {
            let count = table.code_lengths[length - 1] as usize;
            if count > 0 {
                first_symbol[length] = k;
                min_code[length] = table.codes[k].bits;
                max_code[length] = Some(table.codes[k + count - 1].bits);
                k += count;
            }
        }

        Self {
            max_code,
            min_code,
            first_symbol,
            symbols: table.symbols.clone(),
            codes: table.codes.clone(),
            escape_code: DEFAULT_ESCAPE,
            consumed: 0,
            marker: false,
        }
    }
}

impl SymbolDecoder for VlcDecoder {
    fn decode(&mut self, reader: &mut dyn BitStreamReader) -> Decoded {
        self.consumed = 0;
        self.marker = false;

        let mut code = 0u64;
        for length in 1..=MAX_CODE_LENGTH {
            match reader.read_one_bit() {
                Ok(bit) => code = (code << 1) | u64::from(bit),
                Err(_) => return Decoded::EndOfStream,
            }
            self.consumed += 1;

            let Some(max) = self.max_code[length] else {
                continue;
            };
            if code > max {
                continue;
            }

            let k = self.first_symbol[length] + (code - self.min_code[length]) as usize;
            return match self.symbols[k] {
                VlcSymbol::Value(v) => Decoded::Value(v),
                VlcSymbol::Escape => match reader.read_bits(self.escape_code.width) {
                    Ok(literal) => {
                        self.consumed += self.escape_code.width;
                        Decoded::Value(literal as u32 & self.escape_code.mask)
                    }
                    Err(_) => Decoded::EndOfStream,
                },
                VlcSymbol::EndOfPlane | VlcSymbol::EndOfImage => {
                    self.marker = true;
                    Decoded::Marker(self.codes[k])
                }
            };
        }

        log::trace!("no code matches {:0width$b}", code, width = MAX_CODE_LENGTH);
        Decoded::Invalid
    }

    fn bits_consumed(&self) -> u32 {
        self.consumed
    }

    fn marker_flag(&self) -> bool {
        self.marker
    }

    fn set_escape(&mut self, width: u32, mask: u32) {
        self.escape_code = EscapeCode { width, mask };
    }

    fn marker_code(&self, marker: VlcSymbol) -> Option<Codeword> {
        match marker {
            VlcSymbol::EndOfPlane | VlcSymbol::EndOfImage => self
                .symbols
                .iter()
                .position(|s| *s == marker)
                .map(|k| self.codes[k]),
            _ => None,
        }
    }
}
