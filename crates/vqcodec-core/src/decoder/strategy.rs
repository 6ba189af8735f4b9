use super::{IntraDecoding, PlaneDecoder, StandardDecoding};
use crate::encoder::CodingReport;
use crate::result::Result;
use enum_dispatch::enum_dispatch;

/// One way of reading a stream back into a plane set.
#[enum_dispatch]
pub trait DecodingStrategy {
    fn decode(&self, decoder: &mut PlaneDecoder<'_>, bit_budget: u64) -> Result<CodingReport>;
}

#[enum_dispatch(DecodingStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderStrategy {
    StandardDecoding(StandardDecoding),
    IntraDecoding(IntraDecoding),
}
