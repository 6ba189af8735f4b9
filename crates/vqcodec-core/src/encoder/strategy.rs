use super::emission::emit_vectors;
use super::{
    CodingReport, CodingStatus, ConstantQuality, DeferredHistogram, FastHistogram,
    IntraPrediction, PlaneEncoder, Standard, VectorSession,
};
use crate::result::Result;
use enum_dispatch::enum_dispatch;

/// One way of turning a plane set into a stream.
#[enum_dispatch]
pub trait EncodingStrategy {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport>;
}

#[enum_dispatch(EncodingStrategy)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStrategy {
    Standard(Standard),
    ConstantQuality(ConstantQuality),
    FastHistogram(FastHistogram),
    DeferredHistogram(DeferredHistogram),
    IntraPrediction(IntraPrediction),
}

/// Block selection of the quantizer based strategies. The stream is written
/// by the shared emission step once the selection is made.
pub(crate) trait VectorSelection {
    /// Marks blocks `coded` whose run and index codes fit into `available`
    /// bits. Returns `true` if candidates were left out for lack of bits.
    fn select(&self, session: &mut VectorSession<'_, '_>, available: u64) -> bool;

    fn encode_vectors(
        &self,
        encoder: &mut PlaneEncoder<'_>,
        bit_budget: u64,
    ) -> Result<CodingReport> {
        let mut session = encoder.vector_session()?;
        let available = bit_budget.saturating_sub(session.marker_reserve());

        let limited = self.select(&mut session, available);
        let mut report = emit_vectors(&mut session, bit_budget);

        if limited && report.status == CodingStatus::Complete {
            log::warn!(
                "bit budget of {} exhausted, {:?} blocks coded",
                bit_budget,
                report.coded_blocks
            );
            report.status = CodingStatus::BudgetReached;
        }
        Ok(report)
    }
}
