#![allow(dead_code)]

use std::io::Cursor;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use vqcodec_core::vlc::VlcSymbol;
use vqcodec_core::{
    finish_stream, Chroma, CodebookQuantizer, CodecOptions, CodingReport, PlaneDecoder,
    PlaneEncoder, PlaneSet, StrategyKind, VlcTable,
};

pub const ALL_STRATEGIES: [StrategyKind; 5] = [
    StrategyKind::Standard,
    StrategyKind::ConstantQuality,
    StrategyKind::FastHistogram,
    StrategyKind::DeferredHistogram,
    StrategyKind::Intra,
];

/// Flat codebook for 4x4 blocks covering offsets up to +-128.
pub fn quantizer() -> CodebookQuantizer {
    CodebookQuantizer::flat_levels(16, 2, 128).unwrap()
}

/// Uniformly random 8 bit samples in every plane.
pub fn random_frame(width: usize, height: usize, seed: u64) -> PlaneSet {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut frame = PlaneSet::blank(width, height, Chroma::Yuv420, 0);
    for channel in 0..3 {
        for sample in frame.plane_mut(channel).iter_mut() {
            *sample = rng.i16(0..=255);
        }
    }
    frame
}

/// `reference` with every 4x4 block moved by its own offset plus a little noise,
/// so that blocks carry clearly different amounts of energy.
pub fn shifted_frame(reference: &PlaneSet, seed: u64) -> PlaneSet {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut frame = reference.clone();
    for channel in 0..3 {
        let plane = frame.plane_mut(channel);
        let (height, width) = plane.dim();
        let offsets: Vec<i16> = (0..((height + 3) / 4) * ((width + 3) / 4))
            .map(|_| rng.i16(-40..=40))
            .collect();
        for ((y, x), sample) in plane.indexed_iter_mut() {
            let offset = offsets[(y / 4) * ((width + 3) / 4) + x / 4];
            *sample = (*sample + offset + rng.i16(-2..=2)).clamp(0, 255);
        }
    }
    frame
}

pub struct Encoded {
    pub report: CodingReport,
    pub bytes: Vec<u8>,
    /// Per channel, which blocks were selected for the stream.
    pub coded: [Vec<bool>; 3],
}

/// The run-length table with both frame markers moved to other codes.
pub fn rearranged_run_table() -> VlcTable {
    use VlcSymbol::*;
    let mut symbols: Vec<VlcSymbol> = (0..14).map(Value).collect();
    symbols.insert(1, EndOfPlane);
    symbols.insert(6, Escape);
    symbols.insert(14, EndOfImage);
    VlcTable::new([0, 1, 3, 3, 3, 4, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0], symbols).unwrap()
}

/// Codes `source` against `reference` and leaves the reconstruction in `reference`.
pub fn encode(
    source: &PlaneSet,
    reference: &mut PlaneSet,
    options: &CodecOptions,
    quantizer: &CodebookQuantizer,
    budget: u64,
) -> Encoded {
    let runs = VlcTable::run_length().unwrap();
    encode_with_runs(source, reference, options, quantizer, budget, &runs)
}

pub fn encode_with_runs(
    source: &PlaneSet,
    reference: &mut PlaneSet,
    options: &CodecOptions,
    quantizer: &CodebookQuantizer,
    budget: u64,
    runs: &VlcTable,
) -> Encoded {
    let (indices, intra) = tables();
    let (mut run_coder, mut index_coder, mut intra_coder) =
        (runs.encoder(), indices.encoder(), intra.encoder());
    let mut writer = BitWriter::endian(Vec::new(), BigEndian);

    let (report, coded) = {
        let grids = PlaneSet::encoding_grids(
            source,
            reference,
            options.block_width,
            options.block_height,
        )
        .unwrap();
        let mut encoder = PlaneEncoder::new(grids, options).unwrap();
        encoder
            .attach_quantizer(quantizer)
            .attach_run_coder(&mut run_coder)
            .attach_index_coder(&mut index_coder)
            .attach_intra_coder(&mut intra_coder)
            .attach_writer(&mut writer);
        let report = encoder.encode(budget).unwrap();
        let coded: [Vec<bool>; 3] = encoder
            .grids()
            .each_ref()
            .map(|grid| grid.blocks().iter().map(|b| b.coded).collect());
        (report, coded)
    };

    Encoded {
        report,
        bytes: finish_stream(writer).unwrap(),
        coded,
    }
}

/// Applies `bytes` to `reference`.
pub fn decode(
    bytes: &[u8],
    reference: &mut PlaneSet,
    options: &CodecOptions,
    quantizer: &CodebookQuantizer,
    budget: u64,
) -> CodingReport {
    let runs = VlcTable::run_length().unwrap();
    decode_with_runs(bytes, reference, options, quantizer, budget, &runs)
}

pub fn decode_with_runs(
    bytes: &[u8],
    reference: &mut PlaneSet,
    options: &CodecOptions,
    quantizer: &CodebookQuantizer,
    budget: u64,
    runs: &VlcTable,
) -> CodingReport {
    let (indices, intra) = tables();
    let (mut run_decoder, mut index_decoder, mut intra_decoder) =
        (runs.decoder(), indices.decoder(), intra.decoder());
    let mut reader = BitReader::endian(Cursor::new(bytes.to_vec()), BigEndian);

    let grids = reference
        .decoding_grids(
            options.block_width,
            options.block_height,
            options.sample_range,
        )
        .unwrap();
    let mut decoder = PlaneDecoder::new(grids, options).unwrap();
    decoder
        .attach_quantizer(quantizer)
        .attach_run_decoder(&mut run_decoder)
        .attach_index_decoder(&mut index_decoder)
        .attach_intra_decoder(&mut intra_decoder)
        .attach_reader(&mut reader);
    decoder.decode(budget).unwrap()
}

fn tables() -> (VlcTable, VlcTable) {
    (VlcTable::index().unwrap(), VlcTable::intra().unwrap())
}
