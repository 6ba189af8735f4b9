mod common;

use std::io::Cursor;

use bitstream_io::{BigEndian, BitReader, BitWriter};
use common::*;
use vqcodec_core::{
    Chroma, CodebookQuantizer, CodecError, CodecOptions, CodingStatus, FrameMarkers,
    PlaneDecoder, PlaneEncoder, PlaneSet, StrategyKind, VlcTable,
};

#[test]
fn should_report_desync_for_a_stream_of_ones() {
    let quantizer = quantizer();
    for strategy in [StrategyKind::Standard, StrategyKind::Intra] {
        let options = CodecOptions::default().with_strategy(strategy);
        let mut frame = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);

        let report = decode(&[0xFF; 8], &mut frame, &options, &quantizer, 1000);
        assert_eq!(report.status, CodingStatus::Desync, "{:?}", strategy);
        assert_eq!(report.total_coded(), 0);
    }
}

#[test]
fn should_stop_at_the_end_of_a_truncated_stream() {
    let reference = random_frame(32, 32, 30);
    let source = shifted_frame(&reference, 31);
    let quantizer = quantizer();

    for strategy in ALL_STRATEGIES {
        let options = CodecOptions::default().with_strategy(strategy);
        let mut reconstruction = reference.clone();
        let encoded = encode(&source, &mut reconstruction, &options, &quantizer, 100_000);
        assert_eq!(encoded.report.status, CodingStatus::Complete);

        let truncated = &encoded.bytes[..encoded.bytes.len() / 2];
        let mut decoded = reference.clone();
        let report = decode(truncated, &mut decoded, &options, &quantizer, 100_000);
        assert_eq!(report.status, CodingStatus::BudgetReached, "{:?}", strategy);
        assert!(report.bits_used <= truncated.len() as u64 * 8);
    }
}

#[test]
fn should_not_read_past_the_decoder_budget() {
    let reference = random_frame(32, 32, 32);
    let source = shifted_frame(&reference, 33);
    let quantizer = quantizer();
    let options = CodecOptions::default();

    let mut reconstruction = reference.clone();
    let encoded = encode(&source, &mut reconstruction, &options, &quantizer, 100_000);

    let mut decoded = reference.clone();
    let report = decode(&encoded.bytes, &mut decoded, &options, &quantizer, 64);
    assert_eq!(report.status, CodingStatus::BudgetReached);
    assert!(report.bits_used <= 64);
    assert!(report.total_coded() < encoded.report.total_coded());
}

#[test]
fn should_fail_without_required_collaborators() {
    let source = PlaneSet::blank(16, 16, Chroma::Yuv420, 100);
    let mut reference = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
    let runs = VlcTable::run_length().unwrap();
    let mut run_coder = runs.encoder();
    let mut writer = BitWriter::endian(Vec::new(), BigEndian);

    let grids = PlaneSet::encoding_grids(&source, &mut reference, 4, 4).unwrap();
    let mut encoder = PlaneEncoder::new(grids, &CodecOptions::default()).unwrap();
    encoder
        .attach_run_coder(&mut run_coder)
        .attach_writer(&mut writer);
    assert!(matches!(
        encoder.encode(1000),
        Err(CodecError::MissingCollaborator(_))
    ));

    encoder.set_strategy(
        CodecOptions::default()
            .with_strategy(StrategyKind::Intra)
            .encoder_strategy(),
    );
    assert!(matches!(
        encoder.encode(1000),
        Err(CodecError::MissingCollaborator("intra coder"))
    ));
}

#[test]
fn should_fail_without_a_reader() {
    let quantizer = quantizer();
    let (runs, indices) = (VlcTable::run_length().unwrap(), VlcTable::index().unwrap());
    let (mut run_decoder, mut index_decoder) = (runs.decoder(), indices.decoder());
    let mut frame = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);

    let grids = frame
        .decoding_grids(4, 4, CodecOptions::default().sample_range)
        .unwrap();
    let mut decoder = PlaneDecoder::new(grids, &CodecOptions::default()).unwrap();
    decoder
        .attach_quantizer(&quantizer)
        .attach_run_decoder(&mut run_decoder)
        .attach_index_decoder(&mut index_decoder);
    assert!(matches!(
        decoder.decode(1000),
        Err(CodecError::MissingCollaborator("bit reader"))
    ));
}

#[test]
fn should_reject_a_quantizer_of_another_block_size() {
    let source = PlaneSet::blank(16, 16, Chroma::Yuv420, 100);
    let mut reference = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
    let quantizer = CodebookQuantizer::flat_levels(8, 2, 16).unwrap();
    let (runs, indices) = (VlcTable::run_length().unwrap(), VlcTable::index().unwrap());
    let (mut run_coder, mut index_coder) = (runs.encoder(), indices.encoder());
    let mut writer = BitWriter::endian(Vec::new(), BigEndian);

    let grids = PlaneSet::encoding_grids(&source, &mut reference, 4, 4).unwrap();
    let mut encoder = PlaneEncoder::new(grids, &CodecOptions::default()).unwrap();
    encoder
        .attach_quantizer(&quantizer)
        .attach_run_coder(&mut run_coder)
        .attach_index_coder(&mut index_coder)
        .attach_writer(&mut writer);
    assert!(matches!(
        encoder.encode(1000),
        Err(CodecError::QuantizerDimensionMismatch {
            quantizer: 8,
            block: 16
        })
    ));
}

#[test]
fn should_reject_grids_of_another_block_size() {
    let mut frame = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
    let grids = frame
        .decoding_grids(2, 2, CodecOptions::default().sample_range)
        .unwrap();
    assert!(matches!(
        PlaneDecoder::new(grids, &CodecOptions::default()),
        Err(CodecError::InvalidDimensions(16, 16, 4, 4))
    ));

    let source = PlaneSet::blank(3, 8, Chroma::Yuv444, 0);
    let mut reference = source.clone();
    assert!(matches!(
        PlaneSet::encoding_grids(&source, &mut reference, 4, 0),
        Err(CodecError::InvalidDimensions(3, 8, 4, 0))
    ));
}

#[test]
fn should_read_an_empty_stream_as_budget_reached() {
    let options = CodecOptions::default();
    let quantizer = quantizer();
    let (runs, indices) = (VlcTable::run_length().unwrap(), VlcTable::index().unwrap());
    let (mut run_decoder, mut index_decoder) = (runs.decoder(), indices.decoder());
    let mut reader = BitReader::endian(Cursor::new(Vec::<u8>::new()), BigEndian);
    let mut frame = PlaneSet::blank(8, 8, Chroma::Yuv420, 128);

    let grids = frame.decoding_grids(4, 4, options.sample_range).unwrap();
    let mut decoder = PlaneDecoder::new(grids, &options).unwrap();
    decoder
        .attach_quantizer(&quantizer)
        .attach_run_decoder(&mut run_decoder)
        .attach_index_decoder(&mut index_decoder)
        .attach_reader(&mut reader);
    let report = decoder.decode(1000).unwrap();
    assert_eq!(report.status, CodingStatus::BudgetReached);
    assert_eq!(report.bits_used, 0);
}

#[test]
fn should_reject_markers_the_run_coder_does_not_use() {
    let options = CodecOptions::default().with_markers(
        FrameMarkers::of_table(&rearranged_run_table()).unwrap(),
    );
    let quantizer = quantizer();
    let (runs, indices) = (VlcTable::run_length().unwrap(), VlcTable::index().unwrap());

    let source = PlaneSet::blank(16, 16, Chroma::Yuv420, 100);
    let mut reference = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
    let (mut run_coder, mut index_coder) = (runs.encoder(), indices.encoder());
    let mut writer = BitWriter::endian(Vec::new(), BigEndian);
    let grids = PlaneSet::encoding_grids(&source, &mut reference, 4, 4).unwrap();
    let mut encoder = PlaneEncoder::new(grids, &options).unwrap();
    encoder
        .attach_quantizer(&quantizer)
        .attach_run_coder(&mut run_coder)
        .attach_index_coder(&mut index_coder)
        .attach_writer(&mut writer);
    assert!(matches!(
        encoder.encode(1000),
        Err(CodecError::MarkerMismatch {
            marker: "end-of-plane",
            ..
        })
    ));

    let (mut run_decoder, mut index_decoder) = (runs.decoder(), indices.decoder());
    let mut reader = BitReader::endian(Cursor::new(vec![0u8; 4]), BigEndian);
    let mut frame = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
    let grids = frame.decoding_grids(4, 4, options.sample_range).unwrap();
    let mut decoder = PlaneDecoder::new(grids, &options).unwrap();
    decoder
        .attach_quantizer(&quantizer)
        .attach_run_decoder(&mut run_decoder)
        .attach_index_decoder(&mut index_decoder)
        .attach_reader(&mut reader);
    assert!(matches!(
        decoder.decode(1000),
        Err(CodecError::MarkerMismatch { .. })
    ));
}
