use bitstream_io::{BigEndian, BitWriter};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use vqcodec_core::{
    Chroma, CodebookQuantizer, CodecOptions, PlaneEncoder, PlaneSet, StrategyKind, VlcTable,
};

/// 352x288 frame of random samples and a reference that differs block by block.
fn frames() -> (PlaneSet, PlaneSet) {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut source = PlaneSet::blank(352, 288, Chroma::Yuv420, 0);
    for channel in 0..3 {
        for sample in source.plane_mut(channel).iter_mut() {
            *sample = rng.i16(0..=255);
        }
    }
    let mut reference = source.clone();
    for channel in 0..3 {
        for ((y, x), sample) in reference.plane_mut(channel).indexed_iter_mut() {
            let offset = ((y / 4 * 7 + x / 4 * 3) % 41) as i16 - 20;
            *sample = (*sample + offset).clamp(0, 255);
        }
    }
    (source, reference)
}

pub fn plane_encoding(c: &mut Criterion) {
    let (source, reference) = frames();
    let quantizer = CodebookQuantizer::flat_levels(16, 2, 128).expect("flat codebook");
    let runs = VlcTable::run_length().expect("run-length table");
    let indices = VlcTable::index().expect("index table");
    let intra = VlcTable::intra().expect("intra table");

    let mut group = c.benchmark_group("Plane Encoding");
    for strategy in [
        StrategyKind::Standard,
        StrategyKind::FastHistogram,
        StrategyKind::DeferredHistogram,
        StrategyKind::Intra,
    ] {
        let options = CodecOptions::default().with_strategy(strategy);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &options,
            |b, options| {
                b.iter(|| {
                    let mut reconstruction = reference.clone();
                    let (mut run_coder, mut index_coder, mut intra_coder) =
                        (runs.encoder(), indices.encoder(), intra.encoder());
                    let mut writer = BitWriter::endian(Vec::new(), BigEndian);
                    let grids = PlaneSet::encoding_grids(&source, &mut reconstruction, 4, 4)
                        .expect("grids");
                    let mut encoder = PlaneEncoder::new(grids, options).expect("encoder");
                    encoder
                        .attach_quantizer(&quantizer)
                        .attach_run_coder(&mut run_coder)
                        .attach_index_coder(&mut index_coder)
                        .attach_intra_coder(&mut intra_coder)
                        .attach_writer(&mut writer);
                    encoder.encode(20_000).expect("Cannot encode the frame")
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, plane_encoding);
criterion_main!(benches);
