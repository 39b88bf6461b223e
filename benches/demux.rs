use criterion::{criterion_group, criterion_main, Criterion};
use mphotokit::{classify, Demuxer};
use std::hint::black_box;

#[path = "../tests/fixtures/mod.rs"]
mod fixtures;

fn bench_demux_jpeg(c: &mut Criterion) {
    let data = fixtures::jpeg_motion_photo(&fixtures::mp4_video(1 << 20));

    c.bench_function("demux_jpeg", |b| {
        b.iter(|| {
            let mut demuxer = Demuxer::new();
            demuxer.init(black_box(data.as_slice())).unwrap();
            black_box(demuxer.video().unwrap().len());
        });
    });
}

fn bench_demux_heic(c: &mut Criterion) {
    let data = fixtures::heic_motion_photo(&fixtures::mp4_video(1 << 20));

    c.bench_function("demux_heic", |b| {
        b.iter(|| {
            let mut demuxer = Demuxer::new();
            demuxer.init(black_box(data.as_slice())).unwrap();
            black_box(demuxer.still().unwrap().len());
        });
    });
}

fn bench_demux_microvideo(c: &mut Criterion) {
    let video = fixtures::mp4_video(1 << 20);
    let xmp = fixtures::microvideo_xmp(video.len(), 0);
    let data = fixtures::jpeg_motion_photo_with_xmp(&xmp, &video);

    c.bench_function("demux_microvideo", |b| {
        b.iter(|| {
            let mut demuxer = Demuxer::new();
            demuxer.init(black_box(data.as_slice())).unwrap();
            black_box(demuxer.info().unwrap());
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    let jpeg = fixtures::jpeg_still();
    let heic = fixtures::heic_still(None);
    let mp4 = fixtures::mp4_video(64);

    c.bench_function("classify", |b| {
        b.iter(|| {
            black_box(classify(black_box(&jpeg)));
            black_box(classify(black_box(&heic)));
            black_box(classify(black_box(&mp4)));
        });
    });
}

criterion_group!(
    benches,
    bench_demux_jpeg,
    bench_demux_heic,
    bench_demux_microvideo,
    bench_classify
);
criterion_main!(benches);
