#![allow(missing_docs)]

use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use http::{header, HeaderMap, HeaderValue};
use multipart_reader::MultipartReader;

fn benchmark_read_parts(c: &mut Criterion) {
    let length_delimited = build_body(64 * 1024, true);
    let line_delimited = build_body(64 * 1024, false);

    c.bench_function("read_64kb_part_with_content_length", |b| {
        b.iter(|| read_all(&length_delimited));
    });
    c.bench_function("read_64kb_part_line_scan", |b| {
        b.iter(|| read_all(&line_delimited));
    });
}

fn read_all(body: &[u8]) -> usize {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("multipart/form-data; boundary=BOUND"),
    );

    let mut reader =
        MultipartReader::from_reader(headers, Cursor::new(body)).expect("reader should be created");
    let mut total = 0;
    while let Some(part) = reader.next_part().expect("next part") {
        let data = part.as_body_mut().expect("leaf part").read().expect("read");
        total += data.len();
    }
    total
}

fn build_body(size: usize, with_length: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(size + 256);
    out.extend_from_slice(
        b"--BOUND\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"bench.bin\"\r\n",
    );
    if with_length {
        out.extend_from_slice(format!("Content-Length: {size}\r\n").as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    for line in 0..size / 64 {
        let fill = if line % 2 == 0 { b'x' } else { b'y' };
        out.extend(std::iter::repeat(fill).take(62));
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n--BOUND--\r\n");
    out
}

criterion_group!(benches, benchmark_read_parts);
criterion_main!(benches);
