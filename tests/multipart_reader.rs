#![allow(missing_docs)]

use std::{cell::Cell, io::Cursor, rc::Rc};

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue};
use multipart_reader::{
    shared, BodyPartReader, ByteStream, DefaultFactory, HeaderError, Limits, MultipartError,
    MultipartReader, Part, ReaderConfig, ReaderFactory, SharedStream,
};

type Source = Cursor<&'static [u8]>;

fn content_type(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(value).expect("valid content type"),
    );
    headers
}

fn reader(body: &'static [u8]) -> MultipartReader<Source> {
    MultipartReader::from_reader(content_type("multipart/related;boundary=\":\""), Cursor::new(body))
        .expect("reader should be created")
}

fn body_text(part: &mut Part<Source>) -> String {
    part.as_body_mut()
        .expect("leaf part")
        .text(None)
        .expect("text should decode")
}

#[test]
fn stores_boundary_with_dashes() {
    let reader = reader(b"");
    assert_eq!(reader.boundary(), b"--:");
    assert!(!reader.at_eof());
}

#[test]
fn yields_single_part() {
    let mut reader = reader(b"--:\r\n\r\necho\r\n--:--");

    let part = reader.next_part().expect("next part").expect("part");
    assert!(!part.is_multipart());
    assert!(part.headers().is_empty());
    assert_eq!(body_text(part), "echo");

    assert!(reader.next_part().expect("next part").is_none());
    assert!(reader.at_eof());
    assert!(reader.next_part().expect("next part after eof").is_none());
}

#[test]
fn skips_preamble() {
    let mut reader = reader(b"This is a preamble.\r\n\r\n--:\r\n\r\necho\r\n--:--\r\nepilogue");

    let part = reader.next_part().expect("next part").expect("part");
    assert_eq!(body_text(part), "echo");
    assert!(reader.next_part().expect("next part").is_none());
}

#[test]
fn parses_part_headers() {
    let mut reader = reader(
        b"--:\r\nContent-Type: text/plain\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--:--",
    );

    let part = reader.next_part().expect("next part").expect("part");
    assert_eq!(part.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(part.name().as_deref(), Some("note"));
    assert_eq!(part.filename(), None);
    assert_eq!(body_text(part), "hi");
}

#[test]
fn unconsumed_parts_are_released_automatically() {
    let mut reader = reader(b"--:\r\n\r\nfirst\r\nline\r\n--:\r\n\r\nsecond\r\n--:--");

    reader.next_part().expect("next part").expect("first part");
    let part = reader.next_part().expect("next part").expect("second part");
    assert_eq!(body_text(part), "second");
    assert!(reader.next_part().expect("next part").is_none());
}

#[test]
fn partially_read_length_delimited_part_is_released() {
    let mut reader = reader(
        b"--:\r\nContent-Length: 6\r\n\r\nabcdef\r\n--:\r\nContent-Length: 3\r\n\r\nxyz\r\n--:--",
    );

    let part = reader.next_part().expect("next part").expect("first part");
    let chunk = part.as_body_mut().expect("leaf part").read_chunk(2).expect("chunk");
    assert_eq!(chunk, Bytes::from_static(b"ab"));

    let part = reader.next_part().expect("next part").expect("second part");
    assert_eq!(body_text(part), "xyz");
    assert!(reader.next_part().expect("next part").is_none());
}

#[test]
fn closing_boundary_first_means_no_parts() {
    let mut reader = reader(b"--:--\r\n");
    assert!(reader.next_part().expect("next part").is_none());
    assert!(reader.at_eof());
}

#[test]
fn rejects_stream_without_start_boundary() {
    let mut reader = reader(b"---:\r\n\r\necho\r\n---:--");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(err, MultipartError::MissingStartBoundary { boundary } if boundary == "--:"));
}

#[test]
fn rejects_empty_stream() {
    let mut reader = reader(b"");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(err, MultipartError::MissingStartBoundary { .. }));
}

#[test]
fn rejects_malformed_boundary_between_parts() {
    let mut reader = reader(b"--:\r\nContent-Length: 4\r\n\r\necho\r\ngarbage\r\n--:--");

    reader.next_part().expect("next part").expect("part");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::MalformedBoundary { found, expected } if found == "garbage" && expected == "--:"
    ));
}

#[test]
fn truncated_stream_is_incomplete() {
    let mut reader = reader(b"--:\r\n\r\necho");

    let part = reader.next_part().expect("next part").expect("part");
    assert_eq!(body_text(part), "echo");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(err, MultipartError::IncompleteStream));
}

#[test]
fn truncated_header_block_is_incomplete() {
    let mut reader = reader(b"--:\r\nContent-Type: text/plain\r\n");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(err, MultipartError::IncompleteStream));
}

#[test]
fn rejects_invalid_part_header() {
    let mut reader = reader(b"--:\r\nnot a header\r\n\r\necho\r\n--:--");
    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Header(HeaderError::InvalidHeader { .. })
    ));
}

#[test]
fn enforces_header_line_limit() {
    let body = format!("--:\r\nX-Big: {}\r\n\r\necho\r\n--:--", "a".repeat(200)).into_bytes();
    let config = ReaderConfig {
        limits: Limits {
            max_line_size: 100,
            ..Limits::default()
        },
        ..ReaderConfig::default()
    };
    let mut reader = MultipartReader::with_config(
        content_type("multipart/mixed; boundary=:"),
        shared(Cursor::new(body)),
        config,
    )
    .expect("reader should be created");

    let err = reader.next_part().expect_err("must fail");
    assert!(matches!(
        err,
        MultipartError::Header(HeaderError::LineTooLong { limit: 100 })
    ));
}

#[test]
fn requires_content_type_header() {
    let err = MultipartReader::from_reader(HeaderMap::new(), Cursor::new(&b""[..]))
        .expect_err("must fail");
    assert!(matches!(err, MultipartError::Parse(_)));
    assert!(err.to_string().contains("missing Content-Type"));
}

#[test]
fn rejects_non_multipart_content_type() {
    let err = MultipartReader::from_reader(content_type("text/plain"), Cursor::new(&b""[..]))
        .expect_err("must fail");
    assert!(matches!(err, MultipartError::Parse(_)));
}

#[test]
fn dispatches_by_content_type() {
    let reader = reader(b"");

    let part = reader
        .dispatch(content_type("text/plain"))
        .expect("dispatch should succeed");
    assert!(matches!(part, Part::Body(_)));

    let part = reader
        .dispatch(content_type("multipart/related;boundary=--:--"))
        .expect("dispatch should succeed");
    assert!(matches!(part, Part::Multipart(_)));

    let part = reader
        .dispatch(HeaderMap::new())
        .expect("dispatch should succeed");
    assert!(matches!(part, Part::Body(_)));
}

#[test]
fn nested_multipart_without_boundary_fails_dispatch() {
    let reader = reader(b"");
    let err = reader
        .dispatch(content_type("multipart/mixed"))
        .expect_err("must fail");
    assert!(matches!(err, MultipartError::Parse(_)));
}

#[test]
fn reads_nested_multipart() {
    let mut reader = reader(
        b"--:\r\nContent-Type: multipart/related;boundary=--:--\r\n\r\n\
          ----:--\r\n\r\ntest\r\n\
          ----:--\r\n\r\npassed\r\n\
          ----:----\r\n\
          --:--",
    );

    let part = reader.next_part().expect("next part").expect("part");
    let nested = part.as_multipart_mut().expect("nested reader");
    assert_eq!(nested.boundary(), b"----:--");

    let inner = nested.next_part().expect("nested part").expect("inner part");
    assert_eq!(body_text(inner), "test");
    let inner = nested.next_part().expect("nested part").expect("inner part");
    assert_eq!(body_text(inner), "passed");
    assert!(nested.next_part().expect("nested part").is_none());

    assert!(reader.next_part().expect("next part").is_none());
}

#[test]
fn skipped_nested_multipart_is_released() {
    let mut reader = reader(
        b"--:\r\nContent-Type: multipart/related;boundary=--:--\r\n\r\n\
          ----:--\r\n\r\ntest\r\n\
          ----:----\r\n\
          --:\r\n\r\nafter\r\n\
          --:--",
    );

    let part = reader.next_part().expect("next part").expect("nested part");
    assert!(part.is_multipart());

    let part = reader.next_part().expect("next part").expect("leaf part");
    assert_eq!(body_text(part), "after");
    assert!(reader.next_part().expect("next part").is_none());
}

#[test]
fn release_drains_everything() {
    let mut reader = reader(
        b"--:\r\n\r\ntest\r\n\
          --:\r\nContent-Type: multipart/related;boundary=--:--\r\n\r\n\
          ----:--\r\n\r\ninner\r\n\
          ----:----\r\n\
          --:--",
    );

    reader.release().expect("release should succeed");
    assert!(reader.at_eof());
    assert!(reader.next_part().expect("next part").is_none());
}

#[derive(Default)]
struct CountingFactory {
    bodies: Cell<usize>,
    readers: Cell<usize>,
}

impl<S: ByteStream> ReaderFactory<S> for CountingFactory {
    fn body_part_reader(
        &self,
        boundary: Bytes,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
    ) -> Result<BodyPartReader<S>, MultipartError> {
        self.bodies.set(self.bodies.get() + 1);
        DefaultFactory.body_part_reader(boundary, headers, stream, config)
    }

    fn multipart_reader(
        &self,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
        factory: Rc<dyn ReaderFactory<S>>,
    ) -> Result<MultipartReader<S>, MultipartError> {
        self.readers.set(self.readers.get() + 1);
        DefaultFactory.multipart_reader(headers, stream, config, factory)
    }
}

#[test]
fn custom_factory_builds_parts_at_every_level() {
    let mut reader = reader(
        b"--:\r\n\r\ntest\r\n\
          --:\r\nContent-Type: multipart/related;boundary=--:--\r\n\r\n\
          ----:--\r\n\r\ninner\r\n\
          ----:--\r\n\r\ninner\r\n\
          ----:----\r\n\
          --:--",
    );
    let factory = Rc::new(CountingFactory::default());
    reader.set_factory(factory.clone());

    reader.release().expect("release should succeed");
    assert_eq!(factory.readers.get(), 1);
    assert_eq!(factory.bodies.get(), 3);
}

#[test]
fn debug_output_hides_factory() {
    let reader = reader(b"");
    let debug = format!("{reader:?}");
    assert!(debug.contains("MultipartReader"));
    assert!(debug.contains("<factory>"));
}
