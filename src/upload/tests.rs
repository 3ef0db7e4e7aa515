use super::mock::MockTransport;
use super::transport::join_url;
use super::*;
use crate::config::{FramecastConfig, UploadConfig};
use crate::error::{EncodingError, TransportError};
use crate::frame::{PixelLayout, RgbBuffer};
use crate::pipeline::PipelineMetrics;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

fn create_test_upload_config() -> UploadConfig {
    FramecastConfig::default().upload
}

fn create_gray_buffer(sequence: u64, width: u32, height: u32) -> RgbBuffer {
    let len = width as usize * height as usize * PixelLayout::BYTES_PER_PIXEL;
    let mut data = vec![128u8; len];
    for px in data.chunks_exact_mut(PixelLayout::BYTES_PER_PIXEL) {
        px[3] = 255;
    }
    RgbBuffer::new(sequence, width, height, PixelLayout::Rgba, data)
}

fn create_dispatcher(transport: Arc<MockTransport>) -> (UploadDispatcher, Arc<PipelineMetrics>) {
    let metrics = Arc::new(PipelineMetrics::new());
    let dispatcher = UploadDispatcher::new(
        &create_test_upload_config(),
        transport,
        Arc::clone(&metrics),
    )
    .unwrap();
    (dispatcher, metrics)
}

#[test]
fn test_encode_jpeg_produces_jpeg() {
    let jpeg = encode_jpeg(&create_gray_buffer(0, 32, 16), 90).unwrap();

    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
}

#[test]
fn test_encode_jpeg_accepts_argb() {
    let mut rgb = create_gray_buffer(0, 8, 8);
    rgb.layout = PixelLayout::Argb;
    assert!(encode_jpeg(&rgb, 75).is_ok());
}

#[test]
fn test_encode_jpeg_rejects_empty_buffer() {
    let rgb = RgbBuffer::new(3, 0, 10, PixelLayout::Rgba, Vec::new());

    match encode_jpeg(&rgb, 90) {
        Err(EncodingError::EmptyBuffer { width, height }) => {
            assert_eq!((width, height), (0, 10));
        }
        other => panic!("Expected empty buffer error, got {:?}", other),
    }
}

#[test]
fn test_encode_jpeg_rejects_short_buffer() {
    let mut rgb = create_gray_buffer(0, 4, 4);
    rgb.data.truncate(10);

    assert!(matches!(
        encode_jpeg(&rgb, 90),
        Err(EncodingError::BufferSize {
            expected: 64,
            actual: 10
        })
    ));
}

#[test]
fn test_multipart_form_layout() {
    let form = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"JPEGDATA");
    let body = String::from_utf8(form.body().to_vec()).unwrap();
    let boundary = form.boundary().to_string();

    assert!(boundary.starts_with("framecast-"));
    assert_eq!(
        form.content_type(),
        format!("multipart/form-data; boundary={}", boundary)
    );
    assert!(body.starts_with(&format!("--{}\r\n", boundary)));
    assert!(body
        .contains("Content-Disposition: form-data; name=\"file\"; filename=\"frame.jpg\"\r\n"));
    assert!(body.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n"));
    assert!(body.ends_with(&format!("\r\n--{}--\r\n", boundary)));
}

#[test]
fn test_multipart_names_cannot_inject_headers() {
    let form = MultipartForm::single_file(
        "file\r\nX-Injected: 1",
        "frame\".jpg\nContent-Type: text/html",
        "image/jpeg",
        b"x",
    );
    let body = String::from_utf8(form.body().to_vec()).unwrap();

    assert!(!body.contains("\r\nX-Injected"));
    assert!(!body.contains("\nContent-Type: text/html"));
    assert!(body.contains(
        "name=\"file%0D%0AX-Injected: 1\"; filename=\"frame%22.jpg%0AContent-Type: text/html\"\r\n"
    ));
    let header_lines: Vec<&str> = body
        .split("\r\n")
        .filter(|line| line.starts_with("Content-"))
        .collect();
    assert_eq!(header_lines.len(), 2);
    assert_eq!(header_lines[1], "Content-Type: image/jpeg");
}

#[test]
fn test_multipart_boundaries_differ() {
    let a = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"x");
    let b = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"x");
    assert_ne!(a.boundary(), b.boundary());
}

#[test]
fn test_receipt_parsing_is_best_effort() {
    let receipt = UploadReceipt::from_body(
        r#"{"message": "ok", "scene_description": "a hallway", "audio_path": "out.mp3"}"#,
    );
    assert_eq!(receipt.scene_description.as_deref(), Some("a hallway"));
    assert_eq!(receipt.audio_path.as_deref(), Some("out.mp3"));

    let partial = UploadReceipt::from_body(r#"{"message": "ok"}"#);
    assert_eq!(partial.message.as_deref(), Some("ok"));
    assert!(partial.scene_description.is_none());

    assert_eq!(UploadReceipt::from_body("<html>"), UploadReceipt::default());
}

#[test]
fn test_join_url() {
    assert_eq!(
        join_url("http://host:5000/", "/upload-frame"),
        "http://host:5000/upload-frame"
    );
    assert_eq!(
        join_url("http://host:5000", "get-audio"),
        "http://host:5000/get-audio"
    );
    assert_eq!(join_url("http://host", ""), "http://host");
}

#[tokio::test]
async fn test_dispatch_uploads_once() {
    let transport = Arc::new(MockTransport::new());
    let (dispatcher, metrics) = create_dispatcher(Arc::clone(&transport));

    dispatcher.dispatch(create_gray_buffer(7, 16, 16));
    assert!(dispatcher.drain(Duration::from_secs(2)).await);

    assert_eq!(transport.uploaded(), vec![7]);
    let body = &transport.bodies()[0];
    assert!(body.windows(2).any(|w| w == [0xFF, 0xD8]));

    let stats = metrics.snapshot();
    assert_eq!(stats.uploads_started, 1);
    assert_eq!(stats.uploads_succeeded, 1);
    assert!(stats.bytes_uploaded > 0);
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn test_dispatch_of_empty_buffer_never_reaches_transport() {
    let transport = Arc::new(MockTransport::new());
    let (dispatcher, metrics) = create_dispatcher(Arc::clone(&transport));

    dispatcher.dispatch(RgbBuffer::new(1, 0, 0, PixelLayout::Rgba, Vec::new()));
    assert!(dispatcher.drain(Duration::from_secs(1)).await);

    assert_eq!(transport.call_count(), 0);
    let stats = metrics.snapshot();
    assert_eq!(stats.encoding_failures, 1);
    assert_eq!(stats.uploads_started, 0);
}

#[tokio::test]
async fn test_prepare_rejects_empty_buffer() {
    let (dispatcher, _) = create_dispatcher(Arc::new(MockTransport::new()));
    let result = dispatcher.prepare(&RgbBuffer::new(1, 10, 0, PixelLayout::Rgba, Vec::new()));
    assert!(matches!(result, Err(EncodingError::EmptyBuffer { .. })));

    let artifact = dispatcher.prepare(&create_gray_buffer(4, 8, 8)).unwrap();
    assert_eq!(artifact.sequence, 4);
    assert!(!artifact.is_empty());
}

#[tokio::test]
async fn test_failed_upload_is_counted_not_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.fail_frame(2);
    let (dispatcher, metrics) = create_dispatcher(Arc::clone(&transport));

    dispatcher.dispatch(create_gray_buffer(2, 8, 8));
    dispatcher.dispatch(create_gray_buffer(3, 8, 8));
    assert!(dispatcher.drain(Duration::from_secs(2)).await);

    assert_eq!(transport.call_count(), 2);
    assert_eq!(transport.uploaded(), vec![3]);
    let stats = metrics.snapshot();
    assert_eq!(stats.uploads_failed, 1);
    assert_eq!(stats.uploads_succeeded, 1);
    assert_eq!(stats.uploads_in_flight(), 0);
}

#[tokio::test]
async fn test_dispatch_does_not_wait_for_slow_upload() {
    let transport = Arc::new(MockTransport::new());
    transport.delay_frame(1, Duration::from_millis(300));
    let (dispatcher, _) = create_dispatcher(Arc::clone(&transport));

    let started = tokio::time::Instant::now();
    dispatcher.dispatch(create_gray_buffer(1, 8, 8));
    dispatcher.dispatch(create_gray_buffer(2, 8, 8));
    assert!(started.elapsed() < Duration::from_millis(250));

    assert!(dispatcher.drain(Duration::from_secs(2)).await);
    // The slow upload finishes last
    assert_eq!(transport.uploaded(), vec![2, 1]);
}

#[tokio::test]
async fn test_drain_gives_up_after_timeout() {
    let transport = Arc::new(MockTransport::new());
    transport.delay_frame(1, Duration::from_secs(5));
    let (dispatcher, _) = create_dispatcher(Arc::clone(&transport));

    dispatcher.dispatch(create_gray_buffer(1, 8, 8));
    assert!(!dispatcher.drain(Duration::from_millis(50)).await);
    assert_eq!(dispatcher.in_flight(), 1);
}

#[tokio::test]
async fn test_fetch_audio_goes_through_transport() {
    let transport = Arc::new(MockTransport::with_audio(b"ID3audio"));
    let (dispatcher, _) = create_dispatcher(transport);

    assert_eq!(dispatcher.fetch_audio().await.unwrap(), b"ID3audio".to_vec());
}

#[test]
fn test_dispatcher_requires_runtime() {
    let result = UploadDispatcher::new(
        &create_test_upload_config(),
        Arc::new(MockTransport::new()),
        Arc::new(PipelineMetrics::new()),
    );
    assert!(result.is_err());
}

/// Serve a single HTTP request on loopback and hand back the raw request
fn serve_once(status_line: &'static str, body: &'static [u8]) -> (String, std::thread::JoinHandle<Vec<u8>>) {
    serve_with_length(status_line, body.len(), body)
}

/// Like `serve_once`, but announce `content_length` whatever the body holds
fn serve_with_length(
    status_line: &'static str,
    content_length: usize,
    body: &'static [u8],
) -> (String, std::thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line, content_length
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(body).unwrap();
        stream.flush().unwrap();
        request
    });

    (format!("http://{}", addr), handle)
}

fn read_request(stream: &mut std::net::TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }

    buf
}

fn create_http_transport(base_url: String) -> HttpTransport {
    let mut config = create_test_upload_config();
    config.base_url = base_url;
    config.timeout_ms = 5000;
    HttpTransport::new(&config)
}

#[tokio::test]
async fn test_http_transport_posts_multipart_frame() {
    let (base_url, server) = serve_once(
        "200 OK",
        br#"{"message": "Frame received", "scene_description": "a desk"}"#,
    );
    let transport = create_http_transport(base_url);

    let form = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"\xFF\xD8JPEG\xFF\xD9");
    let boundary = form.boundary().to_string();
    let receipt = transport.upload_frame(11, form).await.unwrap();
    assert_eq!(receipt.scene_description.as_deref(), Some("a desk"));

    let request = String::from_utf8_lossy(&server.join().unwrap()).to_string();
    assert!(request.starts_with("POST /upload-frame HTTP/1.1\r\n"));
    assert!(request
        .to_lowercase()
        .contains(&format!("content-type: multipart/form-data; boundary={}", boundary)));
    assert!(request.contains("filename=\"frame.jpg\""));
}

#[tokio::test]
async fn test_http_transport_counts_2xx_with_truncated_body_as_delivered() {
    let (base_url, server) = serve_with_length("200 OK", 100, b"{\"me");
    let transport = create_http_transport(base_url);

    let form = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"x");
    let receipt = transport.upload_frame(5, form).await.unwrap();
    assert_eq!(receipt, UploadReceipt::default());
    server.join().unwrap();
}

#[tokio::test]
async fn test_http_transport_reports_error_status() {
    let (base_url, server) = serve_once("500 Internal Server Error", b"model offline");
    let transport = create_http_transport(base_url);

    let form = MultipartForm::single_file("file", "frame.jpg", "image/jpeg", b"x");
    match transport.upload_frame(1, form).await {
        Err(TransportError::Status { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "model offline");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
    server.join().unwrap();
}

#[tokio::test]
async fn test_http_transport_reports_unreachable_server() {
    // Bind then drop so the port is very likely closed
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let transport = create_http_transport(format!("http://{}", addr));

    let result = transport.fetch_audio().await;
    assert!(matches!(result, Err(TransportError::Request { .. })));
}

#[tokio::test]
async fn test_http_transport_fetches_audio() {
    let (base_url, server) = serve_once("200 OK", b"ID3\x04audio-bytes");
    let transport = create_http_transport(base_url);

    let audio = transport.fetch_audio().await.unwrap();
    assert_eq!(audio, b"ID3\x04audio-bytes".to_vec());

    let request = String::from_utf8_lossy(&server.join().unwrap()).to_string();
    assert!(request.starts_with("POST /get-audio HTTP/1.1\r\n"));
}
