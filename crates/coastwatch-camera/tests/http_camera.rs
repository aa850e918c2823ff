//! HTTP camera tests against a mock camera.

use std::time::Duration;

use image::{Rgb, RgbImage};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coastwatch_camera::{CameraError, CaptureMode, FrameSource, HttpCamera, HttpCameraConfig};
use coastwatch_models::{CameraHandle, Credentials};
use coastwatch_vision::Frame;

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    Frame::from_rgb(RgbImage::from_pixel(width, height, Rgb([40, 90, 160])))
        .to_jpeg(85)
        .unwrap()
}

fn mjpeg_body(frames: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for frame in frames {
        body.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(frame);
        body.extend_from_slice(b"\r\n");
    }
    body
}

fn handle_for(server: &MockServer) -> CameraHandle {
    let addr = server.address();
    CameraHandle::new("test_cam", addr.ip().to_string()).with_port(addr.port())
}

fn fast_config(mode: CaptureMode) -> HttpCameraConfig {
    let mut config = HttpCameraConfig::default().with_mode(mode);
    config.request_timeout = Duration::from_secs(2);
    config.probe_timeout = Duration::from_secs(1);
    config.snapshot_interval = Duration::from_millis(50);
    config.reconnect = config
        .reconnect
        .with_base_delay(Duration::from_millis(50))
        .with_max_delay(Duration::from_millis(200));
    config
}

async fn wait_for_frame(camera: &HttpCamera) -> Option<Frame> {
    for _ in 0..100 {
        if let Some(frame) = camera.latest() {
            return Some(frame);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}

#[tokio::test]
async fn test_check_connection_ok() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Stream)).unwrap();
    camera.check_connection().await.unwrap();
}

#[tokio::test]
async fn test_check_connection_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Stream)).unwrap();
    let err = camera.check_connection().await.unwrap_err();
    assert!(matches!(err, CameraError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_check_connection_unreachable() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let handle = CameraHandle::new("gone", "127.0.0.1").with_port(port);
    let camera = HttpCamera::new(handle, fast_config(CaptureMode::Stream)).unwrap();

    let err = camera.check_connection().await.unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_capture_snapshot_decodes_jpeg() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(jpeg(64, 48)),
        )
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Snapshot)).unwrap();
    let frame = camera.capture_snapshot().await.unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 48));
}

#[tokio::test]
async fn test_capture_snapshot_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg(32, 32)))
        .with_priority(2)
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Snapshot)).unwrap();
    let frame = camera.capture_snapshot().await.unwrap();
    assert_eq!(frame.width(), 32);
}

#[tokio::test]
async fn test_capture_snapshot_does_not_retry_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Snapshot)).unwrap();
    let err = camera.capture_snapshot().await.unwrap_err();
    assert!(matches!(err, CameraError::Http { status: 401, .. }));
}

#[tokio::test]
async fn test_corrupt_snapshot_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0x00]))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Snapshot)).unwrap();
    let err = camera.capture_snapshot().await.unwrap_err();
    assert!(matches!(err, CameraError::Decode(_)));
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;
    // "user:pass"
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let handle = handle_for(&server).with_credentials(Credentials::new("user", "pass"));
    let camera = HttpCamera::new(handle, fast_config(CaptureMode::Stream)).unwrap();
    camera.check_connection().await.unwrap();
}

#[tokio::test]
async fn test_stream_pump_publishes_frames() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "multipart/x-mixed-replace; boundary=frame")
                .set_body_bytes(mjpeg_body(&[jpeg(40, 30), b"\xFF\xD8garbage\xFF\xD9".to_vec(), jpeg(40, 30)])),
        )
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Stream)).unwrap();
    camera.start().await.unwrap();
    // second start is a no-op
    camera.start().await.unwrap();

    let frame = wait_for_frame(&camera).await.expect("no frame published");
    assert_eq!((frame.width(), frame.height()), (40, 30));
    for _ in 0..100 {
        if camera.buffer().published() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(camera.buffer().published() >= 2);

    camera.stop().await;
    assert!(!camera.is_streaming());
    assert!(camera.latest().is_none());
}

#[tokio::test]
async fn test_stream_start_fails_on_bad_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Stream)).unwrap();
    let err = camera.start().await.unwrap_err();
    assert!(matches!(err, CameraError::Http { status: 404, .. }));
    assert!(!camera.is_streaming());
    camera.stop().await;
}

#[tokio::test]
async fn test_snapshot_mode_polls_capture() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg(24, 16)))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Snapshot)).unwrap();
    camera.start().await.unwrap();
    assert!(camera.latest().is_some());
    assert!(camera.is_streaming());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(camera.buffer().published() >= 2);

    camera.stop().await;
    assert!(camera.latest().is_none());
}

#[tokio::test]
async fn test_control_and_info() {
    let server = MockServer::start().await;
    let settings = json!({"framesize": 8, "quality": 12});
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_json(&settings))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"model": "OV2640"})))
        .mount(&server)
        .await;

    let camera = HttpCamera::new(handle_for(&server), fast_config(CaptureMode::Stream)).unwrap();
    camera.set_settings(&settings).await.unwrap();
    let info = camera.info().await.unwrap();
    assert_eq!(info["model"], "OV2640");
}
