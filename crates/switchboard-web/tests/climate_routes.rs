use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use switchboard_core::simulated::{SimulatedClimateSensor, SimulatedLines};
use switchboard_core::{ClimateConfig, ClimateDevice, PinId};
use switchboard_web::create_climate_router;
use tower::ServiceExt;

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_sensor_reports_latest_sample() {
    let mut device = ClimateDevice::new(
        &ClimateConfig::default(),
        Box::new(SimulatedClimateSensor::new()),
        Box::new(SimulatedLines::new()),
    )
    .unwrap();
    device.tick(Instant::now());
    let expected = device.monitor.reading();
    let app = create_climate_router(Arc::new(Mutex::new(device)));

    let (status, body) = get(&app, "/sensor").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["temperature"].as_f64().unwrap() as f32, expected.temperature);
    assert_eq!(json["humidity"].as_f64().unwrap() as f32, expected.humidity);
}

#[tokio::test]
async fn test_toggle_led_alternates() {
    let lines = SimulatedLines::new();
    let device = ClimateDevice::new(
        &ClimateConfig::default(),
        Box::new(SimulatedClimateSensor::new()),
        Box::new(lines.clone()),
    )
    .unwrap();
    let app = create_climate_router(Arc::new(Mutex::new(device)));

    assert_eq!(get(&app, "/toggleLED").await, (StatusCode::OK, "ON".to_string()));
    assert_eq!(lines.level(PinId(2)), Some(true));
    assert_eq!(get(&app, "/toggleLED").await, (StatusCode::OK, "OFF".to_string()));
    assert_eq!(lines.level(PinId(2)), Some(false));
}

#[tokio::test]
async fn test_dashboard_polls_sensor() {
    let app = create_climate_router(Arc::new(Mutex::new(
        ClimateDevice::new(
            &ClimateConfig::default(),
            Box::new(SimulatedClimateSensor::new()),
            Box::new(SimulatedLines::new()),
        )
        .unwrap(),
    )));

    let (status, body) = get(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("/sensor"));
    assert!(body.contains("/toggleLED"));
}
