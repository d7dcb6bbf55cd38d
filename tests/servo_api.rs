//! Servo HTTP API exercised through actix's test service

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use vent_station::core::DeviceError;
use vent_station::hardware::VentActuator;
use vent_station::web::handlers::servo::fallback;
use vent_station::web::{configure, cors_headers, json_config, ServoController};

#[derive(Default)]
struct Moves {
    angles: Vec<i32>,
    releases: usize,
}

struct FakeServo(Arc<Mutex<Moves>>);

impl VentActuator for FakeServo {
    fn move_to(&mut self, angle: i32) -> Result<Duration, DeviceError> {
        self.0.lock().unwrap().angles.push(angle);
        Ok(Duration::from_micros(1500))
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        self.0.lock().unwrap().releases += 1;
        Ok(())
    }
}

fn controller() -> (web::Data<ServoController>, Arc<Mutex<Moves>>) {
    let moves = Arc::new(Mutex::new(Moves::default()));
    let controller = web::Data::new(ServoController::new(
        Box::new(FakeServo(moves.clone())),
        Duration::ZERO,
    ));
    (controller, moves)
}

/// Build the app the way the server does, around a fake servo
macro_rules! servo_app {
    () => {{
        let (controller, moves) = controller();
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .app_data(controller)
                .app_data(json_config())
                .configure(configure)
                .default_service(web::to(fallback)),
        )
        .await;
        (app, moves)
    }};
}

fn post(uri: &str, body: Value) -> test::TestRequest {
    test::TestRequest::post().uri(uri).set_json(body)
}

#[actix_web::test]
async fn get_angle_starts_centred() {
    let (app, _moves) = servo_app!();
    let req = test::TestRequest::get().uri("/api/get_angle").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Methods").unwrap(),
        "GET, POST, OPTIONS"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"angle": 90}));
}

#[actix_web::test]
async fn set_angle_moves_and_releases() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({"angle": 45})).to_request()).await;
    assert_eq!(body, json!({"status": "success", "angle": 45}));

    let req = test::TestRequest::get().uri("/api/get_angle").to_request();
    let current: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(current, json!({"angle": 45}));

    let moves = moves.lock().unwrap();
    assert_eq!(moves.angles, vec![45]);
    assert_eq!(moves.releases, 1);
}

#[actix_web::test]
async fn set_angle_accepts_floats_and_strings() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({"angle": 45.7})).to_request()).await;
    assert_eq!(body["angle"], json!(45));
    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({"angle": "-100"})).to_request()).await;
    assert_eq!(body["angle"], json!(-100));

    assert_eq!(moves.lock().unwrap().angles, vec![45, -100]);
}

#[actix_web::test]
async fn set_angle_defaults_to_centre() {
    let (app, _moves) = servo_app!();
    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({})).to_request()).await;
    assert_eq!(body, json!({"status": "success", "angle": 90}));
}

#[actix_web::test]
async fn set_angle_out_of_range_is_an_error_reply() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({"angle": 300})).to_request()).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "angle must be between -100 and 270"})
    );
    assert!(moves.lock().unwrap().angles.is_empty());
}

#[actix_web::test]
async fn preset_positions() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/preset", json!({"position": "far_right"})).to_request()).await;
    assert_eq!(
        body,
        json!({"status": "success", "angle": 270, "position": "far_right"})
    );

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/preset", json!({"position": "sideways"})).to_request()).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "invalid preset position"})
    );

    assert_eq!(moves.lock().unwrap().angles, vec![270]);
}

#[actix_web::test]
async fn sweep_steps_through_range() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/sweep", json!({"start": 40, "end": 0, "step": 20, "delay": 0})).to_request()).await;
    assert_eq!(body, json!({"status": "success", "start": 40, "end": 0}));

    let moves = moves.lock().unwrap();
    assert_eq!(moves.angles, vec![40, 20, 0]);
    assert_eq!(moves.releases, 1);
}

#[actix_web::test]
async fn sweep_validates_arguments() {
    let (app, moves) = servo_app!();

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/sweep", json!({"start": -101, "delay": 0})).to_request()).await;
    assert_eq!(body["status"], json!("error"));

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/sweep", json!({"step": 0, "delay": 0})).to_request()).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "step must be a positive integer"})
    );

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/sweep", json!({"delay": -1})).to_request()).await;
    assert_eq!(body["status"], json!("error"));

    assert!(moves.lock().unwrap().angles.is_empty());
}

#[actix_web::test]
async fn wrongly_typed_fields_are_error_replies() {
    let (app, moves) = servo_app!();

    let resp = test::call_service(&app, post("/api/preset", json!({"position": 5})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "invalid preset position"})
    );

    let resp = test::call_service(&app, post("/api/set_angle", json!({"angle": null})).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "invalid angle value: null"})
    );

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/set_angle", json!({"angle": true})).to_request()).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "invalid angle value: true"})
    );

    let body: Value =
        test::call_and_read_body_json(&app, post("/api/sweep", json!({"step": {"by": 5}})).to_request()).await;
    assert_eq!(body["status"], json!("error"));

    assert!(moves.lock().unwrap().angles.is_empty());
}

#[actix_web::test]
async fn malformed_json_is_bad_request() {
    let (app, _moves) = servo_app!();
    let req = test::TestRequest::post()
        .uri("/api/set_angle")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"angle\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.headers().get("Access-Control-Allow-Origin").unwrap(),
        "*"
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"status": "error", "message": "invalid JSON data"}));
}

#[actix_web::test]
async fn unknown_route_is_not_found() {
    let (app, _moves) = servo_app!();

    for req in [
        test::TestRequest::get().uri("/api/reboot").to_request(),
        test::TestRequest::get().uri("/api/set_angle").to_request(),
        test::TestRequest::post().uri("/index.html").to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], json!("error"));
    }
}

#[actix_web::test]
async fn preflight_is_answered_everywhere() {
    let (app, _moves) = servo_app!();

    for uri in ["/api/set_angle", "/anything"] {
        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri(uri)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Headers").unwrap(),
            "Content-Type"
        );
    }
}
