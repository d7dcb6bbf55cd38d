use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use actix_web::error::InternalError;
use actix_web::{guard, middleware, web, App, HttpResponse, HttpServer};
use log::info;

use crate::core::config::ServerConfig;
use crate::hardware::ServoProfile;
use crate::web::control::ServoController;
use crate::web::handlers;
use crate::web::models::CommandResponse;

/// Start the servo HTTP API and serve until the process is stopped
pub async fn start_server(
    servo: web::Data<ServoController>,
    config: &ServerConfig,
) -> std::io::Result<()> {
    let ip = local_ip_address();
    let (min, max) = ServoProfile::Extended.range();
    info!("Servo API listening on http://{}:{}", ip, config.port);
    info!("Angle range: {} to {} degrees", min, max);
    info!("Point the control page's API base URL at http://{}:{}", ip, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_headers())
            .wrap(middleware::Logger::default())
            .app_data(servo.clone())
            .app_data(json_config())
            .configure(configure)
            .default_service(web::to(handlers::servo::fallback))
    })
    .bind((config.bind.as_str(), config.port))?
    .run()
    .await
}

/// API routes; each resource answers only its own method so everything else
/// reaches the default service
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/get_angle")
            .guard(guard::Get())
            .to(handlers::servo::get_angle),
    )
    .service(
        web::resource("/api/set_angle")
            .guard(guard::Post())
            .to(handlers::servo::set_angle),
    )
    .service(
        web::resource("/api/preset")
            .guard(guard::Post())
            .to(handlers::servo::preset),
    )
    .service(
        web::resource("/api/sweep")
            .guard(guard::Post())
            .to(handlers::servo::sweep),
    );
}

/// Browser pages served from another machine call the API directly
pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
}

/// Bodies are parsed whatever content type is declared; unparsable ones get a
/// JSON 400
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(|err, _req| {
            let response =
                HttpResponse::BadRequest().json(CommandResponse::error("invalid JSON data"));
            InternalError::from_response(err, response).into()
        })
}

/// Address of the interface holding the default route, found by connecting a
/// UDP socket (nothing is sent); loopback when there is no route
pub fn local_ip_address() -> IpAddr {
    let routed = UdpSocket::bind("0.0.0.0:0").and_then(|socket| {
        socket.connect("10.255.255.255:1")?;
        socket.local_addr()
    });
    match routed {
        Ok(addr) if !addr.ip().is_unspecified() => addr.ip(),
        _ => IpAddr::V4(Ipv4Addr::LOCALHOST),
    }
}
