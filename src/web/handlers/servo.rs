use std::time::Duration;

use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::warn;

use crate::core::error::ServoCommandError;
use crate::web::control::ServoController;
use crate::web::models::{
    AngleResponse, CommandResponse, PresetRequest, SetAngleRequest, SweepRequest,
};

/// Current servo angle
pub async fn get_angle(servo: web::Data<ServoController>) -> impl Responder {
    HttpResponse::Ok().json(AngleResponse {
        angle: servo.angle().await,
    })
}

/// Move the servo to an absolute angle
pub async fn set_angle(
    servo: web::Data<ServoController>,
    request: web::Json<SetAngleRequest>,
) -> impl Responder {
    let result = async {
        let angle = request.angle.to_angle()?;
        let angle = servo.set_angle(angle).await?;
        Ok::<_, ServoCommandError>(CommandResponse::angle(angle))
    }
    .await;
    reply(result)
}

/// Move the servo to a named position
pub async fn preset(
    servo: web::Data<ServoController>,
    request: web::Json<PresetRequest>,
) -> impl Responder {
    let result = async {
        let name = request.name().ok_or(ServoCommandError::UnknownPreset)?;
        let angle = servo.preset(name).await?;
        Ok::<_, ServoCommandError>(CommandResponse::preset(angle, name))
    }
    .await;
    reply(result)
}

/// Sweep the servo between two angles
pub async fn sweep(
    servo: web::Data<ServoController>,
    request: web::Json<SweepRequest>,
) -> impl Responder {
    let result = async {
        let start = request.start.to_angle()?;
        let end = request.end.to_angle()?;
        let step = request.step.to_angle()?;
        let delay = Duration::try_from_secs_f64(request.delay.to_seconds()?)
            .map_err(|_| ServoCommandError::InvalidDelay)?;
        let (start, end) = servo.sweep(start, end, step, delay).await?;
        Ok::<_, ServoCommandError>(CommandResponse::sweep(start, end))
    }
    .await;
    reply(result)
}

/// Anything no route claimed: CORS preflight succeeds, the rest is a 404
pub async fn fallback(req: HttpRequest) -> impl Responder {
    if req.method() == Method::OPTIONS {
        return HttpResponse::Ok().finish();
    }
    HttpResponse::NotFound().json(CommandResponse::error(format!(
        "no such endpoint: {} {}",
        req.method(),
        req.path()
    )))
}

fn reply(result: Result<CommandResponse, ServoCommandError>) -> HttpResponse {
    if let Err(e) = &result {
        warn!("Servo command rejected: {}", e);
    }
    HttpResponse::Ok().json(CommandResponse::from(result))
}
