use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::error::CheckError;
use crate::services::intake_service;
use crate::state::AppState;

pub async fn check_files(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, CheckError> {
    state.record_request();

    match intake_service::handle_check_request(&state, payload).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            log::error!("文件检查失败: {}", e);
            state.record_error();
            Err(e)
        }
    }
}
