use actix_web::HttpResponse;

// 存活探针：固定返回 ["OK"]，无副作用
pub async fn app_status() -> HttpResponse {
    HttpResponse::Ok().json(["OK"])
}
