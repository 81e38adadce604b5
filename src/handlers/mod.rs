pub mod check_handlers;
pub mod system_handlers;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig, root_path: &str) {
    cfg.service(
        web::scope(root_path)
            .route("/", web::get().to(system_handlers::app_status))
            .route("/check-files", web::post().to(check_handlers::check_files)),
    );
}
