mod config;
mod error;
mod models;

mod state;
mod handlers;
mod utils;
pub mod services;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io::Result;
use std::sync::Arc;

use services::checker_service::JarFileChecker;

#[actix_web::main]
async fn main() -> Result<()> {
    // 初始化日志
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // 初始化配置
    let config = config::ServerConfig::new();
    config.init_directories().await?;

    // 创建应用状态
    let checker = Arc::new(JarFileChecker::from_config(&config));
    let app_state = state::AppState::new(config.clone(), checker);

    // 保留请求目录时才需要后台清理
    if config.keep_request_dirs {
        tokio::spawn(services::cleanup_service::start_background_cleanup(config.clone()));
    }

    log::info!("启动文件检查服务...");
    config.log_config();
    println!("服务器运行在：http://{}:{}{}", config.address, config.port, config.root_path);

    let stats_state = app_state.clone();
    let root_path = config.root_path.clone();
    let server = HttpServer::new(move || {
        let root_path = root_path.clone();
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(Logger::default())
            .configure(move |cfg| handlers::configure_routes(cfg, &root_path))
    })
    .bind(format!("{}:{}", config.address, config.port))?
    .run();

    // 设置优雅关闭
    let server_handle = server.handle();
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("无法监听 CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("接收到关闭信号");
    };

    tokio::select! {
        result = server => {
            log::info!("服务器正常退出");
            result?;
        }
        _ = shutdown_signal => {
            log::info!("开始优雅关闭流程");
            // 排队等待检查的请求直接返回 503
            stats_state.check_semaphore.close();
            server_handle.stop(true).await;
            services::cleanup_service::graceful_shutdown(&config).await;
        }
    }

    log::info!("请求统计: {}", stats_state.get_stats());
    Ok(())
}
