use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use std::str::FromStr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mafia_server::{app, state::AppState, utils::config::CONFIG};

// ログ設定
fn init_logger() {
    let level = LevelFilter::from_str(&CONFIG.log_level).unwrap_or(LevelFilter::Info);
    Builder::new()
        .filter_level(level)
        .filter_module("tower_http", level)
        .filter_module("axum", level)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    init_logger();

    let state = AppState::new();
    log::info!("game config: {:?}", state.game_config);

    // CORSレイヤーの設定
    let origin = CONFIG.allowed_origin.parse::<HeaderValue>()?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let app = app::create_app_with_state(state).layer(cors).layer(
        TraceLayer::new_for_http() // HTTPトレースログを有効化
            .make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
    );

    // サーバーの起動
    let listener = tokio::net::TcpListener::bind(&CONFIG.server_addr).await?;
    log::info!("サーバーを起動しました: http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
