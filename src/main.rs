use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pictoria_notification_service::config::Settings;
use pictoria_notification_service::grpc::{NotificationGrpcService, NotificationServiceServer};
use pictoria_notification_service::server::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    // Create application state (verifies the template set, fails closed)
    let state = AppState::new(settings.clone()).await?;
    tracing::info!("Application state initialized");

    // Shutdown broadcast shared by both servers
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Start gRPC server in background
    let grpc_addr: std::net::SocketAddr = settings.grpc_addr().parse()?;
    let grpc_service = NotificationGrpcService::new(state.dispatcher.clone());
    let mut grpc_shutdown = shutdown_tx.subscribe();
    let grpc_handle = tokio::spawn(async move {
        tracing::info!("gRPC server listening on {}", grpc_addr);
        let result = tonic::transport::Server::builder()
            .add_service(NotificationServiceServer::new(grpc_service))
            .serve_with_shutdown(grpc_addr, async {
                let _ = grpc_shutdown.recv().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "gRPC server failed");
        }
    });

    // Create Axum app
    let app = create_app(state);

    // Start HTTP server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for the gRPC server to finish
    tracing::info!("Waiting for gRPC server to finish...");
    let _ = grpc_handle.await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Send shutdown signal to the gRPC server
    let _ = shutdown_tx.send(());
}
