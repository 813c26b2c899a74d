//! HTTP and WebSocket facade
//!
//! `POST /api/query` runs the guide pipeline (one run at a time) while
//! `/ws` subscribers receive its progress events. Generated files are served
//! back from the project directory.

mod files;
pub mod router;
pub mod state;
mod ws;

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::info;

use crate::agent::GuideGenerator;
use crate::core::{GuideError, Result};

pub use router::{build_router, QueryRequest, QueryResponse};
pub use state::{BroadcastProgress, ServeState};

/// Bind and serve until the process is stopped
pub async fn serve(generator: GuideGenerator, project_root: PathBuf) -> Result<()> {
    let config = generator.config().clone();
    let addr = config.server_addr();
    let state = ServeState::new(generator, project_root);
    let app = build_router(state, &config.server.allowed_origins);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| GuideError::with_context(format!("binding {}", addr), e))?;

    info!(%addr, "guidegen server listening");
    println!("🚀 guidegen API listening on http://{}", addr);
    println!("   WebSocket progress at ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
