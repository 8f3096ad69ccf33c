//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every path to the dispatch table
//! - Wire up the middleware pipeline according to configuration
//! - Serve on a plain or TLS listener until shutdown is triggered

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::from_fn_with_state,
    response::Response,
    routing::any,
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::compression::CompressionPools;
use crate::config::ServerConfig;
use crate::http::middleware::{
    basic_auth, compress, flush_body, request_log, tee_body, BasicAuth, Compress, RequestLog, TeeBody,
};
use crate::lifecycle::Shutdown;
use crate::net::Listener;
use crate::observability::{SharedSink, StdoutSink};
use crate::routing::Dispatch;

const NO_CACHE: &str = "private, max-age=0, no-cache";

/// How long TLS connections may drain after shutdown is triggered.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Where the access log and body dumps go.
#[derive(Clone, Debug)]
pub struct Outputs {
    pub access: SharedSink,
    pub body: SharedSink,
}

impl Default for Outputs {
    fn default() -> Self {
        Self {
            access: Arc::new(StdoutSink),
            body: Arc::new(StdoutSink),
        }
    }
}

/// The content server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Wrap `dispatch` in the pipeline `config` asks for.
    pub fn new(
        config: &ServerConfig,
        dispatch: Dispatch,
        pools: Arc<CompressionPools>,
        outputs: Outputs,
    ) -> Self {
        let router = Self::build_router(config, Arc::new(dispatch), pools, outputs);
        Self { router }
    }

    /// Build the Axum router with all middleware layers; the last layer
    /// added is the outermost.
    fn build_router(
        config: &ServerConfig,
        dispatch: Arc<Dispatch>,
        pools: Arc<CompressionPools>,
        outputs: Outputs,
    ) -> Router {
        let pipeline = &config.pipeline;
        let mut router = Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(dispatch);

        if pipeline.tee_body {
            let limit = usize::try_from(config.uploads.max_size).unwrap_or(usize::MAX);
            router = router
                .layer(from_fn_with_state(limit, flush_body))
                .layer(from_fn_with_state(TeeBody::new(outputs.body), tee_body));
        }
        if pipeline.log_requests {
            router = router.layer(from_fn_with_state(RequestLog::new(outputs.access), request_log));
        }
        if let Some(credentials) = &pipeline.auth {
            match BasicAuth::parse(credentials) {
                Some(auth) => router = router.layer(from_fn_with_state(auth, basic_auth)),
                None => tracing::warn!("auth credentials lack ':', authentication disabled"),
            }
        }
        if pipeline.compress {
            router = router.layer(from_fn_with_state(Compress::new(pools), compress));
        }

        router = router.layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ));
        if !pipeline.server_id.is_empty() {
            match HeaderValue::from_str(&pipeline.server_id) {
                Ok(id) => router = router.layer(SetResponseHeaderLayer::overriding(header::SERVER, id)),
                Err(_) => tracing::warn!(server_id = %pipeline.server_id, "server id is not a header value"),
            }
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// The assembled router, for driving requests without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: Listener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = listener.is_tls(), "HTTP server starting");

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match listener {
            Listener::Plain(listener) => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop.recv().await;
                    })
                    .await?;
            }
            Listener::Tls(listener, tls) => {
                let handle = axum_server::Handle::new();
                let trigger = handle.clone();
                tokio::spawn(async move {
                    let _ = stop.recv().await;
                    trigger.graceful_shutdown(Some(TLS_DRAIN));
                });
                axum_server::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(dispatch): State<Arc<Dispatch>>, request: Request<Body>) -> Response {
    dispatch.dispatch(request).await
}
