// Request-hook server loop

use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Outcome of running a request through a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The hook did not claim the request; keep going.
    Continue,
    /// The hook handled the request; stop and send this response.
    Terminate(HttpResponse),
}

/// A hook that sees every request before the fallback handler runs.
#[async_trait]
pub trait RequestHook: Send + Sync {
    async fn on_request(&self, request: &HttpRequest) -> Dispatch;
}

/// Largest request body the server will buffer, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Handler for requests no hook claimed.
pub type Fallback = Arc<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// HTTP server that runs registered hooks in order on every request.
#[derive(Clone)]
pub struct Server {
    hooks: Vec<Arc<dyn RequestHook>>,
    fallback: Fallback,
    body_limit: usize,
}

impl Server {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            fallback: Arc::new(|_| HttpResponse::not_found()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Bodies over `bytes` are refused with 413 before any hook runs.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Run a request through the hooks, then the fallback.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        for hook in &self.hooks {
            if let Dispatch::Terminate(response) = hook.on_request(&request).await {
                return response;
            }
        }
        (self.fallback)(&request)
    }

    /// Accept connections on `addr` until the process exits.
    pub async fn listen(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "beacon server listening");

        let server = Arc::new(self);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = server.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let server = server.clone();
                    async move { handle_request(req, server).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(%peer, error = ?err, "error serving connection");
                }
            });
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

async fn handle_request(
    req: Request<IncomingBody>,
    server: Arc<Server>,
) -> Result<Response<Full<bytes::Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let method = parts.method.to_string();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let mut request = HttpRequest::from_target(method, &target);

    for (name, value) in &parts.headers {
        if let Ok(value_str) = value.to_str() {
            request
                .headers
                .insert(name.as_str().to_ascii_lowercase(), value_str.to_string());
        }
    }

    request.body = match read_body(body, server.body_limit).await {
        Ok(body) => body,
        Err(response) => return Ok(into_hyper(response)),
    };

    let response = server.dispatch(request).await;
    Ok(into_hyper(response))
}

/// Buffer a request body, refusing anything over `limit` bytes.
async fn read_body<B>(body: B, limit: usize) -> Result<Vec<u8>, HttpResponse>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            debug!(limit, "request body too large");
            Err(HttpResponse::new(413))
        }
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            Err(HttpResponse::bad_request())
        }
    }
}

fn into_hyper(response: HttpResponse) -> Response<Full<bytes::Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    builder
        .body(Full::new(bytes::Bytes::from(response.body)))
        .unwrap_or_else(|err| {
            error!(error = %err, "invalid response parts");
            let mut fallback = Response::new(Full::new(bytes::Bytes::new()));
            *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Claim(&'static str);

    #[async_trait]
    impl RequestHook for Claim {
        async fn on_request(&self, request: &HttpRequest) -> Dispatch {
            if request.path == self.0 {
                Dispatch::Terminate(HttpResponse::no_content())
            } else {
                Dispatch::Continue
            }
        }
    }

    #[tokio::test]
    async fn test_hook_claims_request() {
        let server = Server::new().hook(Arc::new(Claim("/beacon")));
        let response = server.dispatch(HttpRequest::new("POST", "/beacon")).await;
        assert_eq!(response.status, 204);
    }

    #[tokio::test]
    async fn test_unclaimed_request_reaches_fallback() {
        let server = Server::new()
            .hook(Arc::new(Claim("/beacon")))
            .fallback(|_| HttpResponse::ok().with_body(b"home".to_vec()));
        let response = server.dispatch(HttpRequest::new("GET", "/")).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"home".to_vec());
    }

    #[tokio::test]
    async fn test_default_fallback_is_not_found() {
        let response = Server::default().dispatch(HttpRequest::new("GET", "/")).await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_read_body_within_limit() {
        let body = Full::new(bytes::Bytes::from_static(b"{\"csp-report\":{}}"));
        assert_eq!(read_body(body, 64).await.unwrap(), b"{\"csp-report\":{}}".to_vec());
    }

    #[tokio::test]
    async fn test_read_body_over_limit_is_refused() {
        let body = Full::new(bytes::Bytes::from(vec![b'a'; 65]));
        let response = read_body(body, 64).await.unwrap_err();
        assert_eq!(response.status, 413);
    }

    #[test]
    fn test_body_limit_builder() {
        assert_eq!(Server::new().body_limit, DEFAULT_BODY_LIMIT);
        assert_eq!(Server::new().body_limit(1024).body_limit, 1024);
    }

    #[test]
    fn test_into_hyper_keeps_status_and_headers() {
        let response = into_hyper(HttpResponse::no_content().with_header("X-A", "b"));
        assert_eq!(response.status(), 204);
        assert_eq!(response.headers().get("X-A").unwrap(), "b");
    }
}
