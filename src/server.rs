//! HTTP Server
//!
//! Every request, whatever its method or path, lands on one fallback route
//! that hands it to the [`RequestHandler`]. Connection management (framing,
//! keep-alive, pipelining, chunked bodies) is left to axum and hyper.

use crate::handler::{Reply, RequestHandler};
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Uri};
use axum::Router;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::debug;

/// Builds the router: a single catch-all route backed by `handler`.
pub fn router(handler: RequestHandler) -> Router {
    Router::new().fallback(serve_request).with_state(handler)
}

async fn serve_request(
    State(handler): State<RequestHandler>,
    client: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Reply {
    let reply = handler.dispatch(&method, uri.path(), body).await;
    debug!(
        client = ?client.map(|ConnectInfo(addr)| addr),
        %method,
        %uri,
        outcome = ?reply.outcome,
        "Handled request"
    );
    reply
}

/// Serves `handler` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, handler: RequestHandler, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(handler).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::CONTENT_TYPE;
    use crate::storage::Store;
    use axum::body::to_bytes;
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Bytes) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            CONTENT_TYPE
        );
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_router_put_get_delete() {
        let store = Arc::new(Store::new());
        let app = router(RequestHandler::new(Arc::clone(&store)));

        let (status, body) = send(&app, "PUT", "/newkey", "newvalue").await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.is_empty());
        assert_eq!(store.get(b"newkey"), Some(Bytes::from("newvalue")));

        let (status, body) = send(&app, "GET", "/newkey", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from("newvalue"));

        let (status, body) = send(&app, "DELETE", "/newkey", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, body) = send(&app, "GET", "/newkey", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_router_error_statuses() {
        let app = router(RequestHandler::new(Arc::new(Store::new())));

        for method in ["GET", "PUT", "DELETE"] {
            let (status, body) = send(&app, method, "/", "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{} /", method);
            assert_eq!(body, Bytes::from("key param missing"));
        }

        let (status, body) = send(&app, "POST", "/", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body.is_empty());

        let (status, _) = send(&app, "GET", "/%zz", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_router_query_is_not_part_of_key() {
        let app = router(RequestHandler::new(Arc::new(Store::new())));

        send(&app, "PUT", "/a%20b?ignored=1", "spaced").await;
        let (status, body) = send(&app, "GET", "/a%20b", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from("spaced"));
    }

    #[tokio::test]
    async fn test_router_body_limit() {
        let handler = RequestHandler::with_max_body_size(Arc::new(Store::new()), 8);
        let app = router(handler);

        let (status, body) = send(&app, "PUT", "/key", "more than eight bytes").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.starts_with(b"reading request body: "));
    }

    async fn create_test_server() -> (SocketAddr, Arc<Store>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Store::new());

        tokio::spawn(serve(
            listener,
            RequestHandler::new(Arc::clone(&store)),
            std::future::pending(),
        ));

        (addr, store)
    }

    /// Reads one response: returns the status line, the lowercased head and the body.
    async fn read_response(client: &mut TcpStream) -> (String, String, Vec<u8>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8(buf[..head_end].to_vec())
                    .unwrap()
                    .to_ascii_lowercase();
                let length: usize = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: "))
                    .unwrap()
                    .parse()
                    .unwrap();
                let body_start = head_end + 4;
                if buf.len() >= body_start + length {
                    let status = head.lines().next().unwrap().to_string();
                    let body = buf[body_start..body_start + length].to_vec();
                    return (status, head, body);
                }
            }

            let n = client.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-response");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[tokio::test]
    async fn test_keep_alive_round_trip() {
        let (addr, store) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"PUT /newkey HTTP/1.1\r\nhost: test\r\ncontent-length: 8\r\n\r\nnewvalue")
            .await
            .unwrap();
        let (status, head, body) = read_response(&mut client).await;
        assert_eq!(status, "http/1.1 201 created");
        assert!(head.contains("content-type: application/json"));
        assert!(body.is_empty());
        assert_eq!(store.get(b"newkey"), Some(Bytes::from("newvalue")));

        // Same connection
        client
            .write_all(b"GET /newkey HTTP/1.1\r\nhost: test\r\n\r\n")
            .await
            .unwrap();
        let (status, head, body) = read_response(&mut client).await;
        assert_eq!(status, "http/1.1 200 ok");
        assert!(head.contains("content-type: application/json"));
        assert_eq!(body, b"newvalue");
    }

    #[tokio::test]
    async fn test_chunked_put() {
        let (addr, store) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(
                b"PUT /k HTTP/1.1\r\nhost: test\r\ntransfer-encoding: chunked\r\n\r\n\
                  3\r\nnew\r\n5\r\nvalue\r\n0\r\n\r\n",
            )
            .await
            .unwrap();
        let (status, _, body) = read_response(&mut client).await;
        assert_eq!(status, "http/1.1 201 created");
        assert!(body.is_empty());
        assert_eq!(store.get(b"k"), Some(Bytes::from("newvalue")));
    }

    #[tokio::test]
    async fn test_pipelined_requests() {
        let (addr, store) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(
                b"PUT /a HTTP/1.1\r\ncontent-length: 1\r\n\r\n1\
                  PUT /b HTTP/1.1\r\ncontent-length: 1\r\n\r\n2",
            )
            .await
            .unwrap();
        let (first, _, _) = read_response(&mut client).await;
        let (second, _, _) = read_response(&mut client).await;
        assert_eq!(first, "http/1.1 201 created");
        assert_eq!(second, "http/1.1 201 created");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_connection_close() {
        let (addr, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"GET /missing HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        let response = String::from_utf8(response).unwrap();
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_endless_blank_lines_are_cut_off() {
        let (addr, _) = create_test_server().await;
        let client = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = client.into_split();

        // 4 MiB of CRLF and never a request line
        let flood = tokio::spawn(async move {
            let chunk = b"\r\n".repeat(32 * 1024);
            for _ in 0..64 {
                if writer.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        });

        // The server gives up on the connection instead of buffering forever
        let mut response = Vec::new();
        let closed = tokio::time::timeout(Duration::from_secs(10), reader.read_to_end(&mut response))
            .await;
        assert!(closed.is_ok(), "server kept the connection open");
        flood.await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_clients() {
        const CLIENTS: usize = 16;

        let (addr, store) = create_test_server().await;

        let writers: Vec<_> = (0..CLIENTS)
            .map(|i| {
                tokio::spawn(async move {
                    let mut client = TcpStream::connect(addr).await.unwrap();
                    let value = format!("value-{}", i);
                    let request = format!(
                        "PUT /key-{} HTTP/1.1\r\nhost: test\r\ncontent-length: {}\r\n\r\n{}",
                        i,
                        value.len(),
                        value
                    );
                    client.write_all(request.as_bytes()).await.unwrap();
                    let (status, _, _) = read_response(&mut client).await;
                    assert_eq!(status, "http/1.1 201 created");
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let readers: Vec<_> = (0..CLIENTS)
            .map(|i| {
                tokio::spawn(async move {
                    let mut client = TcpStream::connect(addr).await.unwrap();
                    let request = format!("GET /key-{} HTTP/1.1\r\nhost: test\r\n\r\n", i);
                    client.write_all(request.as_bytes()).await.unwrap();
                    let (status, _, body) = read_response(&mut client).await;
                    assert_eq!(status, "http/1.1 200 ok");
                    assert_eq!(body, format!("value-{}", i).into_bytes());
                })
            })
            .collect();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(store.len(), CLIENTS as u64);
    }
}
