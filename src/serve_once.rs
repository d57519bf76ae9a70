//! The one-shot HTTP server: binds one path, serves it once, tears itself
//! down afterwards.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use http::header::{CONNECTION, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use http::{HeaderValue, Request, Response, StatusCode};
use httpdate::fmt_http_date;
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::Body;
use tokio::net::TcpListener;
use tracing::debug;

use crate::body::{file_body, text_body};
use crate::error::{Error, Result};
use crate::file::{FileContent, ServableFile};
use crate::ResponseBody;

/// How the single meaningful request of a server run concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The file was requested and fully streamed to the client.
    Sent,
    /// A request for an unknown (non-favicon) path closed the server.
    Rejected {
        /// The path the client asked for.
        path: String,
    },
}

/// A server for a single [`ServableFile`], not yet listening.
///
/// No I/O happens until [`bind`](ServeOnce::bind) is called.
#[derive(Debug)]
pub struct ServeOnce {
    file: ServableFile,
}

impl ServeOnce {
    pub fn new(file: ServableFile) -> Self {
        debug!(
            path = %file.expected_path(),
            size = file.size(),
            "serving file"
        );

        Self { file }
    }

    /// Bind the listening socket. Port 0 lets the operating system choose.
    ///
    /// Bind failure surfaces as [`Error::Bind`]; no listening state exists
    /// afterwards and [`BoundServer::serve`] can never resolve for it.
    pub async fn bind(self, addr: SocketAddr) -> Result<BoundServer> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "listener bound");

        Ok(BoundServer {
            listener,
            local_addr,
            file: self.file,
        })
    }
}

/// A bound, listening one-shot server.
///
/// Dropping it before [`serve`](BoundServer::serve) completes closes the
/// listener and releases the file content.
#[derive(Debug)]
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    file: ServableFile,
}

impl BoundServer {
    /// The real bound address, for constructing the public-facing URI.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until one request either downloads the file or
    /// misses the expected path, then shut down.
    ///
    /// The returned future is the completion channel: it resolves exactly
    /// once per server instance. Favicon probes are answered with a 404 but
    /// never resolve it. A socket-level failure mid-response resolves it
    /// with [`Error::Transfer`]. On return the listener, the connection and
    /// the file's byte stream have all been dropped.
    pub async fn serve(self) -> Result<TransferOutcome> {
        let BoundServer { listener, file, .. } = self;

        let session = Arc::new(Session {
            expected_path: file.expected_path(),
            basename: file.basename(),
            mime: file.mime_header_value(),
            size: file.size(),
            modified: file.modified(),
            content: Mutex::new(Some(file.into_content())),
        });

        loop {
            let (stream, peer) = listener.accept().await?;

            debug!(%peer, "accepted connection");

            // Decision made by this connection's single request. Keep-alive
            // is disabled so there is at most one request per connection.
            let decision = Arc::new(Mutex::new(None::<Decision>));

            let service = service_fn({
                let session = Arc::clone(&session);
                let decision = Arc::clone(&decision);
                move |req| {
                    let session = Arc::clone(&session);
                    let decision = Arc::clone(&decision);
                    async move { Ok::<_, Infallible>(handle(req, &session, &decision)) }
                }
            });

            // Resolves once the response has been flushed and the
            // connection closed.
            let served = Http::new()
                .http1_keep_alive(false)
                .serve_connection(stream, service)
                .await;

            let decision = decision.lock().unwrap().take();

            if let Err(err) = served {
                match decision {
                    // the one qualifying response was in flight when the
                    // socket failed
                    Some(Decision::Sent) | Some(Decision::Rejected(_)) => {
                        return Err(Error::Transfer(err));
                    }
                    // malformed request, or a client that gave up before
                    // sending one; the single request is still owed
                    Some(Decision::Favicon) | None => {
                        debug!(error = %err, "connection failed without a qualifying request");
                        continue;
                    }
                }
            }

            match decision {
                Some(Decision::Sent) => {
                    debug!("transfer complete, closing server");
                    return Ok(TransferOutcome::Sent);
                }
                Some(Decision::Rejected(path)) => {
                    debug!(%path, "unknown path requested, closing server");
                    return Ok(TransferOutcome::Rejected { path });
                }
                // Favicon probe, or a connection that sent no request:
                // keep waiting for the real one.
                Some(Decision::Favicon) | None => continue,
            }
        }
    }
}

struct Session {
    expected_path: String,
    basename: String,
    mime: HeaderValue,
    size: u64,
    modified: SystemTime,
    content: Mutex<Option<FileContent>>,
}

enum Decision {
    Sent,
    Rejected(String),
    Favicon,
}

fn handle(
    req: Request<Body>,
    session: &Session,
    decision: &Mutex<Option<Decision>>,
) -> Response<ResponseBody> {
    let path = req.uri().path().to_owned();

    debug!(%path, "received request");

    // Literal comparison, no percent-decoding.
    if path == session.expected_path {
        if let Some(content) = session.content.lock().unwrap().take() {
            *decision.lock().unwrap() = Some(Decision::Sent);

            debug!(size = session.size, mime = ?session.mime, "responding 200");

            return Response::builder()
                .status(StatusCode::OK)
                .header(CONNECTION, HeaderValue::from_static("close"))
                .header(CONTENT_DISPOSITION, content_disposition(&session.basename))
                .header(CONTENT_LENGTH, session.size)
                .header(CONTENT_TYPE, session.mime.clone())
                .header(LAST_MODIFIED, fmt_http_date(session.modified))
                .body(file_body(content.into_reader(), session.size))
                .unwrap();
        }
    }

    let closing = path != "/favicon.ico";

    debug!(
        %path,
        expected = %session.expected_path,
        closing,
        "responding 404"
    );

    *decision.lock().unwrap() = Some(if closing {
        Decision::Rejected(path.clone())
    } else {
        Decision::Favicon
    });

    not_found(&path)
}

// quoted-string per RFC 6266: backslash-escape '\' and '"' in the filename
fn content_disposition(basename: &str) -> String {
    let escaped = basename.replace('\\', "\\\\").replace('"', "\\\"");

    format!("attachment; filename=\"{escaped}\"")
}

fn not_found(path: &str) -> Response<ResponseBody> {
    let body = format!("Unknown file: {path}");

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONNECTION, HeaderValue::from_static("close"))
        .header(CONTENT_LENGTH, body.len())
        .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
        .body(text_body(body))
        .unwrap()
}
