use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use log::debug;
use oauth2::{AuthorizationCode, CsrfToken};
use tokio::sync::mpsc;

use crate::config;
use crate::error::{Error, Result};

const SUCCESS_MESSAGE: &str =
    "The authentication flow has completed. You may close this window.";

type Outcome = Result<AuthorizationCode>;

/// Loopback HTTP listener that receives the provider's redirect after consent.
pub struct RedirectListener {
    listener: TcpListener,
    port: u16,
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl RedirectListener {
    /// Bind to an OS-assigned port on the loopback interface.
    pub fn bind() -> Result<Self> {
        let listener = TcpListener::bind((config::REDIRECT_HOST, 0))
            .map_err(|e| Error::transport("bind redirect listener", e))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::transport("get redirect listener address", e))?
            .port();
        Ok(Self { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", config::REDIRECT_HOST, self.port)
    }

    /// Serve requests until one carries an authorization code or an error.
    ///
    /// Every connection is handled on its own task, so a browser preconnect
    /// that never sends anything, or a client speaking something other than
    /// HTTP, cannot hold up the real redirect. Requests with neither a code
    /// nor an error (e.g. `/favicon.ico`) get a 404 and are skipped.
    pub fn wait_for_code(&self, csrf: &CsrfToken) -> Result<AuthorizationCode> {
        let listener = self
            .listener
            .try_clone()
            .map_err(|e| Error::transport("clone redirect listener", e))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::transport("start redirect server", e))?;
        runtime.block_on(serve(listener, csrf.clone()))
    }
}

async fn serve(listener: TcpListener, csrf: CsrfToken) -> Result<AuthorizationCode> {
    listener
        .set_nonblocking(true)
        .map_err(|e| Error::transport("configure redirect listener", e))?;
    let listener = tokio::net::TcpListener::from_std(listener)
        .map_err(|e| Error::transport("configure redirect listener", e))?;
    let (done, mut finished) = mpsc::channel::<Outcome>(1);

    loop {
        tokio::select! {
            Some(outcome) = finished.recv() => return outcome,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(stream, peer, csrf.clone(), done.clone()));
                }
                Err(e) => debug!("failed to accept redirect connection: {e}"),
            },
        }
    }
}

/// Serve a single request on `stream` and report its outcome once the
/// response has been written.
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    csrf: CsrfToken,
    done: mpsc::Sender<Outcome>,
) {
    let outcome: Arc<Mutex<Option<Outcome>>> = Arc::default();
    let slot = Arc::clone(&outcome);
    let service = service_fn(move |req: Request<Incoming>| {
        let target = req
            .uri()
            .path_and_query()
            .map_or("/", |target| target.as_str());
        debug!("redirect request for {}", req.uri().path());
        let (response, result) = answer(&parse_callback(target), &csrf);
        if let (Some(result), Ok(mut stored)) = (result, slot.lock()) {
            *stored = Some(result);
        }
        async move { Ok::<_, Infallible>(response) }
    });

    let served = http1::Builder::new()
        .timer(TokioTimer::new())
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service)
        .await;
    if let Err(e) = served {
        debug!("redirect connection from {peer} dropped: {e}");
    }

    let result = outcome.lock().ok().and_then(|mut stored| stored.take());
    if let Some(result) = result {
        let _ = done.send(result).await;
    }
}

/// Decide how to answer a callback. `None` means keep waiting.
fn answer(params: &CallbackParams, csrf: &CsrfToken) -> (Response<Full<Bytes>>, Option<Outcome>) {
    if params.code.is_none() && params.error.is_none() {
        return (reply(StatusCode::NOT_FOUND, "Not found."), None);
    }
    // nothing else is trusted until the state matches
    if params.state.as_deref() != Some(csrf.secret().as_str()) {
        return (
            reply(StatusCode::BAD_REQUEST, "State mismatch."),
            Some(Err(Error::Authorization(
                "state parameter does not match the request".to_string(),
            ))),
        );
    }
    match (&params.error, &params.code) {
        (Some(error), _) => (
            reply(StatusCode::BAD_REQUEST, "Authorization was denied."),
            Some(Err(Error::Authorization(format!("consent denied: {error}")))),
        ),
        (None, Some(code)) => (
            reply(StatusCode::OK, SUCCESS_MESSAGE),
            Some(Ok(AuthorizationCode::new(code.clone()))),
        ),
        (None, None) => (reply(StatusCode::NOT_FOUND, "Not found."), None),
    }
}

/// Pull `code`, `state` and `error` out of a request target such as `/?code=..&state=..`.
pub fn parse_callback(target: &str) -> CallbackParams {
    let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut params = CallbackParams::default();
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        match &*k {
            "code" => params.code = Some(v.into_owned()),
            "state" => params.state = Some(v.into_owned()),
            "error" => params.error = Some(v.into_owned()),
            _ => {}
        }
    }
    params
}

fn reply(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
