//! Local HTTP fixtures shared by the client tests.

use axum::Router;
use parking_lot::Mutex;
use std::sync::Arc;

/// Bind the router on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Requests seen by a fixture: (uri, body), plus the authorization header when present.
#[derive(Clone, Default)]
pub struct Recorded {
    inner: Arc<Mutex<Vec<(String, String)>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    pub fn push(&self, uri: String, body: String) {
        self.inner.lock().push((uri, body));
    }

    pub fn push_auth(&self, value: String) {
        self.auth.lock().push(value);
    }

    pub fn first(&self) -> (String, String) {
        self.inner.lock().first().cloned().expect("no request recorded")
    }

    pub fn first_auth(&self) -> String {
        self.auth.lock().first().cloned().expect("no auth header recorded")
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}
