#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use rtimesync::upstream::{HttpResponse, Method, RequestDescriptor, Transport, TransportError};
use std::cell::RefCell;
use std::env;
use std::fs;
use std::path::PathBuf;

pub fn rts() -> Command {
    cargo_bin_cmd!("rtimesync")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rtimesync.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// Initialize a test DB through the CLI (no config file written)
pub fn init_test_db(db_path: &str) {
    rts()
        .args(["--db", db_path, "--test", "init"])
        .assert()
        .success();
}

struct Route {
    method: Method,
    prefix: String,
    reply: Result<HttpResponse, String>,
}

/// Canned upstream. A request is answered by the first route whose method
/// matches and whose URL prefix matches `full_url()`; anything else is 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: RefCell<Vec<Route>>,
    calls: RefCell<Vec<RequestDescriptor>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, method: Method, prefix: &str, reply: Result<HttpResponse, String>) {
        let mut routes = self.routes.borrow_mut();
        routes.retain(|r| !(r.method == method && r.prefix == prefix));
        routes.push(Route {
            method,
            prefix: prefix.to_string(),
            reply,
        });
    }

    pub fn get(&self, prefix: &str, status: u16, body: &str) {
        self.set(
            Method::Get,
            prefix,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn post(&self, prefix: &str, status: u16, body: &str) {
        self.set(
            Method::Post,
            prefix,
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn fail(&self, prefix: &str, message: &str) {
        self.set(Method::Get, prefix, Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, fragment: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.full_url().contains(fragment))
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.full_url().contains(fragment))
            .count()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        self.calls.borrow_mut().push(request.clone());
        let url = request.full_url();

        let routes = self.routes.borrow();
        let hit = routes
            .iter()
            .find(|r| r.method == request.method && url.starts_with(&r.prefix));

        match hit {
            Some(route) => route
                .reply
                .clone()
                .map_err(|message| TransportError { message }),
            None => Ok(HttpResponse {
                status: 404,
                body: r#"{"error":"not found"}"#.to_string(),
            }),
        }
    }
}
