//! Local HTTP server for tests
//!
//! Serves a small site with a profile dropdown, a hover menu, a sign-up form
//! that validates with `alert()`, and the pages the menu items lead to.
//!
//! Each server instance runs on a random available port for test isolation.

use std::net::SocketAddr;
use tokio::sync::oneshot;
use warp::Filter;

pub const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Resilient UI Fixture</title>
    <style>
        .hover-menu .panel { display: none; }
        .hover-menu:hover .panel { display: block; }
    </style>
</head>
<body>
    <header data-testid="navbar">
        <button data-testid="profile-trigger"
            onclick="const d = document.querySelector('[data-testid=profile-dropdown]'); d.style.display = d.style.display === 'none' ? 'block' : 'none';">
            Account
        </button>
        <div data-testid="profile-dropdown" role="menu" style="display: none">
            <a role="menuitem" data-testid="profile-dropdown-Settings" href="/settings">Settings</a>
            <a role="menuitem" href="/tools">My Tools</a>
            <div aria-hidden="true"><span>Help</span></div>
            <span onclick="location.href = '/help'">Help</span>
        </div>
        <div class="hover-menu">
            <span data-testid="resources-trigger">Resources</span>
            <div class="panel" data-testid="resources-panel">
                <a href="/docs">Docs</a>
            </div>
        </div>
    </header>
    <main>
        <h1>Example Domain</h1>
        <form onsubmit="return false">
            <input data-testid="email" placeholder="Email">
            <button data-testid="signup-submit"
                onclick="if (!document.querySelector('[data-testid=email]').value.includes('@')) { alert('Please enter a valid email address'); }">
                Sign up
            </button>
        </form>
    </main>
    <footer><a href="/privacy">Privacy</a></footer>
</body>
</html>"#;

fn simple_page(title: &'static str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{title}</title></head>
<body><h1>{title}</h1><p><a href="/">Back to Home</a></p></body>
</html>"#
    )
}

/// Test server that serves the fixture site
pub struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a new test server on a random available port
    pub async fn start() -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let index = warp::path::end().map(|| warp::reply::html(HOME_PAGE));
        let settings = warp::path("settings").map(|| warp::reply::html(simple_page("Settings")));
        let tools = warp::path("tools").map(|| warp::reply::html(simple_page("My Tools")));
        let help = warp::path("help").map(|| warp::reply::html(simple_page("Help")));
        let docs = warp::path("docs").map(|| warp::reply::html(simple_page("Docs")));

        let routes = index.or(settings).or(tools).or(help).or(docs);

        let (addr, server) =
            warp::serve(routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                shutdown_rx.await.ok();
            });

        tokio::spawn(server);

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this server (e.g., "http://127.0.0.1:12345")
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready by making a test request
    pub async fn wait_ready(&self) -> anyhow::Result<()> {
        let url = self.url();
        let max_attempts = 10;

        for attempt in 1..=max_attempts {
            match reqwest::get(&url).await {
                Ok(response) if response.status().is_success() => {
                    println!("✅ Test server ready on: {}", url);
                    return Ok(());
                }
                Ok(response) => {
                    println!(
                        "⚠️ Attempt {}: Server returned status {}",
                        attempt,
                        response.status()
                    );
                }
                Err(e) => {
                    println!("⚠️ Attempt {}: Server not ready - {}", attempt, e);
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }

        anyhow::bail!(
            "Server did not become ready after {} attempts",
            max_attempts
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
