// chromiumoxide drives Chrome over the DevTools protocol
use super::page::ChromePage;
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;

/// Environment variable naming the Chrome executable to launch
pub const CHROME_PATH_ENV: &str = "RESILIENT_UI_CHROME";

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Sandboxed mode - launches a fresh Chrome with its own profile directory
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Advanced mode - connects to existing Chrome on debug port
    DebugPort(u16),
}

impl ConnectionMode {
    /// Sandboxed launch tuned for the current environment.
    ///
    /// CI runners get headless + no-sandbox; the executable comes from
    /// `RESILIENT_UI_CHROME` when set.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let is_ci = ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "JENKINS_HOME", "CIRCLECI"]
            .iter()
            .any(|key| var(key).is_some());

        ConnectionMode::Sandboxed {
            chrome_path: var(CHROME_PATH_ENV).filter(|p| !p.is_empty()),
            no_sandbox: is_ci,
            headless: is_ci,
        }
    }
}

impl ChromeDriver {
    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory per browser so parallel sessions never
                // share cookies or storage
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!(
                    "resilient-ui-{}-{}",
                    std::process::id(),
                    unique_id
                ));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    BrowserError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir);

                // Linux AppArmor workaround
                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                log::info!(
                    "Launching Chrome (headless: {}, no_sandbox: {})",
                    headless,
                    no_sandbox
                );

                let (browser, mut handler) = Browser::launch(config.build().map_err(|e| {
                    BrowserError::LaunchFailed(format!(
                        "{}. Install Chrome or Chromium, or point {} at an executable",
                        e, CHROME_PATH_ENV
                    ))
                })?)
                .await
                .map_err(|e| {
                    BrowserError::LaunchFailed(format!(
                        "{}. Linux sandbox issue? Try --no-sandbox",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    BrowserError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                             Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Whether this driver launched (and therefore owns) the browser process
    pub fn owns_browser(&self) -> bool {
        self.temp_dir.is_some()
    }

    /// Open a new tab
    pub async fn new_page(&self, url: &str) -> Result<ChromePage> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::Other(format!("Failed to create page: {}", e)))?;
        Ok(ChromePage::new(page))
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| BrowserError::Other(e.to_string()))?;
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
