//! Scoped browser sessions
//!
//! A session is one fresh browser plus one page, owned by a single flow. It is
//! always released through [`Session::close`], which first runs any teardown
//! hooks the flow registered (for example deleting an account it created).

use crate::browser::{ChromeDriver, ChromePage, ConnectionMode};
use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::{Arc, Mutex};

type Hook<P> = Box<dyn FnOnce(P) -> BoxFuture<'static, Result<()>> + Send>;

/// Cleanup actions paired with side effects a flow caused on the target.
///
/// Cloning shares the same stack. Hooks run last-registered first.
pub struct TeardownStack<P> {
    hooks: Arc<Mutex<Vec<(String, Hook<P>)>>>,
}

impl<P> Clone for TeardownStack<P> {
    fn clone(&self) -> Self {
        Self {
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<P> Default for TeardownStack<P> {
    fn default() -> Self {
        Self {
            hooks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<P: Clone + Send + 'static> TeardownStack<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup hook
    pub fn defer<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce(P) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let hook: Hook<P> = Box::new(move |page| -> BoxFuture<'static, Result<()>> {
            Box::pin(hook(page))
        });
        self.lock().push((name.into(), hook));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run and drain every hook. Failures are logged and counted, never raised.
    pub async fn run_all(&self, page: P) -> usize {
        let hooks: Vec<_> = std::mem::take(&mut *self.lock());
        let mut failures = 0;

        for (name, hook) in hooks.into_iter().rev() {
            log::info!("Running teardown '{}'", name);
            if let Err(e) = hook(page.clone()).await {
                log::error!("Teardown '{}' failed: {}", name, e);
                failures += 1;
            }
        }
        failures
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Hook<P>)>> {
        // a panicking hook registration cannot leave the vector inconsistent
        self.hooks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct Session {
    driver: ChromeDriver,
    page: ChromePage,
    teardown: TeardownStack<ChromePage>,
}

impl Session {
    /// Launch (or attach to) a browser and open a fresh page
    pub async fn start(mode: ConnectionMode) -> Result<Self> {
        let driver = ChromeDriver::new(mode).await?;
        let page = match driver.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if driver.owns_browser() {
                    driver.close().await.ok();
                }
                return Err(e);
            }
        };

        Ok(Self {
            driver,
            page,
            teardown: TeardownStack::new(),
        })
    }

    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    pub fn teardown(&self) -> &TeardownStack<ChromePage> {
        &self.teardown
    }

    /// Run teardown hooks, then release the page and browser
    pub async fn close(self) -> Result<()> {
        let failures = self.teardown.run_all(self.page.clone()).await;
        if failures > 0 {
            log::warn!("{} teardown hook(s) failed", failures);
        }

        if self.driver.owns_browser() {
            self.driver.close().await
        } else {
            // attached to someone else's browser: only close our tab
            self.page.close().await
        }
    }

    /// Run `f` in a fresh session, releasing it on every exit path.
    ///
    /// The closure's error wins over a close error.
    pub async fn run<F, Fut, T>(mode: ConnectionMode, f: F) -> Result<T>
    where
        F: FnOnce(ChromePage, TeardownStack<ChromePage>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = Self::start(mode).await?;
        let result = f(session.page.clone(), session.teardown.clone()).await;
        let closed = session.close().await;

        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                log::warn!("Session close also failed: {}", close_err);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;

    #[tokio::test]
    async fn test_teardown_runs_lifo_and_drains() {
        let stack: TeardownStack<Arc<Mutex<Vec<String>>>> = TeardownStack::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["create-account", "upload-tool"] {
            stack.defer(name, move |log: Arc<Mutex<Vec<String>>>| async move {
                log.lock().unwrap().push(name.to_string());
                Ok(())
            });
        }
        assert_eq!(stack.len(), 2);

        let failures = stack.run_all(log.clone()).await;

        assert_eq!(failures, 0);
        assert_eq!(*log.lock().unwrap(), vec!["upload-tool", "create-account"]);
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_failure_does_not_stop_others() {
        let stack: TeardownStack<Arc<Mutex<u32>>> = TeardownStack::new();
        let ran = Arc::new(Mutex::new(0));

        stack.defer("ok", |ran: Arc<Mutex<u32>>| async move {
            *ran.lock().unwrap() += 1;
            Ok(())
        });
        stack.defer("broken", |_| async {
            Err(BrowserError::Other("account already gone".to_string()))
        });

        let shared = stack.clone();
        assert_eq!(shared.run_all(ran.clone()).await, 1);
        assert_eq!(*ran.lock().unwrap(), 1);
    }
}
