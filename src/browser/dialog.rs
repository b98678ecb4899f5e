//! One-shot native dialog handling
//!
//! A `ChromeDialog` holds an event subscription opened before the triggering
//! action. `wait` consumes it, so a handler can never outlive the action it was
//! armed for.

use crate::error::{BrowserError, Result};
use crate::surface::DialogWatch;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;

pub struct ChromeDialog {
    page: Page,
    events: EventStream<EventJavascriptDialogOpening>,
    accept: bool,
}

impl ChromeDialog {
    pub(crate) fn new(
        page: Page,
        events: EventStream<EventJavascriptDialogOpening>,
        accept: bool,
    ) -> Self {
        Self {
            page,
            events,
            accept,
        }
    }
}

impl DialogWatch for ChromeDialog {
    async fn wait(mut self, timeout: Duration) -> Result<String> {
        let event = match tokio::time::timeout(timeout, self.events.next()).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                return Err(BrowserError::DialogExpected(
                    "dialog event stream closed".to_string(),
                ))
            }
            Err(_) => {
                return Err(BrowserError::DialogExpected(format!(
                    "no dialog opened within {:?}",
                    timeout
                )))
            }
        };

        log::info!(
            "Dialog ({:?}) opened: {}; {}",
            event.r#type,
            event.message,
            if self.accept { "accepting" } else { "dismissing" }
        );

        self.page
            .execute(HandleJavaScriptDialogParams::new(self.accept))
            .await?;

        Ok(event.message.clone())
    }
}
