use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PilotError, PilotResult};

#[derive(Debug)]
pub enum BrowserCommand {
    OpenPage { url: String, reply: oneshot::Sender<PilotResult<Page>> },
    Ping { reply: oneshot::Sender<bool> },
    Close,
}

/// Owns the Chromium process. Page requests are served one at a time.
pub struct BrowserActor {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
    pages_opened: usize,
    rx: mpsc::Receiver<BrowserCommand>,
}

impl BrowserActor {
    pub async fn launch(config: BrowserConfig, rx: mpsc::Receiver<BrowserCommand>) -> PilotResult<Self> {
        let (browser, mut handler) = Browser::launch(config).await?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });
        info!("browser launched");

        Ok(Self {
            browser,
            handler: Some(handler_task),
            pages_opened: 0,
            rx,
        })
    }

    pub async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                BrowserCommand::OpenPage { url, reply } => {
                    self.pages_opened += 1;
                    debug!(url = %url, pages_opened = self.pages_opened, "opening page");
                    let page = self.browser.new_page(url.as_str()).await.map_err(PilotError::from);
                    let _ = reply.send(page);
                }
                BrowserCommand::Ping { reply } => {
                    let _ = reply.send(self.browser.version().await.is_ok());
                }
                BrowserCommand::Close => break,
            }
        }

        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        if let Some(h) = self.handler.take() {
            h.abort();
        }
        info!("browser closed");
    }
}
