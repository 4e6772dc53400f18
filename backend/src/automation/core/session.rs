use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::automation::agents::{OpenAiGenerator, ReplyGenerator};
use crate::automation::core::browser::{BrowserActor, BrowserCommand};
use crate::automation::core::browser_config;
use crate::automation::page::{CdpPageAdapter, SelectorProfile};
use crate::automation::state::SessionProvider;
use crate::config::{BrowserSection, CompletionSection, PilotConfig};
use crate::error::{PilotError, PilotResult};
use crate::models::RunConfig;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// One persistent Chromium profile, launched on first use and relaunched
/// when it stops answering.
pub struct BrowserSession {
    browser: BrowserSection,
    completion: CompletionSection,
    input_settle: Duration,
    profile: SelectorProfile,
    browser_tx: Mutex<Option<mpsc::Sender<BrowserCommand>>>,
}

impl BrowserSession {
    pub fn new(config: &PilotConfig) -> Self {
        Self {
            browser: config.browser.clone(),
            completion: config.completion.clone(),
            input_settle: config.pacing.input_settle(),
            profile: SelectorProfile::for_version(config.page.site_version),
            browser_tx: Mutex::new(None),
        }
    }

    async fn browser(&self) -> PilotResult<mpsc::Sender<BrowserCommand>> {
        let mut slot = self.browser_tx.lock().await;
        if let Some(tx) = slot.as_ref() {
            if is_healthy(tx).await {
                return Ok(tx.clone());
            }
            warn!("browser health check failed, relaunching");
            let _ = tx.send(BrowserCommand::Close).await;
            *slot = None;
        }

        info!(profile = %self.browser.profile_dir.display(), "launching browser");
        let (tx, rx) = mpsc::channel(32);
        let actor = BrowserActor::launch(browser_config(&self.browser)?, rx).await?;
        tokio::spawn(actor.run());
        *slot = Some(tx.clone());
        Ok(tx)
    }

    pub async fn shutdown(&self) {
        if let Some(tx) = self.browser_tx.lock().await.take() {
            let _ = tx.send(BrowserCommand::Close).await;
        }
    }
}

async fn is_healthy(tx: &mpsc::Sender<BrowserCommand>) -> bool {
    let (reply_tx, reply_rx) = oneshot::channel();
    if tx.send(BrowserCommand::Ping { reply: reply_tx }).await.is_err() {
        return false;
    }
    matches!(tokio::time::timeout(PING_TIMEOUT, reply_rx).await, Ok(Ok(true)))
}

#[async_trait]
impl SessionProvider for BrowserSession {
    type Page = CdpPageAdapter;

    async fn open_page(&self) -> PilotResult<CdpPageAdapter> {
        let tx = self.browser().await?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(BrowserCommand::OpenPage {
            url: self.browser.inbox_url.clone(),
            reply: reply_tx,
        })
        .await
        .map_err(|_| PilotError::Browser("browser actor stopped".into()))?;

        let page = reply_rx
            .await
            .map_err(|_| PilotError::Browser("browser actor dropped reply".into()))??;
        Ok(CdpPageAdapter::new(page, self.profile.clone(), self.input_settle))
    }

    fn generator(&self, config: &RunConfig) -> PilotResult<Box<dyn ReplyGenerator>> {
        Ok(Box::new(OpenAiGenerator::new(config.api_key(), &self.completion)?))
    }

    async fn release(&self, page: CdpPageAdapter) {
        if let Err(e) = page.into_page().close().await {
            debug!(error = %e, "page did not close cleanly");
        }
    }
}
