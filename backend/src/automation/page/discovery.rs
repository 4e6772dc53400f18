use std::future::Future;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::SelectorProfile;
use crate::error::PilotResult;

static THREAD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/direct/t/[^/?#\s]+").expect("thread link pattern is valid"));

/// Selector that matches every anchor, used for the last-resort scan.
pub const ANY_LINK: &str = "a";

pub fn is_thread_link(href: &str) -> bool {
    THREAD_LINK.is_match(href)
}

/// An element found while probing for chats, with its `href` if it has one.
#[derive(Debug, Clone)]
pub struct Candidate<T> {
    pub node: T,
    pub href: Option<String>,
}

impl<T> Candidate<T> {
    pub fn new(node: T, href: Option<String>) -> Self {
        Self { node, href }
    }

    fn links_thread(&self) -> bool {
        self.href.as_deref().is_some_and(is_thread_link)
    }
}

/// Probes the profile's chat selectors in order and returns the hits of the
/// first one that finds anything. Falls back to every anchor whose `href`
/// points at a thread. An empty result means there is nothing to do.
pub async fn discover<T, F, Fut>(profile: &SelectorProfile, mut query: F) -> Vec<Candidate<T>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = PilotResult<Vec<Candidate<T>>>>,
{
    for selector in &profile.chat_list {
        let mut hits = match query(selector.clone()).await {
            Ok(hits) => hits,
            Err(e) => {
                debug!(selector = %selector, error = %e, "chat selector query failed");
                continue;
            }
        };
        if profile.require_thread_href {
            hits.retain(Candidate::links_thread);
        }
        debug!(selector = %selector, found = hits.len(), "chat selector probed");
        if !hits.is_empty() {
            info!(selector = %selector, chats = hits.len(), "using chat selector");
            return hits;
        }
    }

    warn!("no chat selector matched, scanning all links");
    match query(ANY_LINK.to_string()).await {
        Ok(mut links) => {
            let total = links.len();
            links.retain(Candidate::links_thread);
            debug!(total, threads = links.len(), "link scan finished");
            links
        }
        Err(e) => {
            warn!(error = %e, "link scan failed");
            Vec::new()
        }
    }
}
