//! Paginated harvesting of search results into article records.
//!
//! [`Harvester::harvest`] returns a lazy [`Stream`] of [`ArticleRecord`]s.
//! Nothing is requested until the stream is polled, and each poll does only
//! as much work as needed for the next record:
//!
//! 1. **Paginate**: request the next page from the [`NewsSearch`] client,
//!    retrying the same offset after a fixed cooldown on failure
//! 2. **Scrape**: extract the full body of each result through the
//!    [`BodyExtractor`], using the API link as referer
//! 3. **Assemble**: build one record per result, even when extraction failed
//!
//! The stream ends when `max_items` records were produced, a page comes back
//! empty, or the API offset ceiling ([`MAX_START`]) is passed. Dropping the
//! stream cancels the harvest; records already yielded are unaffected.
//!
//! # Pacing
//!
//! Random jitter is slept before every page request and after every scrape
//! to keep request rates polite. Delays are held in [`Pacing`] so tests can
//! run without them.

use crate::extract::BodyExtractor;
use crate::extract::fetch::PageFetcher;
use crate::models::{
    ArticleRecord, RECORD_LANG, RECORD_SOURCE, RECORD_VERSION, SearchItem, response_hash,
};
use crate::search::{MAX_PAGE_SIZE, NewsSearch, SearchRequest, SortOrder};
use crate::utils::{clean_html_text, format_kst, kst_now, parse_pubdate};
use futures::stream::{self, Stream, StreamExt};
use std::future::Future;
use rand::{Rng, rng};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Records between progress log lines in [`drain`].
const PROGRESS_EVERY: usize = 10;

/// Highest 1-based offset the search API serves.
pub const MAX_START: usize = 1000;

/// Request pacing for one harvest.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Jitter range slept before each page request.
    pub page_jitter: (Duration, Duration),
    /// Jitter range slept after each article scrape.
    pub item_jitter: (Duration, Duration),
    /// Fixed wait before retrying a failed page request.
    pub retry_cooldown: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            page_jitter: (Duration::from_millis(200), Duration::from_millis(600)),
            item_jitter: (Duration::from_millis(100), Duration::from_millis(300)),
            retry_cooldown: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
impl Pacing {
    /// No delays at all.
    pub fn none() -> Self {
        Self {
            page_jitter: (Duration::ZERO, Duration::ZERO),
            item_jitter: (Duration::ZERO, Duration::ZERO),
            retry_cooldown: Duration::ZERO,
        }
    }
}

async fn jitter((low, high): (Duration, Duration)) {
    let delay = if high > low {
        let ms = rng().random_range(low.as_millis() as u64..=high.as_millis() as u64);
        Duration::from_millis(ms)
    } else {
        low
    };
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

/// What to harvest.
#[derive(Debug, Clone)]
pub struct HarvestParams {
    pub query: String,
    /// Hard cap on yielded records.
    pub max_items: usize,
    pub sort: SortOrder,
    /// Page size; clamped to `1..=100`.
    pub per_page: usize,
}

struct HarvestState {
    params: HarvestParams,
    per_page: usize,
    start: usize,
    total_fetched: usize,
    pending: VecDeque<Value>,
    exhausted: bool,
}

/// Drives a search client and a body extractor to produce article records.
pub struct Harvester<S, F> {
    search: S,
    extractor: BodyExtractor<F>,
    pacing: Pacing,
}

impl<S, F> Harvester<S, F>
where
    S: NewsSearch,
    F: PageFetcher,
{
    pub fn new(search: S, extractor: BodyExtractor<F>, pacing: Pacing) -> Self {
        Self {
            search,
            extractor,
            pacing,
        }
    }

    /// Lazily harvest records for `params.query`.
    ///
    /// No request is made until the stream is polled. Each poll fetches at
    /// most one result page and scrapes at most one article.
    ///
    /// # Arguments
    ///
    /// * `params` - Query, sort order, page size and record cap
    ///
    /// # Returns
    ///
    /// A stream of records in API order. It ends after `params.max_items`
    /// records, on an empty page, or once the next offset exceeds
    /// [`MAX_START`]. A failed page request is retried indefinitely and
    /// never surfaces as an item.
    pub fn harvest(&self, params: HarvestParams) -> impl Stream<Item = ArticleRecord> + '_ {
        let per_page = params.per_page.clamp(1, MAX_PAGE_SIZE);
        info!(
            query = %params.query,
            max_items = params.max_items,
            sort = params.sort.as_str(),
            per_page,
            "Starting harvest"
        );
        let state = HarvestState {
            params,
            per_page,
            start: 1,
            total_fetched: 0,
            pending: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(state, move |mut state| async move {
            let record = self.next_record(&mut state).await?;
            Some((record, state))
        })
    }

    async fn next_record(&self, state: &mut HarvestState) -> Option<ArticleRecord> {
        loop {
            if state.total_fetched >= state.params.max_items {
                debug!(total = state.total_fetched, "Reached max_items");
                return None;
            }

            if let Some(raw) = state.pending.pop_front() {
                match self.build_record(&state.params.query, &raw).await {
                    Some(record) => {
                        state.total_fetched += 1;
                        return Some(record);
                    }
                    None => continue,
                }
            }

            if state.exhausted {
                return None;
            }
            if state.start > MAX_START {
                info!(start = state.start, "Reached API offset ceiling");
                return None;
            }

            let items = self.fetch_page(state).await;
            if items.is_empty() {
                info!(start = state.start, "No more results");
                state.exhausted = true;
                return None;
            }
            debug!(start = state.start, items = items.len(), "Fetched result page");
            state.pending.extend(items);
            state.start += state.per_page;
        }
    }

    /// Request the page at `state.start`, retrying until it succeeds.
    async fn fetch_page(&self, state: &HarvestState) -> Vec<Value> {
        let request = SearchRequest {
            query: &state.params.query,
            display: state.per_page,
            start: state.start,
            sort: state.params.sort,
        };
        loop {
            jitter(self.pacing.page_jitter).await;
            match self.search.search(&request).await {
                Ok(page) => return page.items,
                Err(e) => {
                    warn!(
                        start = request.start,
                        error = %e,
                        cooldown_secs = self.pacing.retry_cooldown.as_secs(),
                        "Search request failed; retrying"
                    );
                    sleep(self.pacing.retry_cooldown).await;
                }
            }
        }
    }

    /// Scrape one result and assemble its record; `None` when it has no link.
    async fn build_record(&self, query: &str, raw: &Value) -> Option<ArticleRecord> {
        let item = SearchItem::from_value(raw);
        let Some(target) = item.scrape_target() else {
            debug!(title = %item.title, "Skipping result without a link");
            return None;
        };

        let extraction = self.extractor.extract(target, item.link.as_deref()).await;
        let extractor_used = extraction.label();
        if extraction.text.is_empty() {
            info!(url = %target, extractor = %extractor_used, "Body extraction failed");
        }

        jitter(self.pacing.item_jitter).await;

        let now = kst_now();
        Some(ArticleRecord {
            id: Uuid::new_v4().to_string(),
            source: RECORD_SOURCE.to_string(),
            query: query.to_string(),
            title: clean_html_text(&item.title),
            body_text: clean_html_text(&item.description),
            body_full: extraction.text,
            extractor_used,
            url: item.link.clone().unwrap_or_default(),
            originallink: item.originallink.clone().filter(|l| !l.trim().is_empty()),
            published_at_kst: parse_pubdate(&item.pub_date, now),
            first_seen_at_kst: format_kst(&now),
            lang: RECORD_LANG.to_string(),
            response_hash: response_hash(raw),
            version: RECORD_VERSION.to_string(),
        })
    }
}

/// Collect records from a harvest until it ends or `shutdown` resolves.
///
/// `shutdown` is typically `tokio::signal::ctrl_c()`. It is checked before
/// each record, and records yielded before it fired are always returned.
///
/// # Arguments
///
/// * `stream` - The harvest, usually from [`Harvester::harvest`]
/// * `shutdown` - Future whose completion stops the harvest
/// * `max_items` - Cap used only for progress logging
///
/// # Returns
///
/// The collected records and whether `shutdown` cut the harvest short.
pub async fn drain<St, C>(stream: St, shutdown: C, max_items: usize) -> (Vec<ArticleRecord>, bool)
where
    St: Stream<Item = ArticleRecord>,
    C: Future,
{
    tokio::pin!(stream);
    tokio::pin!(shutdown);

    let mut records = Vec::new();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!(collected = records.len(), "Interrupted; finalizing partial results");
                return (records, true);
            }
            next = stream.next() => match next {
                Some(record) => {
                    records.push(record);
                    if records.len() % PROGRESS_EVERY == 0 {
                        info!(collected = records.len(), max_items, "Harvest progress");
                    }
                }
                None => return (records, false),
            },
        }
    }
}
