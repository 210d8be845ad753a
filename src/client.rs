use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::protocol::{
    LastUpdateResponse, SearchRequest, SearchResponse, TotalCountResponse,
};

/// Work handed to the fetch thread.
pub enum Job {
    Search { seq: u64, request: SearchRequest },
    LastUpdate,
    TotalCount,
}

/// Completion delivered back to the UI loop. Search completions carry their
/// submission sequence so stale responses can be dropped.
pub enum FetchEvent {
    Search {
        seq: u64,
        outcome: Result<SearchResponse>,
    },
    LastUpdate(String),
    TotalCount(u64),
}

/// Handle to the backend search service. All HTTP happens on a dedicated
/// thread with a blocking client; the UI loop stays non-blocking by polling
/// `poll()` once per tick.
pub struct SearchClient {
    jobs: Sender<Job>,
    events: Receiver<FetchEvent>,
}

impl SearchClient {
    /// Spawn the fetch thread. `base_url` is the service root, e.g.
    /// `http://localhost:8040`.
    pub fn spawn(base_url: String) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (event_tx, event_rx) = mpsc::channel::<FetchEvent>();

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("building HTTP client")?;

        thread::Builder::new()
            .name("facetmap-fetch".into())
            .spawn(move || worker(http, &base_url, job_rx, event_tx))
            .context("spawning fetch thread")?;

        Ok(Self {
            jobs: job_tx,
            events: event_rx,
        })
    }

    pub fn submit(&self, job: Job) {
        // A closed channel means the fetch thread is gone; the app keeps
        // running on whatever it last rendered.
        if self.jobs.send(job).is_err() {
            log::warn!("fetch thread unavailable, dropping request");
        }
    }

    /// Next completed fetch, if any arrived since the last tick.
    pub fn poll(&self) -> Option<FetchEvent> {
        self.events.try_recv().ok()
    }
}

fn worker(http: reqwest::blocking::Client, base_url: &str, jobs: Receiver<Job>, events: Sender<FetchEvent>) {
    while let Ok(job) = jobs.recv() {
        let event = match job {
            Job::Search { seq, request } => {
                let outcome = post_search(&http, base_url, &request);
                if let Err(err) = &outcome {
                    // Failures are terminal for the request: logged here,
                    // never retried, never surfaced past the status bar.
                    log::warn!("search request {seq} failed: {err:#}");
                }
                FetchEvent::Search { seq, outcome }
            }
            Job::LastUpdate => match get_last_update(&http, base_url) {
                Ok(stamp) => FetchEvent::LastUpdate(stamp),
                Err(err) => {
                    log::warn!("last-update request failed: {err:#}");
                    continue;
                }
            },
            Job::TotalCount => match get_total_count(&http, base_url) {
                Ok(count) => FetchEvent::TotalCount(count),
                Err(err) => {
                    log::warn!("total-count request failed: {err:#}");
                    continue;
                }
            },
        };

        if events.send(event).is_err() {
            break; // UI is gone
        }
    }
}

fn post_search(
    http: &reqwest::blocking::Client,
    base_url: &str,
    request: &SearchRequest,
) -> Result<SearchResponse> {
    let url = format!("{base_url}/search");
    let response = http
        .post(&url)
        .json(request)
        .send()
        .with_context(|| format!("POST {url}"))?
        .error_for_status()
        .context("search returned error status")?;
    response.json().context("decoding search response")
}

fn get_last_update(http: &reqwest::blocking::Client, base_url: &str) -> Result<String> {
    let url = format!("{base_url}/last-update");
    let response: LastUpdateResponse = http
        .get(&url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?
        .json()
        .context("decoding last-update response")?;
    Ok(response.last_updated)
}

fn get_total_count(http: &reqwest::blocking::Client, base_url: &str) -> Result<u64> {
    let url = format!("{base_url}/total-count");
    let response: TotalCountResponse = http
        .get(&url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?
        .json()
        .context("decoding total-count response")?;
    Ok(response.total_count)
}
