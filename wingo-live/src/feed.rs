use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use wingo_core::issue::IssueId;
use wingo_core::models::DrawRecord;
use wingo_core::simulate::DrawSimulator;

use crate::error::FeedError;

/// Source d'une page de tirages récents.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Page courante, du plus récent au plus ancien.
    async fn fetch(&self) -> Result<Vec<DrawRecord>, FeedError>;
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    data: Option<FeedData>,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    #[serde(default)]
    list: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(rename = "issueNumber")]
    issue_number: Scalar,
    number: Scalar,
}

/// Le flux publie indifféremment des chaînes ou des nombres.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(u64),
}

impl Scalar {
    fn to_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.clone(),
            Scalar::Int(n) => n.to_string(),
        }
    }
}

/// Décode le corps JSON `{"data": {"list": [{"issueNumber", "number"}, ...]}}`.
pub fn parse_page(body: &str) -> Result<Vec<DrawRecord>, FeedError> {
    let response: FeedResponse =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed { message: e.to_string() })?;
    let list = response.data.map(|d| d.list).unwrap_or_default();
    if list.is_empty() {
        return Err(FeedError::EmptyPage);
    }

    list.iter()
        .map(|item| {
            let raw_issue = item.issue_number.to_text();
            let issue = IssueId::parse(&raw_issue)
                .map_err(|e| FeedError::InvalidRecord { message: e.to_string() })?;
            let raw_number = item.number.to_text();
            let number = raw_number.trim().parse::<u8>().map_err(|_| FeedError::InvalidRecord {
                message: format!("numéro '{}' pour la période {}", raw_number, raw_issue),
            })?;
            DrawRecord::new(issue, number).map_err(|e| FeedError::InvalidRecord { message: e.to_string() })
        })
        .collect()
}

/// Flux HTTP officiel. Chaque requête porte un paramètre `ts` pour contourner les caches.
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.to_string() })
    }

    pub fn request_url(&self, ts_millis: i64) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}ts={}", self.url, sep, ts_millis)
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<Vec<DrawRecord>, FeedError> {
        let url = self.request_url(chrono::Utc::now().timestamp_millis());
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_page(&body)
    }
}

struct SimulatedState {
    sim: DrawSimulator,
    published: VecDeque<DrawRecord>,
    last_publish: tokio::time::Instant,
}

/// Flux hors ligne : tirages uniformes reproductibles, un nouveau par fenêtre écoulée.
pub struct SimulatedFeed {
    state: Mutex<SimulatedState>,
    window: Duration,
    page_size: usize,
}

impl SimulatedFeed {
    pub fn new(first_issue: IssueId, seed: u64, window: Duration, backlog: usize) -> Self {
        let mut sim = DrawSimulator::new(first_issue, seed);
        let page_size = backlog.max(1);
        let mut published = VecDeque::with_capacity(page_size + 1);
        for _ in 0..page_size {
            published.push_front(sim.next_draw());
        }
        Self {
            state: Mutex::new(SimulatedState {
                sim,
                published,
                last_publish: tokio::time::Instant::now(),
            }),
            window,
            page_size,
        }
    }
}

#[async_trait]
impl FeedSource for SimulatedFeed {
    async fn fetch(&self) -> Result<Vec<DrawRecord>, FeedError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| FeedError::Transport { message: "simulateur indisponible".to_string() })?;
        let now = tokio::time::Instant::now();
        while !self.window.is_zero() && now.duration_since(state.last_publish) >= self.window {
            let draw = state.sim.next_draw();
            state.published.push_front(draw);
            state.published.truncate(self.page_size);
            state.last_publish += self.window;
        }
        Ok(state.published.iter().cloned().collect())
    }
}

/// Flux scripté : rejoue une suite de réponses, puis répète la dernière page reçue.
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<Vec<DrawRecord>, FeedError>>>,
    last_page: Mutex<Option<Vec<DrawRecord>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<Vec<DrawRecord>, FeedError>>) -> Self {
        Self::with_delay(responses, Duration::ZERO)
    }

    /// Chaque appel attend `delay` avant de répondre.
    pub fn with_delay(responses: Vec<Result<Vec<DrawRecord>, FeedError>>, delay: Duration) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last_page: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<Vec<DrawRecord>, FeedError> {
        let poisoned = || FeedError::Transport { message: "script indisponible".to_string() };
        let next = self.responses.lock().map_err(|_| poisoned())?.pop_front();
        let mut last = self.last_page.lock().map_err(|_| poisoned())?;
        match next {
            Some(Ok(page)) => {
                *last = Some(page.clone());
                Ok(page)
            }
            Some(Err(e)) => Err(e),
            None => last.clone().ok_or(FeedError::EmptyPage),
        }
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<DrawRecord>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_response()
    }
}

/// Page du plus récent au plus ancien, périodes consécutives se terminant à `head`.
pub fn make_page(head: u64, numbers_newest_first: &[u8]) -> Vec<DrawRecord> {
    numbers_newest_first
        .iter()
        .enumerate()
        .map(|(i, &n)| DrawRecord {
            issue: IssueId::from(head - i as u64),
            number: n % 10,
        })
        .collect()
}
