//! Scripted fetcher and listing markup shared by the crate's unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use booktags_api::{FetchFailure, Identity, IdentityPool, RawPage};

use crate::config::{CrawlPolicy, DelayRange};
use crate::crawl::Crawler;
use crate::fetch::PageFetch;
use crate::selectors::{Selectors, SiteSelectors};

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub user_agent: String,
}

/// Answers listing reads from a queue and detail reads from fixed routes.
/// An exhausted queue answers with a transport failure.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<String, FetchFailure>>>,
    routes: HashMap<String, Result<String, u16>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<String, FetchFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Serves `body` for every read of `url`, bypassing the queue.
    pub fn with_route(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    /// Answers every read of `url` with `status`.
    pub fn with_failing_route(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn listing_requests(&self, topic: &str) -> usize {
        let prefix = format!("mock://tag/{}?", topic);
        self.requests()
            .iter()
            .filter(|r| r.url.starts_with(&prefix))
            .count()
    }
}

#[async_trait]
impl PageFetch for ScriptedFetcher {
    fn listing_url(&self, topic: &str, start: u32) -> Result<String, FetchFailure> {
        Ok(format!("mock://tag/{}?start={}", topic, start))
    }

    async fn fetch(&self, url: &str, identity: &Identity) -> Result<RawPage, FetchFailure> {
        self.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            user_agent: identity.user_agent.clone(),
        });

        let body = match self.routes.get(url) {
            Some(Ok(body)) => body.clone(),
            Some(Err(status)) => return Err(FetchFailure::Status { status: *status }),
            None => {
                let next = self.script.lock().unwrap().pop_front();
                next.unwrap_or_else(|| Err(FetchFailure::Transport("script exhausted".into())))?
            }
        };

        Ok(RawPage {
            url: url.to_string(),
            status: 200,
            body,
        })
    }
}

/// Policy with no delay and the default thresholds.
pub fn policy() -> CrawlPolicy {
    CrawlPolicy {
        delay: DelayRange::none(),
        ..CrawlPolicy::default()
    }
}

pub fn crawler(fetcher: ScriptedFetcher, policy: CrawlPolicy) -> Crawler<ScriptedFetcher> {
    let selectors = Selectors::compile(&SiteSelectors::default()).unwrap();
    Crawler::new(fetcher, IdentityPool::default(), selectors, policy)
}

/// One listing entry. A zero count renders the site's "no ratings yet" text.
pub fn item(title: &str, rating: &str, count: u64) -> String {
    item_with_url(title, rating, count, &format!("https://book.example/subject/{}/", title))
}

pub fn item_with_url(title: &str, rating: &str, count: u64, url: &str) -> String {
    let votes = if count == 0 {
        "(目前无人评价)".to_string()
    } else {
        format!("({}人评价)", count)
    };
    format!(
        r#"<li class="subject-item">
             <div class="info">
               <h2><a href="{url}" title="{title}">{title}</a></h2>
               <div class="pub">Author / Press / 2020-1 / 39.00元</div>
               <div class="star clearfix">
                 <span class="rating_nums">{rating}</span>
                 <span class="pl">{votes}</span>
               </div>
               <p>About {title}.</p>
             </div>
           </li>"#
    )
}

/// A listing page wrapping `items`.
pub fn listing(items: &[String]) -> String {
    format!(
        r#"<html><body><div id="subject_list"><ul class="subject-list">{}</ul></div></body></html>"#,
        items.join("\n")
    )
}

/// A detail page carrying `votes` in the rating summary.
pub fn detail_page(votes: u64) -> String {
    format!(
        r#"<html><body><div class="rating_sum"><a href="collections" class="rating_people"><span property="v:votes">{}</span>人评价</a></div></body></html>"#,
        votes
    )
}
