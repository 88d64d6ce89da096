//! Crawl frontier
//!
//! Queue of discovered URLs waiting to be visited, handed out in FIFO
//! (breadth-first) or LIFO (depth-first) order.

use crate::config::FrontierOrder;
use crate::url::ParsedUrl;
use std::collections::VecDeque;

/// A URL waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: String,

    pub url_info: ParsedUrl,

    /// Crawl path from the start URL, oldest first
    pub parents: Vec<String>,

    /// Whether links should be collected from this page
    pub collect: bool,

    /// Page the URL was found on
    pub referrer: Option<String>,
}

impl FrontierItem {
    /// The start URL of a crawl
    pub fn seed(url_info: ParsedUrl) -> Self {
        Self {
            url: url_info.assemble(),
            url_info,
            parents: Vec::new(),
            collect: true,
            referrer: None,
        }
    }

    /// A URL discovered on `page`, the page this item led to
    pub fn child(&self, page: &str, url_info: ParsedUrl) -> Self {
        let mut parents = self.parents.clone();
        parents.push(page.to_string());

        Self {
            url: url_info.assemble(),
            url_info,
            parents,
            collect: true,
            referrer: Some(page.to_string()),
        }
    }

    /// Number of pages between the start URL and this item
    pub fn depth(&self) -> usize {
        self.parents.len()
    }
}

/// Queue of frontier items
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierItem>,
    order: FrontierOrder,
}

impl Frontier {
    pub fn new(order: FrontierOrder) -> Self {
        Self {
            queue: VecDeque::new(),
            order,
        }
    }

    pub fn push(&mut self, item: FrontierItem) {
        self.queue.push_back(item);
    }

    pub fn pop(&mut self) -> Option<FrontierItem> {
        match self.order {
            FrontierOrder::Fifo => self.queue.pop_front(),
            FrontierOrder::Lifo => self.queue.pop_back(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
