use std::collections::{HashSet, VecDeque};
use url::{Origin, Url};

/// Resolves a raw `href` against the page it was found on.
///
/// Returns `None` for script, mail, phone and data links, for same-page
/// anchors, and for anything that does not resolve to http(s).
pub fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"].iter().any(|s| lower.starts_with(s)) {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Key used for visited/pending dedup: the absolute URL without its fragment.
pub fn dedup_key(url: &Url) -> String {
    let mut u = url.clone();
    u.set_fragment(None);
    u.to_string()
}

/// Pending URLs of one crawl plus everything already seen or fetched.
///
/// Breadth-first. Depths in `pending` never decrease from front to back, and
/// as long as a whole level is expanded before the next one is popped (see
/// [`Frontier::next_depth`]) the first time a page is reached is along its
/// shortest path from the seed.
#[derive(Debug)]
pub struct Frontier {
    origin: Origin,
    max_depth: Option<usize>,
    pending: VecDeque<(Url, usize)>,
    /// Keys ever enqueued.
    seen: HashSet<String>,
    visited: HashSet<String>,
    skipped: usize,
}

impl Frontier {
    pub fn new(seed: Url, max_depth: Option<usize>) -> Self {
        let mut frontier = Self {
            origin: seed.origin(),
            max_depth,
            pending: VecDeque::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            skipped: 0,
        };
        frontier.seen.insert(dedup_key(&seed));
        frontier.pending.push_back((seed, 0));
        frontier
    }

    pub fn origin(&self) -> &Origin { &self.origin }

    pub fn same_origin(&self, url: &Url) -> bool { url.origin() == self.origin }

    /// Next URL to fetch with its depth. Already visited URLs are dropped here
    /// and the returned one is marked visited before it is handed out.
    pub fn pop(&mut self) -> Option<(Url, usize)> {
        while let Some((url, depth)) = self.pending.pop_front() {
            if self.mark_visited(&url) {
                return Some((url, depth));
            }
            self.skipped += 1;
        }
        None
    }

    /// Depth of the next URL `pop` would return. Visited entries at the front
    /// are dropped first.
    pub fn next_depth(&mut self) -> Option<usize> {
        while let Some((url, depth)) = self.pending.front() {
            if !self.is_visited(url) {
                return Some(*depth);
            }
            self.pending.pop_front();
            self.skipped += 1;
        }
        None
    }

    /// Returns false if the URL had been visited before.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        let key = dedup_key(url);
        self.seen.insert(key.clone());
        self.visited.insert(key)
    }

    pub fn is_visited(&self, url: &Url) -> bool { self.visited.contains(&dedup_key(url)) }

    /// Queues the same-origin links of a page fetched at `parent_depth`.
    /// Returns how many new URLs were added.
    pub fn enqueue_links(&mut self, base: &Url, parent_depth: usize, hrefs: &[String]) -> usize {
        let depth = parent_depth + 1;
        if self.max_depth.is_some_and(|max| depth > max) {
            return 0;
        }
        let mut added = 0;
        for href in hrefs {
            let Some(mut url) = resolve_link(href, base) else { continue };
            if !self.same_origin(&url) {
                continue;
            }
            url.set_fragment(None);
            if self.seen.insert(url.to_string()) {
                self.pending.push_back((url, depth));
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize { self.pending.len() }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    pub fn visited_count(&self) -> usize { self.visited.len() }

    /// Pops that were dropped because the URL was already visited.
    pub fn skipped(&self) -> usize { self.skipped }
}
