use crate::domain::SearchResult;

/// One external literature index.
///
/// `search` must never fail at the call boundary: implementations absorb
/// network and parse errors internally, report them through `tracing`, and
/// return an empty list. Error detail is observability, not control flow.
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn search(&self, query: &str, limit: usize) -> Vec<SearchResult>;
}
