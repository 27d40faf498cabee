//! Bounded-time HTTP fetching across an ordered chain of access strategies.

mod fetcher;
mod strategy;
mod transport;

pub use fetcher::{Attempt, FetchOutcome, Fetcher};
pub use strategy::{default_proxy_chain, Strategy, PROXY_TIMEOUT_MS};
pub use transport::{AttemptError, HttpResponse, ReqwestTransport, Transport};
