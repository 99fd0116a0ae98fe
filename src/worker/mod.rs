pub mod handler;
pub mod pair_fetcher;
pub mod parser;
pub mod token_fetcher;
pub mod worker;

pub use handler::{ExchangeIndexer, RefreshSummary, TrackedAmounts};
pub use pair_fetcher::PairFetcher;
pub use parser::{parse_logs, ParseResult, ParsedLog};
pub use token_fetcher::TokenFetcher;
pub use worker::{BatchResolver, ChainWorker};
