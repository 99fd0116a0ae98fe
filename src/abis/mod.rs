//! Solidity bindings for the V2 exchange contracts the indexer talks to.

pub mod factory;
pub mod multicall;
pub mod pair;
pub mod token;

pub use factory::IUniswapV2Factory;
pub use multicall::IMulticall3;
pub use pair::{Burn, Mint, PairCreated, Swap, Sync};
pub use token::IERC20Metadata;
