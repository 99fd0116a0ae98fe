//! Log parsing for V2 exchange events.
//!
//! Decodes RPC logs into typed structures once, in chain order, so the
//! indexer can apply them strictly sequentially.

use alloy::{primitives::B256, rpc::types::Log, sol_types::SolEvent};

use crate::{
    abis::{Burn, Mint, PairCreated, Swap, Sync},
    utils::address_id,
};

/// Pre-parsed log with the metadata needed for processing.
pub enum ParsedLog {
    PairCreated {
        event: PairCreated,
        log_address: String,
        block_number: u64,
        log_index: u64,
    },
    Sync {
        event: Sync,
        log_address: String,
        block_number: u64,
        log_index: u64,
    },
    Swap {
        event: Swap,
        log_address: String,
        block_number: u64,
        log_index: u64,
    },
    Mint {
        event: Mint,
        log_address: String,
        block_number: u64,
        log_index: u64,
    },
    Burn {
        event: Burn,
        log_address: String,
        block_number: u64,
        log_index: u64,
    },
}

impl ParsedLog {
    /// (block number, log index), the chain ordering key.
    pub fn position(&self) -> (u64, u64) {
        match self {
            ParsedLog::PairCreated { block_number, log_index, .. }
            | ParsedLog::Sync { block_number, log_index, .. }
            | ParsedLog::Swap { block_number, log_index, .. }
            | ParsedLog::Mint { block_number, log_index, .. }
            | ParsedLog::Burn { block_number, log_index, .. } => (*block_number, *log_index),
        }
    }
}

/// Result of parsing a batch of logs.
pub struct ParseResult {
    /// Parsed logs sorted by (block, log index)
    pub parsed_logs: Vec<ParsedLog>,
    /// Token addresses referenced by `PairCreated` (for fetching metadata)
    pub token_addresses: Vec<String>,
}

/// Topic0 of every event the indexer consumes.
pub fn event_signatures() -> Vec<B256> {
    vec![
        PairCreated::SIGNATURE_HASH,
        Sync::SIGNATURE_HASH,
        Swap::SIGNATURE_HASH,
        Mint::SIGNATURE_HASH,
        Burn::SIGNATURE_HASH,
    ]
}

/// Decode RPC logs. Logs with an unknown topic or undecodable data are
/// dropped; removed (reorged) logs are skipped.
pub fn parse_logs(logs: impl IntoIterator<Item = Log>) -> ParseResult {
    let mut parsed_logs: Vec<ParsedLog> = Vec::new();
    let mut token_addresses: Vec<String> = Vec::new();

    for log in logs {
        if log.removed {
            continue;
        }

        let data = &log.inner.data;
        let Some(topic0) = data.topics().first() else {
            continue;
        };

        let log_address = address_id(&log.inner.address);
        let block_number = log.block_number.unwrap_or(0);
        let log_index = log.log_index.unwrap_or(0);

        match *topic0 {
            t if t == PairCreated::SIGNATURE_HASH => {
                if let Ok(event) = PairCreated::decode_log_data(data) {
                    token_addresses.push(address_id(&event.token0));
                    token_addresses.push(address_id(&event.token1));
                    parsed_logs.push(ParsedLog::PairCreated {
                        event,
                        log_address,
                        block_number,
                        log_index,
                    });
                }
            },
            t if t == Sync::SIGNATURE_HASH => {
                if let Ok(event) = Sync::decode_log_data(data) {
                    parsed_logs.push(ParsedLog::Sync {
                        event,
                        log_address,
                        block_number,
                        log_index,
                    });
                }
            },
            t if t == Swap::SIGNATURE_HASH => {
                if let Ok(event) = Swap::decode_log_data(data) {
                    parsed_logs.push(ParsedLog::Swap {
                        event,
                        log_address,
                        block_number,
                        log_index,
                    });
                }
            },
            t if t == Mint::SIGNATURE_HASH => {
                if let Ok(event) = Mint::decode_log_data(data) {
                    parsed_logs.push(ParsedLog::Mint {
                        event,
                        log_address,
                        block_number,
                        log_index,
                    });
                }
            },
            t if t == Burn::SIGNATURE_HASH => {
                if let Ok(event) = Burn::decode_log_data(data) {
                    parsed_logs.push(ParsedLog::Burn {
                        event,
                        log_address,
                        block_number,
                        log_index,
                    });
                }
            },
            _ => {},
        }
    }

    // Stable: logs sharing a position keep their RPC order
    parsed_logs.sort_by_key(|log| log.position());

    ParseResult {
        parsed_logs,
        token_addresses,
    }
}
