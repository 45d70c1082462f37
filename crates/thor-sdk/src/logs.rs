//! Event log filtering
//!
//! A query's criteria set is OR-ed: a log is returned when it satisfies any
//! entry. Results keep the node's chronological order, made deterministic by
//! a stable sort on (block number, log index, criteria position), and are
//! reversed for descending queries. Indexes are always requested; rows the
//! node returns without them keep their row order within a block. Decoding picks the first criteria entry
//! that matches a log and parses it with that entry's event; a mismatch
//! between the two is an error, never a silent `None`.

use thor_primitives::Address;

use crate::abi::{DecodedEvent, EventDef, IndexedArgs};
use crate::thor::ThorClient;
use crate::types::{
    EventCriteria, EventLogQuery, LogOptions, LogOrder, LogRange, NativeEventLog,
};
use crate::SdkError;

/// Criteria entry paired with the event that decodes its matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    /// Topic filter sent to the node
    pub criteria: EventCriteria,
    /// Event used for decoding
    pub event: EventDef,
}

impl EventFilter {
    /// Criteria derived from `event` and the given indexed values
    pub fn new(
        event: EventDef,
        address: Option<Address>,
        args: &IndexedArgs,
    ) -> Result<Self, SdkError> {
        let criteria = event.criteria(address, args)?;
        Ok(Self { criteria, event })
    }

    /// Pair a hand-written criteria entry with an event. The pairing is
    /// checked when matching logs are decoded.
    pub fn with_criteria(criteria: EventCriteria, event: EventDef) -> Self {
        Self { criteria, event }
    }
}

/// A native log and its decoded arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    /// Log as returned by the node
    pub log: NativeEventLog,
    /// Decoded arguments
    pub decoded: DecodedEvent,
}

/// Stable chronological ordering; position of the first matching criteria
/// breaks ties between logs that share block and log index. Rows without a
/// log index are only ordered by block, so the node's row order stands.
fn order_logs(logs: &mut [NativeEventLog], criteria_set: &[EventCriteria], order: LogOrder) {
    logs.sort_by_cached_key(|log| {
        let position = match log.meta.log_index {
            Some(_) => criteria_set
                .iter()
                .position(|c| c.matches(&log.address, &log.topics))
                .unwrap_or(usize::MAX),
            None => 0,
        };
        (log.meta.block_number, log.meta.log_index, position)
    });
    if order == LogOrder::Desc {
        logs.reverse();
    }
}

fn decode_with(filter: &EventFilter, log: &NativeEventLog) -> Result<DecodedLog, SdkError> {
    let decoded = filter.event.parse_log(log.data.as_slice(), &log.topics)?;
    Ok(DecodedLog {
        log: log.clone(),
        decoded,
    })
}

impl ThorClient {
    /// Run a native log query and order its rows. Native errors, including
    /// range-window rejections, are returned unchanged.
    pub async fn filter_raw_event_logs(
        &self,
        query: &EventLogQuery,
    ) -> Result<Vec<NativeEventLog>, SdkError> {
        tracing::debug!(
            criteria = query.criteria_set.len(),
            range = ?query.range,
            "filtering event logs"
        );
        let mut logs = self.query_event_logs(query).await?;
        order_logs(&mut logs, &query.criteria_set, query.order);
        Ok(logs)
    }

    /// One flat, ordered sequence of decoded logs matching any filter.
    pub async fn filter_event_logs(
        &self,
        filters: &[EventFilter],
        range: Option<LogRange>,
        options: Option<LogOptions>,
        order: LogOrder,
    ) -> Result<Vec<DecodedLog>, SdkError> {
        let logs = self.query_filters(filters, range, options, order).await?;
        logs.iter()
            .map(|log| {
                let filter = filters
                    .iter()
                    .find(|f| f.criteria.matches(&log.address, &log.topics))
                    .ok_or_else(|| {
                        SdkError::InvalidAbiItem(format!(
                            "log {} matches none of the supplied criteria",
                            log.meta.tx_id
                        ))
                    })?;
                decode_with(filter, log)
            })
            .collect()
    }

    /// One ordered sequence per filter, positionally aligned with `filters`.
    /// A log matching several filters appears in each of their groups.
    pub async fn filter_grouped_event_logs(
        &self,
        filters: &[EventFilter],
        range: Option<LogRange>,
        options: Option<LogOptions>,
        order: LogOrder,
    ) -> Result<Vec<Vec<DecodedLog>>, SdkError> {
        let logs = self.query_filters(filters, range, options, order).await?;
        filters
            .iter()
            .map(|filter| {
                logs.iter()
                    .filter(|log| filter.criteria.matches(&log.address, &log.topics))
                    .map(|log| decode_with(filter, log))
                    .collect()
            })
            .collect()
    }

    async fn query_filters(
        &self,
        filters: &[EventFilter],
        range: Option<LogRange>,
        options: Option<LogOptions>,
        order: LogOrder,
    ) -> Result<Vec<NativeEventLog>, SdkError> {
        if filters.is_empty() {
            return Ok(Vec::new());
        }
        let options = LogOptions {
            include_indexes: true,
            ..options.unwrap_or_default()
        };
        let query = EventLogQuery {
            range,
            options: Some(options),
            criteria_set: filters.iter().map(|f| f.criteria.clone()).collect(),
            order,
        };
        self.filter_raw_event_logs(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::transfer_event;
    use crate::types::{HexBytes, LogMeta};
    use thor_primitives::H256;

    fn log(block: u32, index: Option<u32>, topics: Vec<H256>) -> NativeEventLog {
        NativeEventLog {
            address: Address::from_bytes([1; 20]),
            topics,
            data: HexBytes::default(),
            meta: LogMeta {
                block_number: block,
                log_index: index,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_order_logs_by_block_then_index() {
        let t = H256::from_low_u64_be(1);
        let mut logs = vec![log(2, Some(0), vec![t]), log(1, Some(3), vec![t]), log(1, Some(1), vec![t])];
        order_logs(&mut logs, &[], LogOrder::Asc);
        let keys: Vec<_> = logs.iter().map(|l| (l.meta.block_number, l.meta.log_index)).collect();
        assert_eq!(keys, vec![(1, Some(1)), (1, Some(3)), (2, Some(0))]);

        order_logs(&mut logs, &[], LogOrder::Desc);
        assert_eq!(logs[0].meta.block_number, 2);
    }

    #[test]
    fn test_order_ties_follow_criteria_position() {
        let a = H256::from_low_u64_be(0xa);
        let b = H256::from_low_u64_be(0xb);
        let criteria = vec![
            EventCriteria {
                topic0: Some(b),
                ..Default::default()
            },
            EventCriteria {
                topic0: Some(a),
                ..Default::default()
            },
        ];
        let mut logs = vec![log(1, Some(0), vec![a]), log(1, Some(0), vec![b])];
        order_logs(&mut logs, &criteria, LogOrder::Asc);
        assert_eq!(logs[0].topics[0], b);
    }

    #[test]
    fn test_unindexed_rows_keep_node_order() {
        let a = H256::from_low_u64_be(0xa);
        let b = H256::from_low_u64_be(0xb);
        let criteria = vec![
            EventCriteria {
                topic0: Some(b),
                ..Default::default()
            },
            EventCriteria {
                topic0: Some(a),
                ..Default::default()
            },
        ];
        let mut logs = vec![log(2, None, vec![b]), log(1, None, vec![a]), log(1, None, vec![b])];
        order_logs(&mut logs, &criteria, LogOrder::Asc);
        let order: Vec<_> = logs.iter().map(|l| (l.meta.block_number, l.topics[0])).collect();
        assert_eq!(order, vec![(1, a), (1, b), (2, b)]);
    }

    #[test]
    fn test_filter_with_mismatched_event_fails_decoding() {
        let transfer = transfer_event();
        let other = crate::abi::approval_event();
        let filter = EventFilter::with_criteria(
            EventCriteria {
                topic0: Some(transfer.selector()),
                ..Default::default()
            },
            other,
        );
        let (topics, data) = transfer
            .encode_log(&[
                crate::abi::Token::Address(Address::ZERO),
                crate::abi::Token::Address(Address::ZERO),
                crate::abi::Token::uint(1),
            ])
            .unwrap();
        let mut native = log(1, Some(0), topics);
        native.data = HexBytes(data);
        assert!(matches!(
            decode_with(&filter, &native),
            Err(SdkError::InvalidAbiItem(_))
        ));
    }
}
