use std::collections::BTreeMap;

use lokimap_core::error::{LokimapError, Result};
use lokimap_core::lineparse::parse_line;
use lokimap_core::logql::build_query;
use lokimap_core::model::log::LogRecord;
use lokimap_core::query::{Direction, QuerySpec};
use lokimap_core::time::to_nanos;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::client::LokiTransport;

/// Pagination state: the window bound currently being advanced plus the
/// running count of accumulated records. An owned value threaded through the
/// fetch loop; each step is pure so the ±1 ns rule is testable without I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub bound_ns: i64,
    pub fetched: usize,
}

impl Cursor {
    pub fn begin(spec: &QuerySpec) -> Self {
        let bound_ns = match spec.direction {
            Direction::Backward => to_nanos(spec.end),
            Direction::Forward => to_nanos(spec.start),
        };
        Self {
            bound_ns,
            fetched: 0,
        }
    }

    /// Steps the bound one nanosecond past the last consumed record. The
    /// store's windows are inclusive on both ends, so reusing the boundary
    /// timestamp would refetch that record forever.
    pub fn advance(self, last_record_ns: i64, direction: Direction) -> Self {
        let bound_ns = match direction {
            Direction::Backward => last_record_ns - 1,
            Direction::Forward => last_record_ns + 1,
        };
        Self { bound_ns, ..self }
    }

    pub fn absorbed(self, batch_len: usize) -> Self {
        Self {
            fetched: self.fetched + batch_len,
            ..self
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    #[serde(default)]
    data: QueryRangeData,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryRangeData {
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    // Observed upstream revisions disagree on the payload key; `stream` is
    // canonical, `labels` decodes too.
    #[serde(default, alias = "labels")]
    stream: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(String, String)>,
}

/// Drives the windowed `query_range` pagination protocol until the spec's
/// window is exhausted or its limit is met, returning the full buffered
/// record sequence in the store's order for the requested direction.
///
/// Batches are strictly sequential: each window bound depends on the
/// previous batch's last record. A failed fetch aborts the whole query and
/// discards anything already accumulated; retry policy belongs to the
/// transport, not this loop.
pub async fn query_logs<T: LokiTransport>(
    transport: &T,
    spec: &QuerySpec,
) -> Result<Vec<LogRecord>> {
    let query = build_query(spec);
    let start_ns = to_nanos(spec.start);
    let end_ns = to_nanos(spec.end);

    let mut all = Vec::new();
    let mut cursor = Cursor::begin(spec);

    loop {
        let batch_size = match spec.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(cursor.fetched);
                if remaining == 0 {
                    break;
                }
                spec.batch_size.min(remaining)
            }
            None => spec.batch_size,
        };

        let (window_start, window_end) = match spec.direction {
            Direction::Backward => (start_ns, cursor.bound_ns),
            Direction::Forward => (cursor.bound_ns, end_ns),
        };

        let params = [
            ("query".to_string(), query.clone()),
            ("start".to_string(), window_start.to_string()),
            ("end".to_string(), window_end.to_string()),
            ("direction".to_string(), spec.direction.as_str().to_string()),
            ("limit".to_string(), batch_size.to_string()),
        ];

        let body = transport.get_json("/query_range", &params).await?;
        let batch = decode_batch(body, spec.parse_fields)?;
        let batch_len = batch.len();
        let last_ns = batch.last().map(|r| r.ts_nanos);

        tracing::debug!(
            batch = batch_len,
            total = cursor.fetched + batch_len,
            "fetched loki batch"
        );
        all.extend(batch);
        cursor = cursor.absorbed(batch_len);

        // Short batch: the store has no more matching data in range.
        if batch_len < batch_size {
            break;
        }
        if let Some(limit) = spec.limit
            && cursor.fetched >= limit
        {
            break;
        }
        // Guard against a store returning an empty-but-not-short batch.
        let Some(last_ns) = last_ns else {
            break;
        };

        cursor = cursor.advance(last_ns, spec.direction);
    }

    Ok(all)
}

fn decode_batch(body: Value, parse_fields: bool) -> Result<Vec<LogRecord>> {
    let response: QueryRangeResponse = serde_json::from_value(body)
        .map_err(|e| LokimapError::Upstream(format!("malformed query_range response: {e}")))?;

    if response.status != "success" {
        let detail = response.error.unwrap_or_else(|| response.status.clone());
        return Err(LokimapError::Upstream(format!("loki query failed: {detail}")));
    }

    let mut records = Vec::new();
    for stream in response.data.result {
        for (ts, line) in stream.values {
            let ts_nanos = ts.parse::<i64>().map_err(|e| {
                LokimapError::Upstream(format!("bad timestamp {ts} in response: {e}"))
            })?;
            let fields = if parse_fields {
                parse_line(&line).unwrap_or_default()
            } else {
                Map::new()
            };
            records.push(LogRecord::new(ts_nanos, stream.stream.clone(), line, fields));
        }
    }
    Ok(records)
}
