use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::NameCatalog;
use crate::model::log::LogRecord;
use crate::model::movement::MovementEntry;

/// Field carrying the correlation key that groups start/end records.
pub const SPAN_FIELD: &str = "span_id";

pub const START_MARKER: &str = "Начало";
pub const END_MARKER: &str = "Завершение";

// `<marker> <Service>.<method>` anywhere in the effective message.
static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Начало|Завершение)\s+([A-Za-z_]\w*)\.(\w+)").expect("static pattern")
});

struct Marked<'a> {
    record: &'a LogRecord,
    service: String,
    method: String,
}

#[derive(Default)]
struct SpanMarkers<'a> {
    start: Option<Marked<'a>>,
    end: Option<Marked<'a>>,
}

/// Pairs start/end marker records by span and emits the chronological
/// movement timeline. Best-effort by design: records without a span id or a
/// recognizable marker are skipped, spans missing either marker are dropped,
/// and nothing here ever fails.
pub fn reconstruct(records: &[LogRecord], catalog: &NameCatalog) -> Vec<MovementEntry> {
    let mut spans: HashMap<String, SpanMarkers> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for record in records {
        let Some(span_id) = record.get_str(SPAN_FIELD) else {
            continue;
        };
        let message = record
            .get_str("message")
            .unwrap_or_else(|| record.message.clone());
        let Some(caps) = MARKER_PATTERN.captures(&message) else {
            tracing::debug!(%span_id, "no movement marker in message, skipping record");
            continue;
        };

        let marked = Marked {
            record,
            service: caps[2].to_string(),
            method: caps[3].to_string(),
        };
        let slot = spans.entry(span_id.clone()).or_insert_with(|| {
            order.push(span_id.clone());
            SpanMarkers::default()
        });

        // First observed record per marker kind wins.
        if &caps[1] == START_MARKER {
            if slot.start.is_none() {
                slot.start = Some(marked);
            }
        } else if slot.end.is_none() {
            slot.end = Some(marked);
        }
    }

    let mut entries = Vec::new();
    for span_id in &order {
        let slot = &spans[span_id];
        let (Some(start), Some(end)) = (&slot.start, &slot.end) else {
            // Incomplete spans are expected: the operation may not finish
            // inside the query window.
            continue;
        };

        let duration_secs = (end.record.ts_nanos - start.record.ts_nanos) as f64 / 1e9;
        entries.push(MovementEntry {
            account_id: start.record.get_i64("account_id").unwrap_or_default(),
            user_name: start.record.get_str("name").unwrap_or_default(),
            start: start.record.ts,
            end: end.record.ts,
            duration: format_duration(duration_secs),
            service: catalog.service_display(&start.service).to_string(),
            method: catalog.method_display(&start.service, &start.method).to_string(),
            service_id: start.service.clone(),
            method_id: start.method.clone(),
        });
    }

    // Stable, so spans starting at the same instant keep grouping order.
    entries.sort_by_key(|e| e.start);
    entries
}

/// Formats a fractional-second duration for the timeline. Negative values
/// (end-marker clock behind the start marker) keep their sign: an anomaly
/// worth seeing, not an error.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 {
        return format!("-{}", format_duration(-seconds));
    }
    if seconds < 1.0 {
        return format!("{} мс", (seconds * 1000.0).round() as i64);
    }
    if seconds < 60.0 {
        return format!("{seconds:.2} с");
    }
    if seconds < 3600.0 {
        let minutes = (seconds / 60.0) as i64;
        let rem = (seconds % 60.0) as i64;
        if rem == 0 {
            format!("{minutes} мин")
        } else {
            format!("{minutes} мин {rem} с")
        }
    } else {
        let hours = (seconds / 3600.0) as i64;
        let rem = ((seconds % 3600.0) / 60.0) as i64;
        if rem == 0 {
            format!("{hours} ч")
        } else {
            format!("{hours} ч {rem} мин")
        }
    }
}
