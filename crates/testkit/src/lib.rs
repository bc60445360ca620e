use chrono::{Duration, Utc};
use lokimap_core::Result;
use lokimap_core::time::to_nanos;
use lokimap_loki::LokiTransport;
use serde_json::{Value, json};

/// Base instant for canned fixtures: one hour ago, so records land inside
/// any recent query window.
pub fn base_nanos() -> i64 {
    to_nanos(Utc::now() - Duration::hours(1))
}

/// Two complete movement spans and one dangling start marker for the given
/// account, as (nanos, line) pairs sorted oldest-first. The lines are the
/// JSON shape the bot emits.
pub fn movement_lines(account_id: i64) -> Vec<(i64, String)> {
    let base = base_nanos();
    let line = |span: &str, message: &str| {
        json!({
            "span_id": span,
            "message": message,
            "account_id": account_id,
            "name": "Иван",
        })
        .to_string()
    };

    vec![
        (
            base,
            line("span-a", "Начало MainMenuService.handle_go_to_content"),
        ),
        (
            base + 648_000_000,
            line("span-a", "Завершение MainMenuService.handle_go_to_content"),
        ),
        (
            base + 2_000_000_000,
            line("span-b", "Начало ContentMenuService.handle_go_to_main_menu"),
        ),
        (
            base + 67_000_000_000,
            line("span-b", "Завершение ContentMenuService.handle_go_to_main_menu"),
        ),
        (
            base + 70_000_000_000,
            line("span-c", "Начало AlertsService.handle_go_to_video_drafts"),
        ),
    ]
}

/// Wraps (nanos, line) pairs into a Loki `query_range` success body under a
/// single stream.
pub fn query_range_body(label_service: &str, records: &[(i64, String)]) -> Value {
    let values: Vec<Value> = records
        .iter()
        .map(|(ts, line)| json!([ts.to_string(), line]))
        .collect();
    json!({
        "status": "success",
        "data": {
            "result": [{
                "stream": {"service_name": label_service},
                "values": values,
            }]
        }
    })
}

/// In-memory Loki standing in for the real store: honours the window bounds
/// (inclusive), direction, and per-request limit of `query_range`.
pub struct FakeLoki {
    pub service: String,
    pub records: Vec<(i64, String)>,
}

impl FakeLoki {
    pub fn new(records: Vec<(i64, String)>) -> Self {
        Self {
            service: "loom-tg-bot".to_string(),
            records,
        }
    }
}

impl LokiTransport for FakeLoki {
    async fn get_json(&self, _path: &str, params: &[(String, String)]) -> Result<Value> {
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default()
        };
        let start: i64 = get("start").parse().unwrap_or(i64::MIN);
        let end: i64 = get("end").parse().unwrap_or(i64::MAX);
        let limit: usize = get("limit").parse().unwrap_or(usize::MAX);
        let backward = get("direction") != "forward";

        let mut matched: Vec<(i64, String)> = self
            .records
            .iter()
            .filter(|(ts, _)| *ts >= start && *ts <= end)
            .cloned()
            .collect();
        matched.sort_by_key(|(ts, _)| if backward { -*ts } else { *ts });
        matched.truncate(limit);

        Ok(query_range_body(&self.service, &matched))
    }
}
