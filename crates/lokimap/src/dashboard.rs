use chrono::{Duration, Utc};
use lokimap_core::catalog::NameCatalog;
use lokimap_core::config::Config;
use lokimap_core::error::{LokimapError, Result};
use lokimap_core::logql::PRIMARY_LABEL;
use lokimap_core::model::movement::MovementEntry;
use lokimap_core::query::{QuerySpec, SearchMode, SearchTerms};
use lokimap_core::timeline::{self, END_MARKER, START_MARKER};
use lokimap_loki::{LokiTransport, query_logs};

/// The one query the dashboard issues: the bot service's streams, filtered
/// to the account, restricted to lines carrying either movement marker,
/// over `[now - hours, now)`.
pub fn movement_query_spec(cfg: &Config, account_id: i64, window_hours: u32) -> QuerySpec {
    let end = Utc::now();
    let start = end - Duration::hours(i64::from(window_hours));

    let mut spec = QuerySpec::window(start, end);
    spec.label_filters = vec![(PRIMARY_LABEL.to_string(), cfg.bot_service.clone())];
    spec.content_filters = vec![("account_id".to_string(), account_id.to_string())];
    spec.search = Some(SearchTerms::Multiple(
        vec![START_MARKER.to_string(), END_MARKER.to_string()],
        SearchMode::Or,
    ));
    spec.batch_size = cfg.batch_size;
    spec
}

pub async fn get_user_movement_map<T: LokiTransport>(
    transport: &T,
    catalog: &NameCatalog,
    cfg: &Config,
    account_id: i64,
    window_hours: u32,
) -> Result<Vec<MovementEntry>> {
    if window_hours == 0 {
        return Err(LokimapError::InvalidArgument(
            "window must cover at least one hour".to_string(),
        ));
    }

    let spec = movement_query_spec(cfg, account_id, window_hours);
    let records = query_logs(transport, &spec).await?;
    tracing::debug!(
        account_id,
        window_hours,
        records = records.len(),
        "retrieved movement records"
    );

    Ok(timeline::reconstruct(&records, catalog))
}

#[cfg(test)]
mod tests {
    use lokimap_core::logql::build_query;
    use testkit::{FakeLoki, movement_lines};

    use super::*;

    #[test]
    fn spec_pins_bot_service_account_and_markers() {
        let cfg = Config::default();
        let spec = movement_query_spec(&cfg, 52, 24);
        let query = build_query(&spec);
        assert_eq!(
            query,
            "{service_name=\"loom-tg-bot\"} | account_id=`52` |~ \"(Начало|Завершение)\""
        );
        assert!(spec.end - spec.start == Duration::hours(24));
    }

    #[tokio::test]
    async fn movement_map_pairs_complete_spans_only() {
        let loki = FakeLoki::new(movement_lines(52));
        let catalog = NameCatalog::builtin();
        let cfg = Config::default();

        let entries = get_user_movement_map(&loki, &catalog, &cfg, 52, 24)
            .await
            .unwrap();

        // span-a and span-b complete; span-c has no end marker.
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service, "Сервис главного меню");
        assert_eq!(entries[0].method, "Перейти к контенту");
        assert_eq!(entries[0].duration, "648 мс");
        assert_eq!(entries[0].account_id, 52);
        assert_eq!(entries[1].service, "Сервис меню контента");
        assert_eq!(entries[1].duration, "1 мин 5 с");
        assert!(entries[0].start < entries[1].start);
    }

    #[tokio::test]
    async fn zero_window_fails_before_any_fetch() {
        let loki = FakeLoki::new(Vec::new());
        let catalog = NameCatalog::builtin();
        let cfg = Config::default();

        let err = get_user_movement_map(&loki, &catalog, &cfg, 52, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, LokimapError::InvalidArgument(_)));
    }
}
