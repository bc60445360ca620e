use crate::query::{QuerySpec, SearchMode, SearchTerms};

/// The label every stream in the store is expected to carry. Used for the
/// catch-all selector when no label filters are given: an unconstrained
/// selector against a multi-tenant store is prohibitively expensive, so the
/// builder never emits one.
pub const PRIMARY_LABEL: &str = "service_name";

/// Renders a `QuerySpec` into a LogQL query string. Pure and deterministic:
/// filters are emitted in declaration order, no I/O happens here.
pub fn build_query(spec: &QuerySpec) -> String {
    let mut query = if spec.label_filters.is_empty() {
        format!("{{{PRIMARY_LABEL}=~\".+\"}}")
    } else {
        let selectors = spec
            .label_filters
            .iter()
            .map(|(key, value)| format!("{key}=\"{value}\""))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{selectors}}}")
    };

    for (key, value) in &spec.content_filters {
        query.push_str(&format!(" | {key}=`{value}`"));
    }

    match &spec.search {
        None => {}
        Some(SearchTerms::Single(term)) => {
            query.push_str(&format!(" |= \"{term}\""));
        }
        Some(SearchTerms::Multiple(terms, SearchMode::And)) => {
            for term in terms {
                query.push_str(&format!(" |= \"{term}\""));
            }
        }
        Some(SearchTerms::Multiple(terms, SearchMode::Or)) => {
            if !terms.is_empty() {
                let alternation = terms
                    .iter()
                    .map(|term| regex::escape(term))
                    .collect::<Vec<_>>()
                    .join("|");
                query.push_str(&format!(" |~ \"({alternation})\""));
            }
        }
    }

    query
}
