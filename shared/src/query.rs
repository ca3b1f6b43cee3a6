use std::cmp::Ordering;

use serde_json::Value;

use crate::error::ApiError;
use crate::response::Pagination;

pub const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Parsed list query: `limit`, `offset` (or 1-based `page`), multi-key
/// `sort`, and equality filters from any remaining parameter.
#[derive(Debug)]
pub struct ListParams {
    pub limit: usize,
    pub offset: usize,
    pub sort: Vec<SortKey>,
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, ApiError> {
        let mut limit = DEFAULT_LIMIT;
        let mut offset: Option<usize> = None;
        let mut page: Option<usize> = None;
        let mut sort = Vec::new();
        let mut filters = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "limit" => {
                    limit = value
                        .parse()
                        .map_err(|_| ApiError::Validation(format!("Invalid limit: {}", value)))?;
                }
                "offset" => {
                    offset = Some(value.parse().map_err(|_| {
                        ApiError::Validation(format!("Invalid offset: {}", value))
                    })?);
                }
                "page" => {
                    page = Some(value.parse().map_err(|_| {
                        ApiError::Validation(format!("Invalid page: {}", value))
                    })?);
                }
                "sort" => sort = parse_sort(value),
                _ => filters.push((key.clone(), value.clone())),
            }
        }

        // Explicit offset wins; otherwise a 1-based page converts to one.
        let offset = match (offset, page) {
            (Some(offset), _) => offset,
            (None, Some(page)) if page >= 1 => (page - 1) * limit,
            _ => 0,
        };

        Ok(ListParams {
            limit,
            offset,
            sort,
            filters,
        })
    }
}

/// `sort=a,-b`: ascending by default, `-` prefix for descending.
fn parse_sort(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: part.to_string(),
                descending: false,
            },
        })
        .collect()
}

fn matches_filter(value: Option<&Value>, want: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == want,
        Some(Value::Number(n)) => want
            .parse::<f64>()
            .map(|w| n.as_f64() == Some(w))
            .unwrap_or(false),
        Some(Value::Bool(b)) => want.parse::<bool>().map(|w| *b == w).unwrap_or(false),
        _ => false,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Missing values sort after present ones.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn compare_items(a: &Value, b: &Value, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ord = compare_values(a.get(&key.field), b.get(&key.field));
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Filter, sort, and paginate in-process. `total` reflects the post-filter
/// count of the freshly read working set.
pub fn apply(params: &ListParams, mut items: Vec<Value>) -> (Vec<Value>, Pagination) {
    items.retain(|item| {
        params
            .filters
            .iter()
            .all(|(field, want)| matches_filter(item.get(field.as_str()), want))
    });

    if !params.sort.is_empty() {
        items.sort_by(|a, b| compare_items(a, b, &params.sort));
    }

    let total = items.len();
    let page: Vec<Value> = items
        .into_iter()
        .skip(params.offset)
        .take(params.limit)
        .collect();

    (
        page,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn stock(code: &str, quantity: i64) -> Value {
        json!({"stock_code": code, "stock_name": format!("{} Inc", code), "quantity": quantity})
    }

    #[test]
    fn defaults_apply_without_parameters() {
        let params = ListParams::from_pairs(&[]).unwrap();
        assert_eq!(params.limit, DEFAULT_LIMIT);
        assert_eq!(params.offset, 0);
        assert!(params.sort.is_empty());
        assert!(params.filters.is_empty());
    }

    #[test]
    fn page_converts_to_offset() {
        let params = ListParams::from_pairs(&pairs(&[("limit", "10"), ("page", "3")])).unwrap();
        assert_eq!(params.offset, 20);
    }

    #[test]
    fn explicit_offset_wins_over_page() {
        let params =
            ListParams::from_pairs(&pairs(&[("limit", "10"), ("page", "3"), ("offset", "5")]))
                .unwrap();
        assert_eq!(params.offset, 5);
    }

    #[test]
    fn bad_limit_is_a_validation_error() {
        assert!(matches!(
            ListParams::from_pairs(&pairs(&[("limit", "lots")])),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn sort_parses_direction_per_field() {
        let params = ListParams::from_pairs(&pairs(&[("sort", "-quantity,stock_code")])).unwrap();
        assert_eq!(
            params.sort,
            vec![
                SortKey { field: "quantity".into(), descending: true },
                SortKey { field: "stock_code".into(), descending: false },
            ]
        );
    }

    #[test]
    fn pagination_grid_over_25_items() {
        let items: Vec<Value> = (0..25).map(|i| stock(&format!("S{:02}", i), i)).collect();

        let page1 = ListParams::from_pairs(&pairs(&[("limit", "10"), ("page", "1")])).unwrap();
        let (data, pagination) = apply(&page1, items.clone());
        assert_eq!(data.len(), 10);
        assert_eq!(pagination.total, 25);

        let page3 = ListParams::from_pairs(&pairs(&[("limit", "10"), ("page", "3")])).unwrap();
        let (data, pagination) = apply(&page3, items);
        assert_eq!(data.len(), 5);
        assert_eq!(pagination.total, 25);
        assert_eq!(pagination.offset, 20);
    }

    #[test]
    fn multi_key_sort_breaks_ties_left_to_right() {
        let items = vec![stock("MSFT", 5), stock("AAPL", 10), stock("GOOG", 10)];
        let params = ListParams::from_pairs(&pairs(&[("sort", "-quantity,stock_code")])).unwrap();
        let (data, _) = apply(&params, items);
        let codes: Vec<&str> = data
            .iter()
            .map(|v| v["stock_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["AAPL", "GOOG", "MSFT"]);
    }

    #[test]
    fn equality_filters_match_strings_and_numbers() {
        let items = vec![stock("AAPL", 10), stock("MSFT", 5), stock("GOOG", 10)];

        let by_code = ListParams::from_pairs(&pairs(&[("stock_code", "MSFT")])).unwrap();
        let (data, pagination) = apply(&by_code, items.clone());
        assert_eq!(data.len(), 1);
        assert_eq!(pagination.total, 1);

        let by_quantity = ListParams::from_pairs(&pairs(&[("quantity", "10")])).unwrap();
        let (data, _) = apply(&by_quantity, items);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn filter_on_absent_field_matches_nothing() {
        let items = vec![stock("AAPL", 10)];
        let params = ListParams::from_pairs(&pairs(&[("sector", "tech")])).unwrap();
        let (data, pagination) = apply(&params, items);
        assert!(data.is_empty());
        assert_eq!(pagination.total, 0);
    }

    #[test]
    fn offset_past_end_yields_empty_page_with_full_total() {
        let items: Vec<Value> = (0..3).map(|i| stock(&format!("S{}", i), i)).collect();
        let params = ListParams::from_pairs(&pairs(&[("offset", "10")])).unwrap();
        let (data, pagination) = apply(&params, items);
        assert!(data.is_empty());
        assert_eq!(pagination.total, 3);
    }
}
