use serde::{Deserialize, Serialize};

/// Query-string paging and sorting shared by every list endpoint.
/// `sort=field` sorts ascending, `sort=-field` descending; which fields are
/// sortable is up to each endpoint's key extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub sort: Option<String>,
}

impl ListQuery {
    /// Sort key with the leading `-` stripped, plus descending flag.
    pub fn sort_key(&self) -> Option<(&str, bool)> {
        self.sort.as_deref().map(|raw| {
            raw.strip_prefix('-')
                .map_or((raw, false), |field| (field, true))
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Applies one-based paging to an already-filtered, already-sorted set.
/// Pages past the end come back empty rather than erroring.
pub fn paginate<T>(
    mut items: Vec<T>,
    query: &ListQuery,
    default_page_size: usize,
    max_page_size: usize,
) -> Paged<T> {
    let total = items.len();
    let per_page = query
        .per_page
        .unwrap_or(default_page_size)
        .clamp(1, max_page_size);
    let page = query.page.unwrap_or(1).max(1);

    let start = (page - 1).saturating_mul(per_page);
    let items = if start >= total {
        Vec::new()
    } else {
        items.drain(start..total.min(start + per_page)).collect()
    };

    Paged {
        items,
        total,
        page,
        per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::{paginate, ListQuery};

    fn query(page: Option<usize>, per_page: Option<usize>) -> ListQuery {
        ListQuery {
            page,
            per_page,
            sort: None,
        }
    }

    #[test]
    fn defaults_to_first_page() {
        let paged = paginate((0..10).collect(), &query(None, None), 3, 100);
        assert_eq!(paged.items, vec![0, 1, 2]);
        assert_eq!(paged.total, 10);
        assert_eq!(paged.page, 1);
    }

    #[test]
    fn second_page_continues_where_first_left_off() {
        let paged = paginate((0..10).collect(), &query(Some(2), Some(4)), 25, 100);
        assert_eq!(paged.items, vec![4, 5, 6, 7]);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let paged = paginate((0..3).collect::<Vec<i32>>(), &query(Some(9), Some(10)), 25, 100);
        assert!(paged.items.is_empty());
        assert_eq!(paged.total, 3);
    }

    #[test]
    fn per_page_is_clamped_to_the_configured_maximum() {
        let paged = paginate((0..500).collect::<Vec<i32>>(), &query(None, Some(9999)), 25, 200);
        assert_eq!(paged.items.len(), 200);
        assert_eq!(paged.per_page, 200);
    }

    #[test]
    fn sort_key_strips_descending_prefix() {
        let q = ListQuery {
            sort: Some("-created_at".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(q.sort_key(), Some(("created_at", true)));

        let q = ListQuery {
            sort: Some("city".to_string()),
            ..ListQuery::default()
        };
        assert_eq!(q.sort_key(), Some(("city", false)));
    }
}
