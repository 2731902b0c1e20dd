use serde::{Deserialize, Serialize};

/// Rows per page on every admin listing.
pub const PAGE_SIZE: usize = 10;

/// `?page=` on listing endpoints, 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices `items` into the requested 1-based page. Pages past the end are empty;
/// page 0 is treated as page 1.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);

    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 1, PAGE_SIZE);
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 25);
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 3, PAGE_SIZE);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = paginate(vec![1, 2, 3], 4, PAGE_SIZE);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let page = paginate(vec![1, 2, 3], 0, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn test_empty_input() {
        let page = paginate(Vec::<u8>::new(), 1, PAGE_SIZE);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }
}
