//! Client-side paging over an in-memory list.
//!
//! Pages are 1-based. The current page always stays inside
//! `[1, max(1, total_pages)]`: navigation past either end is a no-op.

/// Rows per page in the patient table.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator<T> {
    items: Vec<T>,
    page: usize,
    page_size: usize,
}

impl<T> Default for Paginator<T> {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl<T> Paginator<T> {
    /// A page size of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Replaces the list with a new result set and returns to page 1.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = 1;
    }

    /// Swaps in a reloaded list, keeping the current page when it still
    /// exists and clamping to the last page otherwise.
    pub fn reload(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = self.page.min(self.last_page());
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(len / page_size)`; zero for an empty list.
    pub fn total_pages(&self) -> usize {
        self.items.len().div_ceil(self.page_size)
    }

    fn last_page(&self) -> usize {
        self.total_pages().max(1)
    }

    /// Rows of the current page.
    pub fn visible(&self) -> &[T] {
        let start = ((self.page - 1) * self.page_size).min(self.items.len());
        let end = (self.page * self.page_size).min(self.items.len());
        &self.items[start..end]
    }

    pub fn has_next(&self) -> bool {
        self.page < self.last_page()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Advances one page; returns whether the page changed.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Steps back one page; returns whether the page changed.
    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Jumps to `page`, clamped into the valid range. Returns the page now
    /// shown.
    pub fn go_to(&mut self, page: usize) -> usize {
        self.page = page.clamp(1, self.last_page());
        self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(n: usize) -> Paginator<usize> {
        let mut p = Paginator::new(PAGE_SIZE);
        p.replace((1..=n).collect());
        p
    }

    #[test]
    fn pages_of_twenty_three_items() {
        let mut p = paginator(23);
        assert_eq!(p.total_pages(), 3);
        assert_eq!(p.visible(), (1..=10).collect::<Vec<_>>().as_slice());

        assert_eq!(p.go_to(3), 3);
        assert_eq!(p.visible(), &[21, 22, 23]);

        assert_eq!(p.go_to(4), 3);
        assert!(!p.next());
        assert_eq!(p.page(), 3);
        assert_eq!(p.visible(), &[21, 22, 23]);
    }

    #[test]
    fn previous_stops_at_first_page() {
        let mut p = paginator(23);
        assert!(!p.previous());
        assert_eq!(p.go_to(0), 1);
        assert!(p.next());
        assert!(p.previous());
        assert_eq!(p.page(), 1);
    }

    #[test]
    fn replace_resets_to_first_page() {
        let mut p = paginator(23);
        p.go_to(3);
        p.replace((1..=15).collect());
        assert_eq!(p.page(), 1);
        assert_eq!(p.visible().len(), 10);
    }

    #[test]
    fn reload_keeps_page_when_possible() {
        let mut p = paginator(23);
        p.go_to(2);
        p.reload((1..=25).collect());
        assert_eq!(p.page(), 2);

        p.go_to(3);
        p.reload((1..=12).collect());
        assert_eq!(p.page(), 2);
        assert_eq!(p.visible(), &[11, 12]);
    }

    #[test]
    fn empty_list_stays_on_page_one() {
        let mut p = paginator(0);
        assert_eq!(p.total_pages(), 0);
        assert!(p.visible().is_empty());
        assert!(!p.next());
        assert_eq!(p.go_to(5), 1);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let mut p = paginator(20);
        assert_eq!(p.total_pages(), 2);
        assert_eq!(p.go_to(3), 2);
        assert_eq!(p.visible().len(), 10);
    }
}
