/// The window of `rows` that fits into `max_height`, ending `scroll` rows above the bottom.
pub fn visible_rows<T>(mut rows: Vec<T>, max_height: usize, scroll: usize) -> Vec<T> {
    let end = rows.len().saturating_sub(scroll);
    let start = end.saturating_sub(max_height);
    rows.truncate(end);
    rows.drain(..start);
    rows
}

/// Largest useful scroll offset for `total` rows shown `max_height` at a time.
pub fn max_scroll(total: usize, max_height: usize) -> usize {
    total.saturating_sub(max_height)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tail_fits_height() {
        assert_eq!(visible_rows(vec![1, 2, 3, 4, 5], 2, 0), vec![4, 5]);
        assert_eq!(visible_rows(vec![1, 2], 5, 0), vec![1, 2]);
    }

    #[test]
    fn scrolled_window() {
        assert_eq!(visible_rows(vec![1, 2, 3, 4, 5], 2, 1), vec![3, 4]);
        assert_eq!(visible_rows(vec![1, 2, 3], 2, 10), Vec::<i32>::new());
    }

    #[test]
    fn scroll_bound() {
        assert_eq!(max_scroll(10, 4), 6);
        assert_eq!(max_scroll(3, 4), 0);
    }
}
