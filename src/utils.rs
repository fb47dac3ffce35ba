pub(crate) trait LetChain {
    fn let_<F, R>(self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(Self) -> R;
}
impl<T> LetChain for T {
    #[inline]
    fn let_<F, R>(self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

pub(crate) trait AlsoChain {
    fn also_<F, R>(self, f: F) -> Self
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R;
}
impl<T> AlsoChain for T {
    #[inline]
    fn also_<F, R>(mut self, f: F) -> Self
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R,
    {
        f(&mut self);
        self
    }
}

/// arithmetic mean, `0.0` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        n => values.iter().sum::<f64>() / n as f64,
    }
}

/// 1-origin paging: `(start..end)` of `page` when every page holds `per_page` items.
///
/// pages past the end yield an empty range; page `0` is treated as page `1`.
pub(crate) fn page_range(total: usize, per_page: usize, page: usize) -> ::core::ops::Range<usize> {
    let page = page.max(1);
    let start = (per_page * (page - 1)).min(total);
    let end = (start + per_page).min(total);

    start..end
}

pub(crate) fn page_count(total: usize, per_page: usize) -> usize {
    match total {
        0 => 1,
        n => (n - 1) / per_page + 1,
    }
}

#[test]
fn paging_test() {
    assert_eq!(page_range(25, 10, 1), 0..10);
    assert_eq!(page_range(25, 10, 3), 20..25);
    assert_eq!(page_range(25, 10, 4), 25..25);
    assert_eq!(page_range(0, 10, 1), 0..0);
    assert_eq!(page_range(5, 10, 0), 0..5);

    assert_eq!(page_count(0, 10), 1);
    assert_eq!(page_count(10, 10), 1);
    assert_eq!(page_count(11, 10), 2);
}

#[test]
fn mean_test() {
    assert_eq!(mean(&[]), 0.0);
    assert_eq!(mean(&[4.0, 5.0, 3.0]), 4.0);
}
