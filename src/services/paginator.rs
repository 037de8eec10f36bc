use serde::Serialize;

/// Splits an ordered collection of `count` items into pages of `per_page`.
///
/// There is always at least one page, so an empty listing renders as an
/// empty first page rather than an error.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<usize>,
    pub previous_page_number: Option<usize>,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolves the raw `?page=` value: absent, non-numeric or below one
    /// gives the first page, past the end gives the last page.
    pub fn get_page_number(&self, raw: Option<&str>) -> usize {
        let number = raw
            .and_then(|r| r.trim().parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .unwrap_or(1);
        number.min(self.num_pages())
    }

    /// `(limit, offset)` of page `number` for a LIMIT/OFFSET query.
    pub fn bounds(&self, number: usize) -> (usize, usize) {
        let number = number.clamp(1, self.num_pages());
        let offset = (number - 1) * self.per_page;
        let limit = self.per_page.min(self.count.saturating_sub(offset));
        (limit, offset)
    }

    /// Wraps the already-sliced items of page `number` with its metadata.
    pub fn page<T>(&self, object_list: Vec<T>, number: usize) -> Page<T> {
        let num_pages = self.num_pages();
        let number = number.clamp(1, num_pages);
        let has_next = number < num_pages;
        let has_previous = number > 1;
        Page {
            object_list,
            number,
            num_pages,
            count: self.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then_some(number - 1),
        }
    }
}

