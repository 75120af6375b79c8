use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u64),
    Ellipsis,
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageMarker::Page(n) => write!(f, "{}", n),
            PageMarker::Ellipsis => write!(f, "…"),
        }
    }
}

/// Page numbers to display: the first and last page, the current page and its
/// neighbours, with every gap collapsed into one ellipsis.
pub fn page_markers(total_pages: u64, current: u64) -> Vec<PageMarker> {
    let total = total_pages.max(1);
    let current = current.clamp(1, total);

    let mut pages: Vec<u64> = [1, current.saturating_sub(1), current, current + 1, total]
        .into_iter()
        .filter(|p| (1..=total).contains(p))
        .collect();
    pages.sort_unstable();
    pages.dedup();

    let mut markers = Vec::with_capacity(pages.len() + 2);
    let mut previous = None;
    for page in pages {
        if matches!(previous, Some(prev) if page > prev + 1) {
            markers.push(PageMarker::Ellipsis);
        }
        markers.push(PageMarker::Page(page));
        previous = Some(page);
    }
    markers
}
