use askama_actix::Template;

/// Pages shown on each side of the current one.
const PAGINATOR_LOOK_AROUND: usize = 2;

/// One entry of a rendered page bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Current(usize),
    Gap,
}

/// First and last page are always shown, plus a window around the cursor:
///
/// [1] 2 3 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 11 12 [13]
#[derive(Clone, Debug)]
pub struct Paginator {
    /// Prefix the page number is appended to, e.g. `/admin/tag/list/`.
    pub base_url: String,
    /// Appended after the page number, e.g. `?tag=3`. Usually empty.
    pub query: String,
    pub this_page: usize,
    pub page_count: usize,
}

/// A page bar entry with its URL already resolved for the template.
struct PageItem {
    label: String,
    url: String,
    current: bool,
    gap: bool,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate {
    prev_url: String,
    next_url: String,
    items: Vec<PageItem>,
}

impl Paginator {
    pub fn new(base_url: impl Into<String>, this_page: usize, page_count: usize) -> Self {
        Self {
            base_url: base_url.into(),
            query: String::new(),
            this_page,
            page_count,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn url_for(&self, page: usize) -> String {
        format!("{}{}{}", self.base_url, page, self.query)
    }

    pub fn prev(&self) -> Option<usize> {
        (self.this_page > 1).then(|| self.this_page - 1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.this_page < self.page_count).then(|| self.this_page + 1)
    }

    pub fn links(&self) -> Vec<PageLink> {
        let mut links = Vec::new();
        let mut last_shown = 0;

        for page in 1..=self.page_count {
            let near = page + PAGINATOR_LOOK_AROUND >= self.this_page
                && page <= self.this_page + PAGINATOR_LOOK_AROUND;
            if page != 1 && page != self.page_count && !near {
                continue;
            }
            if last_shown + 1 < page {
                links.push(PageLink::Gap);
            }
            links.push(if page == self.this_page {
                PageLink::Current(page)
            } else {
                PageLink::Page(page)
            });
            last_shown = page;
        }

        links
    }

    pub fn as_html(&self) -> String {
        if !self.has_pages() {
            return String::new();
        }
        let items = self
            .links()
            .into_iter()
            .map(|link| match link {
                PageLink::Page(n) | PageLink::Current(n) => PageItem {
                    label: n.to_string(),
                    url: self.url_for(n),
                    current: link == PageLink::Current(n),
                    gap: false,
                },
                PageLink::Gap => PageItem {
                    label: "…".to_owned(),
                    url: String::new(),
                    current: false,
                    gap: true,
                },
            })
            .collect();
        let template = PaginatorTemplate {
            prev_url: self.prev().map(|p| self.url_for(p)).unwrap_or_default(),
            next_url: self.next().map(|p| self.url_for(p)).unwrap_or_default(),
            items,
        };
        template
            .render()
            .unwrap_or_else(|_| "[Paginator Util Error]".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::PageLink::*;
    use super::*;

    #[test]
    fn test_single_page_has_no_bar() {
        let p = Paginator::new("/admin/tag/list/", 1, 1);
        assert!(!p.has_pages());
        assert_eq!(p.as_html(), "");
        assert_eq!(p.links(), vec![Current(1)]);
    }

    #[test]
    fn test_window_in_the_middle() {
        let p = Paginator::new("/", 6, 13);
        assert_eq!(
            p.links(),
            vec![
                Page(1),
                Gap,
                Page(4),
                Page(5),
                Current(6),
                Page(7),
                Page(8),
                Gap,
                Page(13)
            ]
        );
    }

    #[test]
    fn test_window_at_edges() {
        let first = Paginator::new("/", 1, 13);
        assert_eq!(first.links(), vec![Current(1), Page(2), Page(3), Gap, Page(13)]);

        let last = Paginator::new("/", 13, 13);
        assert_eq!(last.links(), vec![Page(1), Gap, Page(11), Page(12), Current(13)]);
    }

    #[test]
    fn test_no_gap_for_adjacent_pages() {
        let p = Paginator::new("/", 4, 5);
        assert_eq!(
            p.links(),
            vec![Page(1), Page(2), Page(3), Current(4), Page(5)]
        );
    }

    #[test]
    fn test_urls_and_neighbours() {
        let p = Paginator::new("/page/", 2, 3).with_query("?tag=7");
        assert_eq!(p.url_for(3), "/page/3?tag=7");
        assert_eq!(p.prev(), Some(1));
        assert_eq!(p.next(), Some(3));
        // askama escapes the slashes, so only look at the tail
        assert!(p.as_html().contains("3?tag=7"));

        let end = Paginator::new("/page/", 3, 3);
        assert_eq!(end.next(), None);
    }
}
