//! Netscape bookmark file parsing.
//!
//! Browser exports nest folders as `<DT><H3>name</H3><DL>...</DL>`; the
//! html5ever tree puts the inner `<DL>` either inside the `<DT>` or right
//! after it depending on how sloppy the export is, so both places are checked.

use scraper::{ElementRef, Html};

use crate::error::BookmarkError;
use crate::model::{NewBookmark, ROOT_PARENT};

/// Parses a bookmark export into records in depth-first document order.
///
/// Folders use their name as both `title` and `url`, and children reference
/// them by that name through `parent_url`. Nothing is persisted and no ids
/// are assigned.
pub fn parse_bookmark_html(html: &str, user_id: i64) -> Result<Vec<NewBookmark>, BookmarkError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let has_list = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| is_named(el, "dl"));
    if !has_list {
        return Err(BookmarkError::Parse(
            "document contains no bookmark list (<dl>)".to_string(),
        ));
    }

    let mut walker = Walker {
        user_id,
        bookmarks: Vec::new(),
        pending: vec![Visit::Element(root, ROOT_PARENT.to_string())],
    };
    walker.run();
    Ok(walker.bookmarks)
}

/// One unit of outstanding work, tagged with the `parent_url` it belongs to.
enum Visit<'a> {
    Element(ElementRef<'a>, String),
    Entry(ElementRef<'a>, String),
}

/// Depth-first walk driven by an explicit stack, so arbitrarily deep exports
/// never grow the call stack.
struct Walker<'a> {
    user_id: i64,
    bookmarks: Vec<NewBookmark>,
    pending: Vec<Visit<'a>>,
}

impl<'a> Walker<'a> {
    fn run(&mut self) {
        while let Some(visit) = self.pending.pop() {
            match visit {
                Visit::Element(element, parent_url) => self.walk(element, parent_url),
                Visit::Entry(entry, parent_url) => self.visit_entry(entry, parent_url),
            }
        }
    }

    // children are pushed in reverse so they pop in document order
    fn walk(&mut self, element: ElementRef<'a>, parent_url: String) {
        if is_named(element, "dl") {
            // only direct entries; nested lists are reached through their folder
            let entries: Vec<_> = child_elements(element).filter(|c| is_named(*c, "dt")).collect();
            self.pending
                .extend(entries.into_iter().rev().map(|e| Visit::Entry(e, parent_url.clone())));
            return;
        }

        let children: Vec<_> = child_elements(element).collect();
        self.pending
            .extend(children.into_iter().rev().map(|c| Visit::Element(c, parent_url.clone())));
    }

    fn visit_entry(&mut self, entry: ElementRef<'a>, parent_url: String) {
        if let Some(heading) = child_elements(entry).find(|c| is_named(*c, "h3")) {
            let name = direct_text(heading);
            if name.is_empty() {
                return;
            }
            self.bookmarks
                .push(NewBookmark::folder(self.user_id, &name, &parent_url));

            let list = child_elements(entry).find(|c| is_named(*c, "dl")).or_else(|| {
                entry
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|s| is_named(*s, "dl"))
            });
            if let Some(list) = list {
                self.pending.push(Visit::Element(list, name));
            }
            return;
        }

        if let Some(link) = child_elements(entry).find(|c| is_named(*c, "a")) {
            let href = link.value().attr("href").unwrap_or_default();
            if href.is_empty() {
                return;
            }
            let title = direct_text(link);
            self.bookmarks
                .push(NewBookmark::leaf(self.user_id, &title, href, &parent_url));
        }
    }
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn is_named(element: ElementRef<'_>, name: &str) -> bool {
    element.value().name() == name
}

/// Text of the immediate text children only, trimmed.
fn direct_text(element: ElementRef<'_>) -> String {
    let text: String = element
        .children()
        .filter_map(|c| c.value().as_text().map(|t| &**t))
        .collect();
    text.trim().to_string()
}
