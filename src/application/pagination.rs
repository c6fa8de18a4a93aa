//! Text chunking and the page navigation state machine

use crate::domain::traits::PageView;

/// Wrap text in a fenced code block
pub fn box_text(text: &str, lang: &str) -> String {
    format!("```{}\n{}```", lang, text)
}

/// Split `text` into chunks of at most `page_length` characters.
///
/// Breaks at the last newline before the boundary when there is one (the
/// newline itself is dropped), otherwise at the boundary. Chunks are trimmed
/// and blank chunks are skipped.
pub fn pagify(text: &str, page_length: usize) -> Vec<String> {
    let page_length = page_length.max(1);
    let mut pages = Vec::new();
    let mut rest = text;

    while rest.chars().count() > page_length {
        let boundary = rest
            .char_indices()
            .nth(page_length)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        match rest[..boundary].rfind('\n') {
            Some(newline) => {
                push_page(&mut pages, &rest[..newline]);
                rest = &rest[newline + 1..];
            }
            None => {
                push_page(&mut pages, &rest[..boundary]);
                rest = &rest[boundary..];
            }
        }
    }
    push_page(&mut pages, rest);
    pages
}

fn push_page(pages: &mut Vec<String>, page: &str) {
    let page = page.trim();
    if !page.is_empty() {
        pages.push(page.to_string());
    }
}

/// Navigation controls of a paginated view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageAction {
    First,
    Previous,
    Stop,
    Next,
    Last,
}

impl PageAction {
    /// Controls in display order
    pub const ALL: [PageAction; 5] = [
        PageAction::First,
        PageAction::Previous,
        PageAction::Stop,
        PageAction::Next,
        PageAction::Last,
    ];

    pub fn custom_id(self) -> &'static str {
        match self {
            PageAction::First => "pager:first",
            PageAction::Previous => "pager:prev",
            PageAction::Stop => "pager:stop",
            PageAction::Next => "pager:next",
            PageAction::Last => "pager:last",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.custom_id() == id)
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PageAction::First => "\u{23EA}",
            PageAction::Previous => "\u{25C0}\u{FE0F}",
            PageAction::Stop => "\u{2716}\u{FE0F}",
            PageAction::Next => "\u{25B6}\u{FE0F}",
            PageAction::Last => "\u{23E9}",
        }
    }
}

/// Result of applying a [`PageAction`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Re-render with this view
    Show(PageView),
    /// The session is over; remove the rendered message
    Close,
}

/// Paginated view state: the pages, who may drive them, and where we are
#[derive(Debug, Clone)]
pub struct Paginator {
    title: String,
    pages: Vec<String>,
    current: usize,
    author_id: u64,
    stopped: bool,
}

impl Paginator {
    pub fn new(title: impl Into<String>, pages: Vec<String>, author_id: u64) -> Self {
        let pages = if pages.is_empty() { vec![String::new()] } else { pages };
        Self {
            title: title.into(),
            pages,
            current: 0,
            author_id,
            stopped: false,
        }
    }

    /// Chunk `text` with [`pagify`] and page through the chunks
    pub fn from_text(title: impl Into<String>, text: &str, page_length: usize, author_id: u64) -> Self {
        Self::new(title, pagify(text, page_length), author_id)
    }

    pub fn current_page(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn author_id(&self) -> u64 {
        self.author_id
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn view(&self) -> PageView {
        PageView {
            title: self.title.clone(),
            body: box_text(&self.pages[self.current], "yml"),
            footer: format!("Page {}/{}", self.current + 1, self.pages.len()),
        }
    }

    pub fn first(&mut self) -> PageView {
        self.current = 0;
        self.view()
    }

    /// One page back, wrapping to the last page
    pub fn previous(&mut self) -> PageView {
        self.current = self.current.checked_sub(1).unwrap_or(self.pages.len() - 1);
        self.view()
    }

    /// One page forward, wrapping to the first page
    pub fn next(&mut self) -> PageView {
        self.current = (self.current + 1) % self.pages.len();
        self.view()
    }

    pub fn last(&mut self) -> PageView {
        self.current = self.pages.len() - 1;
        self.view()
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn apply(&mut self, action: PageAction) -> Transition {
        if self.stopped {
            return Transition::Close;
        }
        match action {
            PageAction::First => Transition::Show(self.first()),
            PageAction::Previous => Transition::Show(self.previous()),
            PageAction::Next => Transition::Show(self.next()),
            PageAction::Last => Transition::Show(self.last()),
            PageAction::Stop => {
                self.stop();
                Transition::Close
            }
        }
    }
}
