use chrono::Utc;
use html_escape::encode_double_quoted_attribute;

use crate::freshness::FreshnessMap;
use crate::markup::Html5Markup;
use crate::models::{ThreadComment, Timestamp, WalkArgs};
use crate::walker::{self, CommentVisitor};

/// Source of "now" for the cache-busting update time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Wraps a comment markup visitor and stamps every opening tag with
/// `data-sort-time` and, when a thread has newer activity, `data-update-time`.
///
/// The freshness map lives only for the duration of one [`paged_walk`](Self::paged_walk)
/// call: it is rebuilt at the start and drained as comments are rendered.
pub struct FreshnessWalker<M = Html5Markup, C = SystemClock> {
    markup: M,
    clock: C,
    thread_latest: FreshnessMap,
    max_pages: usize,
}

impl FreshnessWalker {
    pub fn new() -> Self {
        Self::with_parts(Html5Markup, SystemClock)
    }
}

impl Default for FreshnessWalker {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: CommentVisitor, C: Clock> FreshnessWalker<M, C> {
    pub fn with_parts(markup: M, clock: C) -> Self {
        Self {
            markup,
            clock,
            thread_latest: FreshnessMap::new(),
            max_pages: 0,
        }
    }

    pub fn freshness(&self) -> &FreshnessMap {
        &self.thread_latest
    }

    // Page count from the most recent walk
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Recomputes the freshness map for `comments`, discarding whatever an
    /// earlier walk left behind. Returns the newest timestamp in the forest.
    pub fn build_thread_latest(&mut self, comments: &[ThreadComment]) -> Timestamp {
        self.thread_latest.clear();
        self.thread_latest.compute_thread_latest(comments, 0, false)
    }

    /// Renders one page of comments.
    ///
    /// Freshness is computed over the whole forest before paging so a thread's
    /// update time does not depend on which page it lands on.
    pub fn paged_walk(
        &mut self,
        comments: &[ThreadComment],
        max_depth: i32,
        page_num: i32,
        per_page: i32,
        args: &WalkArgs,
    ) -> String {
        if comments.is_empty() || max_depth < -1 {
            self.thread_latest.clear();
            self.max_pages = 0;
            return String::new();
        }

        self.build_thread_latest(comments);

        let page = walker::paged_walk(self, comments, max_depth, page_num, per_page, args);
        self.max_pages = page.max_pages;

        // Entries for threads outside this page must not leak into the next call
        if !self.thread_latest.is_empty() {
            tracing::debug!(
                remaining = self.thread_latest.len(),
                "discarding freshness entries for threads outside the rendered page"
            );
            self.thread_latest.clear();
        }
        page.html
    }

    /// Shorthand for [`paged_walk`](Self::paged_walk) using the depth and paging in `args`.
    pub fn render_page(&mut self, comments: &[ThreadComment], args: &WalkArgs) -> String {
        self.paged_walk(comments, args.max_depth, args.page, args.per_page, args)
    }

    /// Renders a single comment opening into `output` with the freshness
    /// attributes spliced into its opening tag, then drops the comment's
    /// freshness entry.
    pub fn render_node(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        has_children: bool,
        args: &WalkArgs,
    ) {
        let mut new_out = String::new();
        self.markup.start_el(&mut new_out, comment, depth, has_children, args);

        let tag = args.style.tag_token();
        let comment_time = comment.timestamp();
        let mut new_tag = format!(
            "{} data-sort-time=\"{}\"",
            tag,
            encode_double_quoted_attribute(&comment_time.to_string())
        );

        if let Some(update_time) = self.update_time(&comment.id, comment_time) {
            new_tag.push_str(&format!(
                " data-update-time=\"{}\"",
                encode_double_quoted_attribute(&update_time.to_string())
            ));
        }

        match new_out.trim_start().strip_prefix(tag) {
            Some(rest) => {
                output.push_str(&new_tag);
                output.push_str(rest);
            }
            None => {
                tracing::warn!(
                    comment_id = %comment.id,
                    expected = tag,
                    "comment markup does not start with the expected tag, leaving it unstamped"
                );
                output.push_str(&new_out);
            }
        }

        self.thread_latest.remove(&comment.id);
    }

    fn update_time(&self, id: &str, comment_time: Timestamp) -> Option<Timestamp> {
        let latest = self.thread_latest.get_nonzero(id)?;
        if latest != comment_time {
            Some(latest)
        } else if self.thread_latest.len() == 1 {
            // Last entry left: stamp the current time so polling the same URL
            // doesn't get served a cached page
            Some(self.clock.now())
        } else {
            None
        }
    }
}

impl<M: CommentVisitor, C: Clock> CommentVisitor for FreshnessWalker<M, C> {
    fn start_el(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        has_children: bool,
        args: &WalkArgs,
    ) {
        self.render_node(output, comment, depth, has_children, args);
    }

    fn end_el(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        args: &WalkArgs,
    ) {
        self.markup.end_el(output, comment, depth, args);
    }

    fn start_lvl(&mut self, output: &mut String, depth: usize, args: &WalkArgs) {
        self.markup.start_lvl(output, depth, args);
    }

    fn end_lvl(&mut self, output: &mut String, depth: usize, args: &WalkArgs) {
        self.markup.end_lvl(output, depth, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListStyle;

    fn at(id: &str, ts: i64) -> ThreadComment {
        ThreadComment::new(id, ts.to_string())
    }

    fn div_args() -> WalkArgs {
        WalkArgs {
            style: ListStyle::Div,
            ..WalkArgs::default()
        }
    }

    fn walker() -> FreshnessWalker<Html5Markup, FixedClock> {
        FreshnessWalker::with_parts(Html5Markup, FixedClock(5_000))
    }

    #[test]
    fn newer_reply_sets_update_time_on_root() {
        let mut w = walker();
        let forest = vec![at("a", 100), at("b", 200).with_children(vec![at("c", 300)])];
        w.build_thread_latest(&forest);
        assert_eq!(w.freshness().get("a"), Some(100));
        assert_eq!(w.freshness().get("b"), Some(300));

        let mut out = String::new();
        w.render_node(&mut out, &forest[1], 0, true, &div_args());
        assert!(out.starts_with(
            "<div data-sort-time=\"200\" data-update-time=\"300\" id=\"comment-b\""
        ));

        // "a" is now the only entry, so it gets the cache-busting time
        let mut out = String::new();
        w.render_node(&mut out, &forest[0], 0, false, &div_args());
        assert!(out.starts_with(
            "<div data-sort-time=\"100\" data-update-time=\"5000\" id=\"comment-a\""
        ));
        assert!(w.freshness().is_empty());
    }

    #[test]
    fn up_to_date_root_gets_no_update_time_while_others_remain() {
        let mut w = walker();
        let forest = vec![at("a", 100), at("b", 200).with_children(vec![at("c", 300)])];
        w.build_thread_latest(&forest);

        let mut out = String::new();
        w.render_node(&mut out, &forest[0], 0, false, &div_args());
        assert!(out.starts_with("<div data-sort-time=\"100\" id=\"comment-a\""));
        assert_eq!(w.freshness().len(), 1);
    }

    #[test]
    fn list_style_splices_li_tag() {
        let mut w = walker();
        let forest = vec![at("solo", 42)];
        w.build_thread_latest(&forest);

        let mut out = String::new();
        w.render_node(&mut out, &forest[0], 0, false, &WalkArgs::default());
        assert!(out.starts_with(
            "<li data-sort-time=\"42\" data-update-time=\"5000\" id=\"comment-solo\" class=\"comment depth-1\">"
        ));
    }

    #[test]
    fn missing_entry_emits_no_update_time() {
        let mut w = walker();
        let mut out = String::new();
        w.render_node(&mut out, &at("late", 77), 0, false, &div_args());
        assert!(out.starts_with("<div data-sort-time=\"77\" id=\"comment-late\""));
    }

    #[test]
    fn zero_entry_is_treated_as_missing_but_still_drained() {
        let mut w = walker();
        let forest = vec![ThreadComment::new("bad", "not a date")];
        w.build_thread_latest(&forest);
        assert_eq!(w.freshness().get("bad"), Some(0));

        let mut out = String::new();
        w.render_node(&mut out, &forest[0], 0, false, &div_args());
        assert!(out.starts_with("<div data-sort-time=\"0\" id=\"comment-bad\""));
        assert!(w.freshness().is_empty());
    }

    struct Shouty;

    impl CommentVisitor for Shouty {
        fn start_el(
            &mut self,
            output: &mut String,
            comment: &ThreadComment,
            _depth: usize,
            _has_children: bool,
            _args: &WalkArgs,
        ) {
            output.push_str(&format!("<section>{}", comment.id));
        }
        fn end_el(
            &mut self,
            output: &mut String,
            _comment: &ThreadComment,
            _depth: usize,
            _args: &WalkArgs,
        ) {
            output.push_str("</section>");
        }
        fn start_lvl(&mut self, _output: &mut String, _depth: usize, _args: &WalkArgs) {}
        fn end_lvl(&mut self, _output: &mut String, _depth: usize, _args: &WalkArgs) {}
    }

    #[test]
    fn unexpected_markup_is_passed_through_and_still_drained() {
        let mut w = FreshnessWalker::with_parts(Shouty, FixedClock(1));
        let html = w.paged_walk(&[at("x", 10)], 0, 0, 0, &div_args());
        assert_eq!(html, "<section>x</section>");
        assert!(w.freshness().is_empty());
    }

    #[test]
    fn leading_whitespace_is_dropped_before_splicing() {
        struct Padded;
        impl CommentVisitor for Padded {
            fn start_el(
                &mut self,
                output: &mut String,
                _comment: &ThreadComment,
                _depth: usize,
                _has_children: bool,
                _args: &WalkArgs,
            ) {
                output.push_str("\n\t<li class=\"comment\">");
            }
            fn end_el(
                &mut self,
                output: &mut String,
                _comment: &ThreadComment,
                _depth: usize,
                _args: &WalkArgs,
            ) {
                output.push_str("</li>");
            }
            fn start_lvl(&mut self, _output: &mut String, _depth: usize, _args: &WalkArgs) {}
            fn end_lvl(&mut self, _output: &mut String, _depth: usize, _args: &WalkArgs) {}
        }

        let mut w = FreshnessWalker::with_parts(Padded, FixedClock(9));
        let html = w.paged_walk(&[at("x", 10), at("y", 20)], 0, 0, 0, &WalkArgs::default());
        assert_eq!(
            html,
            "<li data-sort-time=\"10\" class=\"comment\"></li><li data-sort-time=\"20\" data-update-time=\"9\" class=\"comment\"></li>"
        );
    }
}
