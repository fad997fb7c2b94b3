use chrono::DateTime;
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::models::{parse_comment_date, ListStyle, ThreadComment, WalkArgs};
use crate::walker::CommentVisitor;

/// Plain HTML5 comment markup without any freshness attributes.
///
/// Each comment opens with `<li` (or `<div` for [`ListStyle::Div`]) and
/// replies are wrapped in `<ul class="children">` / `<ol class="children">`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Html5Markup;

impl Html5Markup {
    fn tag_name(style: ListStyle) -> &'static str {
        match style {
            ListStyle::Div => "div",
            ListStyle::Ol | ListStyle::Ul => "li",
        }
    }

    fn time_element(comment: &ThreadComment) -> String {
        // The element is left out entirely when the date can't be read
        let parsed =
            parse_comment_date(&comment.date).and_then(|ts| DateTime::from_timestamp(ts, 0));
        match parsed {
            Some(dt) => format!(
                "<time datetime=\"{}\">{}</time>",
                encode_double_quoted_attribute(&dt.to_rfc3339()),
                dt.format("%Y-%m-%d %H:%M"),
            ),
            None => String::new(),
        }
    }
}

impl CommentVisitor for Html5Markup {
    fn start_el(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        has_children: bool,
        args: &WalkArgs,
    ) {
        let tag = Self::tag_name(args.style);
        let id = encode_double_quoted_attribute(&comment.id);
        let mut classes = format!("comment depth-{}", depth + 1);
        if has_children {
            classes.push_str(" parent");
        }

        output.push_str(&format!(
            "<{tag} id=\"comment-{id}\" class=\"{classes}\">\n\
             <article id=\"div-comment-{id}\" class=\"comment-body\">\n\
             <footer class=\"comment-meta\">\n\
             <div class=\"comment-author vcard\"><b class=\"fn\">{author}</b> <span class=\"says\">says:</span></div>\n\
             <div class=\"comment-metadata\">{time}</div>\n\
             </footer>\n\
             <div class=\"comment-content\">{text}</div>\n\
             </article>\n",
            author = encode_text(&comment.author),
            time = Self::time_element(comment),
            // Comment bodies arrive as already-sanitized HTML
            text = comment.text,
        ));
    }

    fn end_el(
        &mut self,
        output: &mut String,
        _comment: &ThreadComment,
        _depth: usize,
        args: &WalkArgs,
    ) {
        output.push_str(&format!("</{}><!-- #comment-## -->\n", Self::tag_name(args.style)));
    }

    fn start_lvl(&mut self, output: &mut String, _depth: usize, args: &WalkArgs) {
        match args.style {
            ListStyle::Div => {}
            ListStyle::Ol => output.push_str("<ol class=\"children\">\n"),
            ListStyle::Ul => output.push_str("<ul class=\"children\">\n"),
        }
    }

    fn end_lvl(&mut self, output: &mut String, _depth: usize, args: &WalkArgs) {
        match args.style {
            ListStyle::Div => {}
            ListStyle::Ol => output.push_str("</ol>\n"),
            ListStyle::Ul => output.push_str("</ul>\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_attributes_and_author() {
        let comment = ThreadComment::new("7\"x", "100").with_author("<bob>").with_text("<p>hi</p>");
        let mut out = String::new();
        Html5Markup.start_el(&mut out, &comment, 0, true, &WalkArgs::default());

        assert!(out.starts_with("<li id=\"comment-7&quot;x\" class=\"comment depth-1 parent\">"));
        assert!(out.contains("<b class=\"fn\">&lt;bob&gt;</b>"));
        assert!(out.contains("<div class=\"comment-content\"><p>hi</p></div>"));
        assert!(out.contains(
            "<time datetime=\"1970-01-01T00:01:40+00:00\">1970-01-01 00:01</time>"
        ));
    }

    #[test]
    fn div_style_has_no_level_wrappers() {
        let args = WalkArgs {
            style: ListStyle::Div,
            ..WalkArgs::default()
        };
        let comment = ThreadComment::new("1", "garbage");
        let mut out = String::new();
        let mut markup = Html5Markup;
        markup.start_lvl(&mut out, 0, &args);
        markup.start_el(&mut out, &comment, 1, false, &args);
        markup.end_el(&mut out, &comment, 1, &args);
        markup.end_lvl(&mut out, 0, &args);

        assert!(out.starts_with("<div id=\"comment-1\" class=\"comment depth-2\">"));
        assert!(out.ends_with("</div><!-- #comment-## -->\n"));
        assert!(out.contains("<div class=\"comment-metadata\"></div>"));
    }

    #[test]
    fn list_styles_wrap_replies() {
        let mut out = String::new();
        let ol = WalkArgs {
            style: ListStyle::Ol,
            ..WalkArgs::default()
        };
        Html5Markup.start_lvl(&mut out, 0, &ol);
        Html5Markup.end_lvl(&mut out, 0, &ol);
        Html5Markup.start_lvl(&mut out, 0, &WalkArgs::default());
        Html5Markup.end_lvl(&mut out, 0, &WalkArgs::default());
        assert_eq!(out, "<ol class=\"children\">\n</ol>\n<ul class=\"children\">\n</ul>\n");
    }
}
