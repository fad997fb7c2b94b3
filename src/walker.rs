use crate::models::{ThreadComment, WalkArgs};

/// Receives the structural events of a comment walk and appends markup for them.
pub trait CommentVisitor {
    /// Opens a comment. `has_children` is true whenever the comment has replies,
    /// even if the depth limit keeps them from being nested inside it.
    fn start_el(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        has_children: bool,
        args: &WalkArgs,
    );

    fn end_el(
        &mut self,
        output: &mut String,
        comment: &ThreadComment,
        depth: usize,
        args: &WalkArgs,
    );

    /// Opens a nested list of replies.
    fn start_lvl(&mut self, output: &mut String, depth: usize, args: &WalkArgs);

    fn end_lvl(&mut self, output: &mut String, depth: usize, args: &WalkArgs);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkedPage {
    pub html: String,
    // Number of pages the top-level comments span, 1 when not paging
    pub max_pages: usize,
}

/// Walks one page of a comment forest depth-first, parents before replies.
///
/// * `max_depth == -1` lists every comment flat, in pre-order, without nesting.
/// * `max_depth == 0` nests without limit.
/// * `max_depth > 0` nests up to that many levels; deeper replies are listed
///   at the deepest level right after their parent closes.
///
/// Paging applies to top-level comments (or to all comments in flat mode). A
/// `page_num < 1` or negative `per_page` disables paging.
pub fn paged_walk<V: CommentVisitor>(
    visitor: &mut V,
    elements: &[ThreadComment],
    max_depth: i32,
    page_num: i32,
    per_page: i32,
    args: &WalkArgs,
) -> WalkedPage {
    let mut page = WalkedPage::default();
    if elements.is_empty() || max_depth < -1 {
        return page;
    }

    let flat = max_depth == -1;
    let mut top_level: Vec<&ThreadComment> = if flat {
        let mut all = Vec::new();
        flatten(elements, &mut all);
        all
    } else {
        elements.iter().collect()
    };
    let total_top = top_level.len() as i64;

    let paging = !(page_num < 1 || per_page < 0);
    let (mut start, mut end) = if paging {
        let start = (page_num as i64 - 1) * per_page as i64;
        (start, start + per_page as i64)
    } else {
        (0, total_top)
    };

    page.max_pages = if !paging {
        1
    } else if per_page == 0 {
        0
    } else {
        ((total_top + per_page as i64 - 1) / per_page as i64) as usize
    };

    if args.reverse_top_level {
        top_level.reverse();
        let old_start = start;
        start = total_top - end;
        end = total_top - old_start;
    }

    tracing::debug!(
        total_top,
        start,
        end,
        max_depth,
        flat,
        "walking comment page"
    );

    for (count, comment) in top_level.into_iter().enumerate() {
        let count = count as i64;
        if count < start {
            continue;
        }
        if count >= end {
            break;
        }
        if flat {
            display_element(visitor, comment, 1, 0, false, args, &mut page.html);
        } else {
            display_element(visitor, comment, max_depth, 0, true, args, &mut page.html);
        }
    }

    page
}

fn flatten<'a>(comments: &'a [ThreadComment], out: &mut Vec<&'a ThreadComment>) {
    for comment in comments {
        out.push(comment);
        flatten(&comment.children, out);
    }
}

fn display_element<V: CommentVisitor>(
    visitor: &mut V,
    comment: &ThreadComment,
    max_depth: i32,
    depth: usize,
    with_children: bool,
    args: &WalkArgs,
    output: &mut String,
) {
    let mut children: Vec<&ThreadComment> = if with_children {
        comment.children.iter().collect()
    } else {
        Vec::new()
    };
    if args.reverse_children {
        children.reverse();
    }
    let has_children = !children.is_empty();

    visitor.start_el(output, comment, depth, has_children, args);

    let nest = max_depth == 0 || max_depth as i64 > depth as i64 + 1;
    if nest && has_children {
        visitor.start_lvl(output, depth, args);
        for child in &children {
            display_element(visitor, child, max_depth, depth + 1, true, args, output);
        }
        visitor.end_lvl(output, depth, args);
    }

    visitor.end_el(output, comment, depth, args);

    // At the depth limit replies follow their parent on the same level
    if !nest && has_children {
        for child in &children {
            display_element(visitor, child, max_depth, depth, true, args, output);
        }
    }
}
