//! Threaded comment rendering with per-thread freshness timestamps.
//!
//! Every rendered comment carries `data-sort-time` (its own creation time) and,
//! when its thread has newer activity, `data-update-time`, so a client can spot
//! new replies without re-parsing the page.

pub mod freshness;
pub mod freshness_walker;
pub mod hn_client;
pub mod markup;
pub mod models;
pub mod walker;

pub use freshness::FreshnessMap;
pub use freshness_walker::{Clock, FixedClock, FreshnessWalker, SystemClock};
pub use markup::Html5Markup;
pub use models::{parse_comment_date, ListStyle, ThreadComment, Timestamp, WalkArgs};
pub use walker::{paged_walk, CommentVisitor, WalkedPage};
