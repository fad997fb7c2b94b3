use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;

use crate::models::ThreadComment;

lazy_static! {
    // "2024-05-01T12:34:56 1714566896" on current pages, just the ISO part on older ones
    static ref AGE_TITLE: Regex = Regex::new(r"^\s*(\S+)(?:\s+(\d+))?").unwrap();
}

pub struct HackerNewsClient {
    client: Client,
    base_url: String,
}

impl HackerNewsClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: "https://news.ycombinator.com".to_string(),
        })
    }

    pub fn fetch_item_html(&self, item_id: &str) -> Result<String> {
        let url = format!("{}/item?id={}", self.base_url, item_id);
        let response = self.client.get(&url).send()?.error_for_status()?;
        Ok(response.text()?)
    }

    pub fn fetch_comments(&self, item_id: &str) -> Result<Vec<ThreadComment>> {
        let html = self.fetch_item_html(item_id)?;
        let comments = parse_comments(&html)?;
        tracing::info!(item_id, threads = comments.len(), "loaded comments");
        Ok(comments)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Selector error: {:?}", e))
}

fn comment_date(row: &ElementRef, age: &Selector) -> String {
    let title = row
        .select(age)
        .next()
        .and_then(|e| e.value().attr("title"))
        .unwrap_or_default();

    match AGE_TITLE.captures(title) {
        // Prefer the epoch seconds when the page carries them
        Some(caps) => caps
            .get(2)
            .or_else(|| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        None => String::new(),
    }
}

/// Parses the comment rows of a Hacker News item page into a reply forest.
pub fn parse_comments(html: &str) -> Result<Vec<ThreadComment>> {
    let document = Html::parse_document(html);
    let comment_selector = selector(".comtr")?;
    let indent_selector = selector(".ind")?;
    let user_selector = selector(".hnuser")?;
    let age_selector = selector(".age")?;
    let text_selector = selector(".commtext")?;

    // Flat list of (indent level, comment) in page order
    let mut comment_list = Vec::new();
    let mut processed_ids = HashSet::new();

    for comment_row in document.select(&comment_selector) {
        let id = comment_row.value().attr("id").unwrap_or_default().to_string();

        // Skip if we've already seen this comment ID
        if !processed_ids.insert(id.clone()) {
            continue;
        }

        let level = comment_row
            .select(&indent_selector)
            .next()
            .and_then(|e| e.value().attr("indent"))
            .and_then(|indent| indent.parse::<i32>().ok())
            .unwrap_or(0);

        let author = comment_row
            .select(&user_selector)
            .next()
            .map(|e| html_escape::decode_html_entities(&e.inner_html()).to_string())
            .unwrap_or_default();

        let text = comment_row
            .select(&text_selector)
            .next()
            .map(|e| e.inner_html())
            .unwrap_or_default();

        let date = comment_date(&comment_row, &age_selector);

        comment_list.push((
            level,
            ThreadComment::new(id, date).with_author(author).with_text(text),
        ));
    }

    Ok(build_comments_tree(&comment_list))
}

// Rebuilds nesting from indent levels; rows with a level jump are attached to
// the nearest shallower row before them
fn build_comments_tree(comments: &[(i32, ThreadComment)]) -> Vec<ThreadComment> {
    let mut result = Vec::new();
    let mut used_indices = HashSet::new();

    for (i, (level, comment)) in comments.iter().enumerate() {
        if *level == 0 && !used_indices.contains(&i) {
            let mut top_comment = comment.clone();
            used_indices.insert(i);
            top_comment.children = find_children_recursive(comments, i, *level, &mut used_indices);
            result.push(top_comment);
        }
    }

    result
}

fn find_children_recursive(
    comments: &[(i32, ThreadComment)],
    parent_idx: usize,
    parent_level: i32,
    used_indices: &mut HashSet<usize>,
) -> Vec<ThreadComment> {
    let mut children = Vec::new();

    for i in (parent_idx + 1)..comments.len() {
        if used_indices.contains(&i) {
            continue;
        }

        let (level, comment) = &comments[i];

        // A row at or above the parent's level ends the parent's replies
        if *level <= parent_level {
            break;
        }

        used_indices.insert(i);
        let mut child = comment.clone();
        child.children = find_children_recursive(comments, i, *level, used_indices);
        children.push(child);
    }

    children
}
