use std::collections::HashSet;

use crate::feed::NewsArticle;

/// Lower-cases, trims, and collapses internal whitespace.
fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable content-addressed article id.
///
/// Derived from the normalized title and the trimmed link, so re-fetches
/// of an unchanged article reproduce the same id and cosmetic whitespace
/// or casing drift does not split a story in two.
pub fn article_id(title: &str, link: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(normalize_title(title).as_bytes());
    hasher.update(b"|");
    hasher.update(link.trim().as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Collapses articles that are the same underlying story.
///
/// Assigns every article its derived id, then keeps the first occurrence
/// per id in iteration order. Order sensitivity is deliberate: callers
/// feed articles in a fixed merge order (feed registration order, parse
/// order within a feed), and the first copy processed wins.
pub fn dedupe(articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    let mut seen = HashSet::with_capacity(articles.len());
    let mut unique = Vec::with_capacity(articles.len());

    for mut article in articles {
        article.id = article_id(&article.title, &article.link);
        if seen.insert(article.id.clone()) {
            unique.push(article);
        }
    }

    unique
}
