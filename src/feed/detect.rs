/// Wire format of a fetched feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedType {
    Rss2,
    Atom1,
    Rss1,
    Unknown,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Rss2 => "RSS 2.0",
            FeedType::Atom1 => "Atom 1.0",
            FeedType::Rss1 => "RSS 1.0",
            FeedType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Classifies raw feed content by inspecting its opening structure.
///
/// Checks, in priority order: an Atom namespace declaration on a `feed`
/// root, an `rss` root carrying `version="2.0"`, an `rdf:RDF` root.
/// Works on the raw text rather than a parsed document — feeds in the
/// wild are frequently malformed, and classification must still succeed
/// on anything with a recognizable root tag.
pub fn detect_feed_type(content: &str) -> FeedType {
    let root = match root_tag(content) {
        Some(tag) => tag,
        None => return FeedType::Unknown,
    };

    let name = tag_name(root);

    if name == "feed" && root.contains(ATOM_NAMESPACE) {
        return FeedType::Atom1;
    }
    if name == "rss" && has_version_2_0(root) {
        return FeedType::Rss2;
    }
    if name == "rdf:RDF" || name == "RDF" {
        return FeedType::Rss1;
    }

    FeedType::Unknown
}

/// Text of the first element tag, prolog / comments / DOCTYPE skipped.
/// Returns the slice between `<` and `>` exclusive. An unterminated tag
/// is returned as-is so truncated documents still classify.
fn root_tag(content: &str) -> Option<&str> {
    let mut rest = content;
    loop {
        let start = rest.find('<')?;
        let after = &rest[start + 1..];

        if let Some(stripped) = after.strip_prefix("!--") {
            // comment: skip to its terminator, or give up on an unterminated one
            let end = stripped.find("-->")?;
            rest = &stripped[end + 3..];
        } else if after.starts_with('?') || after.starts_with('!') {
            // XML prolog or DOCTYPE
            let end = after.find('>')?;
            rest = &after[end + 1..];
        } else {
            return match after.find('>') {
                Some(end) => Some(&after[..end]),
                None => Some(after),
            };
        }
    }
}

fn tag_name(tag: &str) -> &str {
    tag.split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or("")
}

fn has_version_2_0(tag: &str) -> bool {
    let squeezed: String = tag.chars().filter(|c| !c.is_whitespace()).collect();
    squeezed.contains(r#"version="2.0""#) || squeezed.contains("version='2.0'")
}
