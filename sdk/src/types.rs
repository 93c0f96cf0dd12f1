//! Tool boundary types shared by adapters and agents

use serde::{Deserialize, Serialize};
use std::fmt;

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchHit {
    /// Create a new search hit
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.url)?;
        if !self.snippet.is_empty() {
            write!(f, "\n   {}", self.snippet)?;
        }
        Ok(())
    }
}

/// Format search hits as a numbered block for inclusion in a prompt.
///
/// Returns an empty string when there are no hits.
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}", i + 1, hit))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hits_numbers_entries() {
        let hits = vec![
            SearchHit::new("Intro", "https://a.example", "basics"),
            SearchHit::new("Deep dive", "https://b.example", ""),
        ];
        let block = format_hits(&hits);
        assert_eq!(
            block,
            "1. Intro (https://a.example)\n   basics\n2. Deep dive (https://b.example)"
        );
    }

    #[test]
    fn test_format_hits_empty() {
        assert_eq!(format_hits(&[]), "");
    }
}
