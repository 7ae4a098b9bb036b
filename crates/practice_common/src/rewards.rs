//! Reward catalog: static lookup table of items a streak can earn.
//!
//! Loaded once at startup from a CSV file with `Title` and `URL` header
//! columns, or from the built-in list when no file is configured.

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

const BUILTIN_TITLES: &[&str] = &[
    "Golden Star",
    "Rocket Sticker",
    "Dinosaur Badge",
    "Rainbow Ribbon",
    "Treasure Chest",
    "Wizard Hat",
    "Robot Friend",
    "Moon Rock",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardItem {
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RewardCatalog {
    items: Vec<RewardItem>,
    urls: HashMap<String, String>,
}

impl RewardCatalog {
    pub fn new(items: Vec<RewardItem>) -> Self {
        let urls = items
            .iter()
            .filter_map(|item| item.url.clone().map(|url| (item.title.clone(), url)))
            .collect();
        Self { items, urls }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_TITLES
                .iter()
                .map(|title| RewardItem {
                    title: title.to_string(),
                    url: None,
                })
                .collect(),
        )
    }

    /// Catalog from the configured file, or the built-in list
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("Using built-in reward catalog ({} items)", BUILTIN_TITLES.len());
            return Ok(Self::builtin());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reward catalog {}", path.display()))?;
        let catalog = Self::from_csv(&contents)
            .with_context(|| format!("Failed to parse reward catalog {}", path.display()))?;

        if catalog.is_empty() {
            warn!("Reward catalog {} has no items; rewards are disabled", path.display());
        } else {
            info!("Loaded {} reward items from {}", catalog.len(), path.display());
        }
        Ok(catalog)
    }

    /// Parse CSV text. The header must name a `Title` column; `URL` is optional.
    /// Rows with an empty title are skipped. Quoted fields may span lines and
    /// a leading byte-order mark is ignored.
    pub fn from_csv(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = parse_csv_records(text)
            .into_iter()
            .filter(|fields| fields.iter().any(|f| !f.trim().is_empty()));

        let columns = records.next().context("Reward catalog is empty")?;
        let title_idx = columns
            .iter()
            .position(|c| c.trim() == "Title")
            .context("Reward catalog has no Title column")?;
        let url_idx = columns.iter().position(|c| c.trim() == "URL");

        let mut items = Vec::new();
        for fields in records {
            let title = fields.get(title_idx).map(|t| t.trim()).unwrap_or_default();
            if title.is_empty() {
                continue;
            }
            let url = url_idx
                .and_then(|idx| fields.get(idx))
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty());
            items.push(RewardItem {
                title: title.to_string(),
                url,
            });
        }

        Ok(Self::new(items))
    }

    /// Pick one item uniformly; `None` when the catalog is empty
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<RewardItem> {
        self.items.choose(rng).cloned()
    }

    /// Join an inventory title back to its image URL
    pub fn url_for(&self, title: &str) -> Option<&str> {
        self.urls.get(title).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split CSV text into records, honouring double quotes and `""` escapes.
/// Line breaks inside quotes belong to the field.
fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                records.push(std::mem::take(&mut fields));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        records.push(fields);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_csv_with_quotes() {
        let csv = "Title,URL\n\
                   Comet,https://img.test/comet.png\n\
                   \"Anchor, Small\",https://img.test/anchor.png\n\
                   \"The \"\"Big\"\" Bell\",\n\
                   ,https://img.test/orphan.png\n";
        let catalog = RewardCatalog::from_csv(csv).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.url_for("Comet"), Some("https://img.test/comet.png"));
        assert_eq!(
            catalog.url_for("Anchor, Small"),
            Some("https://img.test/anchor.png")
        );
        assert_eq!(catalog.url_for("The \"Big\" Bell"), None);
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let csv = "\u{feff}Title,URL\r\nComet,https://img.test/comet.png\r\n";
        let catalog = RewardCatalog::from_csv(csv).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.url_for("Comet"), Some("https://img.test/comet.png"));
    }

    #[test]
    fn test_quoted_title_spans_lines() {
        let csv = "Title,URL\n\"Comet\nTail\",https://img.test/comet.png\nBell,\n";
        let catalog = RewardCatalog::from_csv(csv).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.url_for("Comet\nTail"),
            Some("https://img.test/comet.png")
        );
        assert_eq!(catalog.url_for("Bell"), None);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "URL,Rarity,Title\nhttps://img.test/a.png,common,Acorn\n";
        let catalog = RewardCatalog::from_csv(csv).unwrap();
        assert_eq!(catalog.url_for("Acorn"), Some("https://img.test/a.png"));
    }

    #[test]
    fn test_missing_title_column_is_error() {
        assert!(RewardCatalog::from_csv("Name,URL\nx,y\n").is_err());
        assert!(RewardCatalog::from_csv("").is_err());
    }

    #[test]
    fn test_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        let catalog = RewardCatalog::builtin();
        let item = catalog.sample(&mut rng).unwrap();
        assert!(BUILTIN_TITLES.contains(&item.title.as_str()));

        assert!(RewardCatalog::default().sample(&mut rng).is_none());
    }
}
