//! Statistics over a checkpoint file
//!
//! This module summarizes what a checkpoint holds: how many records were
//! harvested, how many still lack reviews, which records carry a resume
//! cursor, and how the collected reviews are spread over star ratings.

use crate::catalog::{Catalog, MAX_ITEM_RATING};
use crate::storage::{CheckpointStore, JsonCheckpointStore, StorageResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Harvest statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestStatistics {
    /// Total number of records
    pub records: usize,

    /// Records with at least one review
    pub records_with_items: usize,

    /// Records still waiting for reviews
    pub records_without_items: usize,

    /// Total number of collected reviews
    pub total_items: usize,

    /// Links of records carrying a resume cursor, with the cursor page
    pub pending_cursors: Vec<(String, u32)>,

    /// Collected reviews per star rating; 0 counts unrated reviews
    pub star_distribution: BTreeMap<u8, u64>,

    /// Star counts reported by the detail pages, summed over records
    pub reported_distribution: BTreeMap<String, u64>,
}

impl HarvestStatistics {
    /// Computes statistics for a catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut stats = Self::default();

        for record in catalog.records() {
            stats.records += 1;
            if record.has_items() {
                stats.records_with_items += 1;
            } else {
                stats.records_without_items += 1;
            }
            stats.total_items += record.comments.len();

            if let Some(cursor) = record.last_review_page {
                stats
                    .pending_cursors
                    .push((record.link().to_string(), cursor.page()));
            }

            for item in &record.comments {
                let stars = item.rating.min(MAX_ITEM_RATING);
                *stats.star_distribution.entry(stars).or_insert(0) += 1;
            }

            for (key, count) in &record.detailed_rating {
                if key.ends_with("_star") {
                    *stats.reported_distribution.entry(key.clone()).or_insert(0) += count;
                }
            }
        }

        stats
    }
}

/// Loads statistics from a checkpoint file
///
/// # Arguments
///
/// * `path` - Checkpoint file to summarize
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully computed statistics
/// * `Err(StorageError)` - The file exists but could not be read
pub fn load_statistics(path: &Path) -> StorageResult<HarvestStatistics> {
    let catalog = JsonCheckpointStore::new(path).load()?;
    Ok(HarvestStatistics::from_catalog(&catalog))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Records: {}", stats.records);
    println!("  With reviews: {}", stats.records_with_items);
    println!("  Without reviews: {}", stats.records_without_items);
    println!("  Reviews collected: {}", stats.total_items);
    println!();

    if stats.total_items > 0 {
        println!("Collected Reviews by Rating:");
        for (stars, count) in stats.star_distribution.iter().rev() {
            let percentage = (*count as f64 / stats.total_items as f64) * 100.0;
            let label = if *stars == 0 {
                "unrated".to_string()
            } else {
                format!("{} stars", stars)
            };
            println!("  {}: {} ({:.1}%)", label, count, percentage);
        }
        println!();
    }

    if !stats.reported_distribution.is_empty() {
        println!("Reported Ratings:");
        for (key, count) in stats.reported_distribution.iter().rev() {
            println!("  {}: {}", key, count);
        }
        println!();
    }

    if !stats.pending_cursors.is_empty() {
        println!("Resume Cursors ({}):", stats.pending_cursors.len());
        for (link, page) in &stats.pending_cursors {
            println!("  - {} (after page {})", link, page);
        }
        println!();
    }

    let coverage = if stats.records > 0 {
        (stats.records_with_items as f64 / stats.records as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Coverage: {:.1}% ({} / {} records have reviews)",
        coverage, stats.records_with_items, stats.records
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Item, Record, ResumeCursor};
    use tempfile::TempDir;

    fn item(rating: u8) -> Item {
        Item {
            rating,
            ..Item::default()
        }
    }

    fn sample() -> Catalog {
        let mut harvested = Record::new("https://shop.example/a-i.1.1");
        harvested.comments = vec![item(5), item(5), item(3), item(0)];
        harvested.detailed_rating.insert("5_star".to_string(), 10);
        harvested.detailed_rating.insert("all".to_string(), 12);
        harvested.last_review_page = Some(ResumeCursor::new(2));

        let mut other = Record::new("https://shop.example/b-i.1.2");
        other.detailed_rating.insert("5_star".to_string(), 4);

        Catalog::from_records(vec![harvested, other])
    }

    #[test]
    fn test_from_catalog() {
        let stats = HarvestStatistics::from_catalog(&sample());
        assert_eq!(stats.records, 2);
        assert_eq!(stats.records_with_items, 1);
        assert_eq!(stats.records_without_items, 1);
        assert_eq!(stats.total_items, 4);
        assert_eq!(stats.star_distribution.get(&5), Some(&2));
        assert_eq!(stats.star_distribution.get(&0), Some(&1));
        assert_eq!(stats.reported_distribution.get("5_star"), Some(&14));
        assert!(!stats.reported_distribution.contains_key("all"));
        assert_eq!(
            stats.pending_cursors,
            vec![("https://shop.example/a-i.1.1".to_string(), 2)]
        );
    }

    #[test]
    fn test_empty_catalog() {
        let stats = HarvestStatistics::from_catalog(&Catalog::new());
        assert_eq!(stats, HarvestStatistics::default());
    }

    #[test]
    fn test_load_statistics_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, sample().to_json().unwrap()).unwrap();

        let stats = load_statistics(&path).unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.total_items, 4);
    }

    #[test]
    fn test_load_statistics_missing_file() {
        let dir = TempDir::new().unwrap();
        let stats = load_statistics(&dir.path().join("absent.json")).unwrap();
        assert_eq!(stats.records, 0);
    }
}
