//! Engine statistics and cache size reporting.
//!
//! Gives a quick summary of what is configured, what is loaded, and how
//! much each cache tier holds. Used by `corpus cache info` and
//! `corpus search --stats`.

use serde::Serialize;

use crate::cache::SizeInfo;

/// Snapshot of an engine's load and cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub repositories: usize,
    pub total_files: usize,
    pub loaded_texts: usize,
    /// Sum of loaded content lengths in bytes.
    pub loaded_bytes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fetch_failures: u64,
}

pub fn print_stats(stats: &EngineStats) {
    println!("Corpus Search — Engine Stats");
    println!("============================");
    println!();
    println!("  Repositories:  {}", stats.repositories);
    println!("  Files:         {}", stats.total_files);
    println!(
        "  Loaded:        {} ({})",
        stats.loaded_texts,
        format_bytes(stats.loaded_bytes)
    );
    println!(
        "  Cache:         {} hit(s), {} miss(es)",
        stats.cache_hits, stats.cache_misses
    );
    println!("  Failures:      {}", stats.fetch_failures);
    println!();
}

pub fn print_cache_info(info: &SizeInfo) {
    println!("Corpus Search — Cache");
    println!("=====================");
    println!();
    println!("  Entries:  {}", info.item_count);
    println!("  Size:     {}", format_bytes(info.total_bytes));

    if !info.per_tier.is_empty() {
        println!();
        println!("  {:<12} {:>8} {:>12}", "TIER", "ENTRIES", "SIZE");
        println!("  {}", "-".repeat(34));
        for tier in &info.per_tier {
            println!(
                "  {:<12} {:>8} {:>12}",
                tier.tier,
                tier.item_count,
                format_bytes(tier.bytes)
            );
        }
    }
    println!();
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
