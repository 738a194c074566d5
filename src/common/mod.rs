//! Functionality shared between all commands.

pub mod io;

use std::ops::Range;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indexmap::IndexMap;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let me = procfs::process::Process::myself().unwrap();
    let page_size = procfs::page_size();
    tracing::debug!(
        "RSS now: {}",
        byte_unit::Byte::from_u64(me.stat().unwrap().rss * page_size)
            .get_appropriate_unit(byte_unit::UnitType::Binary)
    );
}

/// Definition of canonical chromosome names, in karyotype order.
pub const CHROMS: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "M",
];

/// Mapping from chromosome name to karyotype rank.
///
/// Both the plain and the `chr`-prefixed spelling of each canonical
/// chromosome map to the same rank.  Contigs outside the canonical set are
/// assigned ranks past the canonical ones in order of first appearance.
#[derive(Debug, Clone)]
pub struct ChromMap {
    ranks: IndexMap<String, usize>,
    next_rank: usize,
}

impl ChromMap {
    pub fn new() -> Self {
        let mut ranks = IndexMap::new();
        for (i, &chrom_name) in CHROMS.iter().enumerate() {
            ranks.insert(chrom_name.to_owned(), i);
            ranks.insert(format!("chr{chrom_name}"), i);
        }
        let (x, y, m) = (CHROMS.len() - 3, CHROMS.len() - 2, CHROMS.len() - 1);
        for (alias, rank) in [
            ("x", x),
            ("chrx", x),
            ("y", y),
            ("chry", y),
            ("m", m),
            ("mt", m),
            ("MT", m),
            ("chrm", m),
            ("chrmt", m),
            ("chrMT", m),
        ] {
            ranks.insert(alias.to_owned(), rank);
        }
        Self {
            ranks,
            next_rank: CHROMS.len(),
        }
    }

    /// Rank of a known chromosome, if any.
    pub fn get(&self, chrom: &str) -> Option<usize> {
        self.ranks.get(chrom).copied()
    }

    /// Rank of a chromosome, assigning the next free rank to unseen contigs.
    pub fn get_or_insert(&mut self, chrom: &str) -> usize {
        if let Some(rank) = self.ranks.get(chrom) {
            return *rank;
        }
        let rank = self.next_rank;
        self.next_rank += 1;
        self.ranks.insert(chrom.to_owned(), rank);
        rank
    }
}

impl Default for ChromMap {
    fn default() -> Self {
        Self::new()
    }
}

// Compute reciprocal overlap between two ranges.
pub fn reciprocal_overlap(lhs: Range<i32>, rhs: Range<i32>) -> f32 {
    let lhs_b = lhs.start;
    let lhs_e = lhs.end;
    let rhs_b = rhs.start;
    let rhs_e = rhs.end;
    let ovl_b = std::cmp::max(lhs_b, rhs_b);
    let ovl_e = std::cmp::min(lhs_e, rhs_e);
    if ovl_b >= ovl_e {
        0f32
    } else {
        let ovl_len = (ovl_e - ovl_b) as f32;
        let x1 = ovl_len / (lhs_e - lhs_b) as f32;
        let x2 = ovl_len / (rhs_e - rhs_b) as f32;
        x1.min(x2)
    }
}

/// The version of `svreport` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_rss_now_smoke() {
        super::trace_rss_now();
    }

    #[rstest::rstest]
    #[case(0..10, 0..10, 1.0)]
    #[case(0..10, 5..15, 0.5)]
    #[case(5..15, 0..10, 0.5)]
    #[case(0..10, 10..20, 0.0)]
    #[case(0..2, 0..10, 0.2)]
    #[case(0..10, 0..2, 0.2)]
    #[case(1000..2000, 1000..2100, 1000f32 / 1100f32)]
    fn reciprocal_overlap(
        #[case] lhs: std::ops::Range<i32>,
        #[case] rhs: std::ops::Range<i32>,
        #[case] expected: f32,
    ) {
        let actual = super::reciprocal_overlap(lhs, rhs);
        assert!(float_cmp::approx_eq!(f32, expected, actual, ulps = 2))
    }

    #[test]
    fn chrom_map_canonical_and_aliases() {
        let map = super::ChromMap::new();
        assert_eq!(map.get("1"), Some(0));
        assert_eq!(map.get("chr1"), Some(0));
        assert_eq!(map.get("22"), Some(21));
        assert_eq!(map.get("X"), Some(22));
        assert_eq!(map.get("chrX"), Some(22));
        assert_eq!(map.get("Y"), Some(23));
        assert_eq!(map.get("M"), Some(24));
        assert_eq!(map.get("MT"), Some(24));
        assert_eq!(map.get("GL000192.1"), None);
    }

    #[test]
    fn chrom_map_extends_for_unseen_contigs() {
        let mut map = super::ChromMap::new();
        let rank_a = map.get_or_insert("GL000192.1");
        let rank_b = map.get_or_insert("GL000193.1");
        assert_eq!(rank_a, 25);
        assert_eq!(rank_b, 26);
        assert_eq!(map.get_or_insert("GL000192.1"), rank_a);
        assert_eq!(map.get_or_insert("chr2"), 1);
    }
}
