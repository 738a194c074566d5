//! Data model for structural variant calls, intervals, and variant groups.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encode the kind of a structural variant.
#[derive(
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Clone,
    Copy,
    Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SvType {
    /// Deletion
    #[default]
    Del,
    /// Duplication
    Dup,
    /// Insertion
    Ins,
    /// Inversion
    Inv,
    /// Interspersed duplication
    Idp,
}

/// Collapsed genotype of one call in one sample.
#[derive(
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Genotype {
    /// het.
    Het,
    /// hom. alt (or anything that is not het.)
    Hom,
}

impl Genotype {
    /// Collapse a genotype column value.
    ///
    /// Accepts the literal `HET`/`HOM` spelling or a VCF-style `GT` string.
    /// A call is heterozygous iff reference and alternate allele are both
    /// present; everything else collapses to `HOM`.
    pub fn from_gt(s: &str) -> Result<Self, anyhow::Error> {
        if let Ok(genotype) = Self::from_str(s) {
            return Ok(genotype);
        }
        let alleles = s.split(['/', '|']).map(str::trim).collect::<Vec<_>>();
        for allele in &alleles {
            if *allele != "." && allele.parse::<u32>().is_err() {
                anyhow::bail!("invalid genotype value: {:?}", s);
            }
        }
        if alleles.contains(&"0") && alleles.contains(&"1") {
            Ok(Genotype::Het)
        } else {
            Ok(Genotype::Hom)
        }
    }
}

/// Genomic interval tagged with a structural variant kind.
///
/// Coordinates are kept as ingested and treated as half-open when overlap
/// lengths are computed.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Default)]
pub struct SvInterval {
    pub chrom: String,
    pub begin: i32,
    pub end: i32,
    pub sv_type: SvType,
}

impl SvInterval {
    /// Build an interval, restoring `begin <= end` and padding zero-length
    /// intervals to length one so they remain discoverable by overlap.
    pub fn new(chrom: &str, begin: i32, end: i32, sv_type: SvType) -> Self {
        let (begin, end) = if begin > end { (end, begin) } else { (begin, end) };
        let end = if begin == end { begin + 1 } else { end };
        Self {
            chrom: chrom.to_owned(),
            begin,
            end,
            sv_type,
        }
    }

    /// The interval as a half-open range.
    pub fn range(&self) -> std::ops::Range<i32> {
        self.begin..self.end
    }
}

/// One structural variant observed in one sample.
#[derive(PartialEq, Debug, Clone)]
pub struct SampleCall {
    /// The interval of the call.
    pub interval: SvInterval,
    /// Collapsed genotype.
    pub genotype: Genotype,
    /// Identifier of the sample the call was made in.
    pub sample: String,
    /// Gene identifiers attached by the caller, split at fusion separators.
    pub genes: Vec<String>,
    /// Structural variant length, if the caller reported one.
    pub svlen: Option<i64>,
    /// Values of the passthrough fields requested at ingestion, aligned with
    /// the requested field names.
    pub extra: Vec<String>,
}

impl SampleCall {
    /// Formatted detail string, `chrom:begin-end:KIND:GENOTYPE`.
    pub fn detail_string(&self) -> String {
        format!(
            "{}:{}-{}:{}:{}",
            self.interval.chrom, self.interval.begin, self.interval.end, self.interval.sv_type,
            self.genotype
        )
    }
}

/// Aggregated per-sample contribution to a variant group.
#[derive(Debug, Clone, Default)]
pub struct SampleAggregate {
    /// Whether the sample contributed at least one call.
    pub present: bool,
    /// Detail strings of the member calls, in join order.
    pub details: Vec<String>,
    /// Genotypes of the member calls, in join order.
    pub genotypes: Vec<String>,
    /// Passthrough field values of the member calls, outer index is the
    /// field, inner index the member call.
    pub extras: Vec<Vec<String>>,
}

/// The clustered multi-sample consensus record for one structural variant.
#[derive(Debug, Clone)]
pub struct VariantGroup {
    /// Canonical interval, taken from the call that seeded the group.
    pub interval: SvInterval,
    /// Gene identifiers seeded from that same call, first-seen order.
    pub genes: Vec<String>,
    /// Number of distinct samples contributing at least one call.
    pub n_samples: u32,
    /// Per-sample aggregation, aligned with the cohort sample list.
    pub per_sample: Vec<SampleAggregate>,
}

impl VariantGroup {
    pub fn new(
        interval: SvInterval,
        genes: Vec<String>,
        num_samples: usize,
        num_extra_fields: usize,
    ) -> Self {
        Self {
            interval,
            genes,
            n_samples: 0,
            per_sample: (0..num_samples)
                .map(|_| SampleAggregate {
                    extras: vec![Vec::new(); num_extra_fields],
                    ..Default::default()
                })
                .collect(),
        }
    }

    /// Record one member call for the sample at `sample_idx`.
    pub fn push_call(&mut self, sample_idx: usize, call: &SampleCall) {
        let agg = &mut self.per_sample[sample_idx];
        if !agg.present {
            agg.present = true;
            self.n_samples += 1;
        }
        agg.details.push(call.detail_string());
        agg.genotypes.push(call.genotype.to_string());
        for (values, value) in agg.extras.iter_mut().zip(call.extra.iter()) {
            values.push(value.clone());
        }
    }
}
