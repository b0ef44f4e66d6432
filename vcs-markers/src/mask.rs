//! SNP masks: `FLANK[A/B]FLANK` strings.
//!
//! Strand designation follows Illumina's TOP/BOT convention. A SNP whose
//! alleles are one of A/T plus one of C/G is TOP when the A/T allele is an
//! `A`, BOT when it is a `T`. For A/T and C/G SNPs the flanks are walked
//! outward from the SNP until the first pair made of one A/T base and one
//! C/G base; the mask is TOP when the left base of that pair is A or T.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display};

use crate::errors::{MaskError, MaskResult};

static MASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ACGT]+\[([ACGT]/){1,3}[ACGT]\][ACGT]+$").unwrap_or_else(|e| {
        panic!("mask pattern does not compile: {}", e);
    })
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strand {
    Top,
    Bot,
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Top => write!(f, "TOP"),
            Strand::Bot => write!(f, "BOT"),
        }
    }
}

/// A mask split into its three parts, upper cased.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMask {
    pub left: String,
    pub alleles: Vec<char>,
    pub right: String,
}

pub fn is_valid_mask(mask: &str) -> bool {
    MASK_RE.is_match(mask)
}

pub fn split_mask(mask: &str) -> MaskResult<SplitMask> {
    if !is_valid_mask(mask) {
        return Err(MaskError::Malformed(mask.to_string()));
    }
    let upper = mask.to_ascii_uppercase();
    let (left, rest) = upper
        .split_once('[')
        .ok_or_else(|| MaskError::Malformed(mask.to_string()))?;
    let (snp, right) = rest
        .split_once(']')
        .ok_or_else(|| MaskError::Malformed(mask.to_string()))?;
    Ok(SplitMask {
        left: left.to_string(),
        alleles: snp.split('/').filter_map(|a| a.chars().next()).collect(),
        right: right.to_string(),
    })
}

pub fn join_mask(mask: &SplitMask) -> String {
    let alleles: Vec<String> = mask.alleles.iter().map(|a| a.to_string()).collect();
    format!("{}[{}]{}", mask.left, alleles.join("/"), mask.right)
}

fn complement(base: char) -> char {
    match base {
        'A' => 'T',
        'T' => 'A',
        'C' => 'G',
        'G' => 'C',
        'a' => 't',
        't' => 'a',
        'c' => 'g',
        'g' => 'c',
        other => other,
    }
}

pub fn reverse_complement(seq: &str) -> String {
    seq.chars().rev().map(complement).collect()
}

fn is_weak(base: char) -> bool {
    matches!(base, 'A' | 'T')
}

fn strand_of_split(mask: &SplitMask, raw: &str) -> MaskResult<Strand> {
    let [x, y] = mask.alleles[..] else {
        return Err(MaskError::MultiAllelic(raw.to_string()));
    };
    if is_weak(x) != is_weak(y) {
        let weak = if is_weak(x) { x } else { y };
        return Ok(if weak == 'A' { Strand::Top } else { Strand::Bot });
    }
    for (l, r) in mask.left.chars().rev().zip(mask.right.chars()) {
        if is_weak(l) != is_weak(r) {
            return Ok(if is_weak(l) { Strand::Top } else { Strand::Bot });
        }
    }
    Err(MaskError::Undecidable(raw.to_string()))
}

///
/// Illumina strand of a bi-allelic mask.
///
pub fn strand_of(mask: &str) -> MaskResult<Strand> {
    strand_of_split(&split_mask(mask)?, mask)
}

///
/// Rewrite a mask in TOP orientation with its alleles in alphabetical order.
///
/// The returned flag is set when the alleles, once on the TOP strand, were
/// listed in reverse alphabetical order; the A/B labels of data produced
/// against the original mask must then be swapped.
///
pub fn convert_to_top(mask: &str) -> MaskResult<(String, bool)> {
    let split = split_mask(mask)?;
    let mut top = match strand_of_split(&split, mask)? {
        Strand::Top => split,
        Strand::Bot => SplitMask {
            left: reverse_complement(&split.right),
            alleles: split.alleles.iter().map(|a| complement(*a)).collect(),
            right: reverse_complement(&split.left),
        },
    };
    let flip = top.alleles[0] > top.alleles[1];
    top.alleles.sort_unstable();
    Ok((join_mask(&top), flip))
}
