// 📏 Similarity Scorer - character-level label similarity
//
// District names are short, so a character-level ratio works without tokenizing.
// Default metric is the gestalt (Ratcliff/Obershelp) ratio:
//
//     ratio = 2 * M / (|a| + |b|)
//
// where M is the total length of the matching blocks found by recursively taking
// the longest common block and repeating on both sides of it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SCORING METHOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Gestalt matching-blocks ratio (default)
    #[default]
    SequenceRatio,

    /// Jaro-Winkler similarity (favours shared prefixes)
    JaroWinkler,

    /// 1 - levenshtein / max_len
    NormalizedLevenshtein,
}

impl ScoringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMethod::SequenceRatio => "sequence_ratio",
            ScoringMethod::JaroWinkler => "jaro_winkler",
            ScoringMethod::NormalizedLevenshtein => "normalized_levenshtein",
        }
    }

    /// Similarity in [0, 1]. Not assumed symmetric.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            ScoringMethod::SequenceRatio => sequence_ratio(a, b),
            ScoringMethod::JaroWinkler => strsim::jaro_winkler(a, b),
            ScoringMethod::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
        }
    }

    /// Cheap upper bound on `score(a, b)`; used to skip hopeless candidates
    pub fn upper_bound(&self, a: &str, b: &str) -> f64 {
        match self {
            ScoringMethod::SequenceRatio => {
                let real = real_quick_ratio(a, b);
                if real == 0.0 {
                    return real;
                }
                real.min(quick_ratio(a, b))
            }
            _ => 1.0,
        }
    }
}

impl std::str::FromStr for ScoringMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequence_ratio" => Ok(ScoringMethod::SequenceRatio),
            "jaro_winkler" => Ok(ScoringMethod::JaroWinkler),
            "normalized_levenshtein" => Ok(ScoringMethod::NormalizedLevenshtein),
            other => Err(format!("Unknown scoring method: {}", other)),
        }
    }
}

// ============================================================================
// SEQUENCE RATIO
// ============================================================================

/// Gestalt similarity ratio over Unicode scalar values.
///
/// - both empty → 1.0
/// - one empty → 0.0
///
/// Example:
/// - sequence_ratio("Visakhapatanam", "Visakhapatnam") = 26/27 ≈ 0.963
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    ratio_of(matching_characters(&a, &b), total)
}

/// Upper bound from character multiset intersection
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, isize> = HashMap::new();
    let mut len_b = 0;
    for c in b.chars() {
        *available.entry(c).or_insert(0) += 1;
        len_b += 1;
    }

    let mut len_a = 0;
    let mut matches = 0;
    for c in a.chars() {
        len_a += 1;
        let count = available.entry(c).or_insert(0);
        if *count > 0 {
            matches += 1;
        }
        *count -= 1;
    }

    if len_a + len_b == 0 {
        return 1.0;
    }
    ratio_of(matches, len_a + len_b)
}

/// Upper bound from lengths alone
pub fn real_quick_ratio(a: &str, b: &str) -> f64 {
    let la = a.chars().count();
    let lb = b.chars().count();
    if la + lb == 0 {
        return 1.0;
    }
    ratio_of(la.min(lb), la + lb)
}

fn ratio_of(matches: usize, total: usize) -> f64 {
    2.0 * matches as f64 / total as f64
}

/// Total size of all matching blocks between a and b
fn matching_characters(a: &[char], b: &[char]) -> usize {
    // Positions of every character in b, ascending
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }

        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest block a[i..i+k] == b[j..j+k] inside the given window.
/// Ties go to the smallest i, then the smallest j.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);

    // j2len[j] = length of the match ending at a[i-1], b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next_j2len = HashMap::new();

        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }

                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_j2len.insert(j, k);

                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }

        j2len = next_j2len;
    }

    best
}

// ============================================================================
// TESTS
// ============================================================================
