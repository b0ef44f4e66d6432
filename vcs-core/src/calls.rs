//! Probabilistic encoding of bi-allelic genotype calls.
//!
//! A call is stored as the pair `(p_AA, p_BB)`; `p_AB` is implied as
//! `1 - p_AA - p_BB`. Arrays of calls are laid out as `2 x N` row-major
//! float arrays: the first `N` values are `p_AA`, the next `N` are `p_BB`.

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_CALL_THRESHOLD;
use crate::errors::{VcsError, VcsResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Call {
    AA,
    AB,
    BB,
    NoCall,
}

impl Call {
    /// One-hot probabilities of a discrete call.
    pub fn probs(&self) -> (f32, f32) {
        match self {
            Call::AA => (1.0, 0.0),
            Call::BB => (0.0, 1.0),
            Call::AB => (0.0, 0.0),
            Call::NoCall => (1.0 / 3.0, 1.0 / 3.0),
        }
    }

    ///
    /// Project a probability pair back to a discrete call. A genotype is
    /// called only when its probability reaches `threshold`.
    ///
    pub fn from_probs(p_aa: f32, p_bb: f32, threshold: f32) -> Call {
        let p_ab = 1.0 - p_aa - p_bb;
        if p_aa >= threshold {
            Call::AA
        } else if p_bb >= threshold {
            Call::BB
        } else if p_ab >= threshold {
            Call::AB
        } else {
            Call::NoCall
        }
    }

    /// The same genotype seen under the opposite A/B convention.
    pub fn flipped(&self) -> Call {
        match self {
            Call::AA => Call::BB,
            Call::BB => Call::AA,
            other => *other,
        }
    }
}

///
/// Encode calls as a `2 x N` probability array plus a confidence array.
///
pub fn encode_calls(calls: &[Call]) -> (Vec<f32>, Vec<f32>) {
    let n = calls.len();
    let mut probs = vec![0.0f32; 2 * n];
    let mut confidence = vec![0.0f32; n];
    for (i, call) in calls.iter().enumerate() {
        let (p_aa, p_bb) = call.probs();
        probs[i] = p_aa;
        probs[n + i] = p_bb;
        confidence[i] = match call {
            Call::NoCall => 0.0,
            _ => 1.0,
        };
    }
    (probs, confidence)
}

///
/// Project a `2 x N` probability array back to discrete calls.
///
pub fn project_calls(probs: &[f32], threshold: Option<f32>) -> VcsResult<Vec<Call>> {
    if probs.len() % 2 != 0 {
        return Err(VcsError::Usage(format!(
            "Probability array of odd length {}",
            probs.len()
        )));
    }
    let threshold = threshold.unwrap_or(DEFAULT_CALL_THRESHOLD);
    let n = probs.len() / 2;
    Ok((0..n)
        .map(|i| Call::from_probs(probs[i], probs[n + i], threshold))
        .collect())
}

///
/// Swap `p_AA` and `p_BB` for every marker whose flag is set, in place.
///
pub fn apply_flip(probs: &mut [f32], flips: &[bool]) -> VcsResult<()> {
    let n = flips.len();
    if probs.len() != 2 * n {
        return Err(VcsError::Usage(format!(
            "Probability array of length {} does not match {} markers",
            probs.len(),
            n
        )));
    }
    for (i, flip) in flips.iter().enumerate() {
        if *flip {
            probs.swap(i, n + i);
        }
    }
    Ok(())
}
