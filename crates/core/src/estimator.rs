/// Maps raw text to an approximate token count.
pub trait Estimator: Send + Sync {
    fn estimate(&self, text: &str) -> u64;
}

/// `ceil(len / 4 * 1.2)` over UTF-16 code units, the length the page reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharRatioEstimator;

impl Estimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> u64 {
        estimate_tokens(text)
    }
}

pub fn estimate_tokens(text: &str) -> u64 {
    let len = text.encode_utf16().count() as u64;
    // len / 4 * 1.2 == 3 * len / 10, rounded up in integer arithmetic.
    (len.saturating_mul(3)).div_ceil(10)
}
