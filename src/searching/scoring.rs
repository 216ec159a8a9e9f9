//! BM25 scoring, used as a match-membership test.
//!
//! Scores decide only whether a row matches; they never order the output,
//! which stays in original row order by contract. The free parameters are
//! conventional defaults and operational tuning values, not structural.

/// BM25 term-frequency saturation parameter.
pub const BM25_K1: f32 = 1.2;
/// BM25 length-normalization strength.
pub const BM25_B: f32 = 0.75;

/// One term's BM25 contribution to a row's score.
///
/// * `tf`: term frequency within the row
/// * `df`: number of rows containing the term
/// * `total_rows`: rows in the index
/// * `row_len`: token count of the row
/// * `avg_row_len`: average token count across indexed rows
///
/// Uses the +1-smoothed idf, which is strictly positive for any `df >= 1`,
/// so every row holding at least one query term scores positive.
pub fn bm25_score(tf: f32, df: f32, total_rows: f32, row_len: f32, avg_row_len: f32) -> f32 {
    let idf = ((total_rows - df + 0.5) / (df + 0.5) + 1.0).ln();

    let norm = if avg_row_len > 0.0 {
        1.0 - BM25_B + BM25_B * (row_len / avg_row_len)
    } else {
        1.0
    };

    idf * (tf * (BM25_K1 + 1.0)) / (tf + BM25_K1 * norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_present_term_scores_positive() {
        // Membership test soundness: tf >= 1 must always score > 0, even
        // for a term present in every row.
        assert!(bm25_score(1.0, 1.0, 1.0, 5.0, 5.0) > 0.0);
        assert!(bm25_score(1.0, 1000.0, 1000.0, 5.0, 5.0) > 0.0);
    }

    #[test]
    fn higher_frequency_scores_higher() {
        let low = bm25_score(1.0, 10.0, 1000.0, 100.0, 100.0);
        let high = bm25_score(5.0, 10.0, 1000.0, 100.0, 100.0);
        assert!(high > low);
    }

    #[test]
    fn rarer_terms_score_higher() {
        let common = bm25_score(1.0, 500.0, 1000.0, 100.0, 100.0);
        let rare = bm25_score(1.0, 2.0, 1000.0, 100.0, 100.0);
        assert!(rare > common);
    }

    #[test]
    fn longer_rows_are_penalized() {
        let short = bm25_score(1.0, 10.0, 1000.0, 50.0, 100.0);
        let long = bm25_score(1.0, 10.0, 1000.0, 400.0, 100.0);
        assert!(short > long);
    }

    #[test]
    fn zero_average_length_does_not_divide_by_zero() {
        let score = bm25_score(1.0, 1.0, 1.0, 0.0, 0.0);
        assert!(score.is_finite());
        assert!(score > 0.0);
    }
}
