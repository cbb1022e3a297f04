/// Committee size: quality estimation, coverage, distraction, random.
const VOTERS: f64 = 4.0;

/// `-v/4 + ln(v/4)`; no votes at all scores negative infinity.
pub fn vote_score(votes: usize) -> f64 {
    let share = votes as f64 / VOTERS;
    -share + share.ln()
}

/// Per-sentence committee score from each voter's selection.
pub(super) fn tally(len: usize, ballots: &[Vec<usize>]) -> Vec<f64> {
    let mut votes = vec![0usize; len];
    for ballot in ballots {
        for &i in ballot {
            votes[i] += 1;
        }
    }
    votes.into_iter().map(vote_score).collect()
}
