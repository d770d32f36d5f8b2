use crate::models::{CHOICE_COUNT, Tally};

/// One choice's aggregated result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResult {
    pub label: String,
    pub count: u64,
    /// Share of the total, rounded to one decimal place. `0.0` when the poll
    /// has no votes at all.
    pub percentage: f64,
}

/// Aggregated results for one poll, in choice order.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResults {
    pub total_votes: u64,
    pub choices: Vec<ChoiceResult>,
}

impl PollResults {
    /// The choice with the most votes; the first of tied maxima. `None` when
    /// nobody has voted.
    pub fn leading(&self) -> Option<&ChoiceResult> {
        self.choices
            .iter()
            .filter(|c| c.count > 0)
            .fold(None, |best: Option<&ChoiceResult>, c| match best {
                Some(b) if c.count > b.count => Some(c),
                None => Some(c),
                other => other,
            })
    }
}

/// Turn a raw tally into per-choice counts and percentages. Choices absent
/// from the tally count as zero; a fully empty tally yields zero percentages
/// everywhere rather than dividing by zero.
pub fn aggregate(tally: &Tally, choices: &[String; CHOICE_COUNT]) -> PollResults {
    let total_votes: u64 = choices
        .iter()
        .map(|label| tally.get(label).copied().unwrap_or(0))
        .sum();

    let choices = choices
        .iter()
        .map(|label| {
            let count = tally.get(label).copied().unwrap_or(0);
            let percentage = if total_votes == 0 {
                0.0
            } else {
                round1(count as f64 / total_votes as f64 * 100.0)
            };
            ChoiceResult {
                label: label.clone(),
                count,
                percentage,
            }
        })
        .collect();

    PollResults {
        total_votes,
        choices,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
