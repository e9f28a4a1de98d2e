//! Quorum rules for replay votes
//!
//! A rule decides whether the votes cast in one squad are enough to replay
//! the whole Session, measured against the members currently live in that
//! squad's channel.

use serde::{Deserialize, Serialize};

/// Rule for determining whether a replay vote passes
///
/// - `Majority`: strictly more than half of the live members (default)
/// - `Unanimous`: every live member
/// - `AtLeast(n)`: at least n votes regardless of live count
/// - `Percentage(p)`: at least p% of the live members
///
/// # Example
///
/// ```
/// use squad_domain::quorum::QuorumRule;
///
/// let rule = QuorumRule::Majority;
/// assert!(rule.is_satisfied(3, 5));  // 3 > 5/2
/// assert!(!rule.is_satisfied(2, 5)); // 2 == floor(5/2)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuorumRule {
    /// More than half of live members must vote (floor(n/2) + 1)
    #[default]
    Majority,

    /// Every live member must vote
    Unanimous,

    /// At least n votes
    AtLeast(usize),

    /// At least this percentage of live members (0-100)
    Percentage(u8),
}

impl QuorumRule {
    /// Check whether `votes` satisfies the rule given `live` members present.
    ///
    /// Live membership is read at vote time, so the threshold shrinks as
    /// members leave. Zero votes never satisfy any rule.
    pub fn is_satisfied(&self, votes: usize, live: usize) -> bool {
        if votes == 0 {
            return false;
        }
        votes >= self.min_votes_needed(live)
    }

    /// Get a human-readable description of this rule
    pub fn description(&self) -> String {
        match self {
            QuorumRule::Majority => "majority (more than half)".to_string(),
            QuorumRule::Unanimous => "unanimous (everyone present)".to_string(),
            QuorumRule::AtLeast(n) => format!("at least {} votes", n),
            QuorumRule::Percentage(p) => format!("at least {}% of members", p),
        }
    }

    /// Minimum number of votes needed for `live` members present
    pub fn min_votes_needed(&self, live: usize) -> usize {
        match self {
            QuorumRule::Majority => live / 2 + 1,
            QuorumRule::Unanimous => live.max(1),
            QuorumRule::AtLeast(n) => (*n).max(1),
            QuorumRule::Percentage(p) => {
                let required = (live as f64 * (*p as f64 / 100.0)).ceil() as usize;
                required.max(1)
            }
        }
    }
}

impl std::fmt::Display for QuorumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::str::FromStr for QuorumRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "majority" => Ok(QuorumRule::Majority),
            "unanimous" => Ok(QuorumRule::Unanimous),
            s if s.starts_with("atleast:") || s.starts_with("at_least:") => {
                let n: usize = s
                    .split(':')
                    .nth(1)
                    .ok_or("Missing number after atleast:")?
                    .parse()
                    .map_err(|_| "Invalid number for atleast")?;
                Ok(QuorumRule::AtLeast(n))
            }
            s if s.starts_with("percentage:") || s.ends_with('%') => {
                let num_str = s.trim_start_matches("percentage:").trim_end_matches('%');
                let p: u8 = num_str.parse().map_err(|_| "Invalid percentage")?;
                if p > 100 {
                    return Err(format!("Percentage out of range: {}", p));
                }
                Ok(QuorumRule::Percentage(p))
            }
            _ => Err(format!(
                "Unknown quorum rule: {}. Valid: majority, unanimous, atleast:N, percentage:N or N%",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_of_five_needs_three() {
        let rule = QuorumRule::Majority;
        assert!(!rule.is_satisfied(2, 5));
        assert!(rule.is_satisfied(3, 5));
        assert!(rule.is_satisfied(5, 5));
    }

    #[test]
    fn test_majority_of_even_count_is_strict() {
        let rule = QuorumRule::Majority;
        assert!(!rule.is_satisfied(2, 4));
        assert!(rule.is_satisfied(3, 4));
        assert!(rule.is_satisfied(1, 1));
    }

    #[test]
    fn test_majority_shrinks_with_live_members() {
        // A squad of 5 where 3 already left: 2 live, so 2 votes pass.
        assert!(QuorumRule::Majority.is_satisfied(2, 2));
        assert!(!QuorumRule::Majority.is_satisfied(1, 2));
    }

    #[test]
    fn test_voter_outside_empty_channel() {
        // Nobody live: a single vote is still a strict majority of zero.
        assert!(QuorumRule::Majority.is_satisfied(1, 0));
        assert!(!QuorumRule::Majority.is_satisfied(0, 0));
    }

    #[test]
    fn test_unanimous_rule() {
        let rule = QuorumRule::Unanimous;
        assert!(!rule.is_satisfied(2, 3));
        assert!(rule.is_satisfied(3, 3));
    }

    #[test]
    fn test_at_least_rule() {
        let rule = QuorumRule::AtLeast(2);
        assert!(!rule.is_satisfied(1, 5));
        assert!(rule.is_satisfied(2, 5));
    }

    #[test]
    fn test_percentage_rule() {
        let rule = QuorumRule::Percentage(75);
        assert!(!rule.is_satisfied(2, 4));
        assert!(rule.is_satisfied(3, 4));
        assert!(!rule.is_satisfied(3, 5));
        assert!(rule.is_satisfied(4, 5));
    }

    #[test]
    fn test_min_votes_needed() {
        assert_eq!(QuorumRule::Majority.min_votes_needed(5), 3);
        assert_eq!(QuorumRule::Majority.min_votes_needed(4), 3);
        assert_eq!(QuorumRule::Majority.min_votes_needed(0), 1);
        assert_eq!(QuorumRule::Unanimous.min_votes_needed(3), 3);
        assert_eq!(QuorumRule::Percentage(75).min_votes_needed(4), 3);
    }

    #[test]
    fn test_parse_rule() {
        assert_eq!("majority".parse::<QuorumRule>().ok(), Some(QuorumRule::Majority));
        assert_eq!("Unanimous".parse::<QuorumRule>().ok(), Some(QuorumRule::Unanimous));
        assert_eq!("atleast:2".parse::<QuorumRule>().ok(), Some(QuorumRule::AtLeast(2)));
        assert_eq!("at_least:3".parse::<QuorumRule>().ok(), Some(QuorumRule::AtLeast(3)));
        assert_eq!(
            "percentage:75".parse::<QuorumRule>().ok(),
            Some(QuorumRule::Percentage(75))
        );
        assert_eq!("80%".parse::<QuorumRule>().ok(), Some(QuorumRule::Percentage(80)));
        assert!("150%".parse::<QuorumRule>().is_err());
        assert!("plurality".parse::<QuorumRule>().is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(QuorumRule::default(), QuorumRule::Majority);
    }
}
