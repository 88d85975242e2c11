//! Logo likelihood scoring for candidate images.

use serde::{Deserialize, Serialize};

/// Attributes of an image element considered as a logo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoCandidate {
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub alt: Option<String>,
    pub src: String,
}

/// Indicator terms and weights used by [`LogoScorer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoWeights {
    pub positive_terms: Vec<String>,
    pub positive_weight: i32,
    pub negative_terms: Vec<String>,
    pub negative_weight: i32,
    pub src_bonus_terms: Vec<String>,
    pub src_bonus: i32,
    pub src_penalty_terms: Vec<String>,
    pub src_penalty: i32,
    /// A candidate must score strictly above this to be selected.
    pub min_score: i32,
}

impl Default for LogoWeights {
    fn default() -> Self {
        let terms = |t: &[&str]| t.iter().map(|s| s.to_string()).collect();
        Self {
            positive_terms: terms(&["logo", "brand", "header"]),
            positive_weight: 1,
            negative_terms: terms(&["banner", "hero", "background", "icon-small"]),
            negative_weight: 1,
            src_bonus_terms: terms(&["logo", "brand"]),
            src_bonus: 2,
            src_penalty_terms: terms(&["banner", "hero", "bg"]),
            src_penalty: 1,
            min_score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub candidate: LogoCandidate,
    pub score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct LogoScorer {
    weights: LogoWeights,
}

impl LogoScorer {
    pub fn new(weights: LogoWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &LogoWeights {
        &self.weights
    }

    pub fn score(&self, candidate: &LogoCandidate) -> i32 {
        let w = &self.weights;
        let fields: Vec<String> = candidate
            .classes
            .iter()
            .map(String::as_str)
            .chain(candidate.id.as_deref())
            .chain(candidate.alt.as_deref())
            .chain(std::iter::once(candidate.src.as_str()))
            .map(str::to_ascii_lowercase)
            .collect();
        let occurrences = |terms: &[String]| -> i32 {
            terms
                .iter()
                .map(|term| {
                    let term = term.to_ascii_lowercase();
                    fields.iter().map(|f| f.matches(term.as_str()).count()).sum::<usize>()
                })
                .sum::<usize>() as i32
        };
        let src = candidate.src.to_ascii_lowercase();
        let src_has = |terms: &[String]| {
            terms
                .iter()
                .any(|t| src.contains(t.to_ascii_lowercase().as_str()))
        };

        let mut score = occurrences(&w.positive_terms) * w.positive_weight
            - occurrences(&w.negative_terms) * w.negative_weight;
        if src_has(&w.src_bonus_terms) {
            score += w.src_bonus;
        }
        if src_has(&w.src_penalty_terms) {
            score -= w.src_penalty;
        }
        score
    }

    /// Candidates by descending score; equal scores keep document order.
    pub fn rank(&self, candidates: &[LogoCandidate]) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .map(|c| ScoredCandidate {
                candidate: c.clone(),
                score: self.score(c),
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// The best candidate, if it clears `min_score`.
    pub fn select(&self, candidates: &[LogoCandidate]) -> Option<ScoredCandidate> {
        self.rank(candidates)
            .into_iter()
            .next()
            .filter(|best| best.score > self.weights.min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(classes: &[&str], id: Option<&str>, alt: Option<&str>, src: &str) -> LogoCandidate {
        LogoCandidate {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            id: id.map(str::to_string),
            alt: alt.map(str::to_string),
            src: src.to_string(),
        }
    }

    #[test]
    fn logo_signals_outrank_banner_images() {
        let scorer = LogoScorer::default();
        let logo = candidate(&["logo"], None, None, "/img/logo.svg");
        let banner = candidate(&["photo"], None, None, "/img/banner-1.jpg");
        // class "logo" + src "logo" + src bonus
        assert_eq!(scorer.score(&logo), 4);
        // "banner" in src - penalty
        assert_eq!(scorer.score(&banner), -2);

        let ranked = scorer.rank(&[banner.clone(), logo.clone()]);
        assert_eq!(ranked[0].candidate, logo);
        assert_eq!(scorer.select(&[banner, logo.clone()]).unwrap().candidate, logo);
    }

    #[test]
    fn no_selection_when_nothing_scores_positively() {
        let scorer = LogoScorer::default();
        let candidates = vec![
            candidate(&["hero"], None, Some("Team photo"), "/hero.jpg"),
            candidate(&[], None, None, "/photo.png"),
        ];
        assert!(scorer.select(&candidates).is_none());
        assert!(scorer.select(&[]).is_none());
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let scorer = LogoScorer::default();
        let first = candidate(&["brand"], None, None, "/a.png");
        let second = candidate(&["header"], None, None, "/b.png");
        let best = scorer.select(&[first.clone(), second]).unwrap();
        assert_eq!(best.candidate, first);
    }

    #[test]
    fn weights_are_configurable() {
        let scorer = LogoScorer::new(LogoWeights {
            positive_terms: vec!["wordmark".into()],
            min_score: 1,
            ..LogoWeights::default()
        });
        let c = candidate(&["wordmark"], None, None, "/w.svg");
        assert_eq!(scorer.score(&c), 1);
        assert!(scorer.select(&[c]).is_none());
    }
}
