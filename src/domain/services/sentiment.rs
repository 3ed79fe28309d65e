//! NewsSnapshot — recent headlines plus keyword-based sentiment for one
//! ticker. Each positive keyword in a headline contributes +0.25 and each
//! negative keyword -0.25 (clamped to ±1); the snapshot score is the mean
//! across headlines. No external sentiment API or model involved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const POSITIVE_WORDS: &[&str] = &[
    // Price / earnings action
    "surge", "surges", "surging", "soar", "soars", "soaring",
    "jump", "jumps", "jumping", "rise", "rises", "rising", "rally", "rallies",
    "gain", "gains", "high", "highs", "record", "records",
    // Earnings / fundamentals
    "beat", "beats", "beating", "exceeded", "exceeds", "exceed",
    "outperform", "outperforms", "strong", "strength", "profit",
    "revenue", "growth", "grew", "expand", "expands", "expansion",
    // Analyst / rating
    "upgrade", "upgrades", "upgraded", "buy", "overweight",
    "bullish", "positive", "optimistic", "upside",
    // Corporate actions
    "approved", "approves", "breakthrough", "partnership", "deal", "wins",
    "awarded", "contract", "dividend", "buyback",
];

const NEGATIVE_WORDS: &[&str] = &[
    // Price action
    "drop", "drops", "dropping", "fall", "falls", "falling",
    "plunge", "plunges", "plunging", "crash", "crashes", "crashing",
    "decline", "declines", "declining", "slump", "slumps", "low", "lows",
    // Earnings / fundamentals
    "miss", "misses", "missed", "disappoints", "disappointing",
    "weak", "weakness", "loss", "losses", "deficit",
    "cut", "cuts", "cutting", "reduce", "reduces",
    // Analyst / rating
    "downgrade", "downgrades", "downgraded", "sell", "underperform",
    "underweight", "bearish", "negative", "pessimistic", "downside",
    // Legal / risk
    "lawsuit", "lawsuits", "investigation", "probe", "fine", "fined",
    "fraud", "recall", "warning", "concern", "concerns", "risk", "risks",
    "delay", "delays", "layoff", "layoffs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Bullish,
    Neutral,
    Bearish,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Bullish => write!(f, "bullish"),
            SentimentLabel::Neutral => write!(f, "neutral"),
            SentimentLabel::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub publisher: String,
    pub age_hours: f64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSnapshot {
    pub ticker: String,
    pub headline_count: usize,
    pub articles: Vec<Article>,
    /// Mean headline score, range [-1.0, +1.0].
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
}

impl NewsSnapshot {
    /// Multi-line text summary suitable for LLM context.
    pub fn summary(&self) -> String {
        if self.headline_count == 0 {
            return format!("{} news: no recent headlines found.", self.ticker);
        }

        let mut lines = vec![format!(
            "{} news ({} headlines, sentiment: {} {:+.2}):",
            self.ticker,
            self.headline_count,
            self.sentiment_label.to_string().to_uppercase(),
            self.sentiment_score
        )];
        for article in self.articles.iter().take(6) {
            let age_str = if article.age_hours < 48.0 {
                format!("{:.0}h", article.age_hours)
            } else {
                format!("{:.0}d", article.age_hours / 24.0)
            };
            lines.push(format!(
                "  [{}] \"{}\" ({})",
                age_str, article.title, article.publisher
            ));
        }
        lines.join("\n")
    }
}

/// Keyword sentiment score for a single headline, in [-1.0, +1.0].
pub fn score_headline(title: &str) -> f64 {
    let lowered = title.to_lowercase().replace([',', '.'], " ");
    let tokens: std::collections::HashSet<&str> = lowered.split_whitespace().collect();

    let mut score: f64 = 0.0;
    for token in tokens {
        if POSITIVE_WORDS.contains(&token) {
            score += 0.25;
        } else if NEGATIVE_WORDS.contains(&token) {
            score -= 0.25;
        }
    }
    score.clamp(-1.0, 1.0)
}

pub fn compute(ticker: &str, articles: Vec<Article>) -> NewsSnapshot {
    if articles.is_empty() {
        return NewsSnapshot {
            ticker: ticker.to_string(),
            headline_count: 0,
            articles,
            sentiment_score: 0.0,
            sentiment_label: SentimentLabel::Neutral,
        };
    }

    let avg: f64 =
        articles.iter().map(|a| score_headline(&a.title)).sum::<f64>() / articles.len() as f64;

    let label = if avg >= 0.1 {
        SentimentLabel::Bullish
    } else if avg <= -0.1 {
        SentimentLabel::Bearish
    } else {
        SentimentLabel::Neutral
    };

    NewsSnapshot {
        ticker: ticker.to_string(),
        headline_count: articles.len(),
        articles,
        sentiment_score: (avg * 1000.0).round() / 1000.0,
        sentiment_label: label,
    }
}

pub fn compute_all(news_raw: HashMap<String, Vec<Article>>) -> HashMap<String, NewsSnapshot> {
    news_raw
        .into_iter()
        .map(|(ticker, articles)| {
            let snapshot = compute(&ticker, articles);
            (ticker, snapshot)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn article(title: &str, age_hours: f64) -> Article {
        Article {
            title: title.to_string(),
            publisher: "Newswire".to_string(),
            age_hours,
            url: "https://example.com/a".to_string(),
        }
    }

    #[test]
    fn test_score_headline_positive_keywords() {
        // surges + record + profit = 3 * 0.25
        let score = score_headline("Stock surges on record profit");
        assert_relative_eq!(score, 0.75);
    }

    #[test]
    fn test_score_headline_mixed_and_clamped() {
        assert_relative_eq!(score_headline("Shares rise despite lawsuit concerns"), -0.25);
        // Six positive keywords clamp at +1.
        let score =
            score_headline("Record surge: strong growth, revenue beat, dividend buyback");
        assert_relative_eq!(score, 1.0);
    }

    #[test]
    fn test_score_headline_duplicate_tokens_count_once() {
        // Tokenization into a set: repeated words contribute once.
        assert_relative_eq!(score_headline("gains gains gains"), 0.25);
    }

    #[test]
    fn test_compute_labels() {
        let bullish = compute("VOO", vec![article("Markets rally to record highs", 5.0)]);
        assert_eq!(bullish.sentiment_label, SentimentLabel::Bullish);

        let bearish = compute("SNOW", vec![article("Shares plunge after earnings miss", 2.0)]);
        assert_eq!(bearish.sentiment_label, SentimentLabel::Bearish);

        let neutral = compute(
            "QQMG",
            vec![article("Quarterly report published on schedule", 20.0)],
        );
        assert_eq!(neutral.sentiment_label, SentimentLabel::Neutral);
        assert_relative_eq!(neutral.sentiment_score, 0.0);
    }

    #[test]
    fn test_compute_empty_articles() {
        let snap = compute("VOO", vec![]);
        assert_eq!(snap.headline_count, 0);
        assert_eq!(snap.sentiment_label, SentimentLabel::Neutral);
        assert_eq!(snap.summary(), "VOO news: no recent headlines found.");
    }

    #[test]
    fn test_summary_age_rendering() {
        let snap = compute(
            "SNOW",
            vec![article("Quiet day", 5.4), article("Last week recap", 96.0)],
        );
        let summary = snap.summary();
        assert!(summary.contains("[5h]"));
        assert!(summary.contains("[4d]"));
        assert!(summary.contains("2 headlines"));
    }
}
