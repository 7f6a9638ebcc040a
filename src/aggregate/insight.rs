// src/aggregate/insight.rs
//
// Rule-based reading of the free-text notes: keyword tallies per sentiment
// and reason category, then a decision table that picks a summary template.

use serde::{Deserialize, Serialize};

use super::group::{group_counts, GroupCount, Tally};
use crate::ingest::Record;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightRules {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub neutral: Vec<String>,
    pub timeline: Vec<String>,
    pub categories: Vec<CategoryRule>,
    /// Category for notes that match none of `categories`.
    pub fallback_category: String,
    /// One sentiment dominates when it exceeds the other times this ratio.
    pub dominance_ratio: f64,
}

impl Default for InsightRules {
    fn default() -> Self {
        let category = |name: &str, keywords: &[&str]| CategoryRule {
            name: name.to_string(),
            keywords: strings(keywords),
        };
        Self {
            positive: strings(&[
                "긍정", "관심 있", "호의", "좋", "만족", "협조", "입점 희망", "interested",
                "positive",
            ]),
            negative: strings(&[
                "거절", "불가", "부정", "어렵", "싫", "불만", "관심 없", "관심없", "not interested",
                "reject", "decline",
            ]),
            neutral: strings(&["보류", "고민", "미정", "검토", "부재", "pending", "undecided"]),
            timeline: strings(&[
                "추후", "다음 달", "다음달", "다음 주", "다음주", "내년", "재연락", "재컨택", "예정",
                "later", "next week", "next month", "follow up",
            ]),
            categories: vec![
                category("수수료/가격", &["수수료", "가격", "비용", "단가", "fee", "price", "cost"]),
                category(
                    "타 플랫폼",
                    &["타 플랫폼", "타플랫폼", "다른 플랫폼", "경쟁", "competitor"],
                ),
                category("운영/인력", &["인력", "일손", "운영", "바쁨", "바빠", "staff"]),
                category("시스템", &["시스템", "연동", "system"]),
            ],
            fallback_category: "기타".to_string(),
            dominance_ratio: 1.5,
        }
    }
}

fn mentions(text: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub timeline: usize,
}

/// How the outcomes of the selection compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLean {
    Winning,
    Losing,
    Even,
}

impl OutcomeLean {
    pub fn from_counts(success: usize, negative: usize) -> Self {
        match success.cmp(&negative) {
            std::cmp::Ordering::Greater => OutcomeLean::Winning,
            std::cmp::Ordering::Less => OutcomeLean::Losing,
            std::cmp::Ordering::Equal => OutcomeLean::Even,
        }
    }
}

/// The inputs of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub has_notes: bool,
    pub positive_dominant: bool,
    pub negative_dominant: bool,
    pub timeline: bool,
    pub lean: OutcomeLean,
}

impl Signals {
    pub fn derive(notes: usize, s: &SentimentCounts, lean: OutcomeLean, ratio: f64) -> Self {
        let (pos, neg) = (s.positive as f64, s.negative as f64);
        Self {
            has_notes: notes > 0,
            positive_dominant: pos > neg * ratio,
            negative_dominant: neg > pos * ratio,
            timeline: s.timeline > 0,
            lean,
        }
    }
}

/// A row of the decision table; `None` means "don't care".
#[derive(Debug, Clone, Copy)]
struct Pattern {
    has_notes: Option<bool>,
    positive_dominant: Option<bool>,
    negative_dominant: Option<bool>,
    timeline: Option<bool>,
    lean: Option<OutcomeLean>,
}

const ANY: Pattern = Pattern {
    has_notes: None,
    positive_dominant: None,
    negative_dominant: None,
    timeline: None,
    lean: None,
};

impl Pattern {
    fn matches(&self, s: &Signals) -> bool {
        fn ok<T: PartialEq>(want: Option<T>, got: T) -> bool {
            want.map_or(true, |w| w == got)
        }
        ok(self.has_notes, s.has_notes)
            && ok(self.positive_dominant, s.positive_dominant)
            && ok(self.negative_dominant, s.negative_dominant)
            && ok(self.timeline, s.timeline)
            && ok(self.lean, s.lean)
    }
}

struct Rule {
    id: &'static str,
    when: Pattern,
    template: &'static str,
}

/// First matching row wins; the last row matches everything.
static RULES: &[Rule] = &[
    Rule {
        id: "no_notes",
        when: Pattern {
            has_notes: Some(false),
            ..ANY
        },
        template: "선택한 조건에 기록된 메모가 없습니다.",
    },
    Rule {
        id: "optimistic_follow_up",
        when: Pattern {
            positive_dominant: Some(true),
            timeline: Some(true),
            ..ANY
        },
        template: "긍정 반응이 우세합니다(긍정 {positive}건, 부정 {negative}건). 후속 일정이 언급된 메모 {timeline}건을 먼저 챙기세요.",
    },
    Rule {
        id: "optimistic",
        when: Pattern {
            positive_dominant: Some(true),
            ..ANY
        },
        template: "긍정 반응이 우세합니다(긍정 {positive}건, 부정 {negative}건). 전환 가능성이 높은 곳부터 재컨택하세요.",
    },
    Rule {
        id: "losing_ground",
        when: Pattern {
            negative_dominant: Some(true),
            lean: Some(OutcomeLean::Losing),
            ..ANY
        },
        template: "거절이 입점보다 많고 부정 메모가 우세합니다(부정 {negative}건). 주요 사유는 '{top_category}'입니다.",
    },
    Rule {
        id: "cautious",
        when: Pattern {
            negative_dominant: Some(true),
            ..ANY
        },
        template: "부정 반응이 우세합니다(긍정 {positive}건, 부정 {negative}건). '{top_category}' 관련 대응이 필요합니다.",
    },
    Rule {
        id: "follow_up",
        when: Pattern {
            timeline: Some(true),
            ..ANY
        },
        template: "반응이 엇갈립니다. 후속 일정이 언급된 메모 {timeline}건을 놓치지 마세요.",
    },
    Rule {
        id: "mixed_but_winning",
        when: Pattern {
            lean: Some(OutcomeLean::Winning),
            ..ANY
        },
        template: "메모 반응은 엇갈리지만 입점이 거절보다 많습니다(메모 {notes}건).",
    },
    Rule {
        id: "balanced",
        when: ANY,
        template: "메모 {notes}건의 반응이 고르게 나뉩니다(긍정 {positive}건, 부정 {negative}건, 보류 {neutral}건).",
    },
];

/// Index and id of the first rule matching `signals`.
pub fn select_rule(signals: &Signals) -> (usize, &'static str) {
    RULES
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.when.matches(signals))
        .map(|(idx, rule)| (idx, rule.id))
        .unwrap_or((RULES.len() - 1, "balanced"))
}

fn render(template: &str, notes: usize, s: &SentimentCounts, top_category: &str) -> String {
    template
        .replace("{notes}", &notes.to_string())
        .replace("{positive}", &s.positive.to_string())
        .replace("{negative}", &s.negative.to_string())
        .replace("{neutral}", &s.neutral.to_string())
        .replace("{timeline}", &s.timeline.to_string())
        .replace("{top_category}", top_category)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightSummary {
    pub notes_considered: usize,
    pub sentiment: SentimentCounts,
    pub categories: Vec<GroupCount>,
    pub signals: Signals,
    /// Id of the decision-table row that produced `summary`.
    pub rule: &'static str,
    pub summary: String,
}

/// Tally the notes of `records` and pick a summary.
pub fn summarize(records: &[&Record], lean: OutcomeLean, rules: &InsightRules) -> InsightSummary {
    let mut sentiment = SentimentCounts::default();
    let mut categories: Tally<String> = Tally::new();
    let mut notes_considered = 0;

    for record in records {
        let text = match record.notes.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_lowercase(),
            _ => continue,
        };
        notes_considered += 1;

        sentiment.positive += usize::from(mentions(&text, &rules.positive));
        sentiment.negative += usize::from(mentions(&text, &rules.negative));
        sentiment.neutral += usize::from(mentions(&text, &rules.neutral));
        sentiment.timeline += usize::from(mentions(&text, &rules.timeline));

        let mut any = false;
        for category in &rules.categories {
            if mentions(&text, &category.keywords) {
                categories.add(category.name.clone());
                any = true;
            }
        }
        if !any {
            categories.add(rules.fallback_category.clone());
        }
    }

    let categories = group_counts(categories);
    let top_category = categories
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_else(|| rules.fallback_category.clone());

    let signals = Signals::derive(notes_considered, &sentiment, lean, rules.dominance_ratio);
    let (idx, rule) = select_rule(&signals);
    let summary = render(RULES[idx].template, notes_considered, &sentiment, &top_category);

    InsightSummary {
        notes_considered,
        sentiment,
        categories,
        signals,
        rule,
        summary,
    }
}
