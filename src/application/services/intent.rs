use crate::domain::{Intent, Question};
use crate::infrastructure::config::CannedRule;

/// Decides whether a question gets a pinned answer instead of a model call.
///
/// Rules are checked in order; the first rule with any trigger contained in
/// the question wins.
#[derive(Debug, Clone, Default)]
pub struct IntentClassifier {
    rules: Vec<CannedRule>,
}

impl IntentClassifier {
    pub fn new(rules: Vec<CannedRule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, question: &Question) -> Intent {
        self.rules
            .iter()
            .find(|rule| rule.triggers.iter().any(|t| question.contains(t)))
            .map_or(Intent::NeedsSearch, |rule| Intent::Canned(rule.answer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(vec![
            CannedRule {
                triggers: vec!["寒假".into(), "放假".into()],
                answer: "寒假安排".into(),
            },
            CannedRule {
                triggers: vec!["假".into()],
                answer: "其他假期".into(),
            },
        ])
    }

    #[test]
    fn test_trigger_substring_matches() {
        let q = Question::parse("寒假什么时候开始").unwrap();
        assert_eq!(classifier().classify(&q), Intent::Canned("寒假安排".into()));

        let q = Question::parse("学校几号放假？").unwrap();
        assert_eq!(classifier().classify(&q), Intent::Canned("寒假安排".into()));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let q = Question::parse("请假流程").unwrap();
        assert_eq!(classifier().classify(&q), Intent::Canned("其他假期".into()));
    }

    #[test]
    fn test_no_trigger_needs_search() {
        let q = Question::parse("今天天气怎么样").unwrap();
        assert_eq!(classifier().classify(&q), Intent::NeedsSearch);
        assert_eq!(IntentClassifier::default().classify(&q), Intent::NeedsSearch);
    }
}
