//! Keyword heuristics over the demo taxonomy
//!
//! A deliberately naive stand-in for a real model: the first keyword bank
//! with a hit decides the label, banks ordered most to least severe.

/// Labels the stub can answer with
pub const LABELS: [&str; 6] = [
    "Call for Violence",
    "Sectarian Incitement",
    "Spreading False Information",
    "Politically Charged but Not Harmful",
    "Neutral",
    "Other",
];

/// Keyword-driven labeler
pub struct KeywordLabeler {
    banks: Vec<(&'static str, Vec<&'static str>)>,
}

impl KeywordLabeler {
    pub fn new() -> Self {
        Self {
            banks: vec![
                (
                    "Call for Violence",
                    vec![
                        "kill them",
                        "burn them",
                        "attack them",
                        "march on",
                        "take up arms",
                        "exterminate",
                        "slaughter",
                    ],
                ),
                (
                    "Sectarian Incitement",
                    vec![
                        "sect",
                        "infidel",
                        "heretic",
                        "apostate",
                        "vermin",
                        "traitors to the faith",
                    ],
                ),
                (
                    "Spreading False Information",
                    vec![
                        "hoax",
                        "miracle cure",
                        "they are hiding",
                        "fake news",
                        "conspiracy",
                        "wake up",
                    ],
                ),
                (
                    "Politically Charged but Not Harmful",
                    vec![
                        "minister",
                        "parliament",
                        "election",
                        "vote",
                        "budget",
                        "government",
                        "regime",
                    ],
                ),
            ],
        }
    }

    /// Label one piece of content, returning the label and a short reason
    pub fn label(&self, text: &str) -> (&'static str, String) {
        if !text.chars().any(|c| c.is_alphabetic()) {
            return ("Other", "content has no analyzable words".to_string());
        }

        let lowered = text.to_lowercase();
        for (label, terms) in &self.banks {
            if let Some(term) = terms.iter().find(|t| lowered.contains(**t)) {
                return (label, format!("matched '{}'", term));
            }
        }

        ("Neutral", "no harmful indicators found".to_string())
    }
}

impl Default for KeywordLabeler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severe_banks_win_over_later_ones() {
        let labeler = KeywordLabeler::new();

        let (label, reason) = labeler.label("March on their offices and burn them down");
        assert_eq!(label, "Call for Violence");
        assert!(reason.contains("march on") || reason.contains("burn them"));

        let (label, _) = labeler.label("Members of that sect are vermin");
        assert_eq!(label, "Sectarian Incitement");

        let (label, _) = labeler.label("The miracle cure they are hiding from you");
        assert_eq!(label, "Spreading False Information");

        let (label, _) = labeler.label("Parliament votes on the budget tomorrow");
        assert_eq!(label, "Politically Charged but Not Harmful");
    }

    #[test]
    fn unmatched_text_is_neutral() {
        let labeler = KeywordLabeler::new();
        let (label, _) = labeler.label("Lovely weather in the capital today");
        assert_eq!(label, "Neutral");
    }

    #[test]
    fn wordless_content_is_other() {
        let labeler = KeywordLabeler::new();
        assert_eq!(labeler.label("123 !!!").0, "Other");
        assert_eq!(labeler.label("\u{2600}\u{1F30A}").0, "Other");
    }

    #[test]
    fn every_answer_is_a_known_label() {
        let labeler = KeywordLabeler::new();
        for text in ["kill them all", "hoax", "vote now", "hello", "42"] {
            let (label, _) = labeler.label(text);
            assert!(LABELS.contains(&label));
        }
    }
}
