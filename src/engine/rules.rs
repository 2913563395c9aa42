use crate::config::{RulesConfig, SpecialClick, Variant};
use crate::perception::types::Point;

/// What a recognized text asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Purchase flow is over; stop the run.
    Terminal { keyword: String },
    /// Tap a fixed position regardless of where the text is.
    Special { keyword: String, at: Point },
    /// Tap the centre of the text.
    Target,
}

/// Immutable text-matching rules, built once per variant.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    terminal: Vec<String>,
    special: Vec<SpecialClick>,
    targets: Vec<String>,
    exact_targets: Vec<String>,
}

impl ClassificationRules {
    pub fn new(
        terminal: Vec<String>,
        special: Vec<SpecialClick>,
        targets: Vec<String>,
        exact_targets: Vec<String>,
    ) -> Self {
        Self {
            terminal,
            special,
            targets,
            exact_targets,
        }
    }

    pub fn from_config(cfg: &RulesConfig) -> Self {
        Self::new(
            cfg.terminal.clone(),
            cfg.special_clicks.clone(),
            cfg.targets.clone(),
            cfg.exact_targets.clone(),
        )
    }

    /// Shared rules plus the variant's own special clicks, appended last.
    pub fn for_variant(cfg: &RulesConfig, variant: &Variant) -> Self {
        let mut rules = Self::from_config(cfg);
        rules.special.extend(variant.special_clicks.iter().cloned());
        rules
    }

    /// Precedence is terminal, then special, then target: one text can
    /// satisfy several predicates but only one action is ever taken.
    pub fn classify(&self, text: &str) -> Option<Rule> {
        if let Some(keyword) = self.terminal.iter().find(|t| text.contains(t.as_str())) {
            return Some(Rule::Terminal {
                keyword: keyword.clone(),
            });
        }
        if let Some(sc) = self.special.iter().find(|s| text.contains(s.keyword.as_str())) {
            return Some(Rule::Special {
                keyword: sc.keyword.clone(),
                at: Point::new(sc.x, sc.y),
            });
        }
        let substring = self.targets.iter().any(|t| text.contains(t.as_str()));
        let exact = self.exact_targets.iter().any(|t| t == text);
        if substring || exact {
            return Some(Rule::Target);
        }
        None
    }
}
