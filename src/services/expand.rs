//! Query expansion with domain synonyms.
//!
//! Recall against a vector index improves when a query names every
//! lexical variant of a clinical term, not just the one the user
//! typed. The expander replaces any token that heads a known synonym
//! group with the whole group, deduplicating tokens in first-seen
//! order.
//!
//! Expansion is a pure function and idempotent: expanding an already
//! expanded query yields the same token sequence. Built-in group
//! members either head their own group or head none; custom groups
//! are kept closed under membership by [`QueryExpander::with_group`].

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Built-in synonym groups for common clinical terms (pt-BR).
static DEFAULT_SYNONYMS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        ("dor", vec!["dor", "dolor", "algia", "desconforto"]),
        ("cabeça", vec!["cabeça", "crânio", "cefaleia", "cefaléia"]),
        ("enjoo", vec!["enjoo", "náusea", "nausea", "vômito", "vomito"]),
        ("febre", vec!["febre", "hipertermia", "pirexia"]),
        ("tosse", vec!["tosse", "tossir"]),
        (
            "prescrição",
            vec!["prescrição", "receita", "prescrever", "medicação"],
        ),
        (
            "tratamento",
            vec!["tratamento", "terapia", "terapêutica", "conduta"],
        ),
        (
            "diagnóstico",
            vec!["diagnóstico", "diagnostico", "diagnose"],
        ),
    ])
});

/// Rewrites queries by expanding known domain terms into their
/// synonym groups.
#[derive(Debug, Clone)]
pub struct QueryExpander {
    groups: HashMap<String, Vec<String>>,
}

impl QueryExpander {
    /// Creates an expander with the built-in clinical synonym groups.
    #[must_use]
    pub fn new() -> Self {
        let groups = DEFAULT_SYNONYMS
            .iter()
            .map(|(term, variants)| {
                (
                    (*term).to_string(),
                    variants.iter().map(|v| (*v).to_string()).collect(),
                )
            })
            .collect();
        Self { groups }
    }

    /// Creates an expander with no synonym groups.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Adds a synonym group, keyed by every one of its variants.
    ///
    /// Any existing group sharing a variant is folded in, so each
    /// token always expands to one closed set. That closure is what
    /// keeps expansion idempotent even when custom groups overlap.
    #[must_use]
    pub fn with_group(mut self, variants: &[&str]) -> Self {
        let mut merged: Vec<String> = Vec::new();
        for variant in variants {
            let lower = (*variant).to_lowercase();
            if !merged.contains(&lower) {
                merged.push(lower);
            }
        }

        let overlapping: Vec<String> = self
            .groups
            .values()
            .filter(|group| group.iter().any(|member| merged.contains(member)))
            .flat_map(|group| group.iter().cloned())
            .collect();
        for member in overlapping {
            if !merged.contains(&member) {
                merged.push(member);
            }
        }

        for member in &merged {
            self.groups.insert(member.clone(), merged.clone());
        }
        self
    }

    /// Expands a query, returning it unchanged when no token matched
    /// any synonym group.
    #[must_use]
    pub fn expand(&self, query: &str) -> String {
        let mut expanded: Vec<&str> = Vec::new();
        let mut matched = false;

        for token in query.split_whitespace() {
            let lookup = token.to_lowercase();
            if let Some(variants) = self.groups.get(&lookup) {
                matched = true;
                for variant in variants {
                    push_unique(&mut expanded, variant);
                }
            } else {
                push_unique(&mut expanded, token);
            }
        }

        if !matched {
            return query.to_string();
        }

        let result = expanded.join(" ");
        if result == query {
            query.to_string()
        } else {
            result
        }
    }
}

/// Appends a token unless an equal one was already emitted.
fn push_unique<'a>(tokens: &mut Vec<&'a str>, token: &'a str) {
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new()
    }
}
