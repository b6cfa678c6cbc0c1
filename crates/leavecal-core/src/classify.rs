use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

use crate::model::{
  CategoryStyle,
  LeaveStatus
};

/// Keywords tested, as lower-case substrings, against a leave-type label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
  keywords: Vec<String>,
  category: CategoryStyle
}

impl KeywordRule {
  pub fn new<I, S>(
    keywords: I,
    category: CategoryStyle
  ) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>
  {
    Self {
      keywords: keywords
        .into_iter()
        .map(|kw| {
          kw.as_ref()
            .trim()
            .to_lowercase()
        })
        .filter(|kw| !kw.is_empty())
        .collect(),
      category
    }
  }

  pub fn category(
    &self
  ) -> CategoryStyle {
    self.category
  }

  pub fn keywords(&self) -> &[String] {
    &self.keywords
  }

  fn matches(
    &self,
    lowered_label: &str
  ) -> bool {
    self.keywords.iter().any(|kw| {
      lowered_label.contains(kw.as_str())
    })
  }
}

/// Ordered, first-match-wins keyword table.
///
/// Earlier rules shadow later ones: a label holding both "sick" and "remote"
/// is `sick`. New rules are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
  rules: Vec<KeywordRule>
}

impl Default for Classifier {
  fn default() -> Self {
    Self {
      rules: vec![
        KeywordRule::new(
          ["casual", "cl"],
          CategoryStyle::Casual
        ),
        KeywordRule::new(
          ["sick", "sl"],
          CategoryStyle::Sick
        ),
        KeywordRule::new(
          [
            "wfh",
            "work from home",
            "remote"
          ],
          CategoryStyle::Remote
        ),
        KeywordRule::new(
          ["annual", "vacation"],
          CategoryStyle::Annual
        ),
        KeywordRule::new(
          ["maternity", "paternity"],
          CategoryStyle::Maternity
        ),
      ]
    }
  }
}

impl Classifier {
  #[must_use]
  pub fn with_rule(
    mut self,
    rule: KeywordRule
  ) -> Self {
    self.push_rule(rule);
    self
  }

  pub fn push_rule(
    &mut self,
    rule: KeywordRule
  ) {
    self.rules.push(rule);
  }

  pub fn rules(&self) -> &[KeywordRule] {
    &self.rules
  }

  pub fn classify(
    &self,
    label: &str,
    status: &LeaveStatus
  ) -> CategoryStyle {
    if *status == LeaveStatus::Pending {
      return CategoryStyle::Pending;
    }

    let lowered = label.to_lowercase();
    if let Some(rule) = self
      .rules
      .iter()
      .find(|rule| rule.matches(&lowered))
    {
      return rule.category;
    }

    match status {
      | LeaveStatus::Approved => {
        CategoryStyle::ApprovedOther
      }
      | _ => {
        CategoryStyle::RejectedOther
      }
    }
  }

  /// Appends the rules from a TOML file after the existing ones.
  #[tracing::instrument(skip(self), fields(file = %path.display()))]
  pub fn extend_from_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<usize> {
    let raw = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    let added =
      self.extend_from_toml(&raw).with_context(
        || {
          format!(
            "failed to parse {}",
            path.display()
          )
        }
      )?;
    tracing::info!(
      added,
      "loaded extra classification rules"
    );
    Ok(added)
  }

  pub fn extend_from_toml(
    &mut self,
    raw: &str
  ) -> anyhow::Result<usize> {
    let parsed: RuleFile =
      toml::from_str(raw)?;
    let mut added = 0_usize;
    for entry in parsed.rule {
      let category: CategoryStyle =
        entry.category.parse()?;
      let rule = KeywordRule::new(
        entry.keywords,
        category
      );
      if rule.keywords.is_empty() {
        tracing::warn!(
          %category,
          "skipping rule with no keywords"
        );
        continue;
      }
      self.push_rule(rule);
      added += 1;
    }
    Ok(added)
  }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
  #[serde(default)]
  rule: Vec<RuleEntry>
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
  keywords: Vec<String>,
  category: String
}

/// Classifies with the built-in rule table.
pub fn classify(
  label: &str,
  status: &LeaveStatus
) -> CategoryStyle {
  static DEFAULT: OnceLock<Classifier> =
    OnceLock::new();
  DEFAULT
    .get_or_init(Classifier::default)
    .classify(label, status)
}
