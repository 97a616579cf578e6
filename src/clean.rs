//! Removal of archive-injected comments and banners from replayed code.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::archives::CleaningRule;

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("static comment pattern"));

enum Step {
    Comments,
    Between(Regex),
}

/// An archive's cleaning rules compiled for repeated use.
pub struct CleaningRecipe {
    steps: Vec<Step>,
}

impl CleaningRecipe {
    /// Compile rules in order. Each `remove_between` pair becomes one
    /// case-insensitive, non-greedy `start ... end` pattern.
    pub fn compile(rules: &[CleaningRule]) -> Result<Self, regex::Error> {
        let mut steps = Vec::new();
        for rule in rules {
            if rule.remove_comments {
                steps.push(Step::Comments);
            }
            for d in &rule.remove_between {
                let regex = Regex::new(&format!("(?is){}.*?{}", d.start, d.end))?;
                steps.push(Step::Between(regex));
            }
        }
        Ok(Self { steps })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step in order.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for step in &self.steps {
            let regex = match step {
                Step::Comments => &*BLOCK_COMMENT,
                Step::Between(regex) => regex,
            };
            let replaced = match regex.replace_all(&out, "") {
                Cow::Owned(s) => Some(s),
                Cow::Borrowed(_) => None,
            };
            if let Some(s) = replaced {
                out = Cow::Owned(s);
            }
        }
        out
    }
}

/// One-shot helper: compile `rules` and clean `text`.
pub fn apply_cleaning_rules(rules: &[CleaningRule], text: &str) -> Result<String, regex::Error> {
    Ok(CleaningRecipe::compile(rules)?.apply(text).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archives::{builtin_profiles, Delimiters};

    fn banner_rule() -> CleaningRule {
        CleaningRule::remove_between(vec![Delimiters::new(r"/\* FILE ARCHIVED ON", r"\*/")])
    }

    #[test]
    fn removes_block_comments() {
        let rules = vec![CleaningRule::remove_comments()];
        let out = apply_cleaning_rules(&rules, "a{}/* one */b{}/*\n two\n*/c{}").unwrap();
        assert_eq!(out, "a{}b{}c{}");
    }

    #[test]
    fn removes_archive_banner() {
        let js = "var x = 1;\n/* FILE ARCHIVED ON 12:00:00 Jan 01, 2010 AND RETRIEVED FROM THE\n     INTERNET ARCHIVE ON 2020.\n*/";
        let out = apply_cleaning_rules(&[banner_rule()], js).unwrap();
        assert_eq!(out, "var x = 1;\n");
    }

    #[test]
    fn banner_match_is_case_insensitive() {
        let out = apply_cleaning_rules(&[banner_rule()], "x/* file archived on 2010 */y").unwrap();
        assert_eq!(out, "xy");
    }

    #[test]
    fn clean_text_is_unchanged() {
        let text = "body { color: red; }";
        let recipe = CleaningRecipe::compile(&[banner_rule()]).unwrap();
        assert!(matches!(recipe.apply(text), Cow::Borrowed(_)));
        assert_eq!(recipe.apply(text), text);
    }

    #[test]
    fn idempotent() {
        let rules = builtin_profiles()
            .into_iter()
            .find(|p| p.id == "ia")
            .unwrap()
            .cleaning_rules;
        let recipe = CleaningRecipe::compile(&rules).unwrap();
        let once = recipe.apply("a/* FILE ARCHIVED ON x */b<!-- FILE ARCHIVED ON y -->c").into_owned();
        let twice = recipe.apply(&once).into_owned();
        assert_eq!(once, "abc");
        assert_eq!(once, twice);
    }

    #[test]
    fn html_banner_removed() {
        let rules = vec![CleaningRule::remove_between(vec![Delimiters::new(
            "<!-- FILE ARCHIVED ON",
            "-->",
        )])];
        let out = apply_cleaning_rules(&rules, "<p>x</p>\n<!-- FILE ARCHIVED ON 2010\n JAVASCRIPT APPENDED BY WAYBACK -->").unwrap();
        assert_eq!(out, "<p>x</p>\n");
    }

    #[test]
    fn empty_rules_are_noop() {
        let recipe = CleaningRecipe::compile(&[]).unwrap();
        assert!(recipe.is_empty());
        assert_eq!(recipe.apply("/* kept */"), "/* kept */");
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let rules = vec![CleaningRule::remove_between(vec![Delimiters::new("[", "x")])];
        assert!(CleaningRecipe::compile(&rules).is_err());
    }
}
