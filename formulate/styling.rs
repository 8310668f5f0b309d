//! Sub-expression styling applier.
//!
//! Consumes the matcher's output plus each entry's occurrence filter,
//! paints matched nodes in place, and reports tagged per-entry issues.
//! One entry's failure never aborts the batch, and the whole report list
//! is rebuilt on every pass so stale errors cannot survive a successful
//! revalidation.

use formulate_core::{
  MatchError,
  StyleIssue,
  StyleReport,
  SubExpressionStyle,
  VisualTree,
  find_matches,
  style::parse_occurrences,
};

use crate::engine::{
  LayoutMetrics,
  Typesetter,
};

/// Apply every style entry to `tree`, returning the per-entry issues.
///
/// Each non-blank expression is independently typeset (with the engine's
/// counters reset first) to obtain a reference tree, matched against the
/// main tree, and painted according to its occurrence filter. Painting
/// sets the fill on each matched node and recursively beneath it; error/
/// placeholder nodes keep their fixed error styling.
pub async fn apply_styles<T: Typesetter + ?Sized>(
  typesetter: &T,
  tree: &mut VisualTree,
  styles: &[SubExpressionStyle],
  metrics: LayoutMetrics,
) -> Vec<StyleReport> {
  let mut reports = Vec::new();

  for (entry, style) in styles.iter().enumerate() {
    if style.expression.trim().is_empty() {
      continue;
    }

    typesetter.reset_counters();
    let reference = match typesetter.typeset(&style.expression, false, metrics).await {
      Ok(reference) => reference,
      Err(err) => {
        // A reference that cannot be typeset cannot match anything.
        log::debug!("reference typeset failed for {:?}: {err}", style.expression);
        reports.push(StyleReport {
          entry,
          issue: StyleIssue::ExpressionNotFound {
            expression: style.expression.clone(),
          },
        });
        continue;
      },
    };

    let matches = match find_matches(
      tree,
      tree.math_root(),
      &reference,
      reference.math_root(),
    ) {
      Ok(matches) => matches,
      Err(MatchError::EmptyReference) => {
        reports.push(StyleReport {
          entry,
          issue: StyleIssue::ExpressionNotFound {
            expression: style.expression.clone(),
          },
        });
        continue;
      },
    };

    if matches.is_empty() {
      reports.push(StyleReport {
        entry,
        issue: StyleIssue::ExpressionNotFound {
          expression: style.expression.clone(),
        },
      });
      continue;
    }

    let selected: Vec<usize> = if style.applies_to_all() {
      (0..matches.len()).collect()
    } else {
      let raw = style.occurrences.as_deref().unwrap_or("");
      match parse_occurrences(raw, matches.len()) {
        Ok(selected) => selected,
        Err(issue) => {
          reports.push(StyleReport { entry, issue });
          continue;
        },
      }
    };

    for index in selected {
      for &node in &matches[index] {
        tree.set_fill_subtree(node, &style.color);
      }
    }
  }

  reports
}
