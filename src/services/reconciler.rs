//! Output reconciliation.
//!
//! Collapses aggregated text and state into exactly one [`ReviewOutput`].
//! This boundary faces the end user and therefore never fails: malformed
//! JSON, unbalanced braces, empty text and empty state all resolve to a
//! defined result with every field populated.
//!
//! Priority order: a structured object in session state wins over anything
//! embedded in text; a JSON string in state is parsed and treated the same;
//! otherwise the text is mined for structure (leading fenced block, then
//! brace-balanced spans, then the whole trimmed text) before falling back
//! to wrapping the text verbatim or synthesizing a diagnostic result.

use serde_json::Value;

use crate::domain::models::{
    InlineComment, ModelUsage, OverallStatus, PerformanceMetrics, ReviewMetrics, ReviewOutput,
};

/// State keys that may carry the structured review output, in priority order.
pub const OUTPUT_STATE_KEYS: &[&str] = &["code_review_output", "formatted_output"];

/// Summary used when neither text nor state yielded anything.
const SCHEMA_MISMATCH_SUMMARY: &str =
    "Code review completed successfully, but the review content could not be extracted \
     from the agent response. This usually indicates a streaming response schema mismatch. \
     Please check workflow logs for details.";

/// Collapse aggregated text and state into one review output.
pub fn reconcile(
    combined_text: &str,
    merged_state: &serde_json::Map<String, Value>,
) -> ReviewOutput {
    let mut text = combined_text.trim().to_string();

    if let Some(structured) = first_present_output(merged_state) {
        match structured {
            Value::Object(map) if has_signal_field(map) => {
                return coerce_map(map.clone(), &text);
            }
            Value::String(raw) if !raw.trim().is_empty() => {
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => return coerce_map(map, &text),
                    Ok(_) => {}
                    // Not JSON after all: treat the string as more text.
                    Err(_) => {
                        text = format!("{text}\n{raw}").trim().to_string();
                    }
                }
            }
            _ => {}
        }
    }

    if text.is_empty() {
        return schema_mismatch_output();
    }

    if let Some(interior) = strip_leading_fence(&text) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(interior) {
            if has_signal_field(&map) {
                return coerce_map(map, "");
            }
        }
    }

    if let Some(output) = best_embedded_object(&text) {
        return output;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) {
        if has_signal_field(&map) {
            return coerce_map(map, "");
        }
    }

    wrap_text_output(text)
}

/// First state value under [`OUTPUT_STATE_KEYS`] that is present and
/// non-empty.
fn first_present_output(state: &serde_json::Map<String, Value>) -> Option<&Value> {
    OUTPUT_STATE_KEYS
        .iter()
        .filter_map(|key| state.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Number(n) => n.as_f64() != Some(0.0),
        })
}

/// A mapping qualifies as review output when it carries either signal field.
fn has_signal_field(map: &serde_json::Map<String, Value>) -> bool {
    map.contains_key("summary") || map.contains_key("overall_status")
}

/// Strip a leading fenced code block and return its interior.
///
/// Accepts both ```` ```json ```` and bare ```` ``` ```` fences.
fn strip_leading_fence(text: &str) -> Option<&str> {
    let rest = text.trim_start().strip_prefix("```")?;
    // Drop the info string ("json", "JSON", nothing) up to end of line.
    let body = rest.split_once('\n')?.1;
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Scan for every brace-balanced `{…}` span and pick the best candidate.
///
/// Candidates must parse as a mapping holding a signal field. The winner
/// has the most top-level fields; ties go to the latest position, so later,
/// more complete objects win. If the chosen span is preceded by prose and
/// carries no summary, the prose becomes the summary.
fn best_embedded_object(text: &str) -> Option<ReviewOutput> {
    let mut best: Option<(usize, usize, serde_json::Map<String, Value>)> = None;

    for (start, end) in balanced_spans(text) {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..end]) else {
            continue;
        };
        if !has_signal_field(&map) {
            continue;
        }
        let better = best
            .as_ref()
            .is_none_or(|(best_start, _, best_map)| {
                (map.len(), start) >= (best_map.len(), *best_start)
            });
        if better {
            best = Some((start, end, map));
        }
    }

    let (start, _, map) = best?;
    let prose = text[..start].trim().trim_matches('`').trim();
    Some(coerce_map(map, prose))
}

/// All brace-balanced spans in `text`, at every nesting depth.
///
/// Explicit depth-counter state machine, string- and escape-aware inside
/// spans. Deliberately not a regular expression: balanced braces are not
/// regular, and a backtracking pattern would be pathological on the
/// adversarial inputs models produce.
fn balanced_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open_stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            // Quotes only matter inside a potential object; in surrounding
            // prose they are just punctuation.
            '"' if !open_stack.is_empty() => in_string = true,
            '{' => open_stack.push(index),
            '}' => {
                if let Some(start) = open_stack.pop() {
                    spans.push((start, index + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

/// Convert a candidate mapping into a complete output, backfilling an empty
/// summary from `fallback_summary`.
///
/// Conversion is tolerant: a field with an unexpected type degrades to its
/// default instead of poisoning the whole result.
fn coerce_map(map: serde_json::Map<String, Value>, fallback_summary: &str) -> ReviewOutput {
    let mut output = serde_json::from_value::<ReviewOutput>(Value::Object(map.clone()))
        .unwrap_or_else(|_| lenient_from_map(&map));

    if output.summary.trim().is_empty() && !fallback_summary.is_empty() {
        output.summary = fallback_summary.to_string();
    }
    output
}

/// Field-by-field conversion for mappings the strict decode rejects.
fn lenient_from_map(map: &serde_json::Map<String, Value>) -> ReviewOutput {
    ReviewOutput {
        summary: map
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        inline_comments: map
            .get("inline_comments")
            .and_then(Value::as_array)
            .map(|comments| {
                comments
                    .iter()
                    .filter_map(|comment| {
                        serde_json::from_value::<InlineComment>(comment.clone()).ok()
                    })
                    .collect()
            })
            .unwrap_or_default(),
        overall_status: map
            .get("overall_status")
            .and_then(|value| serde_json::from_value::<OverallStatus>(value.clone()).ok())
            .unwrap_or_default(),
        metrics: map.get("metrics").map(lenient_metrics).unwrap_or_default(),
        model_usage: map
            .get("model_usage")
            .and_then(|value| serde_json::from_value::<ModelUsage>(value.clone()).ok())
            .unwrap_or_default(),
        performance: map
            .get("performance")
            .and_then(|value| serde_json::from_value::<PerformanceMetrics>(value.clone()).ok())
            .unwrap_or_default(),
    }
}

/// Metrics conversion that survives individually malformed counters.
fn lenient_metrics(value: &Value) -> ReviewMetrics {
    serde_json::from_value::<ReviewMetrics>(value.clone()).unwrap_or_else(|_| {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_u64)
                .unwrap_or_default()
        };
        ReviewMetrics {
            files_reviewed: field("files_reviewed"),
            issues_found: field("issues_found"),
            critical_issues: field("critical_issues"),
            warnings: field("warnings"),
            suggestions: field("suggestions"),
            style_score: value
                .get("style_score")
                .and_then(Value::as_f64)
                .unwrap_or_default(),
        }
    })
}

/// Wrap unstructured text verbatim with a neutral status.
fn wrap_text_output(text: String) -> ReviewOutput {
    ReviewOutput {
        summary: text,
        overall_status: OverallStatus::Comment,
        ..ReviewOutput::default()
    }
}

/// Synthesized result for an invocation that produced nothing usable.
fn schema_mismatch_output() -> ReviewOutput {
    ReviewOutput {
        summary: SCHEMA_MISMATCH_SUMMARY.to_string(),
        overall_status: OverallStatus::Comment,
        ..ReviewOutput::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("code_review_output".to_string(), value);
        map
    }

    fn no_state() -> serde_json::Map<String, Value> {
        serde_json::Map::new()
    }

    #[test]
    fn test_state_object_wins_over_text_json() {
        let merged = state(json!({"summary": "LGTM", "overall_status": "APPROVED"}));
        let text = r#"{"summary": "from text", "overall_status": "NEEDS_CHANGES"}"#;
        let output = reconcile(text, &merged);
        assert_eq!(output.summary, "LGTM");
        assert_eq!(output.overall_status, OverallStatus::Approved);
    }

    #[test]
    fn test_state_object_backfills_summary_from_text() {
        let merged = state(json!({"summary": "", "overall_status": "COMMENT"}));
        let output = reconcile("prose from the stream", &merged);
        assert_eq!(output.summary, "prose from the stream");
    }

    #[test]
    fn test_state_json_string_is_parsed() {
        let merged = state(json!(
            r#"{"summary": "stored as string", "overall_status": "APPROVED"}"#
        ));
        let output = reconcile("", &merged);
        assert_eq!(output.summary, "stored as string");
        assert_eq!(output.overall_status, OverallStatus::Approved);
    }

    #[test]
    fn test_state_non_json_string_folds_into_text() {
        let merged = state(json!("definitely not json"));
        let output = reconcile("leading text", &merged);
        assert_eq!(output.summary, "leading text\ndefinitely not json");
        assert_eq!(output.overall_status, OverallStatus::Comment);
    }

    #[test]
    fn test_state_object_without_signal_falls_to_text() {
        let merged = state(json!({"unrelated": true}));
        let output = reconcile(
            r#"{"summary": "from text", "overall_status": "COMMENT"}"#,
            &merged,
        );
        assert_eq!(output.summary, "from text");
    }

    #[test]
    fn test_plain_json_text() {
        let text = r#"{"summary":"Nice.","overall_status":"COMMENT","metrics":{"files_reviewed":2}}"#;
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, "Nice.");
        assert_eq!(output.overall_status, OverallStatus::Comment);
        assert_eq!(output.metrics.files_reviewed, 2);
    }

    #[test]
    fn test_fenced_json_reconciles_identically() {
        let bare = r#"{"summary":"Nice.","overall_status":"COMMENT","metrics":{"files_reviewed":2}}"#;
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(reconcile(bare, &no_state()), reconcile(&fenced, &no_state()));
    }

    #[test]
    fn test_bare_fence_without_language_tag() {
        let bare = r#"{"summary":"Nice.","overall_status":"COMMENT"}"#;
        let fenced = format!("```\n{bare}\n```");
        assert_eq!(reconcile(bare, &no_state()), reconcile(&fenced, &no_state()));
    }

    #[test]
    fn test_embedded_object_in_prose() {
        let text = concat!(
            "Here is my review of the changes.\n",
            r#"{"summary": "Looks fine", "overall_status": "APPROVED"}"#,
            "\nThanks!"
        );
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, "Looks fine");
        assert_eq!(output.overall_status, OverallStatus::Approved);
    }

    #[test]
    fn test_later_more_complete_object_wins() {
        let text = concat!(
            r#"{"summary": "draft"}"#,
            "\nrevised below\n",
            r#"{"summary": "final", "overall_status": "NEEDS_CHANGES", "metrics": {"issues_found": 1}}"#,
        );
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, "final");
        assert_eq!(output.overall_status, OverallStatus::NeedsChanges);
        assert_eq!(output.metrics.issues_found, 1);
    }

    #[test]
    fn test_tie_on_field_count_takes_latest() {
        let text = concat!(
            r#"{"summary": "first"}"#,
            " and then ",
            r#"{"summary": "second"}"#,
        );
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, "second");
    }

    #[test]
    fn test_prose_backfills_missing_summary_of_embedded_object() {
        let text = concat!(
            "The change is small and safe to merge.\n",
            r#"{"overall_status": "APPROVED"}"#,
        );
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, "The change is small and safe to merge.");
        assert_eq!(output.overall_status, OverallStatus::Approved);
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_the_scanner() {
        let text = r#"{"summary": "use {braces} and \"quotes\" freely", "overall_status": "COMMENT"}"#;
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, r#"use {braces} and "quotes" freely"#);
    }

    #[test]
    fn test_unbalanced_braces_wrap_as_text() {
        let text = "some { very broken output";
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, text);
        assert_eq!(output.overall_status, OverallStatus::Comment);
    }

    #[test]
    fn test_json_without_signal_field_wraps_as_text() {
        let text = r#"{"data": [1, 2, 3]}"#;
        let output = reconcile(text, &no_state());
        assert_eq!(output.summary, text);
        assert_eq!(output.overall_status, OverallStatus::Comment);
    }

    #[test]
    fn test_plain_text_wraps_with_neutral_status() {
        let output = reconcile("Everything looks good to me.", &no_state());
        assert_eq!(output.summary, "Everything looks good to me.");
        assert_eq!(output.overall_status, OverallStatus::Comment);
        assert_eq!(output.metrics, ReviewMetrics::default());
    }

    #[test]
    fn test_empty_everything_synthesizes_diagnostic() {
        let output = reconcile("", &no_state());
        assert!(output.summary.contains("schema mismatch"));
        assert_eq!(output.overall_status, OverallStatus::Comment);
    }

    #[test]
    fn test_malformed_status_degrades_to_default() {
        let merged = state(json!({
            "summary": "ok",
            "overall_status": "SHRUG",
            "metrics": {"files_reviewed": "three", "issues_found": 2}
        }));
        let output = reconcile("", &merged);
        assert_eq!(output.summary, "ok");
        assert_eq!(output.overall_status, OverallStatus::Comment);
        assert_eq!(output.metrics.files_reviewed, 0);
        assert_eq!(output.metrics.issues_found, 2);
    }

    #[test]
    fn test_invalid_inline_comments_are_skipped_individually() {
        let merged = state(json!({
            "summary": "mixed comments",
            "inline_comments": [
                {"path": "src/a.rs", "line": 3, "body": "valid"},
                {"line": "nope"},
            ]
        }));
        let output = reconcile("", &merged);
        assert_eq!(output.inline_comments.len(), 1);
        assert_eq!(output.inline_comments[0].path, "src/a.rs");
    }

    #[test]
    fn test_formatted_output_key_is_second_choice() {
        let mut merged = serde_json::Map::new();
        merged.insert("formatted_output".to_string(), json!({"summary": "fallback key"}));
        let output = reconcile("", &merged);
        assert_eq!(output.summary, "fallback key");
    }

    #[test]
    fn test_balanced_spans_nested() {
        let spans = balanced_spans(r#"{"a": {"b": 1}}"#);
        // Inner object closes first, then the outer.
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1], (0, 15));
    }
}
