//! Rule-Based Grader: deterministic pattern checks for formula answers.
//!
//! Each skill with a dedicated validator accumulates partial credit for the
//! syntax and concepts it finds and tags what is missing. Everything else
//! goes through a length heuristic. No validator ever fails: malformed input
//! just scores low.

use std::sync::LazyLock;

use regex::Regex;

use super::types::RuleResult;

static ABSOLUTE_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[A-Z]+\$[0-9]+").unwrap());
static RELATIVE_REF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]+[0-9]+").unwrap());
static CELL_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]+[0-9]+:[A-Z]+[0-9]+").unwrap());
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.").unwrap());
static MOVING_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"reference.*change|move").unwrap());

static SUM_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bSUM\s*\(").unwrap());
static VLOOKUP_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bVLOOKUP\s*\(").unwrap());
static IF_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bIF\s*\(").unwrap());
static LOGICAL_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(AND|OR)\s*\(").unwrap());
static INDEX_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bINDEX\s*\(").unwrap());
static MATCH_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bMATCH\s*\(").unwrap());
static COUNTIF_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCOUNTIFS?\s*\(").unwrap());
static SUMIF_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bSUMIFS?\s*\(").unwrap());
/// A lookup function called, XLOOKUP named, or INDEX and MATCH named together.
static LOOKUP_ALTERNATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)\b(INDEX|MATCH|XLOOKUP|FILTER)\s*\(|\bXLOOKUP\b|\bINDEX\b.*\bMATCH\b|\bMATCH\b.*\bINDEX\b",
    )
    .unwrap()
});

const MATCH_TYPE_FLAGS: &[&str] = &["false", "0", "true", "1"];
const CAUSAL_WORDS: &[&str] = &["because", "when", "will", "changes"];
const CONCEPT_WORDS: &[&str] = &["formula", "function", "cell", "range", "reference"];
const PIVOT_KEYWORDS: &[&str] = &["pivot", "pivot table", "summarize", "group", "aggregate"];
const PIVOT_COMPONENTS: &[&str] = &["rows", "columns", "values", "filters", "fields"];
const STEP_WORDS: &[&str] = &["first", "then", "next", "step", "insert", "create", "drag", "drop"];
const CASE_FUNCTIONS: &[&str] = &[
    "AVERAGEIF",
    "COUNTIF",
    "INDEX",
    "MATCH",
    "VLOOKUP",
    "DATEDIF",
    "TODAY",
];
const REASONING_WORDS: &[&str] = &["because", "since", "this will", "to calculate", "in order to"];
const LOOKUP_EXPLANATION_WORDS: &[&str] = &["because", "position", "returns", "row", "column"];

/// Partial-credit accumulator shared by the validators.
#[derive(Debug, Default)]
struct Tally {
    score: f64,
    tags: Vec<String>,
    notes: Vec<String>,
}

impl Tally {
    fn award(&mut self, points: f64, note: &str) {
        self.score += points;
        if !note.is_empty() {
            self.notes.push(note.to_string());
        }
    }

    fn tag(&mut self, tag: &str) {
        self.tags.push(tag.to_string());
    }

    fn finish(self) -> RuleResult {
        RuleResult::from_score(self.score, self.tags, &self.notes)
    }
}

/// Deterministic, zero-latency grader.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedGrader;

impl RuleBasedGrader {
    pub fn new() -> Self {
        Self
    }

    /// Skills with a dedicated validator.
    pub fn validated_skills() -> &'static [&'static str] {
        &[
            "references",
            "vlookup",
            "if_functions",
            "basic_formulas",
            "pivot_tables",
            "case_analysis",
            "index_match",
            "countif",
            "sumif",
        ]
    }

    pub fn grade(&self, question: &str, answer: &str, skill: &str, difficulty: u8) -> RuleResult {
        let result = match skill {
            "references" => grade_references(question, answer),
            "vlookup" => grade_vlookup(question, answer, difficulty),
            "if_functions" => grade_if_functions(question, answer, difficulty),
            "basic_formulas" => grade_basic_formulas(question, answer),
            "pivot_tables" => grade_pivot_tables(answer),
            "case_analysis" => grade_case_analysis(answer),
            "index_match" => grade_index_match(answer),
            "countif" => grade_conditional_aggregate(answer, &COUNTIF_CALL),
            "sumif" => grade_conditional_aggregate(answer, &SUMIF_CALL),
            _ => grade_generic(answer),
        };
        tracing::debug!(
            skill,
            difficulty,
            score = result.score,
            passed = result.passed,
            "rule grading complete"
        );
        result
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn count_present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|n| haystack.contains(*n)).count()
}

fn is_range(arg: &str) -> bool {
    CELL_RANGE.is_match(arg) || arg.contains(':')
}

fn grade_references(question: &str, answer: &str) -> RuleResult {
    let question_lower = question.to_lowercase();
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();

    if question_lower.contains("absolute") || question.contains('$') {
        if ABSOLUTE_REF.is_match(answer) {
            t.award(0.5, "Correctly identified absolute reference syntax");
        } else {
            t.tag("missing_absolute_reference");
            t.notes.push("Missing absolute reference syntax ($A$1)".to_string());
        }
    }

    if question_lower.contains("relative") || MOVING_REFERENCE.is_match(&question_lower) {
        if RELATIVE_REF.is_match(answer) {
            t.award(0.3, "Showed understanding of relative references");
        } else {
            t.tag("missing_relative_concept");
        }
    }

    if CELL_RANGE.is_match(answer) {
        t.award(0.2, "Used proper range syntax");
    }

    if word_count(answer) > 10 && contains_any(&answer_lower, CAUSAL_WORDS) {
        t.award(0.2, "Provided good explanation of concepts");
    }

    t.finish()
}

fn grade_vlookup(question: &str, answer: &str, difficulty: u8) -> RuleResult {
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();
    let mut match_flag: Option<String> = None;

    if let Some(args) = call_arguments(answer, &VLOOKUP_CALL) {
        t.award(0.4, "Used VLOOKUP function");
        if args.len() >= 3 {
            t.award(0.2, "Included required parameters");

            if is_range(&args[1]) {
                t.award(0.1, "");
            } else {
                t.tag("invalid_table_array");
            }

            let column = args[2].trim();
            if !column.is_empty() && column.chars().all(|c| c.is_ascii_digit()) {
                t.award(0.1, "");
            } else {
                t.tag("invalid_column_index");
            }

            if let Some(flag) = args.get(3) {
                let flag = flag.trim().to_lowercase();
                if MATCH_TYPE_FLAGS.contains(&flag.as_str()) {
                    t.award(0.1, "Specified lookup match type");
                    match_flag = Some(flag);
                }
            }
        } else {
            t.tag("incomplete_vlookup_params");
        }
    } else if LOOKUP_ALTERNATIVE.is_match(answer) {
        t.award(0.3, "Mentioned alternative lookup methods");
    } else {
        t.tag("no_lookup_function");
    }

    if difficulty >= 3 && question.to_lowercase().contains("approximate") {
        let approximate_flag = matches!(match_flag.as_deref(), Some("true") | Some("1"));
        if approximate_flag
            || answer_lower.contains("approximate")
            || answer_lower.contains("true")
        {
            t.award(0.1, "Discussed approximate matching");
        } else {
            t.tag("missing_approximate_match_discussion");
        }
    }

    t.finish()
}

fn grade_if_functions(question: &str, answer: &str, difficulty: u8) -> RuleResult {
    let mut t = Tally::default();

    if let Some(args) = call_arguments(answer, &IF_CALL) {
        t.award(0.3, "Used IF function");
        if args.len() >= 2 {
            t.award(0.2, "Included condition and result");

            if args[0].contains(['<', '>', '=']) {
                t.award(0.1, "Used comparison operator");
            }

            if difficulty >= 3 {
                if IF_CALL.find_iter(answer).count() > 1 {
                    t.award(0.2, "Used nested IF functions");
                } else if question.to_lowercase().contains("nested") {
                    t.tag("missing_nested_if");
                }
            }
        }
    } else {
        t.tag("no_if_function");
    }

    if difficulty >= 3 && LOGICAL_CALL.is_match(answer) {
        t.award(0.1, "Used logical operators");
    }

    t.finish()
}

fn grade_basic_formulas(question: &str, answer: &str) -> RuleResult {
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();

    if answer.contains('=') {
        t.award(0.2, "Used formula syntax");
    }

    if question.to_lowercase().contains("sum") {
        if SUM_CALL.is_match(answer) {
            t.award(0.4, "Used SUM function correctly");
        } else {
            t.tag("missing_sum_function");
        }
    }

    if CELL_RANGE.is_match(answer) {
        t.award(0.2, "Used proper range notation");
    }

    if count_present(&answer_lower, CONCEPT_WORDS) >= 2 {
        t.award(0.2, "Demonstrated understanding of Excel concepts");
    }

    t.finish()
}

fn grade_pivot_tables(answer: &str) -> RuleResult {
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();

    if contains_any(&answer_lower, PIVOT_KEYWORDS) {
        t.award(0.3, "Mentioned pivot tables");
    }

    let components = count_present(&answer_lower, PIVOT_COMPONENTS);
    t.award((components as f64 * 0.1).min(0.3), "");
    if components >= 2 {
        t.notes.push("Understood pivot table structure".to_string());
    }

    if contains_any(&answer_lower, STEP_WORDS) {
        t.award(0.2, "Provided step-by-step approach");
    }

    t.finish()
}

fn grade_case_analysis(answer: &str) -> RuleResult {
    let answer_upper = answer.to_uppercase();
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();

    let functions = count_present(&answer_upper, CASE_FUNCTIONS);
    t.award((functions as f64 * 0.1).min(0.4), "");
    if functions >= 2 {
        t.notes.push(format!("Used {functions} relevant functions"));
    }

    if CELL_RANGE.find_iter(answer).count() >= 2 {
        t.award(0.2, "Used appropriate data ranges");
    }

    if NUMBERED_ITEM.is_match(answer) {
        t.award(0.2, "Provided structured responses");
    }

    if contains_any(&answer_lower, REASONING_WORDS) {
        t.award(0.2, "Provided reasoning for approach");
    }

    t.finish()
}

fn grade_index_match(answer: &str) -> RuleResult {
    let answer_lower = answer.to_lowercase();
    let mut t = Tally::default();

    match call_arguments(answer, &INDEX_CALL) {
        Some(index_args) => {
            t.award(0.3, "Used INDEX function");
            if index_args.iter().any(|arg| MATCH_CALL.is_match(arg)) {
                t.award(0.3, "Nested MATCH inside INDEX");
            } else {
                t.tag("missing_match");
            }
        }
        None => t.tag("no_index_function"),
    }

    let exact = call_arguments(answer, &MATCH_CALL)
        .and_then(|args| args.get(2).map(|a| a.trim() == "0"))
        .unwrap_or(false);
    if exact {
        t.award(0.2, "Used exact match type");
    } else {
        t.tag("missing_exact_match_type");
    }

    if word_count(answer) > 5 && contains_any(&answer_lower, LOOKUP_EXPLANATION_WORDS) {
        t.award(0.2, "Explained the lookup");
    }

    t.finish()
}

fn grade_conditional_aggregate(answer: &str, call: &Regex) -> RuleResult {
    let mut t = Tally::default();

    let Some(args) = call_arguments(answer, call) else {
        t.tag("no_conditional_function");
        return t.finish();
    };

    t.award(0.4, "Used conditional aggregate function");

    if args.len() >= 2 {
        t.award(0.2, "Included range and criteria");
    } else {
        t.tag("incomplete_criteria_params");
    }

    if args.iter().any(|arg| is_range(arg)) {
        t.award(0.2, "Used a range argument");
    }

    let criterion = args
        .iter()
        .skip(1)
        .any(|arg| arg.contains('"') || arg.contains(['<', '>', '=']));
    if criterion {
        t.award(0.2, "Specified a criterion");
    }

    t.finish()
}

fn grade_generic(answer: &str) -> RuleResult {
    let mut t = Tally::default();
    t.award(0.5, "Used generic rule-based evaluation");

    if answer.trim().chars().count() < 10 {
        t.score -= 0.2;
        t.tag("answer_too_short");
    }

    if word_count(answer) > 20 {
        t.award(0.1, "Provided detailed response");
    }

    t.finish()
}

/// Arguments of the first call matched by `call` (which must end at the
/// opening parenthesis). An unclosed call takes the rest of the text.
fn call_arguments(text: &str, call: &Regex) -> Option<Vec<String>> {
    let m = call.find(text)?;
    Some(split_arguments(enclosed(&text[m.end()..])))
}

/// Prefix of `rest` up to the parenthesis that closes an already-open call.
fn enclosed(rest: &str) -> &str {
    let mut depth = 0usize;
    let mut in_quotes = false;
    for (i, ch) in rest.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                if depth == 0 {
                    return &rest[..i];
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    rest
}

/// Split a function's argument list on top-level commas.
///
/// Commas inside nested calls or string literals do not split.
pub fn split_arguments(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;

    for ch in inner.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(skill: &str, question: &str, answer: &str, difficulty: u8) -> RuleResult {
        RuleBasedGrader::new().grade(question, answer, skill, difficulty)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn exact_vlookup_passes() {
        let r = grade(
            "vlookup",
            "How would you look up a price by product code?",
            "=VLOOKUP(A1,B:C,2,FALSE)",
            2,
        );
        assert!(r.passed);
        assert!(approx(r.score, 0.9), "score was {}", r.score);
        assert!(r.error_tags.is_empty());
    }

    #[test]
    fn vlookup_with_two_args_is_incomplete() {
        let r = grade("vlookup", "Look up a value", "=VLOOKUP(A1,B2:C9)", 2);
        assert!(approx(r.score, 0.4));
        assert!(!r.passed);
        assert_eq!(r.error_tags, vec!["incomplete_vlookup_params"]);
    }

    #[test]
    fn vlookup_bad_table_and_column() {
        let r = grade("vlookup", "Look up a value", "=VLOOKUP(A1, Prices, two)", 2);
        assert!(r.error_tags.contains(&"invalid_table_array".to_string()));
        assert!(r.error_tags.contains(&"invalid_column_index".to_string()));
    }

    #[test]
    fn vlookup_alternatives_get_partial_credit() {
        let r = grade("vlookup", "Look up a value", "I prefer XLOOKUP these days", 2);
        assert!(approx(r.score, 0.3));
        assert!(r.error_tags.is_empty());
    }

    #[test]
    fn vlookup_alternative_needs_lookup_name_or_call() {
        let pair = grade("vlookup", "q", "I would combine INDEX with MATCH instead", 2);
        assert!(approx(pair.score, 0.3));
        let call = grade("vlookup", "q", "=MATCH(F1, A2:A10, 0)", 2);
        assert!(approx(call.score, 0.3));

        for answer in [
            "an exact match, I guess",
            "filter the list by hand",
            "check the index page",
        ] {
            let r = grade("vlookup", "q", answer, 2);
            assert_eq!(r.score, 0.0, "{answer}");
            assert_eq!(r.error_tags, vec!["no_lookup_function"]);
        }
    }

    #[test]
    fn vlookup_no_lookup_at_all() {
        let r = grade("vlookup", "Look up a value", "I would scroll until I see it", 2);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.error_tags, vec!["no_lookup_function"]);
    }

    #[test]
    fn vlookup_approximate_discussion_required_at_level_three() {
        let q = "When would you use approximate match in VLOOKUP?";
        let r = grade("vlookup", q, "=VLOOKUP(A1,B2:C9,2,FALSE)", 3);
        assert!(r
            .error_tags
            .contains(&"missing_approximate_match_discussion".to_string()));
        let r = grade("vlookup", q, "=VLOOKUP(A1,B2:C9,2,TRUE) for tax brackets", 3);
        assert!(approx(r.score, 1.0));
    }

    #[test]
    fn absolute_reference_with_explanation() {
        let r = grade(
            "references",
            "Explain absolute references like $A$1",
            "Use $B$2 so the reference does not change when you copy the formula over A1:A10 because it is locked",
            2,
        );
        assert!(approx(r.score, 0.9), "score was {}", r.score);
        assert!(r.passed);
    }

    #[test]
    fn missing_absolute_reference_is_tagged() {
        let r = grade("references", "What does $ do in a reference?", "It locks things", 1);
        assert_eq!(r.error_tags, vec!["missing_absolute_reference"]);
        assert!(!r.passed);
    }

    #[test]
    fn nested_if_at_level_three() {
        let r = grade(
            "if_functions",
            "Write a nested IF for letter grades",
            r#"=IF(A1>90,"A",IF(A1>80,"B","C"))"#,
            3,
        );
        assert!(approx(r.score, 0.8), "score was {}", r.score);
        assert!(r.passed);
    }

    #[test]
    fn single_if_when_nesting_requested() {
        let r = grade(
            "if_functions",
            "Write a nested IF for letter grades",
            r#"=IF(A1>90,"A","B")"#,
            3,
        );
        assert!(r.error_tags.contains(&"missing_nested_if".to_string()));
    }

    #[test]
    fn countif_is_not_an_if_call() {
        let r = grade("if_functions", "Use IF", "=COUNTIF(A1:A9,\">5\")", 2);
        assert_eq!(r.error_tags, vec!["no_if_function"]);
    }

    #[test]
    fn basic_sum_formula() {
        let r = grade(
            "basic_formulas",
            "How would you sum values in column A?",
            "=SUM(A1:A100)",
            1,
        );
        assert!(approx(r.score, 0.8));
        assert!(r.passed);
    }

    #[test]
    fn sum_question_without_sum() {
        let r = grade("basic_formulas", "How do you sum a column?", "add them", 1);
        assert_eq!(r.error_tags, vec!["missing_sum_function"]);
    }

    #[test]
    fn pivot_components_capped() {
        let r = grade(
            "pivot_tables",
            "Build a pivot",
            "First insert a pivot table, drag fields to rows, columns, values and filters",
            2,
        );
        assert!(approx(r.score, 0.8), "score was {}", r.score);
    }

    #[test]
    fn case_analysis_structure() {
        let answer = "1. =AVERAGEIF(B2:B50,\"Sales\",E2:E50) because it averages by dept\n\
                      2. =COUNTIF(D2:D50,\">=\"&DATE(2020,1,1))";
        let r = grade("case_analysis", "case", answer, 3);
        // two functions, two+ ranges, numbering, reasoning
        assert!(approx(r.score, 0.8), "score was {}", r.score);
    }

    #[test]
    fn index_match_exact() {
        let r = grade("index_match", "q", "=INDEX(C2:C10, MATCH(F1, A2:A10, 0))", 2);
        assert!(approx(r.score, 0.8), "score was {}", r.score);
        assert!(r.error_tags.is_empty());
    }

    #[test]
    fn index_without_match() {
        let r = grade("index_match", "q", "=INDEX(C2:C10, 3)", 2);
        assert!(r.error_tags.contains(&"missing_match".to_string()));
        assert!(r.error_tags.contains(&"missing_exact_match_type".to_string()));
    }

    #[test]
    fn countif_full_marks() {
        let r = grade("countif", "q", r#"=COUNTIF(B2:B50,">100")"#, 2);
        assert!(approx(r.score, 1.0));
    }

    #[test]
    fn sumif_missing_function() {
        let r = grade("sumif", "q", "I would add the matching rows by hand", 2);
        assert_eq!(r.error_tags, vec!["no_conditional_function"]);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn generic_short_answer() {
        let r = grade("charts", "Which chart for trends?", "line", 2);
        assert!(approx(r.score, 0.3));
        assert_eq!(r.error_tags, vec!["answer_too_short"]);
    }

    #[test]
    fn generic_detailed_answer() {
        let answer = "I would use a line chart because it shows change over time clearly and \
                      lets viewers compare several series on one axis without clutter at all";
        let r = grade("charts", "Which chart for trends?", answer, 2);
        assert!(approx(r.score, 0.6));
        assert!(r.passed);
    }

    #[test]
    fn split_respects_nesting_and_quotes() {
        let args = split_arguments(r#"A1>90,"A, or B",IF(A1>80,"B","C")"#);
        assert_eq!(args, vec!["A1>90", r#""A, or B""#, r#"IF(A1>80,"B","C")"#]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn unclosed_call_takes_rest() {
        let args = call_arguments("=VLOOKUP(A1,B:C,2", &VLOOKUP_CALL).unwrap();
        assert_eq!(args, vec!["A1", "B:C", "2"]);
    }
}
