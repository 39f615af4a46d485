//! Text report rendering.
//!
//! Pure function of the aggregated class set: rendering the same state twice
//! yields byte-identical output. One summary line per class, then a failures
//! section listing every non-passing method result.

use std::fmt::Write as _;

use crate::types::{OutcomeKind, TargetClass};

/// Render the run report.
pub fn render(classes: &[TargetClass]) -> String {
    let mut out = String::new();

    out.push_str("Results:\n========\n");
    for class in classes {
        let _ = writeln!(
            out,
            "{} {}/{} test methods passed",
            class.name,
            class.outcome_counts.pass,
            class.method_results.len()
        );
        if let Some(coverage) = class.coverage {
            let _ = writeln!(out, "Coverage: {:.1}%", coverage.percent());
        }
    }

    let any_failures = classes
        .iter()
        .any(|class| class.outcome_counts.non_pass() > 0);
    if any_failures {
        out.push_str("\nFailures:\n=========\n");
        for class in classes {
            for result in &class.method_results {
                if result.outcome == OutcomeKind::Pass {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "{} {}.{}:",
                    result.outcome, class.name, result.method_name
                );
                if let Some(message) = &result.message {
                    let _ = writeln!(out, "{message}");
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClassId, ClassRow, Coverage, MethodResult};

    fn class(name: &str) -> TargetClass {
        TargetClass::from_row(ClassRow {
            id: ClassId::new(format!("01p-{name}")),
            name: name.to_string(),
            namespace_prefix: None,
        })
    }

    fn record(class: &mut TargetClass, method: &str, outcome: OutcomeKind, message: Option<&str>) {
        class.outcome_counts.increment(outcome);
        class.method_results.push(MethodResult {
            class_name: class.name.clone(),
            method_name: method.to_string(),
            outcome,
            message: message.map(str::to_string),
        });
    }

    #[test]
    fn all_passing_run_has_no_failures_section() {
        let mut foo = class("FooTest");
        record(&mut foo, "testA", OutcomeKind::Pass, None);

        let text = render(&[foo]);
        assert!(text.contains("FooTest 1/1 test methods passed"));
        assert!(!text.contains("Failures:"));
    }

    #[test]
    fn failures_section_lists_every_non_pass_result() {
        let mut foo = class("FooTest");
        record(&mut foo, "testA", OutcomeKind::Pass, None);
        record(
            &mut foo,
            "testB",
            OutcomeKind::Fail,
            Some("System.AssertException: expected 2, got 3"),
        );
        let mut bar = class("BarTest");
        record(&mut bar, "testC", OutcomeKind::Skip, None);

        let text = render(&[foo, bar]);
        assert!(text.contains("FooTest 1/2 test methods passed"));
        assert!(text.contains("BarTest 0/1 test methods passed"));
        assert!(text.contains("Failures:\n=========\n"));
        // One header for the whole section, even with failures in two classes.
        assert_eq!(text.matches("Failures:").count(), 1);
        assert!(text.contains("Fail FooTest.testB:\nSystem.AssertException: expected 2, got 3"));
        assert!(text.contains("Skip BarTest.testC:"));
    }

    #[test]
    fn coverage_line_renders_only_when_collected() {
        let mut foo = class("FooTest");
        record(&mut foo, "testA", OutcomeKind::Pass, None);
        foo.coverage = Some(Coverage {
            covered_lines: 7,
            uncovered_lines: 1,
        });
        let mut bar = class("BarTest");
        record(&mut bar, "testB", OutcomeKind::Pass, None);

        let text = render(&[foo, bar]);
        assert!(text.contains("FooTest 1/1 test methods passed\nCoverage: 87.5%"));
        assert_eq!(text.matches("Coverage:").count(), 1);
    }

    #[test]
    fn rendering_is_idempotent() {
        let mut foo = class("FooTest");
        record(&mut foo, "testA", OutcomeKind::Pass, None);
        record(&mut foo, "testB", OutcomeKind::CompileFail, Some("unexpected token"));
        let classes = vec![foo];

        assert_eq!(render(&classes), render(&classes));
    }
}
