//! SOQL builders for class discovery and the follow-up tooling queries.
//!
//! Pure functions of their input. Single quotes in user-supplied names and
//! patterns are escaped so a stray apostrophe cannot break out of the string
//! literal.

use crate::config::SelectionCriteria;
use crate::types::{ClassId, JobId, QueueItemId};

/// Escape a value for inclusion in a single-quoted SOQL string literal.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quoted_list(values: &[impl AsRef<str>]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", escape(v.as_ref())))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the `ApexClass` discovery query.
///
/// Classes match when their namespace is one of the configured prefixes
/// (`None` matching the empty namespace) and their name matches any pattern
/// or equals any exact name. With no prefixes configured the namespace
/// clause is omitted; with neither patterns nor exact names the name clause
/// is omitted and the query will not select anything useful.
pub fn build_class_query(selection: &SelectionCriteria) -> String {
    let mut q = String::from("SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE ");

    let has_namespaces = !selection.namespace_prefixes.is_empty();
    if has_namespaces {
        let clauses: Vec<String> = selection
            .namespace_prefixes
            .iter()
            .map(|prefix| match prefix {
                None => "NamespacePrefix = null".to_string(),
                Some(ns) => format!("NamespacePrefix = '{}'", escape(ns)),
            })
            .collect();
        q.push('(');
        q.push_str(&clauses.join(" OR "));
        q.push(')');
    }

    let mut name_clauses: Vec<String> = Vec::new();
    if let Some(patterns) = &selection.name_patterns {
        name_clauses.extend(
            patterns
                .iter()
                .map(|p| format!("Name LIKE '{}'", escape(p))),
        );
    }
    if let Some(exacts) = &selection.exact_names {
        name_clauses.extend(exacts.iter().map(|n| format!("Name = '{}'", escape(n))));
    }

    match (has_namespaces, name_clauses.is_empty()) {
        (true, false) => {
            q.push_str(" AND (");
            q.push_str(&name_clauses.join(" OR "));
            q.push(')');
        }
        (false, false) => q.push_str(&name_clauses.join(" OR ")),
        // Caller error: nothing to select on. The query still parses and
        // discovery will fail loudly on the empty result set.
        (true, true) => {}
        (false, true) => q.push_str("Name = null"),
    }

    q
}

/// Build the aggregate coverage query for the discovered class set.
pub fn build_coverage_query(class_ids: &[ClassId]) -> String {
    format!(
        "SELECT Coverage, ApexClassOrTriggerId FROM ApexCodeCoverageAggregate \
         WHERE ApexClassOrTriggerId IN ({})",
        quoted_list(&class_ids.iter().map(ClassId::as_str).collect::<Vec<_>>())
    )
}

/// Build the queue item status query for one async job.
pub fn build_queue_status_query(job_id: &JobId) -> String {
    format!(
        "SELECT Id, Status FROM ApexTestQueueItem WHERE ParentJobId = '{}'",
        escape(job_id.as_str())
    )
}

/// Build the method result query for a set of finished queue items.
pub fn build_result_query(queue_item_ids: &[QueueItemId]) -> String {
    format!(
        "SELECT ApexClass.Id, ApexClass.Name, MethodName, Outcome, Message \
         FROM ApexTestResult WHERE QueueItemId IN ({})",
        quoted_list(
            &queue_item_ids
                .iter()
                .map(QueueItemId::as_str)
                .collect::<Vec<_>>()
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn selection(
        patterns: Option<&[&str]>,
        exacts: Option<&[&str]>,
        namespaces: &[Option<&str>],
    ) -> SelectionCriteria {
        SelectionCriteria {
            name_patterns: patterns.map(|p| p.iter().map(|s| s.to_string()).collect()),
            exact_names: exacts.map(|e| e.iter().map(|s| s.to_string()).collect()),
            namespace_prefixes: namespaces.iter().map(|n| n.map(str::to_string)).collect(),
        }
    }

    #[test]
    fn exact_names_with_empty_namespace() {
        let q = build_class_query(&selection(None, Some(&["A", "B"]), &[None]));
        assert_eq!(
            q,
            "SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE \
             (NamespacePrefix = null) AND (Name = 'A' OR Name = 'B')"
        );
    }

    #[test]
    fn patterns_and_exacts_across_two_namespaces() {
        let q = build_class_query(&selection(
            Some(&["Foo%"]),
            Some(&["Bar"]),
            &[None, Some("ns1")],
        ));
        assert_eq!(
            q,
            "SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE \
             (NamespacePrefix = null OR NamespacePrefix = 'ns1') \
             AND (Name LIKE 'Foo%' OR Name = 'Bar')"
        );
    }

    #[test]
    fn no_namespaces_omits_the_namespace_clause() {
        let q = build_class_query(&selection(Some(&["%Test"]), None, &[]));
        assert_eq!(
            q,
            "SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE Name LIKE '%Test'"
        );
    }

    #[test]
    fn namespaces_without_names_drops_the_name_clause() {
        let q = build_class_query(&selection(None, None, &[Some("ns1")]));
        assert_eq!(
            q,
            "SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE (NamespacePrefix = 'ns1')"
        );
    }

    #[test]
    fn quotes_in_names_are_escaped() {
        let q = build_class_query(&selection(None, Some(&["O'Brien"]), &[None]));
        assert!(q.contains("Name = 'O\\'Brien'"), "got: {q}");
    }

    #[test]
    fn coverage_query_lists_every_class_id() {
        let ids = vec![ClassId::new("01p1"), ClassId::new("01p2")];
        let q = build_coverage_query(&ids);
        assert_eq!(
            q,
            "SELECT Coverage, ApexClassOrTriggerId FROM ApexCodeCoverageAggregate \
             WHERE ApexClassOrTriggerId IN ('01p1', '01p2')"
        );
    }

    #[test]
    fn queue_status_query_filters_on_parent_job() {
        let q = build_queue_status_query(&JobId::new("707x"));
        assert_eq!(
            q,
            "SELECT Id, Status FROM ApexTestQueueItem WHERE ParentJobId = '707x'"
        );
    }

    #[test]
    fn result_query_lists_queue_items() {
        let q = build_result_query(&[QueueItemId::new("709a"), QueueItemId::new("709b")]);
        assert!(q.starts_with("SELECT ApexClass.Id, ApexClass.Name, MethodName, Outcome, Message"));
        assert!(q.ends_with("WHERE QueueItemId IN ('709a', '709b')"));
    }

    proptest! {
        // Arbitrary names never produce an unescaped quote inside the
        // generated literal, and the query always keeps its SELECT prefix.
        #[test]
        fn arbitrary_exact_names_stay_inside_their_literals(name in ".*") {
            let q = build_class_query(&selection(None, Some(&[name.as_str()]), &[None]));
            prop_assert!(q.starts_with("SELECT Id, Name, NamespacePrefix FROM ApexClass WHERE "));

            // Strip escape sequences; whatever quotes remain must be the
            // structural ones, which always come in pairs.
            let stripped = q.replace("\\\\", "").replace("\\'", "");
            let quotes = stripped.matches('\'').count();
            prop_assert_eq!(quotes % 2, 0, "unbalanced quotes in: {}", q);
        }

        #[test]
        fn arbitrary_namespace_prefixes_never_panic(ns in ".*") {
            let _ = build_class_query(&selection(Some(&["%T"]), None, &[Some(ns.as_str())]));
        }
    }
}
