//! Result and coverage aggregation.
//!
//! Method results are merged into the `TargetClass` set fixed at discovery.
//! Rows whose class id matches nothing discovered are dropped (the query that
//! produced them was wider than the discovery query); each drop is traced so
//! a stale selection is diagnosable.

use tracing::{debug, info};

use crate::client::ToolingClient;
use crate::error::RunError;
use crate::query::build_coverage_query;
use crate::types::{Coverage, MethodResult, OutcomeKind, QueueItemId, TargetClass};

/// Fetch method results for the finished queue items and fold them into the
/// class set. Returns `true` if any outcome other than `Pass` was observed.
pub async fn collect_results<C: ToolingClient>(
    client: &C,
    classes: &mut [TargetClass],
    queue_item_ids: &[QueueItemId],
) -> Result<bool, RunError> {
    let rows = client.fetch_results(queue_item_ids).await?;
    info!(results = rows.len(), "collected method results");

    let mut failed = false;
    for row in rows {
        // The flag reflects every outcome observed in the run, matched or not.
        if row.outcome != OutcomeKind::Pass {
            failed = true;
        }

        let Some(class) = classes.iter_mut().find(|class| class.id == row.class_id) else {
            debug!(
                class_id = %row.class_id,
                method = %row.method_name,
                "dropping result for a class outside the discovered set"
            );
            continue;
        };

        class.outcome_counts.increment(row.outcome);
        class.method_results.push(MethodResult {
            class_name: row.class_name,
            method_name: row.method_name,
            outcome: row.outcome,
            message: row.message,
        });
    }

    Ok(failed)
}

/// Fetch aggregate coverage for the whole class set and attach it to each
/// matching class. Classes absent from the aggregate keep `coverage: None`.
pub async fn collect_coverage<C: ToolingClient>(
    client: &C,
    classes: &mut [TargetClass],
) -> Result<(), RunError> {
    let class_ids: Vec<_> = classes.iter().map(|class| class.id.clone()).collect();
    let soql = build_coverage_query(&class_ids);
    let rows = client.query_coverage(&soql).await?;
    info!(rows = rows.len(), "collected coverage aggregate");

    for row in rows {
        if let Some(class) = classes.iter_mut().find(|class| class.id == row.class_id) {
            class.coverage = Some(Coverage {
                covered_lines: row.covered_lines,
                uncovered_lines: row.uncovered_lines,
            });
        }
    }

    Ok(())
}
