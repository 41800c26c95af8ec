//! Completion ledger operations. The ledger is a plain append/truncate log:
//! it never refuses an entry, eligibility is checked by the caller.

use crate::model::{CompletionEntry, Task};
use time::OffsetDateTime;
use tracing::{debug, warn};

pub fn record_completion(task: &mut Task, now: OffsetDateTime) {
    task.completion_ledger.push(CompletionEntry { completed_at: now });
    task.completed_count = ledger_len(task);
    debug!(task_id = %task.id, count = task.completed_count, "recorded completion");
}

/// Remove the most recently appended entry, whatever its timestamp.
/// Returns `None` and leaves the task untouched when the ledger is empty.
pub fn undo_last_completion(task: &mut Task) -> Option<OffsetDateTime> {
    let removed = task.completion_ledger.pop()?;
    task.completed_count = ledger_len(task);
    debug!(task_id = %task.id, count = task.completed_count, "removed last completion");
    Some(removed.completed_at)
}

/// Force `completed_count` back in line with the ledger. Returns true when
/// the stored count was wrong.
pub fn reconcile(task: &mut Task) -> bool {
    let actual = ledger_len(task);
    if task.completed_count == actual {
        return false;
    }

    warn!(
        task_id = %task.id,
        stored = task.completed_count,
        actual,
        "completed_count out of sync with ledger"
    );
    task.completed_count = actual;
    true
}

fn ledger_len(task: &Task) -> u32 {
    u32::try_from(task.completion_ledger.len()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{reconcile, record_completion, undo_last_completion};
    use crate::model::{CompletionEntry, Task};
    use time::macros::datetime;

    fn task() -> Task {
        Task::new(
            "task-1".to_string(),
            "stretch".to_string(),
            None,
            datetime!(2026-10-01 08:00 UTC),
        )
    }

    #[test]
    fn record_appends_and_counts() {
        let mut task = task();
        record_completion(&mut task, datetime!(2026-10-19 07:00 UTC));
        record_completion(&mut task, datetime!(2026-10-19 18:00 UTC));

        assert_eq!(task.completed_count, 2);
        assert_eq!(task.completion_ledger.len(), 2);
        assert_eq!(
            task.completion_ledger[1].completed_at,
            datetime!(2026-10-19 18:00 UTC)
        );
    }

    #[test]
    fn undo_is_the_inverse_of_record() {
        let mut task = task();
        record_completion(&mut task, datetime!(2026-10-18 07:00 UTC));
        let before = task.clone();

        record_completion(&mut task, datetime!(2026-10-19 07:00 UTC));
        let removed = undo_last_completion(&mut task);

        assert_eq!(removed, Some(datetime!(2026-10-19 07:00 UTC)));
        assert_eq!(task, before);
    }

    #[test]
    fn undo_removes_last_appended_not_latest_timestamp() {
        let mut task = task();
        record_completion(&mut task, datetime!(2026-10-19 07:00 UTC));
        record_completion(&mut task, datetime!(2026-10-10 07:00 UTC));

        let removed = undo_last_completion(&mut task);

        assert_eq!(removed, Some(datetime!(2026-10-10 07:00 UTC)));
        assert_eq!(task.completed_count, 1);
        assert_eq!(
            task.completion_ledger[0].completed_at,
            datetime!(2026-10-19 07:00 UTC)
        );
    }

    #[test]
    fn undo_on_empty_ledger_is_a_no_op() {
        let mut task = task();
        let before = task.clone();

        assert_eq!(undo_last_completion(&mut task), None);
        assert_eq!(undo_last_completion(&mut task), None);
        assert_eq!(task, before);
    }

    #[test]
    fn reconcile_fixes_stale_count() {
        let mut task = task();
        task.completed_count = 7;
        task.completion_ledger.push(CompletionEntry {
            completed_at: datetime!(2026-10-19 07:00 UTC),
        });

        assert!(reconcile(&mut task));
        assert_eq!(task.completed_count, 1);
        assert!(!reconcile(&mut task));
    }
}
