//! Property-based checks of the task lifecycle invariants.
//!
//! Random event sequences are applied to a fresh task; rejected events must
//! leave the task untouched, and accepted ones must keep status monotonic and
//! `completed_at` present exactly for terminal states.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use llm_orchestra::models::{NewTask, Task};
use llm_orchestra::state_machine::{TaskEvent, TaskStateMachine, TaskStatus};

fn event_strategy() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        Just(TaskEvent::Start),
        "[a-z ]{0,16}".prop_map(TaskEvent::Complete),
        "[a-z ]{0,16}".prop_map(TaskEvent::Fail),
    ]
}

fn fresh_task() -> Task {
    Task::from_new(
        NewTask {
            owner_id: Uuid::new_v4(),
            task_type: "qa".to_string(),
            prompt: "What is 2+2?".to_string(),
            history: None,
        },
        Utc::now(),
    )
}

proptest! {
    #[test]
    fn status_never_moves_backwards(events in prop::collection::vec(event_strategy(), 0..12)) {
        let mut task = fresh_task();
        let start = task.updated_at;

        for (step, event) in events.into_iter().enumerate() {
            let before = task.clone();
            let now = start + Duration::seconds(step as i64 + 1);

            match TaskStateMachine::transition(&mut task, event, now) {
                Ok(status) => {
                    prop_assert_eq!(status, task.status);
                    prop_assert!(task.status.rank() >= before.status.rank());
                    prop_assert!(!before.status.is_terminal());
                    prop_assert_eq!(task.updated_at, now);
                }
                Err(_) => prop_assert_eq!(&task, &before),
            }

            prop_assert_eq!(task.status.is_terminal(), task.completed_at.is_some());
            prop_assert_eq!(task.status.is_terminal(), task.result.is_some());
        }
    }

    #[test]
    fn terminal_result_is_the_event_text(text in "[a-zA-Z0-9 ]{0,32}", succeed in any::<bool>()) {
        let mut task = fresh_task();
        let now = Utc::now();
        TaskStateMachine::transition(&mut task, TaskEvent::Start, now).unwrap();

        let event = if succeed {
            TaskEvent::Complete(text.clone())
        } else {
            TaskEvent::Fail(text.clone())
        };
        let status = TaskStateMachine::transition(&mut task, event, now).unwrap();

        let expected = if succeed { TaskStatus::Completed } else { TaskStatus::Failed };
        prop_assert_eq!(status, expected);
        prop_assert_eq!(task.result.as_deref(), Some(text.as_str()));
        prop_assert_eq!(task.completed_at, Some(now));
    }
}
