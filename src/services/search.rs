//! Group search and input debouncing

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::study_group::StudyGroupWithCounts;

/// Case-insensitive substring match over subject, location, professor and organizer name.
///
/// A blank query matches everything.
pub fn filter_groups(groups: &[StudyGroupWithCounts], query: &str) -> Vec<StudyGroupWithCounts> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return groups.to_vec();
    }

    groups
        .iter()
        .filter(|group| matches_query(group, &needle))
        .cloned()
        .collect()
}

fn matches_query(group: &StudyGroupWithCounts, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);

    contains(&group.subject)
        || contains(&group.location)
        || group.professor_name.as_deref().map_or(false, contains)
        || group.organizer_name.as_deref().map_or(false, contains)
}

/// Coalesces rapid inputs: a value is delivered only after `quiet` has
/// passed with no newer value. Each new value restarts the timer.
pub struct Debouncer<T> {
    sender: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(quiet: Duration, mut on_settled: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(mut latest) = receiver.recv().await {
                loop {
                    tokio::select! {
                        next = receiver.recv() => match next {
                            Some(value) => latest = value,
                            None => {
                                on_settled(latest);
                                return;
                            }
                        },
                        _ = tokio::time::sleep(quiet) => {
                            on_settled(latest);
                            break;
                        }
                    }
                }
            }
        });

        Self { sender, task }
    }

    /// Submit a value, restarting the quiet period
    pub fn push(&self, value: T) {
        // the receiver only goes away with the task, which lives as long as self
        let _ = self.sender.send(value);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
