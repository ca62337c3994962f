// Deadline-ordered one-shot tasks for the host loop. Each task owns a
// completion callback that gets the registry's context when it comes due.
use std::time::Instant;

struct ScheduledTask<C> {
    seq: u64, // breaks deadline ties in scheduling order
    deadline: Instant,
    on_complete: Box<dyn FnOnce(&mut C)>,
}

pub struct TaskRegistry<C> {
    tasks: Vec<ScheduledTask<C>>,
    next_seq: u64,
}

impl<C> Default for TaskRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TaskRegistry<C> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Instant, on_complete: impl FnOnce(&mut C) + 'static) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(ScheduledTask {
            seq,
            deadline,
            on_complete: Box::new(on_complete),
        });
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.deadline).min()
    }

    // Runs every task whose deadline has passed, earliest first (ties in
    // scheduling order). Returns how many ran.
    pub fn run_due(&mut self, now: Instant, ctx: &mut C) -> usize {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| t.deadline <= now);
        self.tasks = pending;
        due.sort_by_key(|t| (t.deadline, t.seq));

        let count = due.len();
        for task in due {
            (task.on_complete)(ctx);
        }
        count
    }
}
