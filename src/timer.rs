use std::{cell::RefCell, collections::BTreeMap, rc::Rc, time::Duration};

use anyhow::Result;

/// Callback run on every period of a timer.
pub type Task = Box<dyn FnMut()>;

/// Periodic timer source. Callbacks never overlap; the host serializes them.
pub trait Scheduler {
    type Handle: Copy + Eq + std::fmt::Debug;

    fn schedule_periodic(&mut self, interval: Duration, task: Task) -> Result<Self::Handle>;

    /// Stops a timer. Cancelling an unknown or already cancelled handle is a no-op.
    fn cancel(&mut self, handle: Self::Handle);
}

/// Smallest period accepted, matching the browser clamp for `setInterval(0)`.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct Periodic {
    interval: Duration,
    due: Duration,
    /// Taken out while the callback runs.
    task: Option<Task>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerId, Periodic>,
}

/// Virtual-time scheduler stepped explicitly with [`ManualScheduler::advance`].
///
/// Clones share one clock, so a host can keep a handle for stepping while a
/// session owns another for registration.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.borrow();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("active", &clock.timers.len())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.borrow().now
    }

    /// Number of registered, uncancelled timers.
    pub fn active(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    /// Moves time forward, firing every due callback in (due time,
    /// registration) order. Callbacks may cancel timers, their own included.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let next = {
                let clock = self.clock.borrow();
                clock
                    .timers
                    .iter()
                    .filter(|(_, timer)| timer.due <= target && timer.task.is_some())
                    .min_by_key(|(id, timer)| (timer.due, **id))
                    .map(|(id, _)| *id)
            };
            let Some(id) = next else {
                break;
            };

            let task = {
                let mut clock = self.clock.borrow_mut();
                let Some(timer) = clock.timers.get_mut(&id) else {
                    break;
                };
                let due = timer.due;
                timer.due += timer.interval;
                let task = timer.task.take();
                clock.now = due;
                task
            };

            if let Some(mut task) = task {
                task();
                if let Some(timer) = self.clock.borrow_mut().timers.get_mut(&id) {
                    timer.task = Some(task);
                }
            }
        }
        self.clock.borrow_mut().now = target;
    }
}

impl Scheduler for ManualScheduler {
    type Handle = TimerId;

    fn schedule_periodic(&mut self, interval: Duration, task: Task) -> Result<TimerId> {
        let mut clock = self.clock.borrow_mut();
        let interval = interval.max(MIN_INTERVAL);
        let id = TimerId(clock.next_id);
        clock.next_id += 1;
        let due = clock.now + interval;
        clock.timers.insert(
            id,
            Periodic {
                interval,
                due,
                task: Some(task),
            },
        );
        Ok(id)
    }

    fn cancel(&mut self, handle: TimerId) {
        self.clock.borrow_mut().timers.remove(&handle);
    }
}
