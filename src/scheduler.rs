//! Deferred callback scheduling: "next paint" frames and delayed timeouts.
//!
//! Menus never block. The reveal sequence chains two frames and sub-menus
//! debounce hover with timeouts; both go through a [`Scheduler`] so the
//! host decides what a frame is, and tests can drive time by hand.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::{trace, warn};

use crate::error::MenuError;

pub type Task = Box<dyn FnOnce()>;

/// Handle of a scheduled frame or timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

pub trait Scheduler {
    /// Run `task` before the next paint.
    fn request_frame(&self, task: Task) -> TaskHandle;

    /// Run `task` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Cancel a pending task. Unknown or already-run handles are ignored.
    fn cancel(&self, handle: TaskHandle);
}

/// Runs every task synchronously, ignoring delays.
#[derive(Debug, Default)]
pub struct ImmediateScheduler {
    next: Cell<u64>,
}

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&self) -> TaskHandle {
        let id = self.next.get() + 1;
        self.next.set(id);
        TaskHandle(id)
    }
}

impl Scheduler for ImmediateScheduler {
    fn request_frame(&self, task: Task) -> TaskHandle {
        let handle = self.next_handle();
        task();
        handle
    }

    fn set_timeout(&self, _delay: Duration, task: Task) -> TaskHandle {
        let handle = self.next_handle();
        task();
        handle
    }

    fn cancel(&self, _handle: TaskHandle) {}
}

#[derive(Default)]
struct ManualQueue {
    next: u64,
    now: Duration,
    tasks: HashMap<TaskHandle, Task>,
    frames: VecDeque<TaskHandle>,
    // (deadline, handle) keeps insertion order for equal deadlines
    timers: BTreeSet<(Duration, TaskHandle)>,
}

/// Virtual-clock scheduler. Nothing runs until the owner calls
/// [`ManualScheduler::run_frames`] or [`ManualScheduler::advance`].
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<ManualQueue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.queue.borrow().now
    }

    pub fn pending_frames(&self) -> usize {
        let queue = self.queue.borrow();
        queue
            .frames
            .iter()
            .filter(|handle| queue.tasks.contains_key(handle))
            .count()
    }

    pub fn pending_timers(&self) -> usize {
        let queue = self.queue.borrow();
        queue
            .timers
            .iter()
            .filter(|(_, handle)| queue.tasks.contains_key(handle))
            .count()
    }

    /// Run one frame: only the frames queued before this call. Frames they
    /// request wait for the next one. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let due: Vec<TaskHandle> = self.queue.borrow_mut().frames.drain(..).collect();
        let mut ran = 0;
        for handle in due {
            let task = self.queue.borrow_mut().tasks.remove(&handle);
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }
        ran
    }

    /// Run queued frames, including frames requested while running, until
    /// none are left. Returns how many ran.
    pub fn run_frames(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = {
                let mut queue = self.queue.borrow_mut();
                let Some(handle) = queue.frames.pop_front() else {
                    break;
                };
                queue.tasks.remove(&handle)
            };
            if let Some(task) = task {
                task();
                ran += 1;
            }
        }
        ran
    }

    /// Move the clock forward by `by`, firing due timers in deadline order.
    /// Returns how many timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;
        loop {
            let task = {
                let mut queue = self.queue.borrow_mut();
                let due = queue
                    .timers
                    .iter()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);
                let Some(key) = due else {
                    break;
                };
                queue.timers.remove(&key);
                queue.now = key.0;
                queue.tasks.remove(&key.1)
            };
            if let Some(task) = task {
                task();
                fired += 1;
            }
        }
        self.queue.borrow_mut().now = target;
        fired
    }

    fn allocate(&self, task: Task) -> (TaskHandle, std::cell::RefMut<'_, ManualQueue>) {
        let mut queue = self.queue.borrow_mut();
        queue.next += 1;
        let handle = TaskHandle(queue.next);
        queue.tasks.insert(handle, task);
        (handle, queue)
    }
}

impl Scheduler for ManualScheduler {
    fn request_frame(&self, task: Task) -> TaskHandle {
        let (handle, mut queue) = self.allocate(task);
        queue.frames.push_back(handle);
        handle
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TaskHandle {
        let (handle, mut queue) = self.allocate(task);
        let deadline = queue.now + delay;
        queue.timers.insert((deadline, handle));
        handle
    }

    fn cancel(&self, handle: TaskHandle) {
        let mut queue = self.queue.borrow_mut();
        if queue.tasks.remove(&handle).is_some() {
            trace!(handle = handle.id(), "cancelled task");
        }
        queue.frames.retain(|queued| *queued != handle);
        queue.timers.retain(|(_, queued)| *queued != handle);
    }
}

/// Scheduler backed by a calloop event loop: frames are immediate timer
/// sources dispatched on the next loop iteration, timeouts are delayed ones.
pub struct CalloopScheduler {
    handle: LoopHandle<'static, ()>,
    next: Cell<u64>,
    sources: Rc<RefCell<HashMap<TaskHandle, RegistrationToken>>>,
}

impl CalloopScheduler {
    pub fn new(handle: LoopHandle<'static, ()>) -> Self {
        Self {
            handle,
            next: Cell::new(0),
            sources: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Number of tasks still registered with the loop.
    pub fn pending(&self) -> usize {
        self.sources.borrow().len()
    }

    fn insert(&self, timer: Timer, task: Task) -> Result<TaskHandle, MenuError> {
        let id = self.next.get() + 1;
        self.next.set(id);
        let handle = TaskHandle(id);

        let sources = self.sources.clone();
        let mut task = Some(task);
        let token = self
            .handle
            .insert_source(timer, move |_, _, _| {
                sources.borrow_mut().remove(&handle);
                if let Some(task) = task.take() {
                    task();
                }
                TimeoutAction::Drop
            })
            .map_err(|err| MenuError::Schedule(err.error.to_string()))?;
        self.sources.borrow_mut().insert(handle, token);
        Ok(handle)
    }

    fn insert_or_log(&self, timer: Timer, task: Task) -> TaskHandle {
        match self.insert(timer, task) {
            Ok(handle) => handle,
            Err(err) => {
                // the task is dropped; report a handle that cancels nothing
                warn!("failed to schedule menu task: {err}");
                TaskHandle(0)
            }
        }
    }
}

impl Scheduler for CalloopScheduler {
    fn request_frame(&self, task: Task) -> TaskHandle {
        self.insert_or_log(Timer::immediate(), task)
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TaskHandle {
        self.insert_or_log(Timer::from_duration(delay), task)
    }

    fn cancel(&self, handle: TaskHandle) {
        let token = self.sources.borrow_mut().remove(&handle);
        if let Some(token) = token {
            self.handle.remove(token);
        }
    }
}
