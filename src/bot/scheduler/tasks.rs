use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bot::state::def::{AmethystBot, BotResult};

pub type TaskFn = Arc<dyn Fn(Arc<AmethystBot>) -> BoxFuture<'static, BotResult<()>> + Send + Sync>;

/// A background job run every `interval`, optionally after a first delay.
#[derive(Clone)]
pub struct Task {
    pub name: String,
    pub interval: Duration,
    pub initial_delay: Option<Duration>,
    execute: TaskFn,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, interval: Duration, func: F) -> Self
    where
        F: Fn(Arc<AmethystBot>) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Task { name: name.into(), interval, initial_delay: None, execute: Arc::new(func) }
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }
}

#[derive(Default)]
pub struct TaskScheduler {
    running: DashMap<String, JoinHandle<()>>,
}

impl TaskScheduler {
    /// Starts `task`, stopping any running task with the same name.
    pub fn spawn(&self, bot: Arc<AmethystBot>, task: Task) {
        let name = task.name.clone();
        let handle = tokio::spawn(run_task(bot, task));
        if let Some(previous) = self.running.insert(name.clone(), handle) {
            previous.abort();
        }
        info!("Started task {}", name);
    }

    pub fn stop(&self, name: &str) -> bool {
        match self.running.remove(name) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.running.retain(|_, handle| {
            handle.abort();
            false
        });
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}

async fn run_task(bot: Arc<AmethystBot>, task: Task) {
    if let Some(delay) = task.initial_delay {
        tokio::time::sleep(delay).await;
    }
    loop {
        if let Err(e) = (task.execute)(Arc::clone(&bot)).await {
            error!("Task {} failed: {e}", task.name);
        }
        tokio::time::sleep(task.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::bot::test_support::test_bot;

    fn counting_task(name: &str, runs: Arc<AtomicUsize>) -> Task {
        Task::new(name, Duration::from_secs(10), move |_bot| {
            let runs = runs.clone();
            Box::pin(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_on_interval_until_cleared() {
        let bot = test_bot().build().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        bot.create_task(counting_task("tick", runs.clone()));

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        bot.clear_tasks();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_delay_postpones_first_run() {
        let bot = test_bot().build().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        bot.create_task(counting_task("late", runs.clone()).initial_delay(Duration::from_secs(5)));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        bot.shutdown();
    }

    #[tokio::test]
    async fn same_name_replaces_running_task() {
        let bot = test_bot().build().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        bot.create_task(counting_task("job", runs.clone()));
        bot.create_task(counting_task("job", runs.clone()));

        assert_eq!(bot.tasks.len(), 1);
        assert!(bot.tasks.stop("job"));
        assert!(!bot.tasks.is_running("job"));
    }
}
