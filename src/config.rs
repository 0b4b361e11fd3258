use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

/// Where work functions run relative to the calling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingModel {
    /// Work runs on a fixed pool of worker threads.
    ThreadPool,
    /// Work is queued and run on the calling thread at the next turn.
    Cooperative,
}

impl Default for SchedulingModel {
    fn default() -> Self {
        SchedulingModel::ThreadPool
    }
}

impl std::str::FromStr for SchedulingModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread-pool" | "threadpool" | "pool" => Ok(SchedulingModel::ThreadPool),
            "cooperative" | "coop" => Ok(SchedulingModel::Cooperative),
            other => Err(Error::config(format!("unknown scheduling model: {other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    pub scheduling_model: SchedulingModel,
    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    pub panic_strategy: PanicStrategy,
    /// Upper bound on how long `EventLoop::run` blocks before re-checking
    /// cooperative work and liveness.
    pub idle_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            scheduling_model: SchedulingModel::default(),
            pin_workers: false,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "baton-worker".to_string(),
            panic_strategy: PanicStrategy::default(),
            idle_poll_interval: Duration::from_millis(10),
        }
    }
}

impl Config {
    pub const ENV_NUM_THREADS: &'static str = "BATON_NUM_THREADS";
    pub const ENV_SCHEDULING: &'static str = "BATON_SCHEDULING";
    pub const ENV_THREAD_PREFIX: &'static str = "BATON_THREAD_PREFIX";

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Default config overlaid with `BATON_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup(Self::ENV_NUM_THREADS) {
            let n = raw.trim().parse::<usize>().map_err(|e| {
                Error::config(format!("{}={raw:?}: {e}", Self::ENV_NUM_THREADS))
            })?;
            config.num_threads = Some(n);
        }

        if let Some(raw) = lookup(Self::ENV_SCHEDULING) {
            config.scheduling_model = raw.parse()?;
        }

        if let Some(prefix) = lookup(Self::ENV_THREAD_PREFIX) {
            config.thread_name_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        if self.idle_poll_interval.is_zero() {
            return Err(Error::config("idle_poll_interval must be > 0"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn scheduling_model(mut self, model: SchedulingModel) -> Self {
        self.config.scheduling_model = model;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.config.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn idle_poll_interval(mut self, interval: Duration) -> Self {
        self.config.idle_poll_interval = interval;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
