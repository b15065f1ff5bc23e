use crate::conformal::SplitConformal;
use crate::score::Task;
use crate::split::SplitSpec;

impl SplitConformal {
    // Set methods for parameters. Changing the task or alpha drops any computed threshold.

    /// Set the task.
    /// * `task` - Selects the scoring rule and the region rule.
    pub fn set_task(mut self, task: Task) -> Self {
        if self.cfg.task != task {
            self.threshold = None;
        }
        self.cfg.task = task;
        self
    }

    /// Set the miscoverage level.
    /// * `alpha` - Target miscoverage, strictly between 0 and 1.
    pub fn set_alpha(mut self, alpha: f64) -> Self {
        if self.cfg.alpha != alpha {
            self.threshold = None;
        }
        self.cfg.alpha = alpha;
        self
    }

    /// Set how the data is partitioned.
    /// * `split` - Fractions for a three-way split, or a calibration count.
    pub fn set_split(mut self, split: SplitSpec) -> Self {
        self.cfg.split = split;
        self
    }

    /// Set the seed.
    /// * `seed` - Seed for reproducible partitions, `None` for OS entropy.
    pub fn set_seed(mut self, seed: Option<u64>) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the number of Monte Carlo runs.
    pub fn set_n_runs(mut self, n_runs: usize) -> Self {
        self.cfg.n_runs = n_runs;
        self
    }

    /// Set whether scoring and Monte Carlo runs use rayon.
    pub fn set_parallel(mut self, parallel: bool) -> Self {
        self.cfg.parallel = parallel;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Size of a dedicated pool for Monte Carlo runs.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }
}
