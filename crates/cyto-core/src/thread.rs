//! Worker-thread ↔ NUMA-domain topology.
//!
//! The store partitions agents by NUMA domain and the parallel sweeps prefer
//! domain-local work.  `ThreadInfo` supplies the mapping: it detects the
//! domain count from the OS (Linux sysfs; one domain everywhere else) and
//! assigns the rayon worker threads to domains in contiguous blocks, mirroring
//! how a bound OpenMP runtime lays threads out.  Pinning itself is delegated
//! to the process launcher (`taskset`, `numactl`, a container runtime); the
//! engine only needs a stable thread→domain map, which block assignment
//! gives it regardless of physical binding.

use std::path::Path;

/// Thread topology snapshot taken at simulation construction.
#[derive(Clone, Debug)]
pub struct ThreadInfo {
    max_threads: usize,
    numa_nodes: usize,
    /// worker index → numa node
    thread_numa: Vec<usize>,
    /// worker index → id within its numa node (0..k-1 per domain)
    numa_thread_id: Vec<usize>,
    /// numa node → number of workers assigned to it
    threads_in_numa: Vec<usize>,
}

impl ThreadInfo {
    /// Detect the topology for the current rayon pool.
    pub fn detect() -> ThreadInfo {
        Self::with_layout(rayon::current_num_threads(), detect_numa_nodes())
    }

    /// Build a topology with an explicit worker and domain count.
    ///
    /// `numa_nodes` is clamped to `[1, max_threads]` — a domain without any
    /// worker would never have its partition visited locally.
    pub fn with_layout(max_threads: usize, numa_nodes: usize) -> ThreadInfo {
        let max_threads = max_threads.max(1);
        let numa_nodes = numa_nodes.clamp(1, max_threads);

        // Contiguous block assignment: workers [0, t/n), [t/n, 2t/n), ...
        let mut thread_numa = vec![0; max_threads];
        let mut numa_thread_id = vec![0; max_threads];
        let mut threads_in_numa = vec![0; numa_nodes];
        for tid in 0..max_threads {
            let node = tid * numa_nodes / max_threads;
            thread_numa[tid] = node;
            numa_thread_id[tid] = threads_in_numa[node];
            threads_in_numa[node] += 1;
        }

        ThreadInfo {
            max_threads,
            numa_nodes,
            thread_numa,
            numa_thread_id,
            threads_in_numa,
        }
    }

    /// Number of NUMA domains.
    #[inline]
    pub fn numa_nodes(&self) -> usize {
        self.numa_nodes
    }

    /// Number of worker threads.
    #[inline]
    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// The domain a worker thread is assigned to.
    #[inline]
    pub fn numa_node_of(&self, thread: usize) -> usize {
        self.thread_numa[thread % self.max_threads]
    }

    /// The domain of the *calling* thread (domain 0 outside the pool).
    pub fn current_numa_node(&self) -> usize {
        match rayon::current_thread_index() {
            Some(tid) => self.numa_node_of(tid),
            None => 0,
        }
    }

    /// A worker's id within its domain, `0..threads_in_node(d)`.
    #[inline]
    pub fn numa_thread_id(&self, thread: usize) -> usize {
        self.numa_thread_id[thread % self.max_threads]
    }

    /// Number of workers assigned to `node`.
    #[inline]
    pub fn threads_in_node(&self, node: usize) -> usize {
        self.threads_in_numa[node]
    }
}

impl Default for ThreadInfo {
    fn default() -> Self {
        Self::detect()
    }
}

/// Count NUMA domains from sysfs; 1 when the hierarchy is absent.
fn detect_numa_nodes() -> usize {
    let base = Path::new("/sys/devices/system/node");
    let Ok(entries) = std::fs::read_dir(base) else {
        return 1;
    };
    let count = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with("node") && n[4..].chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false)
        })
        .count();
    count.max(1)
}
