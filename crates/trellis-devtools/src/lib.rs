use std::fmt::Write as _;

use web_time::Instant;

use trellis_core::{
    CommitStats, FiberId, FiberRootNode, Flags, HostConfig, MemoizedState, WorkTag,
};

/// Indented pre-order listing of the committed fiber tree.
///
/// ```rust
/// use trellis_core::*;
///
/// let root = create_container(MemoryHost::new(), MemNode::container());
/// root.render(h("ul").key("list").child("hi"));
/// let dump = root.inspect(trellis_devtools::dump_tree);
/// assert_eq!(dump, "HostRoot\n  <ul> key=list\n    #text \"hi\"\n");
/// ```
pub fn dump_tree<H: HostConfig>(root: &FiberRootNode<H>) -> String {
    let mut out = String::new();
    let mut stack: Vec<(FiberId, usize)> = vec![(root.current(), 0)];
    while let Some((id, depth)) = stack.pop() {
        let Some(fiber) = root.fiber(id) else {
            let _ = writeln!(out, "{:indent$}<freed {id:?}>", "", indent = depth * 2);
            continue;
        };

        let _ = write!(out, "{:indent$}{}", "", fiber.describe(), indent = depth * 2);
        if let Some(key) = &fiber.key {
            let _ = write!(out, " key={key}");
        }
        match (&fiber.tag, &fiber.memoized_state) {
            (WorkTag::FunctionComponent, MemoizedState::Hooks(chain)) => {
                let _ = write!(out, " hooks={}", chain.len());
            }
            (WorkTag::HostText, _) => {
                if let Some(text) = fiber.memoized_props.as_ref().and_then(|p| p.text_content()) {
                    let _ = write!(out, " {text:?}");
                }
            }
            _ => {}
        }
        let pending = fiber.flags - Flags::PERFORMED_WORK;
        if !pending.is_empty() {
            let _ = write!(out, " [{pending:?}]");
        }
        out.push('\n');

        let children: Vec<FiberId> = root.fibers().children(id).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }
    out
}

pub struct Hud {
    pub inspector_enabled: bool,
    commit_count: u64,
    last_commit: Option<Instant>,
    commits_per_sec: f32,
    commit_ms_smooth: f32,
    pub metrics: Option<Metrics>,
}

impl Default for Hud {
    fn default() -> Self {
        Self::new()
    }
}

impl Hud {
    pub fn new() -> Self {
        Self {
            inspector_enabled: false,
            commit_count: 0,
            last_commit: None,
            commits_per_sec: 0.0,
            commit_ms_smooth: 0.0,
            metrics: None,
        }
    }

    pub fn toggle_inspector(&mut self) {
        self.inspector_enabled = !self.inspector_enabled;
        log::debug!("inspector {}", if self.inspector_enabled { "on" } else { "off" });
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    /// Smoothed commit duration in milliseconds.
    pub fn commit_ms(&self) -> f32 {
        self.commit_ms_smooth
    }

    pub fn record(&mut self, stats: &CommitStats, fiber_count: usize) {
        self.commit_count += 1;
        // simple EMA
        let a = 0.2;
        let ms = stats.duration.as_secs_f32() * 1000.0;
        self.commit_ms_smooth = if self.commit_count == 1 {
            ms
        } else {
            (1.0 - a) * self.commit_ms_smooth + a * ms
        };

        let now = Instant::now();
        if let Some(prev) = self.last_commit.replace(now) {
            let dt = (now - prev).as_secs_f32();
            if dt > 0.0 {
                let rate = 1.0 / dt;
                self.commits_per_sec = if self.commits_per_sec == 0.0 {
                    rate
                } else {
                    (1.0 - a) * self.commits_per_sec + a * rate
                };
            }
        }

        self.metrics = Some(Metrics {
            units_of_work: stats.units_of_work,
            fibers_allocated: stats.fibers_allocated,
            fibers_freed: stats.fibers_freed,
            fiber_count,
        });
    }

    pub fn overlay(&self) -> String {
        let mut lines = vec![
            format!("commit: {}", self.commit_count),
            format!("commits/s: {:.1}", self.commits_per_sec),
            format!("time: {:.2} ms", self.commit_ms_smooth),
        ];
        if let Some(m) = &self.metrics {
            lines.push(format!("units: {}", m.units_of_work));
            lines.push(format!("fibers: {} (+{} -{})", m.fiber_count, m.fibers_allocated, m.fibers_freed));
        }
        lines.join("  |  ")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metrics {
    pub units_of_work: usize,
    pub fibers_allocated: usize,
    pub fibers_freed: usize,
    pub fiber_count: usize,
}

pub struct Inspector {
    pub hud: Hud,
    seen_commits: u64,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            hud: Hud::new(),
            seen_commits: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.hud.toggle_inspector();
    }

    /// Picks up any commit since the last frame. Returns the overlay line and
    /// the tree dump while the inspector is enabled.
    pub fn frame<H: HostConfig>(&mut self, root: &FiberRootNode<H>) -> Option<String> {
        if root.commit_count() != self.seen_commits {
            self.seen_commits = root.commit_count();
            if let Some(stats) = root.last_commit_stats() {
                self.hud.record(stats, root.fiber_count());
            }
        }
        if !self.hud.inspector_enabled {
            return None;
        }
        Some(format!("{}\n{}", self.hud.overlay(), dump_tree(root)))
    }
}
