/// Per-maze countdown in whole seconds.
///
/// The runtime delivers one `tick` per second; the countdown itself never
/// reads a clock. Pausing hands back a snapshot of the remaining seconds and
/// resuming restarts the tick from that snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    budget: u32,
    remaining: u32,
    running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Stopped or paused; nothing changed.
    Idle,
    Running { remaining: u32 },
    Expired,
}

impl Countdown {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            remaining: budget,
            running: false,
        }
    }

    /// Full budget, running.
    pub fn restart(&mut self) {
        self.remaining = self.budget;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn pause(&mut self) -> u32 {
        self.running = false;
        self.remaining
    }

    pub fn resume_from(&mut self, snapshot: u32) {
        self.remaining = snapshot.min(self.budget);
        self.running = self.remaining > 0;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.budget - self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_only_while_running() {
        let mut t = Countdown::new(3);
        assert_eq!(t.tick(), Tick::Idle);
        t.restart();
        assert_eq!(t.tick(), Tick::Running { remaining: 2 });
        assert_eq!(t.tick(), Tick::Running { remaining: 1 });
        assert_eq!(t.tick(), Tick::Expired);
        assert_eq!(t.tick(), Tick::Idle);
        assert_eq!(t.elapsed(), 3);
    }

    #[test]
    fn pause_snapshot_survives_resume() {
        let mut t = Countdown::new(30);
        t.restart();
        t.tick();
        t.tick();
        let snap = t.pause();
        assert_eq!(snap, 28);
        assert_eq!(t.tick(), Tick::Idle);
        t.resume_from(snap);
        assert_eq!(t.tick(), Tick::Running { remaining: 27 });
    }

    #[test]
    fn restart_refills_budget() {
        let mut t = Countdown::new(5);
        t.restart();
        t.tick();
        t.stop();
        t.restart();
        assert_eq!(t.remaining(), 5);
        assert!(t.is_running());
    }
}
