use mjolnir_motion::Rotation;
use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Manual,
    Backtracking,
}

/// Controller status shared with the monitor task.
#[derive(Debug, Clone)]
pub struct Status {
    pub mode: Mode,
    pub connected: bool,
    pub left_speed: i32,
    pub right_speed: i32,
    /// Values held by the track drivers.
    pub left_output: u16,
    pub right_output: u16,
    pub left_rotation: Rotation,
    pub right_rotation: Rotation,
    pub moving: bool,
    pub history_len: usize,
    pub last_cmd_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            mode: Mode::Manual,
            connected: false,
            left_speed: 0,
            right_speed: 0,
            left_output: 0,
            right_output: 0,
            left_rotation: Rotation::Forward,
            right_rotation: Rotation::Forward,
            moving: false,
            history_len: 0,
            last_cmd_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<Status>>;

pub fn snapshot(bb: &Blackboard) -> Status {
    (*bb.read()).clone()
}

pub fn touch_cmd(bb: &Blackboard) {
    bb.write().last_cmd_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_fault_deduplicates() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "left track output 300 exceeds 255");
        raise_fault(&bb, "left track output 300 exceeds 255");
        raise_fault(&bb, "movement timeout");
        assert_eq!(snapshot(&bb).faults.len(), 2);
    }

    #[test]
    fn test_touch_cmd_moves_timestamp_forward() {
        let bb: Blackboard = Arc::default();
        let before = snapshot(&bb).last_cmd_ts;
        touch_cmd(&bb);
        assert!(snapshot(&bb).last_cmd_ts >= before);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let bb: Blackboard = Arc::default();
        let snap = snapshot(&bb);
        bb.write().mode = Mode::Backtracking;
        assert_eq!(snap.mode, Mode::Manual);
        assert_eq!(snapshot(&bb).mode, Mode::Backtracking);
    }
}
