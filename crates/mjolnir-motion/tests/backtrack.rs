use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use mjolnir_motion::*;

#[derive(Debug, Clone, Default)]
struct Recorder {
    writes: Rc<RefCell<Vec<u16>>>,
}

impl ActuatorSide for Recorder {
    type Error = Infallible;

    fn set_output(&mut self, value: u16, _rotation: Rotation) -> Result<(), Self::Error> {
        self.writes.borrow_mut().push(value);
        Ok(())
    }
}

fn drive_course() -> (Motor<Recorder, MockTicks>, Recorder, Recorder, MockTicks) {
    let ticks = MockTicks::with_initial(1);
    let left = Recorder::default();
    let right = Recorder::default();
    let history = StateHistory::new(DEFAULT_CAPACITY, ticks.clone());
    let mut motor = Motor::new(
        left.clone(),
        right.clone(),
        SpeedCalibration::VEX_SERVO,
        history,
        ticks.clone(),
    )
    .unwrap();

    ticks.advance(100);
    motor.accelerate_forward(10).unwrap();
    ticks.advance(200);
    motor.accelerate_forward(10).unwrap();
    ticks.advance(300);
    motor.turn_left(20).unwrap();
    ticks.advance(400);

    left.writes.borrow_mut().clear();
    right.writes.borrow_mut().clear();
    (motor, left, right, ticks)
}

#[test]
fn test_replays_reversed_course_newest_first() {
    let (mut motor, left, right, ticks) = drive_course();

    let mut backtrack = Backtrack::start(&mut motor).unwrap();
    assert_eq!(motor.history().len(), 4);

    let mut polls = 0;
    while backtrack.poll(&mut motor).unwrap() == BacktrackStatus::Replaying {
        ticks.advance(50);
        polls += 1;
        assert!(polls < 100, "backtrack never depleted");
    }

    // Stop issued by start, three reversed steps, final stop.
    assert_eq!(*left.writes.borrow(), vec![1500, 1500, 1480, 1490, 1500]);
    assert_eq!(*right.writes.borrow(), vec![1500, 1460, 1480, 1490, 1500]);
    assert!(motor.history().is_empty());
    assert!(!motor.is_moving());
    assert!(motor.is_recording());
}

#[test]
fn test_interrupt_keeps_unvisited_states() {
    let (mut motor, _left, right, ticks) = drive_course();

    let mut backtrack = Backtrack::start(&mut motor).unwrap();
    assert_eq!(backtrack.poll(&mut motor), Ok(BacktrackStatus::Replaying));
    assert_eq!(right.writes.borrow().last(), Some(&1460));
    // The turn ran for 400 ticks before the stop.
    ticks.advance(399);
    assert_eq!(backtrack.poll(&mut motor), Ok(BacktrackStatus::Replaying));
    assert_eq!(right.writes.borrow().last(), Some(&1460));
    ticks.advance(1);
    assert_eq!(backtrack.poll(&mut motor), Ok(BacktrackStatus::Replaying));
    assert_eq!(right.writes.borrow().last(), Some(&1480));

    ticks.advance(100);
    let remaining = backtrack.interrupt(&mut motor);
    assert_eq!(remaining, 2);
    assert!(motor.is_recording());
    assert_eq!(motor.history().last().unwrap().duration(), 200);

    // A later backtrack resumes from the interrupted step.
    motor.stop_movement().unwrap();
    let mut resumed = Backtrack::start(&mut motor).unwrap();
    resumed.poll(&mut motor).unwrap();
    assert_eq!(right.writes.borrow().last(), Some(&1480));
}

#[test]
fn test_replay_takes_as_long_as_the_course() {
    let (mut motor, _left, _right, ticks) = drive_course();

    let mut backtrack = Backtrack::start(&mut motor).unwrap();
    let mut replayed = 0;
    while backtrack.poll(&mut motor).unwrap() == BacktrackStatus::Replaying {
        ticks.advance(10);
        replayed += 10;
        assert!(replayed < 10_000, "backtrack never depleted");
    }
    // 200 + 300 + 400 ticks of movement; the idle time before the first move is not replayed.
    assert_eq!(replayed, 900);
}

#[test]
fn test_full_history_keeps_newest_course() {
    let ticks = MockTicks::with_initial(1);
    let mut history = StateHistory::new(3, ticks.clone());
    for left in [1510, 1520, 1530, 1540, 1550] {
        ticks.advance(10);
        history.add_state(State::new(0, 0, left, 1500));
    }

    let mut cursor = history.backtrack_cursor();
    let mut replayed = Vec::new();
    while let Some(state) = history.next_back(&mut cursor) {
        replayed.push(state.reversed(&SpeedCalibration::VEX_SERVO).left_speed());
    }
    assert_eq!(replayed, vec![1450, 1460, 1470]);
}
