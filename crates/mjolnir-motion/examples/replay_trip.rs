use std::convert::Infallible;

use mjolnir_motion::*;

/// Prints every output it receives.
struct PrintSide(&'static str);

impl ActuatorSide for PrintSide {
    type Error = Infallible;

    fn set_output(&mut self, value: u16, rotation: Rotation) -> Result<(), Self::Error> {
        println!("    {:<5} <- {:>4} ({:?})", self.0, value, rotation);
        Ok(())
    }
}

fn main() {
    let ticks = MockTicks::with_initial(1);
    let history = StateHistory::new(DEFAULT_CAPACITY, ticks.clone());
    let motor = Motor::new(
        PrintSide("left"),
        PrintSide("right"),
        SpeedCalibration::VEX_SERVO,
        history,
        ticks.clone(),
    );

    let mut motor = match motor {
        Ok(motor) => motor,
        Err(e) => {
            eprintln!("Rejected calibration: {}", e);
            return;
        }
    };

    println!("Driving out...");
    let step_ms = 250 * clock::TICKS_PER_MS;
    let course: [(&str, fn(&mut Motor<PrintSide, MockTicks>) -> Result<(), Infallible>); 5] = [
        ("accelerate", |m| m.accelerate_forward(100)),
        ("accelerate", |m| m.accelerate_forward(100)),
        ("turn left", |m| m.turn_left(50)),
        ("steer center", |m| m.steer_center()),
        ("turn right", |m| m.turn_right(80)),
    ];
    for (name, command) in course {
        ticks.advance(step_ms);
        println!("  {}", name);
        let Ok(()) = command(&mut motor);
    }
    ticks.advance(step_ms);

    println!("\nRecorded course:");
    for (i, state) in motor.history().iter().enumerate() {
        println!("  {:>2}: {}", i, state);
    }

    println!("\nBacktracking...");
    let Ok(mut backtrack) = Backtrack::start(&mut motor);
    loop {
        let Ok(status) = backtrack.poll(&mut motor);
        if status == BacktrackStatus::Depleted {
            break;
        }
        ticks.advance(clock::TICKS_PER_MS);
    }
    println!("Replayed {} steps, history now holds {} states.", backtrack.steps(), motor.history().len());
}
