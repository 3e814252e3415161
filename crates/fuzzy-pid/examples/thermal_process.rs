use fuzzy_pid::{ControllerConfig, ThreadSafeFuzzyPidController};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Heats a simulated furnace with a sampling thread that runs the fuzzy PID
/// controller and a monitoring thread that watches the adapted gains.
///
/// The controller outputs heater power increments; the furnace integrates
/// them and loses a little heat to its surroundings every cycle.
fn main() {
    env_logger::init();

    // Temperatures up to 400 °C, heating rate up to 60 °C per cycle
    let config = ControllerConfig::new()
        .with_error_limit(400.0)
        .with_error_rate_limit(60.0)
        .with_delta_limits(0.2, 0.5, 0.3)
        .with_initial_gains(0.2, 0.05, 0.01);

    let controller =
        ThreadSafeFuzzyPidController::new(config).expect("Failed to create controller");

    let setpoint = 350.0;
    let furnace = Arc::new(Mutex::new(Furnace::new(20.0)));

    let control_controller = controller.clone();
    let control_furnace = Arc::clone(&furnace);
    let control_thread = thread::spawn(move || {
        for cycle in 0..120 {
            let temperature = control_furnace.lock().unwrap().temperature;
            let increment = control_controller
                .step(setpoint, temperature)
                .expect("Failed to step controller");

            let mut furnace = control_furnace.lock().unwrap();
            furnace.heater_power += increment;
            furnace.advance();

            if cycle % 10 == 0 {
                println!(
                    "CONTROL | Cycle {:3} | Temperature {:7.2} °C | Heater {:7.2}",
                    cycle, furnace.temperature, furnace.heater_power
                );
            }
            thread::sleep(Duration::from_millis(5));
        }
    });

    let monitor_controller = controller.clone();
    let monitor_thread = thread::spawn(move || {
        for _ in 0..6 {
            thread::sleep(Duration::from_millis(100));
            let gains = monitor_controller.gains().expect("Failed to read gains");
            println!(
                "MONITOR | Kp {:.4} | Ki {:.4} | Kd {:.4}",
                gains.kp, gains.ki, gains.kd
            );
        }
    });

    control_thread.join().unwrap();
    monitor_thread.join().unwrap();

    println!(
        "\nFinal temperature: {:.2} °C",
        furnace.lock().unwrap().temperature
    );

    let stats = controller
        .get_statistics()
        .expect("Failed to get controller statistics");
    println!("Average error: {:.2} °C", stats.average_error);
    println!("Max error: {:.2} °C", stats.max_error);
    if let Some(cycle) = stats.rise_cycles {
        println!("Reached the setpoint band at cycle {}", cycle);
    }
}

/// First-order furnace model
struct Furnace {
    temperature: f64,
    ambient: f64,
    heater_power: f64,
}

impl Furnace {
    fn new(ambient: f64) -> Self {
        Furnace {
            temperature: ambient,
            ambient,
            heater_power: 0.0,
        }
    }

    fn advance(&mut self) {
        let loss = 0.02 * (self.temperature - self.ambient);
        self.temperature += 0.5 * self.heater_power - loss;
    }
}
