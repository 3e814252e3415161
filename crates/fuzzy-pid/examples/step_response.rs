use fuzzy_pid::{ControllerConfig, FuzzyPidController};

/// Drives an integrating process from 0 to 500 with the default tuning
/// ranges (error up to 1200, error rate up to 650) and prints how the fuzzy
/// rules reshape the gains along the way.
///
/// Run with `RUST_LOG=fuzzy_pid=trace` to see every cycle.
fn main() {
    env_logger::init();

    let mut controller =
        FuzzyPidController::new(ControllerConfig::new()).expect("Failed to create controller");

    let target = 500.0;
    let mut actual = 0.0;

    println!("Fuzzy PID step response");
    println!("=======================");
    println!("Target: {:.1}", target);
    println!();
    println!("Cycle |     Actual |   Increment |     Kp |     Ki |     Kd");
    println!("------|------------|-------------|--------|--------|-------");

    for cycle in 0..20 {
        let increment = controller.step(target, actual);
        actual += increment;

        let gains = controller.gains();
        println!(
            "{:5} | {:10.4} | {:11.4} | {:6.4} | {:6.4} | {:6.4}",
            cycle, actual, increment, gains.kp, gains.ki, gains.kd
        );
    }

    // Load change: the process suddenly loses 80 units
    actual -= 80.0;
    println!(">>> Disturbance! Process dropped to {:.1}", actual);

    for cycle in 20..40 {
        actual += controller.step(target, actual);
        println!("{:5} | {:10.4}", cycle, actual);
    }

    let stats = controller.get_statistics();
    println!("\nController Statistics:");
    println!("----------------------");
    println!("Cycles: {}", stats.cycles);
    println!("Average error: {:.3}", stats.average_error);
    println!("Max error: {:.3}", stats.max_error);
    match stats.settling_cycles {
        Some(cycle) => println!("Settled since cycle {}", cycle),
        None => println!("Not settled"),
    }
}
