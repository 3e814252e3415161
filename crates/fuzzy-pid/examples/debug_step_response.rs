use fuzzy_pid::{ControllerConfig, DebugConfig, FuzzyPidController};
use std::path::PathBuf;

/// Step response with the tuning trace enabled.
///
/// Every cycle is appended as one JSON object to `step_response_trace.jsonl`,
/// ready for plotting the gain trajectories.
fn main() {
    env_logger::init();

    let debug_config = DebugConfig {
        log_path: PathBuf::from("step_response_trace.jsonl"),
        controller_id: "step_response".to_string(),
        sample_rate_hz: None,
    };

    let mut controller = FuzzyPidController::new(ControllerConfig::new())
        .expect("Failed to create controller")
        .with_debugging(debug_config);

    let target = 500.0;
    let mut actual = 0.0;
    for _ in 0..30 {
        actual += controller.step(target, actual);
    }

    println!("Final value: {:.6}", actual);
    println!("Final gains: {:?}", controller.gains());

    // Dropping the controller flushes the trace
    drop(controller);
    println!("Trace written to step_response_trace.jsonl");
}
