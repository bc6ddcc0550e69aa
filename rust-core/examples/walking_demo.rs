/// Walking demo: feed a synthetic walk, print each decision window.
///
/// Run with `RUST_LOG=debug` to see the per-cycle pipeline log.
use trace_pedometer::{
    Channel, ClassId, DecisionWindow, FeatureVector, Pedometer, PedometerConfig, SampleBatch,
};

const RATE: usize = 25;

/// Toy classifier: energetic accel means walking (9), otherwise still (0).
fn classify(features: &FeatureVector) -> ClassId {
    if features.mean_accel_magnitude() > 1.0e6 {
        ClassId(9)
    } else {
        ClassId(0)
    }
}

/// One second of raw data: a 1.8 Hz gait for the first 20 s, then standing.
fn second_of_motion(second: usize) -> [[i16; RATE]; 6] {
    let mut channels = [[0i16; RATE]; 6];
    for (k, channel) in channels.iter_mut().enumerate() {
        for (i, slot) in channel.iter_mut().enumerate() {
            let t = (second * RATE + i) as f64 / RATE as f64;
            let gravity = if k == 2 { 16384.0 } else { 0.0 };
            let swing = if second < 20 {
                let amplitude = if k < 3 { 7000.0 } else { 2500.0 };
                amplitude * (2.0 * std::f64::consts::PI * (1.8 * t + k as f64 * 0.1)).sin()
            } else {
                0.0
            };
            *slot = (gravity + swing) as i16;
        }
    }
    channels
}

fn print_window(window: &DecisionWindow) {
    println!("Window #{}", window.cycle);
    for channel in Channel::FEATURE_ORDER {
        println!(
            "  {}: {} steps, interval {:.1}",
            channel.label(),
            window.axis_steps[channel],
            window.intervals[channel]
        );
    }
    println!(
        "  class {} via {} -> {} steps\n",
        window.class_id.raw(),
        window.fusion.var_axis.label(),
        window.step_count()
    );
}

fn main() {
    env_logger::init();
    println!("=== Trace Pedometer: Walking Demo ===\n");

    let mut pedometer = match Pedometer::new(PedometerConfig::default(), classify) {
        Ok(pedometer) => pedometer,
        Err(err) => {
            eprintln!("invalid config: {err}");
            return;
        }
    };

    for second in 0..31 {
        let [ax, ay, az, gx, gy, gz] = second_of_motion(second);
        let batch = SampleBatch::new(&ax, &ay, &az, &gx, &gy, &gz);
        let before = pedometer.cycles();
        match pedometer.process(&batch) {
            Ok(_) if pedometer.cycles() > before => {
                if let Some(window) = pedometer.last_window() {
                    print_window(window);
                }
            }
            Ok(_) => {}
            Err(err) => println!("[{second:>2}s] no observation: {err}"),
        }
    }

    println!("Total: {} steps over {} windows", pedometer.total_steps(), pedometer.cycles());
}
