use std::sync::atomic::Ordering;

use utils::timer::{Timer, CALL_DEPTH};

fn failing_phase() -> Result<(), String> {
    let timer = Timer::new("failing phase", true);
    Err::<(), _>("exchange failed".to_string())?;
    timer.stop();
    Ok(())
}

// alone in its test binary: CALL_DEPTH is process wide
#[test]
fn test_early_return_keeps_depth_balanced() {
    let _ = env_logger::builder().is_test(true).try_init();

    let before = CALL_DEPTH.load(Ordering::Relaxed);
    for _ in 0..3 {
        assert!(failing_phase().is_err());
    }
    assert_eq!(CALL_DEPTH.load(Ordering::Relaxed), before);

    let timer = Timer::new("completed phase", true);
    assert_eq!(CALL_DEPTH.load(Ordering::Relaxed), before + 1);
    timer.stop();
    assert_eq!(CALL_DEPTH.load(Ordering::Relaxed), before);
}
