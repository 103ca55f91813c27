use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use ave_base::{CountDownLatch, Priority, RepeatingTaskHandle, TaskRunner, create_default_task_runner_factory};

const PERIOD_US: u64 = 10_000;

fn runner(name: &str) -> TaskRunner {
    create_default_task_runner_factory()
        .create_task_runner(name, Priority::Normal)
        .unwrap()
}

#[test]
fn slow_runs_do_not_stretch_the_period() {
    const ITERATIONS: usize = 100;

    let runner = runner("repeat-drift");
    let fires = Arc::new(Mutex::new(Vec::with_capacity(ITERATIONS)));
    let done = Arc::new(CountDownLatch::new(ITERATIONS));
    let (recorded, latch) = (Arc::clone(&fires), Arc::clone(&done));
    let calls = AtomicUsize::new(0);

    let mut handle = RepeatingTaskHandle::start(&runner, move || {
        recorded.lock().push(Instant::now());
        latch.count_down();
        if calls.fetch_add(1, Ordering::Relaxed) % 3 == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        PERIOD_US
    });
    assert!(done.wait_for(Duration::from_secs(10)));
    handle.stop();

    let fires = fires.lock();
    let first = fires[0];
    let last = fires[ITERATIONS - 1];
    let mean = (last - first) / u32::try_from(ITERATIONS - 1).unwrap();
    assert!(
        mean >= Duration::from_micros(9_500) && mean <= Duration::from_micros(11_500),
        "mean interval {mean:?}"
    );
}

#[test]
fn stop_halts_recurrence() {
    let runner = runner("repeat-stop");
    let count = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(CountDownLatch::new(3));
    let (counter, latch) = (Arc::clone(&count), Arc::clone(&started));

    let mut handle = RepeatingTaskHandle::start(&runner, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        latch.count_down();
        1_000
    });
    assert!(started.wait_for(Duration::from_secs(5)));
    assert!(handle.running());

    handle.stop();
    assert!(!handle.running());
    let at_stop = count.load(Ordering::SeqCst);
    // Everything queued before this no-op has finished once it returns.
    runner.post_fn_and_wait(|| {});
    let settled = count.load(Ordering::SeqCst);
    assert!(settled <= at_stop + 1, "ran {} times after stop", settled - at_stop);

    thread::sleep(Duration::from_millis(30));
    assert_eq!(count.load(Ordering::SeqCst), settled);
}

#[test]
fn delayed_start_waits_for_the_first_delay() {
    let runner = runner("repeat-delayed");
    let first_run = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&first_run);
    let ran = Arc::new(CountDownLatch::new(1));
    let latch = Arc::clone(&ran);

    let started_at = Instant::now();
    let mut handle = RepeatingTaskHandle::delayed_start(&runner, 30_000, move || {
        slot.lock().get_or_insert_with(Instant::now);
        latch.count_down();
        PERIOD_US
    });
    assert!(ran.wait_for(Duration::from_secs(5)));
    handle.stop();

    let first_run = (*first_run.lock()).unwrap();
    assert!(first_run - started_at >= Duration::from_millis(30));
}

#[test]
fn dropping_the_handle_keeps_the_task_running() {
    let runner = runner("repeat-detached");
    let ticks = Arc::new(CountDownLatch::new(5));
    let latch = Arc::clone(&ticks);
    drop(RepeatingTaskHandle::start(&runner, move || {
        latch.count_down();
        1_000
    }));
    assert!(ticks.wait_for(Duration::from_secs(5)));
}

#[test]
fn runner_shutdown_ends_the_chain() {
    let runner = runner("repeat-shutdown");
    let count = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(CountDownLatch::new(2));
    let (counter, latch) = (Arc::clone(&count), Arc::clone(&started));
    let handle = RepeatingTaskHandle::start(&runner, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        latch.count_down();
        1_000
    });
    assert!(started.wait_for(Duration::from_secs(5)));

    drop(runner);
    let at_shutdown = count.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(count.load(Ordering::SeqCst), at_shutdown);
    // The flag is still alive; only the runner is gone.
    assert!(handle.running());
}

#[test]
fn closure_can_stop_its_own_handle() {
    let runner = runner("repeat-self-stop");
    let handle = Arc::new(Mutex::new(RepeatingTaskHandle::default()));
    let count = Arc::new(AtomicUsize::new(0));
    let (own_handle, counter) = (Arc::clone(&handle), Arc::clone(&count));

    // Holding the lock across start keeps the first run from seeing the
    // default handle.
    let mut guard = handle.lock();
    *guard = RepeatingTaskHandle::start(&runner, move || {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
            own_handle.lock().stop();
        }
        1_000
    });
    drop(guard);

    while handle.lock().running() {
        thread::sleep(Duration::from_millis(1));
    }
    runner.post_fn_and_wait(|| {});
    thread::sleep(Duration::from_millis(10));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}
