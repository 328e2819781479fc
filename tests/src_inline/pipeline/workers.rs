use super::*;

#[test]
fn test_split_chunks_cover_range() {
    assert_eq!(split_chunks(10, 3), vec![0..4, 4..7, 7..10]);
    assert_eq!(split_chunks(2, 4), vec![0..1, 1..2]);
    assert_eq!(split_chunks(5, 1), vec![0..5]);
    assert!(split_chunks(0, 3).is_empty());
    assert_eq!(split_chunks(3, 0), vec![0..3]);
}

#[test]
fn test_serial_mapper_in_order() {
    let out = SerialMapper::new(None).map(4, |i, _| Some(i * 10));
    assert_eq!(
        out,
        vec![
            SampleOutcome::Done(0),
            SampleOutcome::Done(10),
            SampleOutcome::Done(20),
            SampleOutcome::Done(30)
        ]
    );
}

#[test]
fn test_thread_pool_mapper_matches_serial() {
    let task = |i: usize, _: &Deadline| Some((i as f64).sqrt() * 3.0);
    let serial = SerialMapper::new(None).map(37, task);
    let pool = ThreadPoolMapper::new(4, None).unwrap();
    assert_eq!(pool.worker_count(), 4);
    let parallel = pool.map(37, task);
    assert_eq!(serial, parallel);
}

#[test]
fn test_panic_fails_only_that_sample() {
    let pool = ThreadPoolMapper::new(2, None).unwrap();
    let out = pool.map(6, |i, _| {
        if i == 2 {
            panic!("bad sample {i}");
        }
        Some(i)
    });
    assert_eq!(out.len(), 6);
    for (i, outcome) in out.iter().enumerate() {
        if i == 2 {
            assert_eq!(
                *outcome,
                SampleOutcome::Failed(WorkerFailure::Panicked("bad sample 2".to_string()))
            );
        } else {
            assert_eq!(*outcome, SampleOutcome::Done(i));
        }
    }
}

#[test]
fn test_serial_panic_isolated() {
    let out = SerialMapper::new(None).map(3, |i, _| {
        if i == 0 {
            panic!("static message");
        }
        Some(i)
    });
    assert_eq!(
        out[0],
        SampleOutcome::Failed(WorkerFailure::Panicked("static message".to_string()))
    );
    assert_eq!(out[1], SampleOutcome::Done(1));
}

#[test]
fn test_expired_deadline_times_out_samples() {
    let serial = SerialMapper::new(Some(Duration::ZERO)).map(3, |i, _| Some(i));
    assert!(
        serial
            .iter()
            .all(|o| *o == SampleOutcome::Failed(WorkerFailure::TimedOut))
    );
    let pool = ThreadPoolMapper::new(2, Some(Duration::ZERO)).unwrap();
    let parallel = pool.map(5, |i, _| Some(i));
    assert_eq!(parallel.len(), 5);
    assert!(
        parallel
            .iter()
            .all(|o| *o == SampleOutcome::Failed(WorkerFailure::TimedOut))
    );
}

#[test]
fn test_generous_deadline_completes() {
    let out = SerialMapper::new(Some(Duration::from_secs(60))).map(3, |i, _| Some(i + 1));
    assert_eq!(out[2], SampleOutcome::Done(3));
}

#[test]
fn test_running_sample_past_deadline_times_out() {
    let pool = ThreadPoolMapper::new(2, Some(Duration::from_millis(50))).unwrap();
    let started = Instant::now();
    let out = pool.map(4, |i, _| {
        std::thread::sleep(Duration::from_millis(200));
        Some(i)
    });
    // One sample per worker ran over; the rest never started.
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert!(
        out.iter()
            .all(|o| *o == SampleOutcome::Failed(WorkerFailure::TimedOut))
    );
}

#[test]
fn test_task_polling_deadline_stops_early() {
    let started = Instant::now();
    let out = SerialMapper::new(Some(Duration::from_millis(30))).map(2, |i, deadline| {
        while !deadline.expired() {
            std::thread::sleep(Duration::from_millis(5));
            if started.elapsed() > Duration::from_secs(10) {
                return Some(i);
            }
        }
        None
    });
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(out, vec![SampleOutcome::Failed(WorkerFailure::TimedOut); 2]);
}

#[test]
fn test_deadline_without_timeout_never_expires() {
    assert!(!Deadline::none().expired());
    assert!(!Deadline::after(None).expired());
    assert!(Deadline::after(Some(Duration::ZERO)).expired());
}
