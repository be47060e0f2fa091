use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use pretty_assertions::assert_eq;
use rerun_core::{
    EnqueueOutcome, RequestKind, RerunPayload, ScriptRequest, ScriptRequestQueue, WidgetStates,
    WidgetValue,
};

const PRODUCERS: usize = 8;
const REQUESTS_PER_PRODUCER: usize = 200;

type StatesFn = fn(usize, usize) -> Option<WidgetStates>;

fn own_counter(producer: usize, i: usize) -> WidgetStates {
    WidgetStates::new().with(format!("p{producer}"), WidgetValue::Int(i as i64))
}

fn mixed_states(producer: usize, i: usize) -> Option<WidgetStates> {
    (i % 3 != 0).then(|| own_counter(producer, i))
}

fn concrete_states(producer: usize, i: usize) -> Option<WidgetStates> {
    Some(own_counter(producer, i))
}

/// Starts the producers behind `barrier`, which must have room for them.
fn spawn_producers(
    queue: &Arc<ScriptRequestQueue>,
    barrier: &Arc<Barrier>,
    states: StatesFn,
    with_stops: bool,
) -> Vec<thread::JoinHandle<Vec<EnqueueOutcome>>> {
    (0..PRODUCERS)
        .map(|producer| {
            let queue = Arc::clone(queue);
            let barrier = Arc::clone(barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut outcomes = Vec::with_capacity(REQUESTS_PER_PRODUCER);
                for i in 0..REQUESTS_PER_PRODUCER {
                    outcomes.push(queue.enqueue(ScriptRequest::Rerun(RerunPayload::new(
                        format!("q={producer}-{i}"),
                        states(producer, i),
                    ))));
                    if with_stops && i % 50 == 0 {
                        queue.enqueue(ScriptRequest::Stop);
                    }
                }
                outcomes
            })
        })
        .collect()
}

fn join_all(producers: Vec<thread::JoinHandle<Vec<EnqueueOutcome>>>) -> Vec<EnqueueOutcome> {
    producers
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect()
}

fn count_reruns(kinds: &[RequestKind]) -> usize {
    kinds.iter().filter(|k| **k == RequestKind::Rerun).count()
}

#[test]
fn concurrent_producers_leave_at_most_one_rerun() {
    let queue = Arc::new(ScriptRequestQueue::new());
    let barrier = Arc::new(Barrier::new(PRODUCERS));
    join_all(spawn_producers(&queue, &barrier, mixed_states, true));

    let drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
    let reruns = drained.iter().filter(|r| r.is_rerun()).count();
    let stops = drained
        .iter()
        .filter(|r| matches!(r, ScriptRequest::Stop))
        .count();

    assert_eq!(reruns, 1);
    assert_eq!(stops, PRODUCERS * REQUESTS_PER_PRODUCER / 50);
}

#[test]
fn shutdown_enqueued_during_contention_is_dequeued_first() {
    let queue = Arc::new(ScriptRequestQueue::new());
    let barrier = Arc::new(Barrier::new(PRODUCERS + 1));
    let producers = spawn_producers(&queue, &barrier, mixed_states, true);

    barrier.wait();
    assert_eq!(
        queue.enqueue(ScriptRequest::Shutdown),
        EnqueueOutcome::Preempted
    );
    assert_eq!(queue.dequeue(), Some(ScriptRequest::Shutdown));

    join_all(producers);
    let kinds = queue.pending_kinds();
    assert!(!kinds.contains(&RequestKind::Shutdown));
    assert_eq!(count_reruns(&kinds), 1);
}

#[test]
fn queue_never_holds_two_reruns_while_producers_and_consumer_run() {
    let queue = Arc::new(ScriptRequestQueue::new());
    let barrier = Arc::new(Barrier::new(PRODUCERS));
    let done = Arc::new(AtomicBool::new(false));
    let producers = spawn_producers(&queue, &barrier, mixed_states, true);

    let consumer = {
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                queue.dequeue();
            }
        })
    };
    let monitor = {
        let queue = Arc::clone(&queue);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut worst = 0;
            while !done.load(Ordering::Acquire) {
                worst = worst.max(count_reruns(&queue.pending_kinds()));
            }
            worst
        })
    };

    join_all(producers);
    done.store(true, Ordering::Release);
    consumer.join().unwrap();
    let worst = monitor.join().unwrap();

    assert!(worst <= 1, "saw {worst} pending reruns at once");
    assert!(count_reruns(&queue.pending_kinds()) <= 1);
}

#[test]
fn coalesced_rerun_keeps_each_producers_latest_value_and_newest_query() {
    let queue = Arc::new(ScriptRequestQueue::new());
    let barrier = Arc::new(Barrier::new(PRODUCERS));
    let outcomes = join_all(spawn_producers(&queue, &barrier, concrete_states, false));

    let appended = outcomes
        .iter()
        .filter(|o| **o == EnqueueOutcome::Appended)
        .count();
    let merged = outcomes
        .iter()
        .filter(|o| **o == EnqueueOutcome::Merged)
        .count();
    assert_eq!(appended, 1);
    assert_eq!(merged, PRODUCERS * REQUESTS_PER_PRODUCER - 1);

    let Some(ScriptRequest::Rerun(payload)) = queue.dequeue() else {
        panic!("expected the coalesced rerun");
    };
    assert!(queue.is_empty());

    let last = REQUESTS_PER_PRODUCER - 1;
    let expected: WidgetStates = (0..PRODUCERS)
        .map(|producer| (format!("p{producer}"), WidgetValue::Int(last as i64)))
        .collect();
    assert_eq!(payload.widget_states, Some(expected));

    let newest: Vec<String> = (0..PRODUCERS).map(|p| format!("q={p}-{last}")).collect();
    assert!(
        newest.contains(&payload.query_string),
        "query {:?} is not any producer's final request",
        payload.query_string
    );
}
