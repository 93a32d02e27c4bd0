//! End-to-end scheduling scenarios: the lab timelines the kernel exists
//! to reproduce, driven tick by tick from the outside. The harness plays
//! the role of the task bodies — it performs each task's fixed sequence
//! of "work N ticks, then call a primitive" on that task's behalf
//! whenever it is the running task.

use tickos::{
    ClearPolicy, Completion, EventSet, Kernel, KernelError, ObjectName, Priority, TaskState,
    Timeout, WaitMode, WaitResult,
};

fn name(s: &[u8; 4]) -> ObjectName {
    ObjectName::new(*s)
}

fn ticks(k: &mut Kernel, n: u64) {
    for _ in 0..n {
        k.advance_clock();
    }
}

/// The Running task must always be at least as urgent as every Ready task.
fn assert_running_outranks_ready(k: &Kernel, tasks: &[tickos::TaskId]) {
    let Some(running) = k.running_task() else {
        return;
    };
    let run_prio = k.effective_priority(running);
    for &t in tasks {
        if k.task_state(t) == TaskState::Ready {
            assert!(
                !k.effective_priority(t).is_more_urgent_than(run_prio),
                "ready task outranks the running task"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Priority inheritance
// ---------------------------------------------------------------------------

/// L obtains the mutex at tick 0; M blocks on it at tick 4; H blocks on it
/// at tick 6. L must run at H's priority from tick 6, finish its critical
/// section before M or H make progress, and hand the mutex to H before M.
#[test]
fn priority_inheritance_bounds_inversion() {
    let mut k = Kernel::new();
    let sem = k.create_mutex(name(b"sem1")).unwrap();
    let l = k.create_task(name(b"LOW "), Priority::new(30)).unwrap();
    let m = k.create_task(name(b"MED "), Priority::new(20)).unwrap();
    let h = k.create_task(name(b"HIGH"), Priority::new(10)).unwrap();
    let all = [l, m, h];

    k.start_task(h).unwrap();
    k.wake_after(6).unwrap();
    k.start_task(m).unwrap();
    k.wake_after(4).unwrap();
    k.start_task(l).unwrap();
    assert_eq!(k.running_task(), Some(l));

    // Tick 0: L enters its critical section.
    assert_eq!(k.obtain(sem, Timeout::Forever), Ok(Completion::Ready(())));

    ticks(&mut k, 4);
    // Tick 4: M preempts L and blocks on the mutex; L inherits 20.
    assert_eq!(k.running_task(), Some(m));
    assert!(k.obtain(sem, Timeout::Forever).unwrap().is_pending());
    assert_eq!(k.running_task(), Some(l));
    assert_eq!(k.effective_priority(l), Priority::new(20));
    assert_running_outranks_ready(&k, &all);

    ticks(&mut k, 2);
    // Tick 6: H preempts L and blocks; L inherits 10 and keeps the CPU.
    assert_eq!(k.running_task(), Some(h));
    assert!(k.obtain(sem, Timeout::Forever).unwrap().is_pending());
    assert_eq!(k.running_task(), Some(l));
    assert_eq!(k.effective_priority(l), Priority::new(10));
    assert_running_outranks_ready(&k, &all);

    // L finishes the critical section before M or H run any further.
    k.release(sem).unwrap();
    assert_eq!(k.effective_priority(l), Priority::new(30));
    // H acquires before M, despite M having waited longer.
    assert_eq!(k.mutex_holder(sem), Some(h));
    assert_eq!(k.running_task(), Some(h));
    assert_eq!(k.take_wait_result(h), Some(WaitResult::MutexAcquired));
    assert_eq!(k.task_state(m), TaskState::Blocked);
    assert_running_outranks_ready(&k, &all);

    k.release(sem).unwrap();
    assert_eq!(k.mutex_holder(sem), Some(m));
    // H still outranks M and keeps running until it terminates.
    assert_eq!(k.running_task(), Some(h));
    k.delete_self().unwrap();
    assert_eq!(k.running_task(), Some(m));
    assert_eq!(k.take_wait_result(m), Some(WaitResult::MutexAcquired));
}

/// Replay of the priority-inheritance lab: T3 (prio 20) grabs the
/// semaphore at tick 6 for a 10-tick critical section; T1 (prio 10) wakes
/// at 8, works 4 ticks and blocks on it at 12; T2 (prio 15) wakes at 15
/// but must not run while T3 is boosted to 10.
#[test]
fn priority_inheritance_lab_timeline() {
    let mut k = Kernel::new();
    let sem = k.create_mutex(name(b"sem1")).unwrap();
    let t1 = k.create_task(name(b"TMSV"), Priority::new(10)).unwrap();
    let t2 = k.create_task(name(b"Hskp"), Priority::new(15)).unwrap();
    let t3 = k.create_task(name(b"ACST"), Priority::new(20)).unwrap();

    k.start_task(t1).unwrap();
    k.wake_after(8).unwrap();
    k.start_task(t2).unwrap();
    k.wake_after(15).unwrap();
    k.start_task(t3).unwrap();

    // T3 works ticks 0..6, then enters its critical section.
    assert_eq!(k.running_task(), Some(t3));
    ticks(&mut k, 6);
    assert_eq!(k.running_task(), Some(t3));
    assert_eq!(k.obtain(sem, Timeout::Forever), Ok(Completion::Ready(())));

    // Tick 8: T1 wakes and preempts T3 inside the critical section.
    ticks(&mut k, 2);
    assert_eq!(k.running_task(), Some(t1));

    // T1 works ticks 8..12 and then blocks on the semaphore.
    ticks(&mut k, 4);
    assert!(k.obtain(sem, Timeout::Forever).unwrap().is_pending());
    assert_eq!(k.effective_priority(t3), Priority::new(10));
    assert_eq!(k.running_task(), Some(t3));

    // Tick 15: T2 wakes, but the boosted T3 keeps the CPU — the whole
    // point of inheritance.
    ticks(&mut k, 3);
    assert_eq!(k.task_state(t2), TaskState::Ready);
    assert_eq!(k.running_task(), Some(t3));

    // T3 finishes the remaining critical-section work and releases.
    // It had done ticks 6..8 plus 12..18 of its 10-tick section.
    ticks(&mut k, 2);
    assert_eq!(k.running_task(), Some(t3));
    k.release(sem).unwrap();

    // T1 takes the semaphore and the CPU; T3 drops back to 20, so T2
    // finally outranks it.
    assert_eq!(k.mutex_holder(sem), Some(t1));
    assert_eq!(k.running_task(), Some(t1));
    assert_eq!(k.effective_priority(t3), Priority::new(20));
    assert_eq!(k.take_wait_result(t1), Some(WaitResult::MutexAcquired));

    // T1's critical section runs 3 ticks, then it releases and finishes.
    ticks(&mut k, 3);
    k.release(sem).unwrap();
    ticks(&mut k, 2);
    assert_eq!(k.running_task(), Some(t1));
    k.delete_self().unwrap();

    // T2 (15) now outranks T3 (20): housekeeping runs its 7 ticks.
    assert_eq!(k.running_task(), Some(t2));
    ticks(&mut k, 7);
    k.delete_self().unwrap();
    assert_eq!(k.running_task(), Some(t3));
}

// ---------------------------------------------------------------------------
// Message queues
// ---------------------------------------------------------------------------

/// Capacity-1 queue: "X" then "Y" sent back to back with no receiver
/// ready. The second send blocks until the first message is received,
/// and the receiver sees "X" before "Y".
#[test]
fn capacity_one_queue_serializes_senders() {
    let mut k = Kernel::new();
    let q = k.create_queue(name(b"ABCD"), 1, 8).unwrap();
    let a = k.create_task(name(b"SEND"), Priority::new(10)).unwrap();
    let rx = k.create_task(name(b"RECV"), Priority::new(20)).unwrap();

    k.start_task(a).unwrap();
    k.start_task(rx).unwrap();

    assert_eq!(
        k.queue_send(q, b"X", Timeout::Forever),
        Ok(Completion::Ready(()))
    );
    assert!(k.queue_send(q, b"Y", Timeout::Forever).unwrap().is_pending());
    assert_eq!(k.task_state(a), TaskState::Blocked);

    assert_eq!(k.running_task(), Some(rx));
    let first = k
        .queue_receive(q, Timeout::Forever)
        .unwrap()
        .expect_ready("X is buffered");
    assert_eq!(first.as_slice(), b"X");

    // Receiving freed the slot: the blocked send completed and, being
    // more urgent, the sender preempted the receiver.
    assert_eq!(k.running_task(), Some(a));
    assert_eq!(k.take_wait_result(a), Some(WaitResult::Sent));
    k.wake_after(100).unwrap();

    let second = k
        .queue_receive(q, Timeout::Forever)
        .unwrap()
        .expect_ready("Y was promoted");
    assert_eq!(second.as_slice(), b"Y");
}

/// Replay of the telemetry lab: a server and two producers, all priority
/// 10. Housekeeping sends at tick 2 (delivered directly to the blocked
/// server); ACS sends at tick 42 (buffered, the server is Ready but has
/// not run). The server drains them in send order.
#[test]
fn telemetry_lab_timeline() {
    let mut k = Kernel::new();
    let q = k.create_queue(name(b"ABCD"), 128, 64).unwrap();
    let server = k.create_task(name(b"TSK1"), Priority::new(10)).unwrap();
    let hk = k.create_task(name(b"TSK2"), Priority::new(10)).unwrap();
    let acs = k.create_task(name(b"TSK3"), Priority::new(10)).unwrap();

    k.start_task(server).unwrap();
    k.start_task(hk).unwrap();
    k.start_task(acs).unwrap();

    // Server runs first (arrival order) and blocks waiting for telemetry.
    assert_eq!(k.running_task(), Some(server));
    assert!(k.queue_receive(q, Timeout::Forever).unwrap().is_pending());

    // Housekeeping: 2 ticks of work, send, sleep 10.
    assert_eq!(k.running_task(), Some(hk));
    ticks(&mut k, 2);
    assert_eq!(
        k.queue_send(q, b"SYSTEM OK", Timeout::Forever),
        Ok(Completion::Ready(()))
    );
    // Direct delivery made the server Ready, but at equal priority the
    // sender keeps the CPU until it blocks.
    assert_eq!(k.running_task(), Some(hk));
    k.wake_after(10).unwrap();

    // ACS arrived in the ready queue before the server was re-readied,
    // so it runs next: 40 ticks of work, then its own telemetry.
    assert_eq!(k.running_task(), Some(acs));
    ticks(&mut k, 40);
    assert_eq!(k.running_task(), Some(acs));
    assert_eq!(
        k.queue_send(q, b"ACS OK", Timeout::Forever),
        Ok(Completion::Ready(()))
    );
    assert_eq!(k.queued_messages(q), 1);
    k.wake_after(100).unwrap();

    // Tick 42: the server finally runs and drains in send order.
    assert_eq!(k.current_tick(), 42);
    assert_eq!(k.running_task(), Some(server));
    let Some(WaitResult::Message(first)) = k.take_wait_result(server) else {
        panic!("server should hold the direct delivery");
    };
    assert_eq!(first.as_slice(), b"SYSTEM OK");
    let second = k
        .queue_receive(q, Timeout::Forever)
        .unwrap()
        .expect_ready("ACS telemetry is buffered");
    assert_eq!(second.as_slice(), b"ACS OK");
}

// ---------------------------------------------------------------------------
// Event flags
// ---------------------------------------------------------------------------

/// A task blocked on receive(mask=0b11, ANY) is woken by a signal of 0b01
/// and observes bit 0 set, bit 1 clear.
#[test]
fn any_mode_rendezvous_delivers_the_asserted_subset() {
    let mut k = Kernel::new();
    let g = k
        .create_event_group(name(b"EVTG"), ClearPolicy::NoClear)
        .unwrap();
    let waiter = k.create_task(name(b"WAIT"), Priority::new(10)).unwrap();
    let signaler = k.create_task(name(b"SIGN"), Priority::new(20)).unwrap();

    k.start_task(waiter).unwrap();
    k.start_task(signaler).unwrap();

    let mask = EventSet::EVENT_0 | EventSet::EVENT_1;
    assert!(k
        .event_receive(g, mask, WaitMode::Any, Timeout::Forever)
        .unwrap()
        .is_pending());

    assert_eq!(k.running_task(), Some(signaler));
    k.event_send(g, EventSet::EVENT_0);

    assert_eq!(k.running_task(), Some(waiter));
    let Some(WaitResult::Events(got)) = k.take_wait_result(waiter) else {
        panic!("waiter should have been satisfied");
    };
    assert!(got.contains(EventSet::EVENT_0));
    assert!(!got.contains(EventSet::EVENT_1));
}

/// Replay of the event-logging lab: the server observes housekeeping's
/// start event first, then — after ACS hogs the CPU for its whole burst —
/// a single accumulated batch. No signal is lost between server runs.
#[test]
fn event_logging_lab_timeline() {
    const EVENT_ACS_START: EventSet = EventSet::EVENT_0;
    const EVENT_ACS_END: EventSet = EventSet::EVENT_1;
    const EVENT_HK_START: EventSet = EventSet::EVENT_2;
    const EVENT_HK_END: EventSet = EventSet::EVENT_3;
    let all_events = EVENT_ACS_START
        .union(EVENT_ACS_END)
        .union(EVENT_HK_START)
        .union(EVENT_HK_END);

    let mut k = Kernel::new();
    let g = k
        .create_event_group(name(b"EVTG"), ClearPolicy::NoClear)
        .unwrap();
    let server = k.create_task(name(b"TSK1"), Priority::new(10)).unwrap();
    let hk = k.create_task(name(b"TSK2"), Priority::new(10)).unwrap();
    let acs = k.create_task(name(b"TSK3"), Priority::new(10)).unwrap();

    k.start_task(server).unwrap();
    k.start_task(hk).unwrap();
    k.start_task(acs).unwrap();

    // Server blocks on the union of everything it logs.
    assert!(k
        .event_receive(g, all_events, WaitMode::Any, Timeout::Forever)
        .unwrap()
        .is_pending());

    // Housekeeping: HK_START, 2 ticks of work, HK_END, sleep 10.
    assert_eq!(k.running_task(), Some(hk));
    k.event_send(g, EVENT_HK_START);
    ticks(&mut k, 2);
    k.event_send(g, EVENT_HK_END);
    k.wake_after(10).unwrap();

    // ACS runs its whole 40-tick burst before the server gets the CPU.
    assert_eq!(k.running_task(), Some(acs));
    k.event_send(g, EVENT_ACS_START);
    ticks(&mut k, 40);
    k.event_send(g, EVENT_ACS_END);
    k.wake_after(100).unwrap();

    // The server's first batch is exactly what the wake delivered.
    assert_eq!(k.running_task(), Some(server));
    assert_eq!(
        k.take_wait_result(server),
        Some(WaitResult::Events(EVENT_HK_START))
    );
    k.event_clear(g, EVENT_HK_START);

    // Everything signaled while the server sat Ready is still asserted:
    // the next receive completes immediately with the accumulated batch.
    let batch = k
        .event_receive(g, all_events, WaitMode::Any, Timeout::Forever)
        .unwrap()
        .expect_ready("accumulated events are asserted");
    assert_eq!(batch, EVENT_HK_END | EVENT_ACS_START | EVENT_ACS_END);
    k.event_clear(g, batch);

    // Batch handled: the server parks again and housekeeping (woken at
    // tick 12, still Ready) gets its next activation.
    assert!(k
        .event_receive(g, all_events, WaitMode::Any, Timeout::Forever)
        .unwrap()
        .is_pending());
    assert_eq!(k.running_task(), Some(hk));
}

// ---------------------------------------------------------------------------
// Cross-primitive ordering
// ---------------------------------------------------------------------------

/// Queue FIFO is independent of sender priority: messages drain in send
/// order even when a low-priority task sent first.
#[test]
fn message_order_ignores_sender_priority() {
    let mut k = Kernel::new();
    let q = k.create_queue(name(b"ABCD"), 8, 8).unwrap();
    let lo = k.create_task(name(b"LOW "), Priority::new(30)).unwrap();
    let hi = k.create_task(name(b"HIGH"), Priority::new(10)).unwrap();
    let rx = k.create_task(name(b"RECV"), Priority::new(20)).unwrap();

    k.start_task(lo).unwrap();
    let _ = k.queue_send(q, b"lo-1", Timeout::Forever).unwrap();
    k.start_task(hi).unwrap();
    let _ = k.queue_send(q, b"hi-1", Timeout::Forever).unwrap();
    let _ = k.queue_send(q, b"hi-2", Timeout::Forever).unwrap();
    k.wake_after(100).unwrap();

    k.start_task(rx).unwrap();
    for expected in [b"lo-1", b"hi-1", b"hi-2"] {
        let got = k
            .queue_receive(q, Timeout::Forever)
            .unwrap()
            .expect_ready("buffered");
        assert_eq!(got.as_slice(), expected.as_slice());
    }
    assert_eq!(
        k.queue_receive(q, Timeout::NoWait),
        Err(KernelError::Timeout)
    );
}
