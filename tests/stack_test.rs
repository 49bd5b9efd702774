#![cfg(not(loom))]
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use hazard_stack::{HazardSlotTable, LockFreeStack, StackError};
use rand::Rng;

#[test]
fn concurrent_push_then_pop() {
    let stack = Arc::new(LockFreeStack::with_hazard_capacity(8));

    let pushers = [2011, 2014, 2017]
        .iter()
        .map(|&year| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.push(year))
        })
        .collect::<Vec<_>>();
    for pusher in pushers {
        pusher.join().unwrap();
    }

    let poppers = (0..3)
        .map(|_| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || stack.pop())
        })
        .collect::<Vec<_>>();
    let popped = poppers
        .into_iter()
        .map(|popper| popper.join().unwrap().unwrap())
        .collect::<HashSet<_>>();

    let expected = [2011, 2014, 2017].iter().copied().collect::<HashSet<_>>();
    assert_eq!(popped, expected);
    assert_eq!(stack.pop(), Err(StackError::EmptyStack));
}

#[test]
fn no_duplication_no_loss() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 2_000;
    const CONSUMERS: usize = 6;

    let stack = Arc::new(LockFreeStack::with_hazard_capacity(CONSUMERS));
    let producers = (0..PRODUCERS)
        .map(|p| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    stack.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect::<Vec<_>>();
    for producer in producers {
        producer.join().unwrap();
    }

    let consumers = (0..CONSUMERS)
        .map(|_| {
            let stack = Arc::clone(&stack);
            thread::spawn(move || {
                let mut popped = Vec::new();
                while let Ok(value) = stack.pop() {
                    popped.push(value);
                }
                popped
            })
        })
        .collect::<Vec<_>>();

    let mut all = consumers
        .into_iter()
        .flat_map(|consumer| consumer.join().unwrap())
        .collect::<Vec<_>>();
    all.sort_unstable();
    assert_eq!(all, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
    assert!(stack.is_empty());
}

#[test]
fn producers_and_consumers_under_load() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 10_000;
    const CONSUMERS: usize = 4;

    let stack = Arc::new(LockFreeStack::with_hazard_capacity(CONSUMERS));
    let producers_done = Arc::new(AtomicUsize::new(0));

    let producers = (0..PRODUCERS)
        .map(|p| {
            let stack = Arc::clone(&stack);
            let producers_done = Arc::clone(&producers_done);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..PER_PRODUCER {
                    stack.push(p * PER_PRODUCER + i);
                    if rng.gen_ratio(1, 1_000) {
                        thread::yield_now();
                    }
                }
                producers_done.fetch_add(1, Ordering::Release);
            })
        })
        .collect::<Vec<_>>();

    let consumers = (0..CONSUMERS)
        .map(|_| {
            let stack = Arc::clone(&stack);
            let producers_done = Arc::clone(&producers_done);
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    match stack.pop() {
                        Ok(value) => seen.push(value),
                        Err(StackError::EmptyStack) => {
                            if producers_done.load(Ordering::Acquire) == PRODUCERS
                                && stack.is_empty()
                            {
                                break;
                            }
                            thread::yield_now();
                        }
                        Err(e) => panic!("unexpected pop failure: {}", e),
                    }
                }
                seen
            })
        })
        .collect::<Vec<_>>();

    for producer in producers {
        producer.join().unwrap();
    }

    let mut returned = HashSet::with_capacity(PRODUCERS * PER_PRODUCER);
    for consumer in consumers {
        for value in consumer.join().unwrap() {
            assert!(value < PRODUCERS * PER_PRODUCER, "never pushed: {}", value);
            assert!(returned.insert(value), "returned twice: {}", value);
        }
    }
    assert_eq!(returned.len(), PRODUCERS * PER_PRODUCER);

    stack.reclaim();
    assert_eq!(stack.retired_len(), 0);
}

#[test]
fn third_popper_is_refused() {
    let stack = Arc::new(LockFreeStack::<u32>::with_hazard_capacity(2));
    let claimed = Arc::new(Barrier::new(3));
    let finish = Arc::new(Barrier::new(3));

    let holders = (0..2)
        .map(|_| {
            let stack = Arc::clone(&stack);
            let claimed = Arc::clone(&claimed);
            let finish = Arc::clone(&finish);
            thread::spawn(move || {
                // The first pop claims the slot even though nothing is there.
                assert_eq!(stack.pop(), Err(StackError::EmptyStack));
                claimed.wait();
                finish.wait();
            })
        })
        .collect::<Vec<_>>();

    claimed.wait();
    let excess = {
        let stack = Arc::clone(&stack);
        thread::spawn(move || stack.pop()).join().unwrap()
    };
    assert_eq!(excess, Err(StackError::ResourceExhausted { capacity: 2 }));
    finish.wait();

    for holder in holders {
        holder.join().unwrap();
    }
    // Slots went back to the table when the holders exited.
    assert_eq!(stack.table().active_count(), 0);
    stack.push(1);
    assert_eq!(stack.pop(), Ok(1));
}

#[test]
fn stacks_share_a_table() {
    let table = Arc::new(HazardSlotTable::with_capacity(3));
    let ints = Arc::new(LockFreeStack::with_table(Arc::clone(&table)));
    let words = Arc::new(LockFreeStack::with_table(Arc::clone(&table)));

    let workers = (0..3)
        .map(|t| {
            let ints = Arc::clone(&ints);
            let words = Arc::clone(&words);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for i in 0..1_000 {
                    ints.push(t * 1_000 + i);
                    words.push(format!("{}-{}", t, i));
                    if rng.gen() {
                        let _ = ints.pop();
                    } else {
                        let _ = words.pop();
                    }
                    if rng.gen_ratio(1, 200) {
                        thread::sleep(Duration::from_micros(50));
                    }
                }
            })
        })
        .collect::<Vec<_>>();
    for worker in workers {
        worker.join().unwrap();
    }

    // The workers' slots went back to the table when they exited.
    assert_eq!(table.active_count(), 0);
    let mut remaining = 0;
    while ints.pop().is_ok() {
        remaining += 1;
    }
    while words.pop().is_ok() {
        remaining += 1;
    }
    assert_eq!(remaining, 3 * 1_000);
}
