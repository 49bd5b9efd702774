use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hazard_stack::LockFreeStack;
use lazy_static::lazy_static;

use rand::Rng;

lazy_static! {
    static ref STACK: LockFreeStack<u64> = LockFreeStack::new();
}

fn worker(id: u64) -> (u64, u64) {
    let mut rng = rand::thread_rng();
    let mut pushed = 0;
    let mut popped = 0;

    if rng.gen() {
        thread::sleep(Duration::from_millis(1));
    }
    let timeout = Duration::from_millis(rng.gen_range(0..10));
    let now = Instant::now();

    while now.elapsed() < timeout {
        for _ in 0..100 {
            if rng.gen() {
                STACK.push(id);
                pushed += 1;
            } else if STACK.pop().is_ok() {
                popped += 1;
            }
        }
    }

    (pushed, popped)
}

fn main() {
    let stack = Arc::new(LockFreeStack::new());
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
    let years = poppers
        .into_iter()
        .filter_map(|popper| popper.join().unwrap().ok())
        .collect::<HashSet<u32>>();
    for year in &years {
        println!("{}", year);
    }

    for _ in 0..100 {
        let threads = (0..16)
            .map(|id| thread::spawn(move || worker(id)))
            .collect::<Vec<_>>();

        let (mut pushed, mut popped) = (0, 0);
        for t in threads {
            let (p, q) = t.join().unwrap();
            pushed += p;
            popped += q;
        }
        while STACK.pop().is_ok() {
            popped += 1;
        }
        assert_eq!(pushed, popped);
    }
    println!("retired nodes left: {}", STACK.retired_len());
}
