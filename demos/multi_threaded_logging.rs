use std::sync::Arc;

use buflog::logger_config;

fn main() {
    let path = "/tmp/buflog_demo_threads.log";
    let logger = Arc::new(logger_config().open(path));
    logger.info("Hello, world from the main thread!");
    let handles: Vec<_> = (0..5)
        .map(|i| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                for n in 0..10 {
                    logger.warning(&format!("thread {i} says hello ({n})"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    drop(logger); // joins the writer thread, flushing everything

    let content = std::fs::read_to_string(path).unwrap();
    println!("wrote {} lines to {path}", content.lines().count());
    println!("last line:\n\t{}", content.lines().last().unwrap());
}
