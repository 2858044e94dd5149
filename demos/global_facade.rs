use buflog::{LogLevel, logger_config};

fn main() {
    let path = "/tmp/buflog_demo_facade.log";
    let guard = logger_config()
        .with_min_level(LogLevel::Info)
        .open(path)
        .init_global()
        .unwrap();
    log::info!("Hello through the log facade!");
    log::debug!("this one is below the minimum level");
    log::error!("and an error for good measure");
    drop(guard);

    print!("{}", std::fs::read_to_string(path).unwrap());
}
