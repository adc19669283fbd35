fn main() {
    if let Err(err) = solar_daily_report::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
