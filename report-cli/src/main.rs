use solar_daily_report::app::cli::{parse_report_args, report_help};

fn main() {
    let args = match parse_report_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(error) => {
            eprintln!("{error}");
            eprint!("{}", report_help());
            std::process::exit(2);
        }
    };
    if args.help {
        print!("{}", report_help());
        return;
    }

    let summary = match solar_daily_report::app::run_report(args.force_send) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("daily report run failed: {err}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to render run summary: {err}"),
    }

    std::process::exit(if summary.ok { 0 } else { 1 });
}
