#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportArgs {
    pub force_send: bool,
    pub help: bool,
}

/// `--force-send`, or `--forceSend=<1|true|0|false>`.
pub fn parse_report_args<I>(args: I) -> Result<ReportArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = ReportArgs::default();

    for arg in args {
        match arg.as_str() {
            "--force-send" | "--forceSend" => parsed.force_send = true,
            "--help" | "-h" => parsed.help = true,
            other => {
                let Some((flag, value)) = other.split_once('=') else {
                    return Err(format!("unknown argument: {other}"));
                };
                if flag != "--force-send" && flag != "--forceSend" {
                    return Err(format!("unknown argument: {other}"));
                }
                parsed.force_send = match value.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" => true,
                    "0" | "false" | "" => false,
                    _ => return Err(format!("{flag} expects 1, true, 0 or false")),
                };
            }
        }
    }

    Ok(parsed)
}

pub fn report_help() -> &'static str {
    "Usage: solar_report_cli [--force-send]\n\n\
     Runs the daily report once and prints the run summary as JSON.\n\n\
     Options:\n  \
     --force-send           Send even during quiet hours (opt-outs are still honored)\n  \
     --forceSend=<1|true>   Same as --force-send\n  \
     -h, --help             Show this help\n"
}
