use std::process::ExitCode;

fn main() -> ExitCode {
    leadscout_cli::run()
}
