use std::process::ExitCode;

fn main() -> ExitCode {
    observatory_watch::app::startup::startup()
}
