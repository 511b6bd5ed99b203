//! Thin binary entry point. All behavior lives in the `steamroll_cli`
//! library crate; this file only wires `main` to it.

use std::ffi::OsString;
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    run_with(std::env::args_os())
}

fn run_with<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    steamroll_cli::run_cli(args)
}

#[cfg(test)]
mod tests {
    use super::run_with;
    use std::process::ExitCode;

    #[test]
    fn version_flag_reports_success() {
        let exit = run_with(["steamroll-transfer", "--version"]);
        assert_eq!(exit, ExitCode::SUCCESS);
    }

    #[test]
    fn help_flag_reports_success() {
        let exit = run_with(["steamroll-transfer", "--help"]);
        assert_eq!(exit, ExitCode::SUCCESS);
    }
}
