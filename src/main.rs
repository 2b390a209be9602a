use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

/// Report the files that received the most written bytes during a short window.
#[derive(Parser)]
#[command(name = "writetop", version)]
struct Cli {
    /// Observation duration in seconds.
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    seconds: u64,

    /// Number of files to report.
    #[arg(short, long, default_value_t = 3)]
    num: usize,

    /// Path to the procfs mount used for per-process write counters.
    #[arg(long, env = "WRITETOP_PROC_PATH", default_value = "/proc")]
    proc_path: PathBuf,

    /// Mount table listing the filesystems to watch.
    #[arg(long, env = "WRITETOP_MOUNTINFO", default_value = "/proc/self/mountinfo")]
    mountinfo: PathBuf,
}

impl From<Cli> for writetop::Config {
    fn from(cli: Cli) -> Self {
        Self {
            window: Duration::from_secs(cli.seconds),
            top: cli.num,
            proc_path: cli.proc_path,
            mountinfo_path: cli.mountinfo,
        }
    }
}

/// Entry point for writetop.
///
/// Requires `CAP_SYS_ADMIN` for fanotify. Logging is configured through
/// `RUST_LOG` and goes to stderr; the ranking is printed to stdout.
///
/// ```bash
/// sudo RUST_LOG=debug writetop -s 10 -n 5
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let config = writetop::Config::from(Cli::parse());

    match writetop::run(&config).await {
        Ok(report) => {
            for line in report.lines() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
