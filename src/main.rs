use std::any::Any;
use std::env;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Context, Result};
use log::info;

use scenegrid_runtime::app::{parse_script, print_final_state, write_step};
use scenegrid_runtime::{LoadPolicy, Runtime, RuntimeConfig};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    let result = panic::catch_unwind(AssertUnwindSafe(run))
        .unwrap_or_else(|panic| Err(anyhow!("runtime panicked: {}", panic_message(panic))));
    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let text = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read script {}", options.path))?;
    let script = parse_script(&text).with_context(|| format!("invalid script {}", options.path))?;
    println!("Running {} message(s) from {}", script.len(), options.path);

    let config = RuntimeConfig {
        load_policy: if options.continue_on_error {
            LoadPolicy::Continue
        } else {
            LoadPolicy::FailFast
        },
    };
    let runtime = Runtime::new(config)?;
    let report = runtime.run_script(script, options.continue_on_error);
    info!("script finished with {} failure(s)", report.failures());

    if !options.summary_only {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for step in &report.steps {
            write_step(&mut out, step)?;
        }
    }
    print_final_state(&runtime);

    match report.steps.iter().find(|step| !step.is_success()) {
        Some(step) if !options.continue_on_error => Err(anyhow!(
            "step {} ({}) did not complete",
            step.index,
            step.action.as_deref().unwrap_or("no action")
        )),
        _ => Ok(()),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    path: String,
    continue_on_error: bool,
    summary_only: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: scenegrid-runtime <script.json> [--continue-on-error] [--summary-only]"
            ));
        };
        let mut continue_on_error = false;
        let mut summary_only = false;
        for arg in args {
            match arg.as_str() {
                "--continue-on-error" => continue_on_error = true,
                "--summary-only" => summary_only = true,
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --continue-on-error or --summary-only"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            continue_on_error,
            summary_only,
        })
    }
}
