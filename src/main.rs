use clap::{Args, Parser, Subcommand};
use resilient_ui::{
    ConnectionMode, Flow, FlowReport, FlowRunner, Session, StepResult, StepStatus,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run flows, each in its own fresh browser
    Run {
        /// Flow JSON files
        #[arg(required = true)]
        flows: Vec<PathBuf>,

        #[command(flatten)]
        browser: BrowserArgs,

        /// Write all reports to this JSON file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Check flow files without launching a browser
    Validate {
        #[arg(required = true)]
        flows: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct BrowserArgs {
    /// Run without a visible window
    #[arg(long)]
    headless: bool,

    /// Pass --no-sandbox to Chrome (Linux AppArmor workaround)
    #[arg(long)]
    no_sandbox: bool,

    /// Chrome executable
    #[arg(long, env = "RESILIENT_UI_CHROME")]
    chrome_path: Option<String>,

    /// Attach to a Chrome already listening on this debug port
    #[arg(long, conflicts_with_all = ["headless", "no_sandbox", "chrome_path"])]
    debug_port: Option<u16>,
}

impl BrowserArgs {
    fn connection_mode(&self) -> ConnectionMode {
        if let Some(port) = self.debug_port {
            return ConnectionMode::DebugPort(port);
        }

        match ConnectionMode::from_env() {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone().or(chrome_path),
                no_sandbox: self.no_sandbox || no_sandbox,
                headless: self.headless || headless,
            },
            other => other,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Validate { flows } => {
            let mut invalid = 0;
            for path in &flows {
                match Flow::from_file(path).await.and_then(|f| f.validate().map(|_| f)) {
                    Ok(flow) => println!("ok      {} ({} steps)", path.display(), flow.steps.len()),
                    Err(e) => {
                        invalid += 1;
                        println!("invalid {}: {}", path.display(), e);
                    }
                }
            }
            if invalid > 0 {
                std::process::exit(1);
            }
        }
        Command::Run {
            flows,
            browser,
            report,
        } => {
            let mode = browser.connection_mode();
            let mut reports = Vec::with_capacity(flows.len());
            let mut failed = 0;

            for path in &flows {
                let flow = Flow::from_file(path).await?;
                log::info!("Loaded flow '{}' from {}", flow.name, path.display());

                let result = Session::run(mode.clone(), |page, _teardown| async move {
                    FlowRunner::new(&page).run(&flow).await
                })
                .await;

                match result {
                    Ok(flow_report) => {
                        print_report(&flow_report);
                        if !flow_report.is_success() {
                            failed += 1;
                        }
                        reports.push(flow_report);
                    }
                    Err(e) => {
                        failed += 1;
                        log::error!("Flow {} could not run: {}", path.display(), e);
                        eprintln!("✗ {}: {}", path.display(), e);
                    }
                }
            }

            if let Some(report_path) = report {
                let json = serde_json::to_string_pretty(&reports)?;
                tokio::fs::write(&report_path, json).await?;
                log::info!("Report written to {}", report_path.display());
            }

            if failed > 0 {
                eprintln!("{} of {} flow(s) failed", failed, flows.len());
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_report(report: &FlowReport) {
    println!(
        "{} {} ({}/{} steps, {:.1}%)",
        if report.is_success() { "✓" } else { "✗" },
        report.flow_name,
        report.passed,
        report.total_steps,
        report.success_rate()
    );
    report.results.iter().for_each(print_step);
    if !report.teardown.is_empty() {
        println!("  teardown:");
        report.teardown.iter().for_each(print_step);
    }
    if let Some(diagnostics) = &report.diagnostics {
        println!("  test ids on page: {}", diagnostics.test_ids.join(", "));
    }
}

fn print_step(result: &StepResult) {
    let mark = match result.status {
        StepStatus::Passed => "  ✓",
        StepStatus::Failed => "  ✗",
        StepStatus::Skipped => "  -",
    };
    match (&result.error, &result.detail) {
        (Some(error), _) => println!("{} {} {}: {}", mark, result.step, result.action, error),
        (None, Some(detail)) => println!("{} {} {} ({})", mark, result.step, result.action, detail),
        (None, None) => println!("{} {} {}", mark, result.step, result.action),
    }
}
