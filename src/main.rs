// Main entry point for rp-reporter

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use rp_reporter::artifact::{ArtifactCapture, DirectoryArtifacts, NoArtifacts};
use rp_reporter::cli::{Cli, RunArgs};
use rp_reporter::client::{OutboxClient, RecordingClient, ReportingClient};
use rp_reporter::config::{self, Config};
use rp_reporter::events::{EventReader, RunnerEvent};
use rp_reporter::execution::{HierarchyController, SyncBridge};
use rp_reporter::report::LaunchTree;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rp_reporter::logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting rp-reporter v{}", env!("CARGO_PKG_VERSION"));
    }

    let mut config = Config::load();

    if cli.config {
        let mut effective = config.clone();
        cli.get_run_args().apply_to(&mut effective);
        print_config(&effective);
        return Ok(());
    }

    // Handle init_config flag
    if let Some(config_file) = cli.init_config {
        std::fs::write(&config_file, Config::default().to_toml())
            .with_context(|| format!("Failed to write {}", config_file.display()))?;
        println!("Configuration file created: {}", config_file.display());
        println!("\nYou can now edit the file to customize your settings.");
        print_precedence();
        return Ok(());
    }

    // Handle completion flag
    if let Some(shell_type) = cli.completion {
        return handle_completion(&shell_type);
    }

    let args = cli.get_run_args().clone();
    args.apply_to(&mut config);
    run(args, config).await
}

async fn run(args: RunArgs, config: Config) -> Result<()> {
    let input = open_events(&args)?;

    let recorder = args.dry_run.then(|| Arc::new(RecordingClient::new()));
    let client: Arc<dyn ReportingClient> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => Arc::new(open_outbox(&args, &config)?),
    };

    let artifacts: Arc<dyn ArtifactCapture> = match &config.reporter.screenshots_dir {
        Some(dir) if config.reporter.attach_screenshots => {
            debug!("Picking up screenshots from {}", dir.display());
            Arc::new(DirectoryArtifacts::new(dir.clone()))
        }
        _ => Arc::new(NoArtifacts),
    };

    let options = config.reporter_options();
    let bridge = SyncBridge::new(tokio::runtime::Handle::current(), options.wait_time);
    let mut controller = HierarchyController::new(client, artifacts, bridge, options);

    // The controller blocks on every operation, like the runner callbacks it
    // stands in for, so it runs off the async workers.
    let handled = tokio::task::spawn_blocking(move || {
        let mut handled = 0usize;
        for event in EventReader::new(input) {
            controller.handle(&event);
            handled += 1;
        }
        if controller.launch_id().is_some() && !controller.is_drained() {
            warn!("Event stream ended before run-exit; draining outstanding operations");
            controller.handle(&RunnerEvent::RunExit);
        }
        handled
    })
    .await
    .context("Event loop terminated abnormally")?;

    info!("Handled {} event(s)", handled);

    if let Some(recorder) = recorder {
        match LaunchTree::from_operations(&recorder.operations()) {
            Some(tree) => print!("{}", tree.render()),
            None => println!("No launch was started"),
        }
    }

    Ok(())
}

fn open_events(args: &RunArgs) -> Result<Box<dyn BufRead + Send>> {
    if args.reads_stdin() {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }
    let file = File::open(&args.events)
        .with_context(|| format!("Failed to open event stream {}", args.events.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn open_outbox(args: &RunArgs, config: &Config) -> Result<OutboxClient> {
    let mut outbox = match &args.output {
        Some(path) => OutboxClient::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?,
        None => OutboxClient::stdout(),
    };
    if let Some(dir) = &args.attachments_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        outbox = outbox.with_attachments_dir(dir.clone());
    }
    outbox
        .write_session(&config.portal.endpoint, &config.portal.project)
        .context("Failed to write session header")?;
    Ok(outbox)
}

fn print_config(config: &Config) {
    println!("Current configuration:");
    match Config::discover() {
        Some(path) => println!("\n  Configuration file: {}", path.display()),
        None => {
            println!("\n  No configuration file loaded");
            println!("  Create one with: rp-reporter --init-config .rpreporterrc.toml");
        }
    }

    println!("\n  Portal:");
    println!("    Endpoint: {}", config.portal.endpoint);
    println!("    Project: {}", config.portal.project);
    println!("    Launch: {}", config.portal.launch);
    if let Some(ref description) = config.portal.description {
        println!("    Description: {}", description);
    }
    if !config.portal.tags.is_empty() {
        println!("    Tags: {}", config.portal.tags.join(", "));
    }
    match config.masked_token() {
        Some(token) => println!("    Token: {}", token),
        None => println!("    Token: not set"),
    }

    println!("\n  Reporter:");
    println!(
        "    Screenshots: {}",
        if config.reporter.attach_screenshots {
            "enabled"
        } else {
            "disabled"
        }
    );
    if let Some(ref dir) = config.reporter.screenshots_dir {
        println!("    Screenshots dir: {}", dir.display());
    }
    println!("    Show passed hooks: {}", config.reporter.show_passed_hooks);
    println!("    Wait time: {}ms", config.reporter.wait_time_ms);

    println!("\n  Environment variables:");
    for key in [config::ENV_RP_ENDPOINT, config::ENV_RP_TOKEN] {
        let state = if std::env::var(key).is_ok() {
            "set"
        } else {
            "not set"
        };
        println!("    {}: {}", key, state);
    }

    print_precedence();
}

fn print_precedence() {
    println!("\nConfiguration precedence:");
    println!("  1. Command-line arguments (highest)");
    println!("  2. Environment variables");
    println!("  3. Configuration file");
    println!("  4. Built-in defaults (lowest)");
}

fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell type '{}' (supported: bash, zsh, fish, elvish, powershell)",
                shell_type
            ));
        }
    };

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, &bin_name, &mut std::io::stdout());

    Ok(())
}
