use clap::Parser;
use topsis_client::config::{CliConfig, Command, SubmitArgs};
use topsis_client::core::session::{Completion, SUBMIT_LABEL_BUSY};
use topsis_client::domain::ports::ScoringService;
use topsis_client::utils::logger;
use topsis_client::utils::validation::Validate;
use topsis_client::{
    EmailJsRelay, FormController, HeaderReader, HttpScoringClient, ResultView, SubmitOutcome,
    TomlConfig,
};

const SAMPLE_INPUT: &str = include_str!("../data/sample_input.csv");

const EXIT_INVALID: i32 = 1;
const EXIT_SERVICE: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let mut config = match TomlConfig::load_or_default(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(EXIT_INVALID);
        }
    };
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(EXIT_INVALID);
    }

    let exit_code = match cli.command {
        Command::Submit(args) => run_submit(&config, args).await?,
        Command::Health => run_health(&config).await?,
        Command::Sample { output } => {
            std::fs::write(&output, SAMPLE_INPUT)?;
            println!("📁 Sample decision matrix written to {}", output.display());
            0
        }
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run_health(config: &TomlConfig) -> anyhow::Result<i32> {
    let client = HttpScoringClient::new(config)?;
    match client.health().await {
        Ok(status) => {
            println!("✅ {}", status);
            Ok(0)
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            eprintln!("❌ {}", e.user_message());
            Ok(EXIT_SERVICE)
        }
    }
}

async fn run_submit(config: &TomlConfig, args: SubmitArgs) -> anyhow::Result<i32> {
    let scoring = HttpScoringClient::new(config)?;
    let relay = match &config.notification {
        Some(section) => Some(EmailJsRelay::new(section, config.service.timeout_seconds)?),
        None => None,
    };
    let controller = FormController::new(
        scoring,
        relay,
        HeaderReader::new(config.delimiter()?),
        config.rules(),
        config.service.base_url.clone(),
    );

    match controller.select_file(&args.file).await {
        Ok(count) => println!("ℹ️  Detected {} criteria in {}", count, args.file.display()),
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            return Ok(EXIT_INVALID);
        }
    }

    controller.set_weights(&args.weights).await;
    controller.set_impacts(&args.impacts).await;
    controller
        .set_notify(args.notify, args.email.as_deref())
        .await;

    let (weights, impacts) = controller
        .inspect(|s| {
            let consistency = s.consistency();
            (consistency.weights_label(), consistency.impacts_label())
        })
        .await;
    println!("   Weights: {}", weights);
    println!("   Impacts: {}", impacts);

    if controller.can_submit().await {
        println!("⏳ {}", SUBMIT_LABEL_BUSY);
    }

    match controller.submit().await {
        SubmitOutcome::Refused(refusal) => {
            eprintln!("❌ {}", refusal);
            Ok(EXIT_INVALID)
        }
        SubmitOutcome::Failed(error) => {
            eprintln!("❌ {}", error);
            Ok(EXIT_SERVICE)
        }
        SubmitOutcome::Discarded => {
            eprintln!("❌ The submission was cancelled before it completed");
            Ok(EXIT_SERVICE)
        }
        SubmitOutcome::Succeeded {
            result,
            notification,
        } => {
            match ResultView::build(&result, controller.base_url()) {
                Some(view) => {
                    println!();
                    print!("{}", view);
                }
                None => println!("ℹ️  The service returned no ranked rows"),
            }
            println!(
                "🕒 Scored at {}",
                result.received_at.format("%Y-%m-%d %H:%M:%S UTC")
            );

            if let Some(mail) = &result.server_mail {
                match (mail.sent, mail.error.as_deref()) {
                    (true, _) => println!("📧 The service mailed the result file"),
                    (false, Some(error)) => eprintln!("⚠️  Service mail: {}", error),
                    (false, None) => {}
                }
            }

            if let Some(handle) = notification {
                match handle.wait().await {
                    Some(Completion::Applied) => {
                        let failure = controller
                            .inspect(|s| s.notification_error().map(str::to_string))
                            .await;
                        match failure {
                            Some(message) => eprintln!("⚠️  {}", message),
                            None => println!(
                                "📧 Result link sent to {}",
                                args.email.as_deref().unwrap_or_default()
                            ),
                        }
                    }
                    Some(Completion::Discarded) => {
                        eprintln!("⚠️  The result email outcome was discarded")
                    }
                    None => {
                        tracing::error!("Notification task did not complete");
                        eprintln!("⚠️  Result email could not be sent: the relay task stopped");
                    }
                }
            }
            Ok(0)
        }
    }
}
