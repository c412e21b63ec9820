use std::{process::ExitCode, sync::Mutex};

use anstream::{eprintln, println};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::InfoLevel;
use config::Config;
use image_qualify::{DomainError, Qualification, RuleSet, decompose, split_image_name};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod config;

/// Qualifies bare container image references with a registry domain.
///
/// Each image is matched against the rules in RULES, most specific rule
/// first, and prefixed with the domain of the first rule that matches.
#[derive(Parser)]
#[command(about, version)]
struct App {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity<InfoLevel>,

    /// The output format to emit.
    #[arg(long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Control the use of color in output.
    #[arg(long, value_enum, value_name = "MODE")]
    color: Option<ColorMode>,

    /// Qualify images that no rule matches with this domain.
    ///
    /// By default, unmatched images are emitted unchanged.
    #[arg(long, env = "IMAGEQUALIFIER_DEFAULT_DOMAIN", value_name = "DOMAIN", value_parser = parse_domain)]
    default_domain: Option<String>,

    /// List the rules in the order they're tried, instead of qualifying.
    #[arg(long, conflicts_with = "images")]
    list: bool,

    /// The rules file to load.
    ///
    /// Files ending in `.yml` or `.yaml` are read as YAML; anything else
    /// is read as `<pattern> <domain>` lines.
    rules: Utf8PathBuf,

    /// The image references to qualify.
    #[arg(required_unless_present = "list")]
    images: Vec<String>,
}

#[derive(Debug, Default, Copy, Clone, ValueEnum)]
pub(crate) enum OutputFormat {
    /// One reference per line.
    #[default]
    Plain,
    /// A JSON array of objects.
    Json,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub(crate) enum ColorMode {
    /// Use color output if the output supports it.
    Auto,
    /// Force color output, even if the output isn't a terminal.
    Always,
    /// Disable color output, even if the output is a compatible terminal.
    Never,
}

impl From<ColorMode> for anstream::ColorChoice {
    /// Maps `ColorMode` to `anstream::ColorChoice`.
    fn from(value: ColorMode) -> Self {
        match value {
            ColorMode::Auto => Self::Auto,
            ColorMode::Always => Self::Always,
            ColorMode::Never => Self::Never,
        }
    }
}

fn parse_domain(domain: &str) -> Result<String, DomainError> {
    image_qualify::validate_domain(domain)?;
    Ok(domain.into())
}

/// What happened to a single image.
#[derive(Serialize, Debug)]
struct Outcome<'a> {
    image: &'a str,
    domain: Option<&'a str>,
    qualified: String,
}

#[derive(Serialize, Debug)]
struct ListedRule<'a> {
    pattern: &'a str,
    domain: &'a str,
}

fn qualify_image<'a>(
    rules: &'a RuleSet,
    image: &'a str,
    default_domain: Option<&'a str>,
) -> Result<Outcome<'a>> {
    let outcome = match rules
        .qualify_image(image)
        .with_context(|| format!("couldn't qualify {image}"))?
    {
        Qualification::AlreadyQualified => {
            let (domain, _) = split_image_name(image)?;
            Outcome {
                image,
                domain,
                qualified: image.into(),
            }
        }
        Qualification::Qualified(qualified) => Outcome {
            image,
            domain: Some(qualified.domain()),
            qualified: qualified.into_string(),
        },
        Qualification::Unmatched => match default_domain {
            Some(domain) => {
                tracing::debug!("no rule matches {image}, falling back to {domain}");

                let qualified = format!("{domain}/{image}");
                decompose(&qualified).with_context(|| {
                    format!("couldn't qualify {image} with default domain {domain}")
                })?;

                Outcome {
                    image,
                    domain: Some(domain),
                    qualified,
                }
            }
            None => Outcome {
                image,
                domain: None,
                qualified: image.into(),
            },
        },
    };

    Ok(outcome)
}

fn list(app: &App, rules: &RuleSet) -> Result<()> {
    match app.format {
        OutputFormat::Plain => {
            for rule in rules {
                println!("{}\t{}", rule.pattern(), rule.domain());
            }
        }
        OutputFormat::Json => {
            let listed = rules
                .iter()
                .map(|rule| ListedRule {
                    pattern: rule.pattern(),
                    domain: rule.domain(),
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
    }

    Ok(())
}

fn run() -> Result<ExitCode> {
    human_panic::setup_panic!();

    let app = App::parse();

    let color_mode = match app.color {
        Some(color_mode) => color_mode,
        None => {
            // If `--color` wasn't specified, we first check a handful
            // of common environment variables, and then fall
            // back to `anstream`'s auto detection.
            if std::env::var("NO_COLOR").is_ok() {
                ColorMode::Never
            } else if std::env::var("FORCE_COLOR").is_ok()
                || std::env::var("CLICOLOR_FORCE").is_ok()
            {
                ColorMode::Always
            } else {
                ColorMode::Auto
            }
        }
    };

    anstream::ColorChoice::write_global(color_mode.into());

    let filter = EnvFilter::builder()
        .with_default_directive(app.verbose.tracing_level_filter().into())
        .from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                // NOTE: We don't need `with_ansi` here since our writer is
                // an `anstream::AutoStream` that handles color output for us.
                .with_writer(Mutex::new(anstream::stderr())),
        )
        .with(filter)
        .init();

    let config = Config::from_path(&app.rules)
        .with_context(|| format!("failed to load rules from {}", app.rules))?;

    tracing::debug!("loaded {} rules from {}", config.rules.len(), app.rules);

    if app.list {
        list(&app, &config.rules)?;
        return Ok(ExitCode::SUCCESS);
    }

    let outcomes = app
        .images
        .iter()
        .map(|image| qualify_image(&config.rules, image, app.default_domain.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    match app.format {
        OutputFormat::Plain => {
            for outcome in &outcomes {
                println!("{}", outcome.qualified);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // This is a little silly, but returning an ExitCode like this ensures
    // we always exit cleanly, rather than performing a hard process exit.
    match run() {
        Ok(exit) => exit,
        Err(err) => {
            eprintln!(
                "{fatal}: no images were qualified",
                fatal = "fatal".red().bold()
            );
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
