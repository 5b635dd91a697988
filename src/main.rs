mod config;
mod error;
mod message;
mod projection;
mod sparkpost;
mod transmission;

use clap::Parser;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::message::ParsedMessage;
use crate::projection::Projection;
use crate::sparkpost::{SparkPost, Transmitter};
use crate::transmission::{Transmission, TransmissionResults};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Parse and send an RFC822-compliant file (e.g. .eml extension) via SparkPost",
    long_about = None
)]
struct Cli {
    /// INI file holding the [SparkPost] section
    #[arg(long, env = "EML2SPARKPOST_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print the transmission JSON instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// RFC822 file to send
    eml_file: Option<PathBuf>,

    /// Override the From: address in the file
    forced_from: Option<String>,

    /// Send to this single address instead of To/Cc/Bcc
    forced_to: Option<String>,
}

/// How a run finished without error. Every outcome exits 0.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Usage,
    MissingInput,
    DryRun,
    Sent(TransmissionResults),
}

fn print_usage(prog: &str) {
    let short = Path::new(prog)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| prog.to_string());

    println!();
    println!("NAME");
    println!("   {}", prog);
    println!("   Parse and send an RFC822-compliant file (e.g. .eml extension) via SparkPost.");
    println!();
    println!("SYNOPSIS");
    println!("  ./{} filename.eml [forced_from [forced_to] ]", short);
    println!();
    println!("  filename.eml must contain RFC822 formatted content including subject, from, to, and MIME parts.");
    println!("  cc and bcc headers are also read and applied.");
    println!();
    println!("OPTIONAL PARAMETERS");
    println!("    forced_from - such as test@example.com - override the From: address in the file.");
    println!("    forced_to - such as sender@example.com - override the To: addresses in the file");
}

/// Runs the whole pipeline. `connect` is only called once a transmission is
/// ready to go out.
fn run<F, T>(cli: &Cli, prog: &str, connect: F) -> Result<Outcome>
where
    F: FnOnce(&Config) -> Result<T>,
    T: Transmitter,
{
    let config = Config::load(&cli.config)?;

    let eml_file = match &cli.eml_file {
        Some(path) => path,
        None => {
            print_usage(prog);
            return Ok(Outcome::Usage);
        }
    };

    if !eml_file.exists() {
        println!("Can't open file {} - stopping.", eml_file.display());
        return Ok(Outcome::MissingInput);
    }

    let message = ParsedMessage::parse_file(eml_file)?;
    let projection = Projection::project(&message.headers, cli.forced_from.as_deref());
    let recipients = projection.recipients(cli.forced_to.as_deref())?;
    info!("[main] {} recipients resolved", recipients.len());

    let transmission = Transmission::build(
        &projection.header_block,
        &message.body,
        recipients,
        &config,
    );

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&transmission)?);
        return Ok(Outcome::DryRun);
    }

    let transmitter = connect(&config)?;
    let start = Instant::now();
    let results = transmitter.send(&transmission)?;
    let elapsed = start.elapsed().as_secs_f64();

    println!("Message accepted by SparkPost");
    println!("Total accepted recipients: {}", results.total_accepted_recipients);
    println!("Total rejected recipients: {}", results.total_rejected_recipients);
    println!("Transmission id:           {}", results.id);
    println!("API call duration:         {:.3} seconds", elapsed);

    Ok(Outcome::Sent(results))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let prog = std::env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    debug!("[main] {:?}", cli);

    match run(&cli, &prog, SparkPost::new) {
        Ok(outcome) => debug!("[main] finished: {:?}", outcome),
        Err(e) => {
            println!("{}", e);
            process::exit(e.exit_code());
        }
    }
}
