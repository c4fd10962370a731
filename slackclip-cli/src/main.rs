use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use slackclip_core::{
    ApiConfig, CommandExtractor, CredentialStore, FileExtractor, HttpThreadClient, MessageLink,
    SlackclipError, StorePaths, ThreadRenderer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "slackclip",
    version,
    about = "Copy a Slack thread as Markdown using your personal Slack account"
)]
struct Cli {
    /// Message link like https://<workspace>.slack.com/archives/<channel_id>/p<16 digit timestamp>
    /// Read from stdin when omitted, e.g. `pbpaste | slackclip | pbcopy`
    link: Option<String>,

    /// Store fresh credentials, from --from or the SLACKCLIP_EXTRACTOR command
    #[arg(long)]
    update_credentials: bool,

    /// JSON credential bundle to store instead of running the extractor
    #[arg(long, value_name = "FILE", requires = "update_credentials")]
    from: Option<PathBuf>,

    /// Report whether stored credentials are usable; exits 1 when they are not
    #[arg(long, conflicts_with = "update_credentials")]
    check_credentials: bool,

    /// Print the workspace name for the link instead of the thread
    #[arg(long, conflicts_with_all = ["update_credentials", "check_credentials"])]
    workspace_name: bool,

    /// Write the thread to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "slackclip=debug,slackclip_core=debug"
    } else {
        "slackclip=info,slackclip_core=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> slackclip_core::Result<ExitCode> {
    let paths = StorePaths::from_env_or_home()?;
    let mut store = CredentialStore::from_paths(&paths);

    if cli.update_credentials {
        if let Some(from) = cli.from {
            store = store.with_extractor(Box::new(FileExtractor::new(from)));
        } else if let Some(extractor) = CommandExtractor::from_env() {
            store = store.with_extractor(Box::new(extractor));
        }
        store.update(None)?;
        info!("Credentials stored in {}", store.path().display());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.check_credentials {
        return Ok(if store.present() {
            println!("credentials present: {}", store.path().display());
            ExitCode::SUCCESS
        } else {
            println!("credentials missing: {}", store.path().display());
            ExitCode::from(1)
        });
    }

    let link = match cli.link {
        Some(link) => link,
        None => read_link_from_stdin()?,
    };

    if cli.workspace_name {
        let parsed = MessageLink::parse(&link)?;
        println!("{}", store.friendly_name(&parsed.origin)?);
        return Ok(ExitCode::SUCCESS);
    }

    info!("Clipping thread for link: {link}");
    let client = HttpThreadClient::new(ApiConfig::from_env())?;
    let document = ThreadRenderer::new(&store, client).render(&link)?;

    match cli.output {
        Some(path) => {
            fs::write(&path, &document).map_err(|source| SlackclipError::Io {
                path: path.clone(),
                source,
            })?;
            info!("Done. Thread written to file.");
        }
        None => print!("{document}"),
    }

    Ok(ExitCode::SUCCESS)
}

fn read_link_from_stdin() -> slackclip_core::Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|source| SlackclipError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
    Ok(input.trim().to_string())
}
