//! CLI driver for `dicom-forward`.
//!
//! Reads composite DICOM instances from disk (standing in for the
//! inbound C-STORE SCP named out of scope in `DESIGN.md`) and forwards
//! each one, in turn, to every destination configured in a TOML file via
//! [`dicom_forward::store_multiple_destination`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use dicom_forward::config::ForwardConfig;
use dicom_forward::params::InboundAssociation;
use dicom_forward::progress::BarProgressSink;
use dicom_forward::{store_multiple_destination, ForwardDestination, Params};
use dicom_object::meta::FileMetaTable;
use indicatif::{ProgressBar, ProgressStyle};
use snafu::{Report, ResultExt, Snafu};
use tracing::{error, info, warn, Level};
use walkdir::WalkDir;

/// DICOM store-and-forward engine
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// path to the TOML configuration file listing the destinations
    config: PathBuf,
    /// the DICOM file(s) or director{y,ies} to forward
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// verbose mode
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
    /// stop at the first instance that could not be read from disk
    #[arg(long = "fail-first")]
    fail_first: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    /// failed to load configuration from {path}
    Config {
        path: String,
        source: dicom_forward::config::ConfigError,
    },

    /// failed to configure destination {name}
    Destination {
        name: String,
        source: dicom_forward::config::ConfigError,
    },

    /// failed to read DICOM file {path}
    ReadFile { path: String, source: std::io::Error },

    /// {path} is not a valid DICOM file (missing file meta information)
    NotDicom {
        path: String,
        source: dicom_object::meta::Error,
    },

    /// failed to forward instance from {path}
    Forward {
        path: String,
        source: dicom_forward::ForwardError,
    },
}

type Result<T, E = Error> = std::result::Result<T, E>;

fn main() {
    let app = App::parse();
    run(app).unwrap_or_else(|e| {
        error!("{}", Report::from_error(e));
        std::process::exit(-2);
    });
}

/// One file's worth of `Params` inputs, read from disk ahead of time so
/// that opening the file (and failing to do so) is reported before any
/// destination is contacted.
struct PendingInstance {
    path: PathBuf,
    iuid: String,
    cuid: String,
    tsuid: String,
    reader: Box<dyn Read + Send>,
}

fn discover_files(inputs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(&input)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| !e.file_type().is_dir())
            {
                files.push(entry.into_path());
            }
        } else {
            files.push(input);
        }
    }
    files
}

/// Open `path`, skip the 128-byte preamble and `DICM` magic code, and
/// parse just the file meta group -- leaving `reader` positioned at the
/// start of the raw data set, which becomes `Params::data` untouched.
fn open_instance(path: &Path) -> Result<PendingInstance> {
    let mut reader = BufReader::new(File::open(path).context(ReadFileSnafu {
        path: path.display().to_string(),
    })?);

    let mut preamble = [0u8; 128];
    reader.read_exact(&mut preamble).context(ReadFileSnafu {
        path: path.display().to_string(),
    })?;

    let meta = FileMetaTable::from_reader(&mut reader).context(NotDicomSnafu {
        path: path.display().to_string(),
    })?;

    Ok(PendingInstance {
        path: path.to_path_buf(),
        iuid: meta.media_storage_sop_instance_uid().to_string(),
        cuid: meta.media_storage_sop_class_uid().to_string(),
        tsuid: meta.transfer_syntax().to_string(),
        reader: Box::new(reader),
    })
}

fn run(app: App) -> Result<()> {
    let App {
        config,
        files,
        verbose,
        fail_first,
    } = app;

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
            .finish(),
    )
    .unwrap_or_else(|e| {
        eprintln!("[WARN] could not install global tracing subscriber: {e}");
    });

    let config = ForwardConfig::from_file(&config).context(ConfigSnafu {
        path: config.display().to_string(),
    })?;

    let mut destinations: Vec<ForwardDestination> = Vec::with_capacity(config.destination.len());
    for entry in &config.destination {
        let destination = ForwardDestination::from_config(
            entry,
            &config.calling_ae_title,
            config.max_pdu_length,
        )
        .context(DestinationSnafu {
            name: entry.name.clone(),
        })?;
        destinations.push(destination);
    }

    let files = discover_files(files);

    let progress_bar = if verbose {
        None
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}")
                .expect("valid progress bar template"),
        );
        bar.enable_steady_tick(Duration::from_millis(480));
        Some(bar)
    };
    let sink = progress_bar
        .clone()
        .map(BarProgressSink::new)
        .unwrap_or_else(|| BarProgressSink::new(ProgressBar::hidden()));

    for path in files {
        if verbose {
            info!("Forwarding '{}'...", path.display());
        }

        let instance = match open_instance(&path) {
            Ok(instance) => instance,
            Err(e) => {
                warn!("{}", Report::from_error(&e));
                if fail_first {
                    return Err(e);
                }
                continue;
            }
        };

        let params = Params {
            iuid: instance.iuid,
            cuid: instance.cuid,
            tsuid: instance.tsuid,
            pcid: 1,
            data: instance.reader,
            inbound_association: InboundAssociation::none(),
        };

        if let Err(source) = store_multiple_destination(&mut destinations, params, &sink) {
            let e = Error::Forward {
                path: instance.path.display().to_string(),
                source,
            };
            warn!("{}", Report::from_error(&e));
            if fail_first {
                return Err(e);
            }
        }

        if let Some(bar) = &progress_bar {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress_bar {
        bar.finish_with_message("done");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::App;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        App::command().debug_assert();
    }
}
