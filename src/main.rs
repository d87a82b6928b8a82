use clap::{value_t, App, Arg, ArgMatches};
use dongfu::build::{self, build_site, Manifest};
use dongfu::config::{self, Config};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = App::new("dongfu")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Exports the blog as a static site")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("The project file (default: search upward for dongfu.yaml)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .help("The output directory; deleted and recreated on every run")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("threads")
                .short("j")
                .long("threads")
                .value_name("N")
                .help("The number of render threads (default: one per CPU)")
                .takes_value(true),
        )
        .get_matches();

    // RUST_LOG overrides the default `info` level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&matches) {
        Ok(manifest) => info!(
            pages = manifest.pages.len(),
            static_files = manifest.static_files,
            media_files = manifest.media_files,
            "Done"
        ),
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}

fn run(matches: &ArgMatches) -> build::Result<Manifest> {
    let threads = match matches.value_of("threads") {
        Some(_) => Some(value_t!(matches, "threads", usize).unwrap_or_else(|e| e.exit())),
        None => None,
    };
    let output = matches.value_of("output").map(Path::new);

    let config = match matches.value_of("config") {
        Some(path) => Config::from_project_file(Path::new(path), output, threads)?,
        None => {
            let cwd = std::env::current_dir().map_err(|err| config::Error::Open {
                path: ".".into(),
                err,
            })?;
            Config::from_directory(&cwd, output, threads)?
        }
    };
    build_site(&config)
}
