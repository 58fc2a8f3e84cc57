use clap::{value_parser, Arg, ArgAction, Command};
use logtail::{TailConfig, TailEngine, WriterSink};
use tracing_subscriber::EnvFilter;

fn command() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("follow rotated log files and print new lines")
        .arg(
            Arg::new("GLOB")
                .long("glob")
                .short('g')
                .required_unless_present("CONFIG")
                .help("file glob used to find files that need to be tailed"),
        )
        .arg(
            Arg::new("DIRECTORY")
                .long("directory")
                .short('d')
                .required_unless_present("CONFIG")
                .help("directory to search for files"),
        )
        .arg(
            Arg::new("DEBUG")
                .long("debug")
                .short('D')
                .action(ArgAction::SetTrue)
                .help("turn on debug output"),
        )
        .arg(
            Arg::new("SINGLE_FILE")
                .long("single-file")
                .short('s')
                .action(ArgAction::SetTrue)
                .help("follow a single file that is replaced on rotation (syslog, for instance)"),
        )
        .arg(
            Arg::new("RECOVERY_FILE")
                .long("recovery-file")
                .short('r')
                .help("file used to remember read position across restarts"),
        )
        .arg(
            Arg::new("READSIZE")
                .long("readsize")
                .value_parser(value_parser!(usize))
                .default_value("10000")
                .help("how many bytes are read from a file at a time"),
        )
        .arg(
            Arg::new("FRESH_START")
                .long("fresh-start")
                .action(ArgAction::SetTrue)
                .help("ignore the recovery file and start at the newest file"),
        )
        .arg(
            Arg::new("CONFIG")
                .long("config")
                .short('c')
                .conflicts_with_all(["GLOB", "DIRECTORY"])
                .help("JSON configuration file used instead of the flags above"),
        )
}

fn main() -> Result<(), anyhow::Error> {
    let args = command().get_matches();

    let default_level = if args.get_flag("DEBUG") { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match args.get_one::<String>("CONFIG") {
        Some(path) => TailConfig::from_json_file(path)?,
        None => {
            // both are required when --config is absent
            let directory = args.get_one::<String>("DIRECTORY").unwrap();
            let pattern = args.get_one::<String>("GLOB").unwrap();
            let mut config = TailConfig::new(directory, pattern.as_str())
                .with_single_file(args.get_flag("SINGLE_FILE"))
                .with_fresh_start(args.get_flag("FRESH_START"))
                .with_read_chunk_size(*args.get_one::<usize>("READSIZE").unwrap());
            if let Some(recovery) = args.get_one::<String>("RECOVERY_FILE") {
                config = config.with_checkpoint_path(recovery);
            }
            config
        }
    };
    tracing::debug!(?config, "starting");

    let mut engine = TailEngine::new(config)?;
    engine.run(&mut WriterSink::stdout())?;
    Ok(())
}
