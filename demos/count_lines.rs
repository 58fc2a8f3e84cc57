use clap::{Arg, Command};
use logtail::{Sink, SinkError, Step, TailConfig, TailEngine};

/// Counts lines instead of printing them
#[derive(Default)]
struct Counter {
    lines: usize,
    bytes: usize,
}

impl Sink for Counter {
    fn deliver(&mut self, line: &str) -> Result<(), SinkError> {
        self.lines += 1;
        self.bytes += line.len();
        Ok(())
    }
}

fn main() -> Result<(), anyhow::Error> {
    let app = Command::new(clap::crate_name!())
        .arg(
            Arg::new("DIRECTORY")
                .long("directory")
                .short('d')
                .required(true)
                .help("directory holding the rotated files"),
        )
        .arg(
            Arg::new("GLOB")
                .long("glob")
                .short('g')
                .required(true)
                .help("file glob of the rotation sequence"),
        )
        .arg(
            Arg::new("RECOVERY_FILE")
                .long("recovery-file")
                .short('r')
                .help("remember position so the next run only counts new lines"),
        );

    let args = app.get_matches();

    let mut config = TailConfig::new(
        args.get_one::<String>("DIRECTORY").unwrap(),
        args.get_one::<String>("GLOB").unwrap().as_str(),
    );
    if let Some(recovery) = args.get_one::<String>("RECOVERY_FILE") {
        config = config.with_checkpoint_path(recovery);
    }

    let mut engine = TailEngine::new(config)?;
    let mut counter = Counter::default();
    match engine.step(&mut counter)? {
        Step::Waiting => println!("no matching files yet"),
        Step::Drained { path, bytes_consumed, .. } => println!(
            "{} new lines ({} bytes) from `{}`, now at offset {}",
            counter.lines,
            counter.bytes,
            path.display(),
            bytes_consumed
        ),
    }

    Ok(())
}
