use anyhow::Context;
use backtrace::Backtrace;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pmsampler::config::Format;
use pmsampler::render::{JsonRenderer, TextRenderer};
use pmsampler::source::ProcSource;
use pmsampler::{Config, Engine, MetricCatalog, Renderer, ResultFilter, Scheduler};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info, Level};

fn main() {
    // custom panic hook to terminate whole process after unwinding
    std::panic::set_hook(Box::new(|s| {
        eprintln!("{s}");
        eprintln!("{:?}", Backtrace::new());
        std::process::exit(101);
    }));

    let matches = command().get_matches();

    if let Err(e) = run(matches) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn command() -> Command {
    Command::new(env!("CARGO_BIN_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_about(
            "pmsampler periodically samples system metrics, turns counters into \
            per-second rates and prints the filtered results.",
        )
        .arg(
            Arg::new("CONFIG")
                .help("Configuration file")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("INTERVAL")
                .long("interval")
                .short('i')
                .help("Sets the sampling interval")
                .action(ArgAction::Set)
                .value_parser(value_parser!(humantime::Duration)),
        )
        .arg(
            Arg::new("SAMPLES")
                .long("samples")
                .short('s')
                .help("Stop after this many samples")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("FORMAT")
                .long("format")
                .short('f')
                .help("Sets the output format")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Format)),
        )
        .arg(
            Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Write results to a file instead of stdout")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("PROCFS")
                .long("procfs")
                .help("Root of the procfs tree")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("METRIC")
                .long("metric")
                .short('m')
                .help("Sample this metric, may be repeated")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("RAW")
                .long("raw")
                .short('r')
                .help("Report current values instead of rates")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("LIST")
                .long("list")
                .short('l')
                .help("List the available metrics and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Increase the verbosity")
                .action(ArgAction::Count),
        )
}

fn run(matches: ArgMatches) -> anyhow::Result<()> {
    if matches.get_flag("LIST") {
        for name in ProcSource::metrics() {
            println!("{name}");
        }
        return Ok(());
    }

    let mut config = match matches.get_one::<PathBuf>("CONFIG") {
        Some(path) => Config::load(path)
            .with_context(|| format!("error loading config file: {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(interval) = matches.get_one::<humantime::Duration>("INTERVAL") {
        config.general_mut().set_interval((*interval).into());
    }

    if let Some(samples) = matches.get_one::<u64>("SAMPLES") {
        config.general_mut().set_samples(Some(*samples));
    }

    if let Some(metrics) = matches.get_many::<String>("METRIC") {
        config.general_mut().set_metrics(metrics.cloned().collect());
    }

    if matches.get_flag("RAW") {
        config.general_mut().set_raw(true);
    }

    if let Some(procfs) = matches.get_one::<PathBuf>("PROCFS") {
        config.source_mut().set_procfs(procfs.clone());
    }

    if let Some(format) = matches.get_one::<Format>("FORMAT") {
        config.output_mut().set_format(*format);
    }

    if let Some(path) = matches.get_one::<PathBuf>("OUTPUT") {
        config.output_mut().set_path(path.clone());
    }

    config.check().context("invalid configuration")?;

    // configure debug log
    let level = match matches.get_count("VERBOSE") {
        0 => config.log().level(),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let general = config.general();

    let source = ProcSource::new(config.source().procfs());
    let catalog = MetricCatalog::from_source(&source, general.metrics())?;
    let filter = ResultFilter::from_config(config.filter(), &catalog)?;
    let mut engine = Engine::new(catalog, filter)?;

    if general.raw() {
        engine = engine.raw_all();
    }

    for metric in general.raw_metrics() {
        engine = engine.raw(metric)?;
    }

    debug!("sampling {} metrics every {:?}", general.metrics().len(), general.interval());

    let mut scheduler = Scheduler::new(engine, source, general.interval())
        .timeout(general.timeout())
        .max_failures(general.max_failures())
        .samples(general.samples());

    let stop = scheduler.stop_handle();

    ctrlc::set_handler(move || {
        if stop.is_stopped() {
            info!("terminating immediately");
            std::process::exit(2);
        }

        info!("stopping after the current sample...");
        stop.stop();
    })
    .context("failed to set ctrl-c handler")?;

    let output = config.output();

    let writer: Box<dyn Write> = match output.path() {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to open output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };

    let mut renderer: Box<dyn Renderer> = match output.format() {
        Format::Text => Box::new(
            TextRenderer::new(writer)
                .precision(output.precision())
                .clamp_negative(output.clamp_negative()),
        ),
        Format::Json => Box::new(JsonRenderer::new(writer)),
    };

    // initialize async runtime
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to launch async runtime")?;

    let summary = rt.block_on(scheduler.run(&mut renderer))?;

    info!(
        "sampled {} ticks, missed {}, {} failed fetches",
        summary.ticks, summary.missed, summary.failures
    );

    Ok(())
}
