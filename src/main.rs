use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use log::debug;
use std::process;

use hcmd::config::CONFIG_ENV;
use hcmd::selector::format_rows;
use hcmd::{
    Bindings, CommandExecutor, ConfigStore, Dispatcher, Error, Reporter, Request, TerminalPrompt,
};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    init_logging(matches.get_flag("debug"));

    // Prompts, the picker and the command all block; keep them off the
    // runtime so Ctrl-C can still be observed here.
    let mut task = tokio::task::spawn_blocking(move || run(&matches));

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            // The child shares our process group and got the same SIGINT.
            // Exit only once it is gone, whatever it did with the signal.
            debug!("interrupted, waiting for the running step to finish");
            let _ = (&mut task).await;
            process::exit(0);
        }
    };

    let failure = match joined {
        Ok(result) => result.err(),
        Err(e) => Some(anyhow::Error::from(e)),
    };
    if let Some(line) = failure.as_ref().and_then(render_failure) {
        eprintln!("{line}");
        process::exit(1);
    }
}

/// The single line printed for a failed run, or `None` when the failure is
/// an interrupt and the launcher should exit quietly.
fn render_failure(err: &anyhow::Error) -> Option<String> {
    if matches!(err.downcast_ref::<Error>(), Some(Error::Interrupted)) {
        return None;
    }
    Some(format!("{} {}", "Error:".red().bold(), err))
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn build_cli() -> Command {
    Command::new("h")
        .about("Launch named shell command shortcuts, filling in their parameters")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help(format!(
                    "Config file (default: ${CONFIG_ENV} or ~/.config/h_command/config.ini)"
                )),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Print diagnostic logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("Print the available commands and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Resolve parameters and print the command without running it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("title")
                .help("Command to run; omit to pick one interactively")
                .index(1),
        )
        .arg(
            Arg::new("args")
                .help("Parameter values: `name=value` or bare values in marker order")
                .index(2)
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true),
        )
}

fn run(matches: &ArgMatches) -> Result<()> {
    let store = ConfigStore::locate(matches.get_one::<String>("file").map(String::as_str));
    debug!("config file: {}", store.root().display());
    let config = store.load()?;

    if matches.get_flag("list") {
        for row in format_rows(&config) {
            println!("{row}");
        }
        return Ok(());
    }

    let request = match matches.get_one::<String>("title") {
        Some(title) => Request::title(
            title,
            Bindings::from_args(matches.get_many::<String>("args").unwrap_or_default()),
        ),
        None => Request::Pick,
    };

    let reporter = Reporter::new();
    let dispatcher = Dispatcher::new(config, reporter).dry_run(matches.get_flag("dry-run"));
    let executor = CommandExecutor::new(reporter);

    dispatcher.dispatch(request, &mut TerminalPrompt, &executor)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_trailing_args_keep_hyphens() {
        let matches = build_cli()
            .try_get_matches_from(["h", "-f", "x.ini", "grep", "-v", "pattern=foo", "bar"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("file").unwrap(), "x.ini");
        assert_eq!(matches.get_one::<String>("title").unwrap(), "grep");
        let args: Vec<_> = matches.get_many::<String>("args").unwrap().collect();
        assert_eq!(args, ["-v", "pattern=foo", "bar"]);
    }

    #[test]
    fn test_interrupt_renders_nothing() {
        let err = anyhow::Error::from(Error::Interrupted);
        assert_eq!(render_failure(&err), None);

        let err = anyhow::Error::from(Error::from(dialoguer::Error::IO(
            std::io::Error::from(std::io::ErrorKind::Interrupted),
        )));
        assert_eq!(render_failure(&err), None);
    }

    #[test]
    fn test_failure_renders_one_line() {
        let err = anyhow::Error::from(Error::TitleNotFound("nope".to_string()));
        let line = render_failure(&err).unwrap();
        assert!(line.contains("Error:"));
        assert!(line.ends_with("title \"nope\" not found"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_no_title_means_pick() {
        let matches = build_cli().try_get_matches_from(["h", "-n"]).unwrap();
        assert!(matches.get_one::<String>("title").is_none());
        assert!(matches.get_flag("dry-run"));
    }
}
