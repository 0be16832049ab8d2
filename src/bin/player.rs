use std::{env, io, process};

use path_race::{cli::parse_player_args, logger::init_logger, prelude::*};

fn run(config: Configuration) -> Result<(), GameError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let args = parse_player_args(&args)?;
    if let Err(e) = init_logger(&format!("{}{}", Role::Player.name(), args.id), &config) {
        eprintln!("{e:#}");
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_player(args.players_count, args.id, stdin.lock(), stdout.lock())
}

fn main() {
    if let Err(e) = run(Configuration::from_env()) {
        eprintln!("{e}");
        process::exit(e.exit_code(Role::Player));
    }
}
