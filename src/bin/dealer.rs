use std::{env, process};

use tracing::warn;

use path_race::{
    cli::{check_deck, parse_dealer_args},
    logger::init_logger,
    prelude::*,
};

fn run(config: Configuration) -> Result<(), GameError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let args = parse_dealer_args(&args)?;
    if let Err(e) = init_logger(Role::Dealer.name(), &config) {
        eprintln!("{e:#}");
    }

    check_deck(&args.deck)?;
    let path = Path::from_file(&args.path, args.players.len())?;

    let dealer = Dealer::new(config);
    let on_seated = |early: EarlyStop| {
        if let Err(e) = ctrlc::set_handler(move || early.trigger()) {
            warn!("could not install interrupt handler: {e}");
        }
    };
    let outcome = if config.in_process_players() {
        dealer.run(path, &mut InProcessFactory::new(), on_seated)?
    } else {
        let mut factory = ProcessFactory::new(args.players, config.debug_player_stderr());
        dealer.run(path, &mut factory, on_seated)?
    };

    match outcome {
        Outcome::Finished(state) => {
            if config.verbose() {
                println!("{}", Scores(&state));
            }
            Ok(())
        }
        Outcome::Early => Err(GameError::EarlyGameOver),
    }
}

fn main() {
    if let Err(e) = run(Configuration::from_env()) {
        eprintln!("{e}");
        process::exit(e.exit_code(Role::Dealer));
    }
}
