use std::{io::Read, thread};

use path_race::prelude::*;

use crate::common::{init_test_logger, quiet, scripted_seat, EXAMPLE_PATH};

mod common;

#[test]
fn honest_script_plays_to_the_end() {
    init_test_logger();
    let path = Path::parse("3;::-Mo1::-", 1).unwrap();
    let (channel, mut player) = scripted_seat();
    let scheduler = TurnScheduler::new(path, vec![channel], quiet());
    let dealer = thread::spawn(move || scheduler.run());

    player.send("^");
    player.expect("3;::-Mo1::-");
    player.expect("YT");
    player.send("DO1\n");
    player.expect("HAP0,1,0,3,0");
    player.expect("YT");
    player.send("DO2\n");
    player.expect("HAP0,2,0,0,0");
    player.expect("DONE");

    let outcome = dealer.join().unwrap().unwrap();
    let Outcome::Finished(state) = outcome else {
        panic!("game did not finish");
    };
    assert_eq!(state.records()[0].money, 10);
}

#[test]
fn early_stop_while_waiting_for_a_move() {
    init_test_logger();
    let path = Path::parse(EXAMPLE_PATH, 2).unwrap();
    let (first, mut p0) = scripted_seat();
    let (second, mut p1) = scripted_seat();
    let scheduler = TurnScheduler::new(path, vec![first, second], quiet());
    let early = scheduler.early_stop();
    let dealer = thread::spawn(move || scheduler.run());

    p0.send("^");
    p0.expect(EXAMPLE_PATH);
    p1.send("^");
    p1.expect(EXAMPLE_PATH);
    p0.expect("YT");

    early.trigger();
    early.trigger();
    p0.expect("EARLY");
    p1.expect("EARLY");

    // players leave, which unblocks the dealer
    drop(p0);
    drop(p1);
    assert_eq!(dealer.join().unwrap().unwrap(), Outcome::Early);
}

#[test]
fn malformed_reply_is_fatal() {
    init_test_logger();
    let path = Path::parse("3;::-Mo1::-", 1).unwrap();
    let (channel, mut player) = scripted_seat();
    let scheduler = TurnScheduler::new(path, vec![channel], quiet());
    let dealer = thread::spawn(move || scheduler.run());

    player.send("^");
    player.expect("3;::-Mo1::-");
    player.expect("YT");
    player.send("MOVE1\n");

    let err = dealer.join().unwrap().unwrap_err();
    assert!(matches!(err, GameError::Comms(CommsError::UnexpectedMessage { .. })));
    assert_eq!(err.exit_code(Role::Dealer), 5);
}

#[test]
fn vanished_player_is_fatal() {
    init_test_logger();
    let path = Path::parse(EXAMPLE_PATH, 2).unwrap();
    let (first, mut p0) = scripted_seat();
    let (second, p1) = scripted_seat();
    let scheduler = TurnScheduler::new(path, vec![first, second], quiet());
    let dealer = thread::spawn(move || scheduler.run());

    p0.send("^");
    p0.expect(EXAMPLE_PATH);
    drop(p1);

    let err = dealer.join().unwrap().unwrap_err();
    assert!(matches!(err, GameError::Comms(CommsError::Closed)));
}

#[test]
fn cheating_player_against_capacity_checks() {
    init_test_logger();
    let path = Path::parse(EXAMPLE_PATH, 2).unwrap();
    let (first, mut p0) = scripted_seat();
    let (second, mut p1) = scripted_seat();
    let config = quiet().with_move_policy(MovePolicy::CapacityChecked);
    let scheduler = TurnScheduler::new(path, vec![first, second], config);
    let dealer = thread::spawn(move || scheduler.run());

    p0.send("^");
    p0.expect(EXAMPLE_PATH);
    p1.send("^");
    p1.expect(EXAMPLE_PATH);

    p0.expect("YT");
    p0.send("DO1\n");
    p0.expect("HAP0,1,0,3,0");
    p1.expect("HAP0,1,0,3,0");

    // the money site only holds one player
    p1.expect("YT");
    p1.send("DO1\n");

    let err = dealer.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        GameError::Comms(CommsError::InvalidMove { player: 1, target: 1 })
    ));
}

#[test]
fn scripted_dealer_against_real_player() {
    init_test_logger();
    let (channel, mut dealer_side) = scripted_seat();
    // the scripted side plays the dealer here: its output is what the player reads
    let player = thread::spawn(move || run_player(1, 0, channel.reader, channel.writer));

    let mut request = [0u8; 1];
    dealer_side.input.read_exact(&mut request).unwrap();
    assert_eq!(&request, b"^");
    dealer_side.send("3;::-Mo1::-\nYT\n");
    dealer_side.expect("DO1");
    dealer_side.send("HAP0,1,0,3,0\nYT\n");
    dealer_side.expect("DO2");
    dealer_side.send("HAP0,2,0,0,0\nDONE\n");

    player.join().unwrap().unwrap();
}
